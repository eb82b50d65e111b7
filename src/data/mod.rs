// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From random numbers to device-ready tensor batches:
//
//   DataGenerator     → random sorting problems (SortSample)
//       │
//       ▼
//   SortBatcher       → stacks samples into SortBatch tensors
//       │
//       ▼
//   Trainer           → one batch per training / evaluation step

/// Seeded generator of random sorting problems
pub mod generator;

/// Stacks samples into tensor batches
pub mod batcher;
