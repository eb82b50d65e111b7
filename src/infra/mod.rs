// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem during a run:
//
//   checkpoint.rs  — Saving and loading model weights with
//                    Burn's CompactRecorder, plus the
//                    TrainConfig as JSON so the sort command
//                    can rebuild the same architecture
//
//   metrics.rs     — Smoothed losses, windowed accuracy and
//                    the metrics.csv learning-curve log

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics and CSV logging
pub mod metrics;
