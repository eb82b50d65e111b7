// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that define what a sorting problem IS:
// samples, pointer permutations, errors and the sample source
// abstraction.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// Typed errors for every contract violation
pub mod error;

// Annotation-space pointers and permutation helpers
pub mod permutation;

// A validated sorting example
pub mod sample;

// Core abstractions (traits) that other layers implement
pub mod traits;
