// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training driver only needs "give me N more samples".
// Where they come from (random generator, fixed fixture,
// file) is hidden behind SampleSource.

use crate::domain::error::PointerResult;
use crate::domain::sample::SortSample;

// ─── SampleMode ───────────────────────────────────────────────────────────────
/// Which decoder inputs a source should attach to its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// Decoder inputs are the sorted values (teacher forcing).
    Train,
    /// Decoder inputs are the values in input order.
    Eval,
}

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can hand out batches of sorting examples.
///
/// DataGenerator is the implementation used for training: every
/// call draws fresh random sequences.
pub trait SampleSource {
    /// Sequence length L of every sample produced.
    fn max_len(&self) -> usize;

    /// Produce `batch_size` samples in the given mode.
    fn next_batch(&mut self, batch_size: usize, mode: SampleMode) -> PointerResult<Vec<SortSample>>;
}
