// ============================================================
// Layer 4 — Synthetic Sorting Data
// ============================================================
// Produces random sorting problems on demand.
//
// For each sample:
//   1. Draw L uniform numbers in [0, 1) and sort them
//   2. Shuffle them with a random permutation → encoder inputs
//   3. Targets point at the input holding rank 0, rank 1, ...
//      then at the end sentinel
//   4. Decoder inputs start with a zero start token, followed by
//      the sorted numbers (train) or the inputs as given (eval)
//
// Example (L = 3):
//   sorted    = [0.1, 0.2, 0.3]
//   shuffle   = [2, 0, 1]            rank of each input position
//   inputs    = [0.3, 0.1, 0.2]
//   pointers  = [2, 3, 1, 0]
//   decoder   = [0.0, 0.1, 0.2, 0.3] (train)
//             = [0.0, 0.3, 0.1, 0.2] (eval)
//
// A seeded StdRng makes whole training runs reproducible.

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::domain::error::PointerResult;
use crate::domain::sample::SortSample;
use crate::domain::traits::{SampleMode, SampleSource};

pub struct DataGenerator {
    max_len: usize,
    rng:     StdRng,
}

impl DataGenerator {
    pub fn new(max_len: usize, seed: u64) -> Self {
        Self { max_len, rng: StdRng::seed_from_u64(seed) }
    }

    /// Draw one sorting problem.
    pub fn sample(&mut self, mode: SampleMode) -> PointerResult<SortSample> {
        let len = self.max_len;

        let mut sorted: Vec<f32> = (0..len).map(|_| self.rng.gen::<f32>()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        // shuffle[i] is the rank of the number placed at input position i
        let mut shuffle: Vec<usize> = (0..len).collect();
        shuffle.shuffle(&mut self.rng);

        let inputs: Vec<f32> = shuffle.iter().map(|&rank| sorted[rank]).collect();

        let mut pointers = vec![0usize; len + 1];
        for (position, &rank) in shuffle.iter().enumerate() {
            pointers[rank] = position + 1;
        }

        let tail = match mode {
            SampleMode::Train => &sorted,
            SampleMode::Eval  => &inputs,
        };
        let decoder_inputs: Vec<Vec<f32>> = std::iter::once(0.0)
            .chain(tail.iter().copied())
            .map(|v| vec![v])
            .collect();

        SortSample::from_parts(
            inputs.into_iter().map(|v| vec![v]).collect(),
            decoder_inputs,
            pointers,
        )
    }
}

impl SampleSource for DataGenerator {
    fn max_len(&self) -> usize {
        self.max_len
    }

    fn next_batch(&mut self, batch_size: usize, mode: SampleMode) -> PointerResult<Vec<SortSample>> {
        (0..batch_size).map(|_| self.sample(mode)).collect()
    }
}
