// ============================================================
// Layer 2 — Sort Use Case
// ============================================================
// Loads the latest checkpoint and sorts one list of numbers.
// The exact ascending order is computed alongside so the
// caller can see whether the network got it right.

use anyhow::Result;
use burn::prelude::Backend;

use crate::domain::permutation::{is_exact_match, sorting_pointers};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{Prediction, Sorter};

type InferBackend = burn::backend::Wgpu;

/// A prediction next to the reference answer.
#[derive(Debug, Clone, PartialEq)]
pub struct SortOutcome {
    pub prediction: Prediction,
    pub expected:   Vec<usize>,
    pub correct:    bool,
}

pub struct SortUseCase<B: Backend = InferBackend> {
    sorter: Sorter<B>,
}

impl SortUseCase<InferBackend> {
    pub fn new(checkpoint_dir: String) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        Self::with_device(checkpoint_dir, device)
    }
}

impl<B: Backend> SortUseCase<B> {
    pub fn with_device(checkpoint_dir: String, device: B::Device) -> Result<Self> {
        let ckpt = CheckpointManager::new(&checkpoint_dir);
        let sorter = Sorter::from_checkpoint(&ckpt, device)?;
        Ok(Self { sorter })
    }

    pub fn sort(&self, numbers: &[f32]) -> Result<SortOutcome> {
        let prediction = self.sorter.predict(numbers)?;
        let expected = sorting_pointers(numbers);
        let correct = is_exact_match(&prediction.pointers, &expected);

        if !prediction.is_permutation {
            tracing::warn!("Prediction {:?} is not a permutation of the input", prediction.pointers);
        }
        Ok(SortOutcome { prediction, expected, correct })
    }
}
