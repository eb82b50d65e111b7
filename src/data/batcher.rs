// ============================================================
// Layer 4 — Sort Batcher
// ============================================================
// Converts a Vec<SortSample> into device tensors.
//
// How batching works here:
//   Input:  N samples, each with L inputs of size S
//   Output: SortBatch with
//             encoder_inputs  [N, L,   S]
//             decoder_inputs  [N, L+1, S]
//             targets         [N, L+1, L+1]  one-hot
//             target_pointers [N, L+1]       Int
//             weights         [N, L+1]       all ones
//
// Samples are flattened row-major into one Vec per tensor and
// handed to TensorData with the final shape. Batches are built
// one per training step from freshly generated samples, so no
// DataLoader sits in front of the batcher.

use burn::prelude::*;

use crate::domain::error::{PointerError, PointerResult};
use crate::domain::permutation::one_hot_index;
use crate::domain::sample::SortSample;

// ─── SortBatch ────────────────────────────────────────────────────────────────
/// A batch of sorting problems ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct SortBatch<B: Backend> {
    /// Numbers to sort — shape: [batch, L, input_size]
    pub encoder_inputs: Tensor<B, 3>,

    /// Teacher-forcing inputs, start token first — shape: [batch, L+1, input_size]
    pub decoder_inputs: Tensor<B, 3>,

    /// One-hot pointer targets — shape: [batch, L+1, L+1]
    pub targets: Tensor<B, 3>,

    /// Same targets as indices — shape: [batch, L+1]
    pub target_pointers: Tensor<B, 2, Int>,

    /// Per-step loss weights — shape: [batch, L+1]
    pub weights: Tensor<B, 2>,
}

impl<B: Backend> SortBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.encoder_inputs.dims()[0]
    }

    /// Check every tensor against the model's L and input size.
    /// Batch size is free but must agree across tensors.
    pub fn validate(&self, max_len: usize, input_size: usize) -> PointerResult<()> {
        let batch = self.batch_size();
        let steps = max_len + 1;

        expect_dims("encoder_inputs", &self.encoder_inputs.dims(), &[batch, max_len, input_size])?;
        expect_dims("decoder_inputs", &self.decoder_inputs.dims(), &[batch, steps, input_size])?;
        expect_dims("targets", &self.targets.dims(), &[batch, steps, steps])?;
        expect_dims("target_pointers", &self.target_pointers.dims(), &[batch, steps])?;
        expect_dims("weights", &self.weights.dims(), &[batch, steps])?;
        self.validate_targets()
    }

    /// Every target row must be one-hot and point where target_pointers does.
    fn validate_targets(&self) -> PointerResult<()> {
        let [batch, steps, positions] = self.targets.dims();

        let targets: Vec<f32> = self
            .targets
            .clone()
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|_| PointerError::InvalidTarget { step: 0 })?;
        let pointers: Vec<i64> = self
            .target_pointers
            .clone()
            .into_data()
            .convert::<i64>()
            .to_vec()
            .map_err(|_| PointerError::InvalidTarget { step: 0 })?;

        for row in 0..batch * steps {
            let step = row % steps;
            let values = &targets[row * positions..(row + 1) * positions];
            match one_hot_index(values) {
                Some(hot) if hot as i64 == pointers[row] => {}
                _ => return Err(PointerError::InvalidTarget { step }),
            }
        }
        Ok(())
    }

    /// Start token of every row — shape: [batch, input_size]
    pub fn start_tokens(&self) -> Tensor<B, 2> {
        let [batch, _, input_size] = self.decoder_inputs.dims();
        self.decoder_inputs
            .clone()
            .slice([0..batch, 0..1, 0..input_size])
            .reshape([batch, input_size])
    }
}

pub(crate) fn expect_dims(what: &'static str, actual: &[usize], expected: &[usize]) -> PointerResult<()> {
    if actual != expected {
        return Err(PointerError::shape(what, expected, actual));
    }
    Ok(())
}

// ─── SortBatcher ──────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct SortBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SortBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack samples into one batch. All samples must share L and input size.
    pub fn batch(&self, items: Vec<SortSample>) -> PointerResult<SortBatch<B>> {
        let first = items.first().ok_or(PointerError::EmptyBatch)?;
        let batch_size = items.len();
        let max_len    = first.max_len();
        let input_size = first.input_size();
        let steps      = max_len + 1;

        for s in &items {
            if s.max_len() != max_len || s.input_size() != input_size {
                return Err(PointerError::shape(
                    "sample",
                    &[max_len, input_size],
                    &[s.max_len(), s.input_size()],
                ));
            }
        }

        let encoder_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.inputs().iter().flatten().copied())
            .collect();

        let decoder_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.decoder_inputs().iter().flatten().copied())
            .collect();

        let target_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| (0..steps).flat_map(move |step| s.one_hot_target(step)))
            .collect();

        let pointer_flat: Vec<i64> = items
            .iter()
            .flat_map(|s| s.pointers().iter().map(|&p| p as i64))
            .collect();

        let encoder_inputs = Tensor::<B, 3>::from_data(
            TensorData::new(encoder_flat, [batch_size, max_len, input_size]),
            &self.device,
        );
        let decoder_inputs = Tensor::<B, 3>::from_data(
            TensorData::new(decoder_flat, [batch_size, steps, input_size]),
            &self.device,
        );
        let targets = Tensor::<B, 3>::from_data(
            TensorData::new(target_flat, [batch_size, steps, steps]),
            &self.device,
        );
        let target_pointers = Tensor::<B, 2, Int>::from_data(
            TensorData::new(pointer_flat, [batch_size, steps]),
            &self.device,
        );
        let weights = Tensor::<B, 2>::ones([batch_size, steps], &self.device);

        Ok(SortBatch { encoder_inputs, decoder_inputs, targets, target_pointers, weights })
    }
}
