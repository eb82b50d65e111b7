// ============================================================
// Layer 3 — SortSample Domain Type
// ============================================================
// One training or evaluation example for the pointer network:
//
//   inputs          L vectors to be sorted (encoder side)
//   decoder_inputs  L+1 vectors fed to the decoder; index 0 is
//                   the start token
//   pointers        L+1 target positions in annotation space,
//                   the last one always the end sentinel
//
// Samples are validated once, here, so every later layer can
// assume well-formed data.

use serde::{Deserialize, Serialize};

use crate::domain::error::{PointerError, PointerResult};
use crate::domain::permutation::{one_hot_index, validate_pointers};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSample {
    inputs:         Vec<Vec<f32>>,
    decoder_inputs: Vec<Vec<f32>>,
    pointers:       Vec<usize>,
}

impl SortSample {
    /// Build a sample from pointer targets, rejecting any shape or
    /// permutation violation.
    pub fn from_parts(
        inputs:         Vec<Vec<f32>>,
        decoder_inputs: Vec<Vec<f32>>,
        pointers:       Vec<usize>,
    ) -> PointerResult<Self> {
        let max_len = inputs.len();
        if max_len == 0 {
            return Err(PointerError::shape("inputs", &[1], &[0]));
        }
        let input_size = inputs[0].len();

        for v in &inputs {
            if v.len() != input_size {
                return Err(PointerError::shape("input vector", &[input_size], &[v.len()]));
            }
        }
        if decoder_inputs.len() != max_len + 1 {
            return Err(PointerError::shape(
                "decoder_inputs", &[max_len + 1], &[decoder_inputs.len()],
            ));
        }
        for v in &decoder_inputs {
            if v.len() != input_size {
                return Err(PointerError::shape("decoder input vector", &[input_size], &[v.len()]));
            }
        }
        validate_pointers(&pointers, max_len)?;

        Ok(Self { inputs, decoder_inputs, pointers })
    }

    /// Build a sample from one-hot target rows of width L+1.
    pub fn from_one_hot(
        inputs:         Vec<Vec<f32>>,
        decoder_inputs: Vec<Vec<f32>>,
        targets:        &[Vec<f32>],
    ) -> PointerResult<Self> {
        let width = inputs.len() + 1;
        let mut pointers = Vec::with_capacity(targets.len());
        for (step, row) in targets.iter().enumerate() {
            if row.len() != width {
                return Err(PointerError::shape("target", &[width], &[row.len()]));
            }
            let hot = one_hot_index(row).ok_or(PointerError::InvalidTarget { step })?;
            pointers.push(hot);
        }
        Self::from_parts(inputs, decoder_inputs, pointers)
    }

    /// Sequence length L.
    pub fn max_len(&self) -> usize {
        self.inputs.len()
    }

    /// Dimension of every input vector.
    pub fn input_size(&self) -> usize {
        self.inputs[0].len()
    }

    pub fn inputs(&self) -> &[Vec<f32>] {
        &self.inputs
    }

    pub fn decoder_inputs(&self) -> &[Vec<f32>] {
        &self.decoder_inputs
    }

    pub fn pointers(&self) -> &[usize] {
        &self.pointers
    }

    /// Target of step `step` as a one-hot row of width L+1.
    pub fn one_hot_target(&self, step: usize) -> Vec<f32> {
        let mut row = vec![0.0; self.max_len() + 1];
        row[self.pointers[step]] = 1.0;
        row
    }
}
