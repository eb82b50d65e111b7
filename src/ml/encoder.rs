// ============================================================
// Layer 5 — Encoder
// ============================================================
// Runs the recurrent cell over the L input vectors and keeps
// every output as an annotation for the pointer attention.
//
//   annotations[0]     zero vector, the end-of-sequence sentinel
//   annotations[i + 1] cell output after reading input i
//
// Sequential in time, parallel across the batch.

use burn::prelude::*;

use crate::ml::cell::{CellState, RecurrentCell, StackedGru};

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub cell: StackedGru<B>,
}

/// Result of one encoder pass.
#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// [batch, L+1, hidden], sentinel first
    pub annotations: Tensor<B, 3>,
    /// State after the last input, handed to the decoder
    pub final_state: CellState<B>,
}

impl<B: Backend> EncoderOutput<B> {
    pub fn num_annotations(&self) -> usize {
        self.annotations.dims()[1]
    }
}

impl<B: Backend> Encoder<B> {
    pub fn new(cell: StackedGru<B>) -> Self {
        Self { cell }
    }

    /// inputs: [batch, L, input_size] starting from a zero state.
    pub fn encode(&self, inputs: Tensor<B, 3>) -> EncoderOutput<B> {
        let [batch, _, _] = inputs.dims();
        let state = self.cell.zero_state(batch, &inputs.device());
        self.encode_from(inputs, state)
    }

    /// Same as [`Encoder::encode`] with a caller-supplied initial state.
    pub fn encode_from(&self, inputs: Tensor<B, 3>, initial: CellState<B>) -> EncoderOutput<B> {
        let [batch, len, input_size] = inputs.dims();
        let device = inputs.device();

        let mut annotations = Vec::with_capacity(len + 1);
        annotations.push(Tensor::<B, 2>::zeros([batch, self.cell.output_size()], &device));

        let mut state = initial;
        for t in 0..len {
            let x = inputs
                .clone()
                .slice([0..batch, t..t + 1, 0..input_size])
                .reshape([batch, input_size]);
            let (output, next) = self.cell.step(x, state);
            annotations.push(output);
            state = next;
        }

        EncoderOutput {
            annotations: Tensor::stack(annotations, 1),
            final_state: state,
        }
    }
}
