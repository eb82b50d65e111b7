// ============================================================
// Layer 5 — Pointing Decoder
// ============================================================
// L+1 steps. At step i:
//
//   state_i  = cell(input_i, state_{i-1})      state_{-1} = encoder final state
//   logits_i = attention(top(state_i), annotations)
//
// The two modes differ only in where input_i comes from:
//
//   teacher-forced  input_i = decoder_inputs[i]        (ground truth)
//   self-fed        input_0 = start token
//                   input_i = candidates[argmax(logits_{i-1})]
//
// candidates[0] is the start token and candidates[j] is the
// original input vector j-1, so pointing at the sentinel feeds
// the start token back and pointing at annotation j feeds the
// number that annotation was read from.
//
// Both modes take &self: they read one parameter snapshot and
// never mutate it.

use burn::prelude::*;

use crate::ml::attention::{AttentionKeys, PointerAttention};
use crate::ml::cell::{CellState, RecurrentCell, StackedGru};
use crate::ml::encoder::EncoderOutput;

#[derive(Module, Debug)]
pub struct PointerDecoder<B: Backend> {
    pub cell:      StackedGru<B>,
    pub attention: PointerAttention<B>,
}

/// Per-step outputs of one decoder pass.
#[derive(Debug, Clone)]
pub struct DecoderOutput<B: Backend> {
    /// L+1 tensors of shape [batch, L+1]
    pub logits:     Vec<Tensor<B, 2>>,
    /// Input consumed at each step — L+1 tensors of [batch, input_size]
    pub fed_inputs: Vec<Tensor<B, 2>>,
}

impl<B: Backend> DecoderOutput<B> {
    pub fn num_steps(&self) -> usize {
        self.logits.len()
    }

    /// [batch, steps, positions]
    pub fn stacked_logits(&self) -> Tensor<B, 3> {
        Tensor::stack(self.logits.clone(), 1)
    }

    /// Arg-max position of every step — [batch, steps]
    pub fn pointers(&self) -> Tensor<B, 2, Int> {
        let steps: Vec<Tensor<B, 2, Int>> = self
            .logits
            .iter()
            .map(|logits| first_argmax(logits.clone()))
            .collect();
        Tensor::cat(steps, 1)
    }
}

impl<B: Backend> PointerDecoder<B> {
    pub fn new(cell: StackedGru<B>, attention: PointerAttention<B>) -> Self {
        Self { cell, attention }
    }

    /// Shared state transition: feed the cell, then point.
    fn transition(
        &self,
        input: Tensor<B, 2>,
        state: CellState<B>,
        keys:  &AttentionKeys<B>,
    ) -> (Tensor<B, 2>, CellState<B>) {
        let (_, state) = self.cell.step(input, state);
        let logits = self.attention.score_with_keys(state.top(), keys);
        (logits, state)
    }

    /// decoder_inputs: [batch, L+1, input_size], step i always reads row i.
    pub fn run_teacher_forced(
        &self,
        decoder_inputs: Tensor<B, 3>,
        encoded:        &EncoderOutput<B>,
    ) -> DecoderOutput<B> {
        let [batch, _, input_size] = decoder_inputs.dims();
        let steps = encoded.num_annotations();
        let keys  = self.attention.keys(encoded.annotations.clone());

        let mut state      = encoded.final_state.clone();
        let mut logits     = Vec::with_capacity(steps);
        let mut fed_inputs = Vec::with_capacity(steps);

        for i in 0..steps {
            let input = decoder_inputs
                .clone()
                .slice([0..batch, i..i + 1, 0..input_size])
                .reshape([batch, input_size]);
            let (step_logits, next) = self.transition(input.clone(), state, &keys);
            logits.push(step_logits);
            fed_inputs.push(input);
            state = next;
        }

        DecoderOutput { logits, fed_inputs }
    }

    /// start_token: [batch, input_size]
    /// candidates:  [batch, L+1, input_size], start token first
    pub fn run_self_fed(
        &self,
        start_token: Tensor<B, 2>,
        candidates:  Tensor<B, 3>,
        encoded:     &EncoderOutput<B>,
    ) -> DecoderOutput<B> {
        let steps = encoded.num_annotations();
        let keys  = self.attention.keys(encoded.annotations.clone());

        let mut state      = encoded.final_state.clone();
        let mut input      = start_token;
        let mut logits     = Vec::with_capacity(steps);
        let mut fed_inputs = Vec::with_capacity(steps);

        for _ in 0..steps {
            let (step_logits, next) = self.transition(input.clone(), state, &keys);
            fed_inputs.push(input);
            input = feedback_input(step_logits.clone(), candidates.clone());
            logits.push(step_logits);
            state = next;
        }

        DecoderOutput { logits, fed_inputs }
    }
}

// ─── Pointer selection ────────────────────────────────────────────────────────

/// Arg-max over positions where exact ties go to the lowest index.
///
/// logits: [batch, positions] → [batch, 1]
pub fn first_argmax<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 2, Int> {
    let [batch, positions] = logits.dims();
    let device = logits.device();

    let max    = logits.clone().max_dim(1).expand([batch, positions]);
    let is_max = logits.greater_equal(max).float();

    // positions - j: strictly decreasing, so among the maxima the
    // lowest index carries the unique largest value
    let rank = Tensor::<B, 1, Int>::arange(0..positions as i64, &device)
        .float()
        .neg()
        .add_scalar(positions as f64)
        .reshape([1, positions])
        .expand([batch, positions]);

    (is_max * rank).argmax(1)
}

/// One-hot float mask of the selected position — [batch, positions]
pub fn pointer_mask<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, positions] = logits.dims();
    let device = logits.device();

    let chosen = first_argmax(logits).expand([batch, positions]);
    let index  = Tensor::<B, 1, Int>::arange(0..positions as i64, &device)
        .reshape([1, positions])
        .expand([batch, positions]);

    index.equal(chosen).float()
}

/// Next self-fed input: the candidate at the arg-max position.
/// Carries no gradient.
///
/// logits: [batch, L+1], candidates: [batch, L+1, input_size] → [batch, input_size]
pub fn feedback_input<B: Backend>(logits: Tensor<B, 2>, candidates: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch, positions, input_size] = candidates.dims();

    let mask = pointer_mask(logits.detach())
        .reshape([batch, positions, 1])
        .expand([batch, positions, input_size]);

    (candidates * mask)
        .sum_dim(1)
        .reshape([batch, input_size])
        .detach()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::attention::PointerAttentionConfig;
    use crate::ml::cell::StackedGruConfig;
    use crate::ml::encoder::Encoder;
    use burn::backend::NdArray;

    type B = NdArray;

    const HIDDEN: usize = 8;

    fn parts(device: &<B as Backend>::Device) -> (Encoder<B>, PointerDecoder<B>) {
        let encoder = Encoder::new(StackedGruConfig::new(1, HIDDEN).init(device));
        let decoder = PointerDecoder::new(
            StackedGruConfig::new(1, HIDDEN).init(device),
            PointerAttentionConfig::new(HIDDEN, HIDDEN, HIDDEN).init(device),
        );
        (encoder, decoder)
    }

    fn to_vec(t: Tensor<B, 2>) -> Vec<f32> {
        t.into_data().to_vec().unwrap()
    }

    fn ints(t: Tensor<B, 2, Int>) -> Vec<i64> {
        t.into_data().convert::<i64>().to_vec().unwrap()
    }

    #[test]
    fn test_first_argmax_unique_maximum() {
        let device = Default::default();
        let logits = Tensor::<B, 2>::from_floats([[0.1, 3.0, -1.0], [5.0, 0.0, 4.9]], &device);
        assert_eq!(ints(first_argmax(logits)), vec![1, 0]);
    }

    #[test]
    fn test_first_argmax_ties_go_to_lowest_index() {
        let device = Default::default();
        let logits = Tensor::<B, 2>::from_floats([[2.0, 5.0, 5.0], [1.0, 1.0, 1.0]], &device);
        assert_eq!(ints(first_argmax(logits)), vec![1, 0]);
    }

    #[test]
    fn test_pointer_mask_is_one_hot() {
        let device = Default::default();
        let logits = Tensor::<B, 2>::from_floats([[0.0, 0.0, 7.0, 7.0]], &device);
        assert_eq!(to_vec(pointer_mask(logits)), vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_feedback_selects_candidate_at_argmax() {
        let device = Default::default();
        let logits = Tensor::<B, 2>::from_floats([[0.1, 3.0, -1.0], [9.0, 0.0, 1.0]], &device);
        let candidates = Tensor::<B, 3>::from_floats(
            [[[0.0], [7.0], [9.0]], [[0.0], [4.0], [2.0]]],
            &device,
        );
        assert_eq!(to_vec(feedback_input(logits, candidates)), vec![7.0, 0.0]);
    }

    #[test]
    fn test_step_count_and_width_for_every_length() {
        let device = Default::default();
        let (encoder, decoder) = parts(&device);

        for len in 1..=4 {
            let inputs  = Tensor::<B, 3>::ones([2, len, 1], &device);
            let encoded = encoder.encode(inputs.clone());

            let tf = decoder.run_teacher_forced(Tensor::ones([2, len + 1, 1], &device), &encoded);
            assert_eq!(tf.num_steps(), len + 1);
            assert_eq!(tf.stacked_logits().dims(), [2, len + 1, len + 1]);

            let start = Tensor::<B, 2>::zeros([2, 1], &device);
            let candidates = Tensor::cat(vec![start.clone().reshape([2, 1, 1]), inputs], 1);
            let sf = decoder.run_self_fed(start, candidates, &encoded);
            assert_eq!(sf.num_steps(), len + 1);
            assert_eq!(sf.pointers().dims(), [2, len + 1]);
        }
    }

    #[test]
    fn test_teacher_forced_step_zero_ignores_later_inputs() {
        let device = Default::default();
        let (encoder, decoder) = parts(&device);
        let encoded = encoder.encode(Tensor::from_floats([[[0.3], [0.1], [0.2]]], &device));

        let right = Tensor::<B, 3>::from_floats([[[0.0], [0.1], [0.2], [0.3]]], &device);
        let wrong = Tensor::<B, 3>::from_floats([[[0.0], [100.0], [-42.0], [7.5]]], &device);

        let a = decoder.run_teacher_forced(right, &encoded);
        let b = decoder.run_teacher_forced(wrong, &encoded);

        assert_eq!(to_vec(a.logits[0].clone()), to_vec(b.logits[0].clone()));
        assert_ne!(to_vec(a.logits[1].clone()), to_vec(b.logits[1].clone()));
    }

    #[test]
    fn test_teacher_forced_feeds_given_inputs() {
        let device = Default::default();
        let (encoder, decoder) = parts(&device);
        let encoded = encoder.encode(Tensor::from_floats([[[0.3], [0.1]]], &device));

        let given = Tensor::<B, 3>::from_floats([[[0.0], [0.1], [0.3]]], &device);
        let out = decoder.run_teacher_forced(given, &encoded);

        let fed: Vec<f32> = out.fed_inputs.into_iter().flat_map(to_vec).collect();
        assert_eq!(fed, vec![0.0, 0.1, 0.3]);
    }

    #[test]
    fn test_self_fed_input_is_candidate_at_previous_argmax() {
        let device = Default::default();
        let (encoder, decoder) = parts(&device);

        let values = [[0.8f32, 0.2, 0.5, 0.1], [0.4, 0.9, 0.3, 0.6]];
        let inputs = Tensor::<B, 3>::from_floats(
            [
                [[values[0][0]], [values[0][1]], [values[0][2]], [values[0][3]]],
                [[values[1][0]], [values[1][1]], [values[1][2]], [values[1][3]]],
            ],
            &device,
        );
        let encoded = encoder.encode(inputs.clone());
        let start = Tensor::<B, 2>::from_floats([[-1.0], [-1.0]], &device);
        let candidates = Tensor::cat(vec![start.clone().reshape([2, 1, 1]), inputs], 1);

        let out = decoder.run_self_fed(start, candidates, &encoded);
        let pointers = ints(out.pointers());
        let steps = out.num_steps();

        assert_eq!(to_vec(out.fed_inputs[0].clone()), vec![-1.0, -1.0]);
        for i in 0..steps - 1 {
            let fed = to_vec(out.fed_inputs[i + 1].clone());
            for row in 0..2 {
                let p = pointers[row * steps + i] as usize;
                let expected = if p == 0 { -1.0 } else { values[row][p - 1] };
                assert_eq!(fed[row], expected);
            }
        }
    }

    #[test]
    fn test_modes_agree_on_first_step() {
        let device = Default::default();
        let (encoder, decoder) = parts(&device);
        let inputs = Tensor::<B, 3>::from_floats([[[0.6], [0.2], [0.4]]], &device);
        let encoded = encoder.encode(inputs.clone());

        let start = Tensor::<B, 2>::zeros([1, 1], &device);
        let candidates = Tensor::cat(vec![start.clone().reshape([1, 1, 1]), inputs], 1);
        let tf = decoder.run_teacher_forced(
            Tensor::from_floats([[[0.0], [0.2], [0.4], [0.6]]], &device),
            &encoded,
        );
        let sf = decoder.run_self_fed(start, candidates, &encoded);

        assert_eq!(to_vec(tf.logits[0].clone()), to_vec(sf.logits[0].clone()));
    }
}
