use burn::{
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder, RecorderError},
};

use crate::data::batcher::{expect_dims, SortBatch};
use crate::domain::error::{PointerError, PointerResult};
use crate::ml::attention::PointerAttentionConfig;
use crate::ml::cell::StackedGruConfig;
use crate::ml::decoder::{DecoderOutput, PointerDecoder};
use crate::ml::encoder::{Encoder, EncoderOutput};
use crate::ml::loss::{aggregate, exact_matches, finite_loss};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct PointerNetworkConfig {
    /// Number of elements to sort (L)
    pub max_len:     usize,
    /// Size of each input vector
    pub input_size:  usize,
    /// Hidden units per recurrent layer
    pub hidden_size: usize,
    #[config(default = 1)]
    pub num_layers:  usize,
}

impl PointerNetworkConfig {
    pub fn validate(&self) -> PointerResult<()> {
        let checks = [
            (self.max_len,     "max_len"),
            (self.input_size,  "input_size"),
            (self.hidden_size, "hidden_size"),
            (self.num_layers,  "num_layers"),
        ];
        for (value, name) in checks {
            if value == 0 {
                return Err(PointerError::InvalidConfig(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    /// Encoder and decoder have separate cells; both modes of the
    /// decoder share one set of weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> PointerNetwork<B> {
        let cell = StackedGruConfig::new(self.input_size, self.hidden_size)
            .with_num_layers(self.num_layers);
        let attention = PointerAttentionConfig::new(self.hidden_size, self.hidden_size, self.hidden_size);

        PointerNetwork {
            encoder:    Encoder::new(cell.init(device)),
            decoder:    PointerDecoder::new(cell.init(device), attention.init(device)),
            max_len:    self.max_len,
            input_size: self.input_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct PointerNetwork<B: Backend> {
    pub encoder:    Encoder<B>,
    pub decoder:    PointerDecoder<B>,
    pub max_len:    usize,
    pub input_size: usize,
}

/// Both decoder passes over one batch, computed from one parameter snapshot.
#[derive(Debug, Clone)]
pub struct PointerOutput<B: Backend> {
    pub teacher_forced: DecoderOutput<B>,
    pub self_fed:       DecoderOutput<B>,
}

/// Self-fed evaluation of one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics {
    pub loss:          f64,
    pub exact_matches: usize,
    pub batch_size:    usize,
}

impl EvalMetrics {
    pub fn accuracy(&self) -> f64 {
        if self.batch_size == 0 { 0.0 } else { self.exact_matches as f64 / self.batch_size as f64 }
    }
}

impl<B: Backend> PointerNetwork<B> {
    /// encoder_inputs: [batch, L, input_size] → L+1 annotations
    pub fn encode(&self, encoder_inputs: Tensor<B, 3>) -> PointerResult<EncoderOutput<B>> {
        let [batch, _, _] = encoder_inputs.dims();
        expect_dims("encoder_inputs", &encoder_inputs.dims(), &[batch, self.max_len, self.input_size])?;
        Ok(self.encoder.encode(encoder_inputs))
    }

    /// Ground-truth feedback. decoder_inputs: [batch, L+1, input_size]
    pub fn run_teacher_forced(
        &self,
        encoder_inputs: Tensor<B, 3>,
        decoder_inputs: Tensor<B, 3>,
    ) -> PointerResult<DecoderOutput<B>> {
        let encoded = self.encode(encoder_inputs)?;
        self.teacher_forced_from(decoder_inputs, &encoded)
    }

    /// Own-prediction feedback. start_token: [batch, input_size]
    pub fn run_self_fed(
        &self,
        encoder_inputs: Tensor<B, 3>,
        start_token:    Tensor<B, 2>,
    ) -> PointerResult<DecoderOutput<B>> {
        let encoded = self.encode(encoder_inputs.clone())?;
        self.self_fed_from(encoder_inputs, start_token, &encoded)
    }

    /// Both modes over one batch, sharing the encoder pass.
    pub fn forward(&self, batch: &SortBatch<B>) -> PointerResult<PointerOutput<B>> {
        batch.validate(self.max_len, self.input_size)?;
        let encoded = self.encoder.encode(batch.encoder_inputs.clone());

        let teacher_forced = self.teacher_forced_from(batch.decoder_inputs.clone(), &encoded)?;
        let self_fed = self.self_fed_from(batch.encoder_inputs.clone(), batch.start_tokens(), &encoded)?;
        Ok(PointerOutput { teacher_forced, self_fed })
    }

    /// Teacher-forced training loss — differentiable, shape [1].
    pub fn forward_loss(&self, batch: &SortBatch<B>) -> PointerResult<Tensor<B, 1>> {
        batch.validate(self.max_len, self.input_size)?;
        let output = self.run_teacher_forced(batch.encoder_inputs.clone(), batch.decoder_inputs.clone())?;
        aggregate(&output.logits, batch.targets.clone(), batch.weights.clone())
    }

    /// Self-fed loss and sequence-level exact matches.
    pub fn evaluate(&self, batch: &SortBatch<B>) -> PointerResult<EvalMetrics> {
        batch.validate(self.max_len, self.input_size)?;
        let output = self.run_self_fed(batch.encoder_inputs.clone(), batch.start_tokens())?;

        let loss = aggregate(&output.logits, batch.targets.clone(), batch.weights.clone())?;
        let loss = finite_loss(loss.detach(), "evaluation")?;
        let exact_matches = exact_matches(output.pointers(), batch.target_pointers.clone())?;

        Ok(EvalMetrics { loss, exact_matches, batch_size: batch.batch_size() })
    }

    /// Full-precision serialized parameters, for byte-level comparisons.
    pub fn parameter_snapshot(&self) -> Result<Vec<u8>, RecorderError> {
        BinBytesRecorder::<FullPrecisionSettings>::default().record(self.clone().into_record(), ())
    }

    fn teacher_forced_from(
        &self,
        decoder_inputs: Tensor<B, 3>,
        encoded:        &EncoderOutput<B>,
    ) -> PointerResult<DecoderOutput<B>> {
        let [batch, _, _] = encoded.annotations.dims();
        expect_dims(
            "decoder_inputs",
            &decoder_inputs.dims(),
            &[batch, self.max_len + 1, self.input_size],
        )?;
        Ok(self.decoder.run_teacher_forced(decoder_inputs, encoded))
    }

    fn self_fed_from(
        &self,
        encoder_inputs: Tensor<B, 3>,
        start_token:    Tensor<B, 2>,
        encoded:        &EncoderOutput<B>,
    ) -> PointerResult<DecoderOutput<B>> {
        let [batch, _, _] = encoder_inputs.dims();
        expect_dims("start_token", &start_token.dims(), &[batch, self.input_size])?;

        // candidates[0] = start token, candidates[j] = input j-1
        let candidates = Tensor::cat(
            vec![start_token.clone().reshape([batch, 1, self.input_size]), encoder_inputs],
            1,
        );
        Ok(self.decoder.run_self_fed(start_token, candidates, encoded))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::SortBatcher;
    use crate::data::generator::DataGenerator;
    use crate::domain::sample::SortSample;
    use crate::domain::traits::{SampleMode, SampleSource};
    use burn::backend::NdArray;

    type B = NdArray;

    fn model(max_len: usize) -> PointerNetwork<B> {
        PointerNetworkConfig::new(max_len, 1, 8).init(&Default::default())
    }

    fn batch(max_len: usize, size: usize, mode: SampleMode) -> SortBatch<B> {
        let samples = DataGenerator::new(max_len, 9).next_batch(size, mode).unwrap();
        SortBatcher::new(Default::default()).batch(samples).unwrap()
    }

    #[test]
    fn test_config_rejects_zero_sizes() {
        assert!(PointerNetworkConfig::new(3, 1, 8).validate().is_ok());
        assert!(PointerNetworkConfig::new(0, 1, 8).validate().is_err());
        assert!(PointerNetworkConfig::new(3, 1, 8).with_num_layers(0).validate().is_err());
    }

    #[test]
    fn test_forward_shapes_both_modes() {
        for max_len in [1, 3, 5] {
            let out = model(max_len).forward(&batch(max_len, 4, SampleMode::Train)).unwrap();
            assert_eq!(out.teacher_forced.stacked_logits().dims(), [4, max_len + 1, max_len + 1]);
            assert_eq!(out.self_fed.stacked_logits().dims(), [4, max_len + 1, max_len + 1]);
        }
    }

    #[test]
    fn test_multi_layer_forward() {
        let m: PointerNetwork<B> = PointerNetworkConfig::new(3, 1, 6)
            .with_num_layers(2)
            .init(&Default::default());
        let out = m.forward(&batch(3, 2, SampleMode::Train)).unwrap();
        assert_eq!(out.teacher_forced.num_steps(), 4);
    }

    #[test]
    fn test_batch_size_may_vary_between_calls() {
        let m = model(4);
        assert!(m.forward_loss(&batch(4, 1, SampleMode::Train)).is_ok());
        assert!(m.forward_loss(&batch(4, 7, SampleMode::Train)).is_ok());
    }

    #[test]
    fn test_training_loss_non_negative() {
        let loss = model(4).forward_loss(&batch(4, 5, SampleMode::Train)).unwrap();
        assert!(finite_loss(loss, "training").unwrap() >= 0.0);
    }

    #[test]
    fn test_evaluate_reports_batch() {
        let metrics = model(3).evaluate(&batch(3, 6, SampleMode::Eval)).unwrap();
        assert_eq!(metrics.batch_size, 6);
        assert!(metrics.exact_matches <= 6);
        assert!(metrics.loss >= 0.0);
        assert!((0.0..=1.0).contains(&metrics.accuracy()));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = model(4).forward(&batch(3, 2, SampleMode::Train)).unwrap_err();
        assert!(matches!(err, PointerError::ShapeMismatch { what: "encoder_inputs", .. }));
    }

    #[test]
    fn test_soft_targets_rejected_by_loss_and_evaluation() {
        let m = model(3);
        let mut soft = batch(3, 2, SampleMode::Eval);
        soft.targets = Tensor::ones([2, 4, 4], &Default::default()) * 0.25;

        assert_eq!(m.forward_loss(&soft).unwrap_err(), PointerError::InvalidTarget { step: 0 });
        assert_eq!(m.evaluate(&soft).unwrap_err(), PointerError::InvalidTarget { step: 0 });
    }

    #[test]
    fn test_wrong_decoder_length_rejected() {
        let device = Default::default();
        let m = model(3);
        let err = m
            .run_teacher_forced(Tensor::ones([2, 3, 1], &device), Tensor::ones([2, 3, 1], &device))
            .unwrap_err();
        assert_eq!(err, PointerError::shape("decoder_inputs", &[2, 4, 1], &[2, 3, 1]));
    }

    #[test]
    fn test_wrong_input_size_rejected() {
        let device = Default::default();
        let err = model(3)
            .run_self_fed(Tensor::ones([2, 3, 2], &device), Tensor::zeros([2, 2], &device))
            .unwrap_err();
        assert!(matches!(err, PointerError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_both_passes_leave_parameters_untouched() {
        let m = model(4);
        let b = batch(4, 3, SampleMode::Train);

        let before = m.parameter_snapshot().unwrap();
        let tf = m.run_teacher_forced(b.encoder_inputs.clone(), b.decoder_inputs.clone()).unwrap();
        let between = m.parameter_snapshot().unwrap();
        let sf = m.run_self_fed(b.encoder_inputs.clone(), b.start_tokens()).unwrap();
        let after = m.parameter_snapshot().unwrap();

        assert_eq!(tf.num_steps(), sf.num_steps());
        assert_eq!(before, between);
        assert_eq!(before, after);
    }

    #[test]
    fn test_forward_matches_separate_passes() {
        let m = model(3);
        let b = batch(3, 2, SampleMode::Train);

        let joint = m.forward(&b).unwrap();
        let tf = m.run_teacher_forced(b.encoder_inputs.clone(), b.decoder_inputs.clone()).unwrap();
        let sf = m.run_self_fed(b.encoder_inputs.clone(), b.start_tokens()).unwrap();

        let joint_tf: Vec<f32> = joint.teacher_forced.stacked_logits().into_data().to_vec().unwrap();
        let sep_tf: Vec<f32> = tf.stacked_logits().into_data().to_vec().unwrap();
        assert_eq!(joint_tf, sep_tf);

        let joint_sf: Vec<i64> = joint.self_fed.pointers().into_data().convert::<i64>().to_vec().unwrap();
        let sep_sf: Vec<i64> = sf.pointers().into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(joint_sf, sep_sf);
    }

    #[test]
    fn test_nan_inputs_fail_evaluation() {
        let sample = SortSample::from_parts(
            vec![vec![f32::NAN], vec![0.5]],
            vec![vec![0.0], vec![0.5], vec![f32::NAN]],
            vec![2, 1, 0],
        )
        .unwrap();
        let b: SortBatch<B> = SortBatcher::new(Default::default()).batch(vec![sample]).unwrap();

        let err = model(2).evaluate(&b).unwrap_err();
        assert!(matches!(err, PointerError::NonFiniteLoss { what: "evaluation", .. }));
    }
}
