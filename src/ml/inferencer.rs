// ============================================================
// Layer 5 — Sorter (Inference)
// ============================================================
// Runs a trained PointerNetwork on one list of numbers.
//
//   values [L] → encoder inputs [1, L, 1]
//              → self-fed decoder, zero start token
//              → L+1 pointers in annotation space
//              → input order (stops at the end sentinel)
//
// The network is fixed-length: a list of any other length is
// rejected, never padded or truncated.

use anyhow::{Context, Result};
use burn::prelude::*;

use crate::domain::error::PointerError;
use crate::domain::permutation::{pointers_to_order, validate_pointers};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::loss::softmax_stable;
use crate::ml::model::PointerNetwork;

/// Result of sorting one list.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Arg-max of every decoder step, in annotation space
    pub pointers:       Vec<usize>,
    /// Input indices in predicted ascending order
    pub order:          Vec<usize>,
    /// The input values in that order
    pub sorted:         Vec<f32>,
    /// Product of the per-step maximum probabilities
    pub confidence:     f32,
    /// Every input used exactly once, then the end sentinel
    pub is_permutation: bool,
}

pub struct Sorter<B: Backend> {
    model:  PointerNetwork<B>,
    device: B::Device,
}

impl<B: Backend> Sorter<B> {
    pub fn new(model: PointerNetwork<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Rebuild the architecture from train_config.json, then load the latest weights.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg = ckpt_manager.load_config()?;
        let model_cfg = cfg.model_config();
        model_cfg.validate()?;

        let model: PointerNetwork<B> = model_cfg.init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint (L={})", cfg.max_len);
        Ok(Self { model, device })
    }

    pub fn max_len(&self) -> usize {
        self.model.max_len
    }

    pub fn predict(&self, values: &[f32]) -> Result<Prediction> {
        let len = self.model.max_len;
        if values.len() != len {
            return Err(PointerError::shape("numbers", &[len], &[values.len()]))
                .context("The model sorts lists of exactly its trained length");
        }
        if self.model.input_size != 1 {
            return Err(PointerError::InvalidConfig(format!(
                "sorting scalars needs input_size 1, model has {}",
                self.model.input_size
            ))
            .into());
        }

        let inputs = Tensor::<B, 3>::from_data(TensorData::new(values.to_vec(), [1, len, 1]), &self.device);
        let start  = Tensor::<B, 2>::zeros([1, 1], &self.device);
        let output = self.model.run_self_fed(inputs, start)?;

        let pointers: Vec<usize> = output
            .pointers()
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|e| anyhow::anyhow!("Cannot read pointers: {e:?}"))?
            .into_iter()
            .map(|p| p as usize)
            .collect();

        let mut confidence = 1.0f32;
        for logits in &output.logits {
            let probs: Vec<f32> = softmax_stable(logits.clone())
                .into_data()
                .convert::<f32>()
                .to_vec::<f32>()
                .map_err(|e| anyhow::anyhow!("Cannot read probabilities: {e:?}"))?;
            confidence *= probs.into_iter().fold(0.0, f32::max);
        }

        let is_permutation = validate_pointers(&pointers, len).is_ok();
        let order  = pointers_to_order(&pointers);
        let sorted = order.iter().filter_map(|&i| values.get(i).copied()).collect();

        tracing::debug!("Pointers {:?} conf={:.4}", pointers, confidence);

        Ok(Prediction { pointers, order, sorted, confidence, is_permutation })
    }
}
