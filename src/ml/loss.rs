// ============================================================
// Layer 5 — Loss and Metrics
// ============================================================
// loss = mean over batch of  Σ_steps  weight_i · CE(logits_i, target_i)
//
// Softmax cross-entropy is written out in two explicit steps:
//
//   log_softmax(z) = (z − max z) − log Σ exp(z − max z)
//   CE(z, t)       = − Σ t · log_softmax(z)
//
// Subtracting the row maximum keeps exp() from overflowing.
//
// Accuracy is sequence level: a row counts only if every one
// of its L+1 pointers matches the target.

use burn::prelude::*;

use crate::data::batcher::expect_dims;
use crate::domain::error::{PointerError, PointerResult};

/// Numerically stable log-softmax over the last dimension of [batch, n].
pub fn log_softmax_stable<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, n] = logits.dims();
    let max = logits.clone().max_dim(1).detach().expand([batch, n]);
    let shifted = logits - max;
    let log_norm = shifted.clone().exp().sum_dim(1).log().expand([batch, n]);
    shifted - log_norm
}

/// Probabilities over positions — [batch, n]
pub fn softmax_stable<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 2> {
    log_softmax_stable(logits).exp()
}

/// Cross-entropy of one step against one-hot targets — [batch]
pub fn step_cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let [batch, _] = logits.dims();
    (targets * log_softmax_stable(logits))
        .sum_dim(1)
        .neg()
        .reshape([batch])
}

/// Weighted per-step cross-entropy, summed over steps, averaged over the batch.
///
/// logits:  L+1 tensors of [batch, L+1]
/// targets: [batch, L+1, L+1] one-hot
/// weights: [batch, L+1]
pub fn aggregate<B: Backend>(
    logits:  &[Tensor<B, 2>],
    targets: Tensor<B, 3>,
    weights: Tensor<B, 2>,
) -> PointerResult<Tensor<B, 1>> {
    let [batch, steps, positions] = targets.dims();
    expect_dims("logits", &[logits.len()], &[steps])?;
    expect_dims("weights", &weights.dims(), &[batch, steps])?;

    let mut total: Option<Tensor<B, 1>> = None;
    for (i, step_logits) in logits.iter().enumerate() {
        expect_dims("step logits", &step_logits.dims(), &[batch, positions])?;

        let target = targets
            .clone()
            .slice([0..batch, i..i + 1, 0..positions])
            .reshape([batch, positions]);
        let weight = weights.clone().slice([0..batch, i..i + 1]).reshape([batch]);

        let ce = step_cross_entropy(step_logits.clone(), target) * weight;
        total = Some(match total {
            Some(sum) => sum + ce,
            None      => ce,
        });
    }

    let total = total.ok_or_else(|| PointerError::shape("logits", &[steps], &[0]))?;
    Ok(total.mean())
}

/// Read a scalar loss back to the host, failing on NaN or infinity.
pub fn finite_loss<B: Backend>(loss: Tensor<B, 1>, what: &'static str) -> PointerResult<f64> {
    let value: f64 = loss.into_scalar().elem::<f64>();
    if !value.is_finite() {
        return Err(PointerError::NonFiniteLoss { what, value });
    }
    Ok(value)
}

/// Number of rows whose whole pointer sequence equals the target.
///
/// predicted, targets: [batch, L+1]
pub fn exact_matches<B: Backend>(
    predicted: Tensor<B, 2, Int>,
    targets:   Tensor<B, 2, Int>,
) -> PointerResult<usize> {
    expect_dims("predicted pointers", &predicted.dims(), &targets.dims())?;

    let mismatches = predicted.not_equal(targets).int().sum_dim(1);
    let matches: i64 = mismatches.equal_elem(0).int().sum().into_scalar().elem::<i64>();
    Ok(matches as usize)
}
