// ============================================================
// Layer 5 — Pointer Attention
// ============================================================
// Additive (content-based) attention, used as the output layer:
//
//   logit_j = v · tanh(W_1 a_j + W_2 d)
//
//   a_j  annotation j (j = 0 is the sentinel)
//   d    current decoder hidden state
//
// W_1 a_j does not depend on the decoder, so the keys are
// computed once per forward pass and reused at every step.
// There is no vocabulary projection: softmax(logits) is the
// distribution over input positions.
//
// Reference: Bahdanau et al. (2015), Vinyals et al. (2015)

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::tanh,
};

#[derive(Config, Debug)]
pub struct PointerAttentionConfig {
    /// Size of each encoder annotation
    pub annotation_size: usize,
    /// Size of the decoder hidden state
    pub query_size:      usize,
    /// Size of the shared key space
    pub attention_size:  usize,
}

impl PointerAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PointerAttention<B> {
        PointerAttention {
            annotation_proj: LinearConfig::new(self.annotation_size, self.attention_size)
                .with_bias(false)
                .init(device),
            query_proj: LinearConfig::new(self.query_size, self.attention_size).init(device),
            score:      LinearConfig::new(self.attention_size, 1)
                .with_bias(false)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct PointerAttention<B: Backend> {
    /// W_1
    pub annotation_proj: Linear<B>,
    /// W_2
    pub query_proj:      Linear<B>,
    /// v
    pub score:           Linear<B>,
}

/// Annotations projected into key space — [batch, L+1, attention_size]
#[derive(Debug, Clone)]
pub struct AttentionKeys<B: Backend> {
    keys: Tensor<B, 3>,
}

impl<B: Backend> AttentionKeys<B> {
    pub fn num_positions(&self) -> usize {
        self.keys.dims()[1]
    }
}

impl<B: Backend> PointerAttention<B> {
    /// Project annotations [batch, L+1, hidden] once per forward pass.
    pub fn keys(&self, annotations: Tensor<B, 3>) -> AttentionKeys<B> {
        AttentionKeys { keys: self.annotation_proj.forward(annotations) }
    }

    /// query: [batch, hidden] → logits: [batch, L+1]
    pub fn score_with_keys(&self, query: Tensor<B, 2>, keys: &AttentionKeys<B>) -> Tensor<B, 2> {
        let [batch, positions, size] = keys.keys.dims();

        let query = self
            .query_proj
            .forward(query)
            .reshape([batch, 1, size])
            .expand([batch, positions, size]);

        let combined = tanh(keys.keys.clone() + query);
        self.score.forward(combined).reshape([batch, positions])
    }

    /// One-off scoring without cached keys.
    pub fn score(&self, query: Tensor<B, 2>, annotations: Tensor<B, 3>) -> Tensor<B, 2> {
        let keys = self.keys(annotations);
        self.score_with_keys(query, &keys)
    }
}
