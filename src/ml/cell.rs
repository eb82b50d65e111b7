// ============================================================
// Layer 5 — Recurrent Cell
// ============================================================
// step(input, state) → (output, new_state)
//
// The same weights are applied at every timestep. A stack of
// num_layers GRU cells behaves as one cell whose state is the
// ordered list of per-layer hidden states.
//
// GRU update (one layer):
//   r, u = σ(W_g [x, h] + b_g)
//   c    = tanh(W_c [x, r ⊙ h] + b_c)
//   h'   = u ⊙ h + (1 − u) ⊙ c
//
// Reference: Cho et al. (2014) GRU

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

// ─── CellState ────────────────────────────────────────────────────────────────
/// Hidden state of a (possibly stacked) cell, one [batch, hidden] tensor per layer.
#[derive(Debug, Clone)]
pub struct CellState<B: Backend> {
    layers: Vec<Tensor<B, 2>>,
}

impl<B: Backend> CellState<B> {
    pub fn new(layers: Vec<Tensor<B, 2>>) -> Self {
        Self { layers }
    }

    pub fn zeros(num_layers: usize, batch_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        let layers = (0..num_layers)
            .map(|_| Tensor::zeros([batch_size, hidden_size], device))
            .collect();
        Self { layers }
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Hidden state of the top layer — the attention query.
    pub fn top(&self) -> Tensor<B, 2> {
        self.layers[self.layers.len() - 1].clone()
    }
}

// ─── RecurrentCell ────────────────────────────────────────────────────────────
/// A state-transition function with weights shared across time.
pub trait RecurrentCell<B: Backend> {
    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;

    /// All-zero state for `batch_size` rows.
    fn zero_state(&self, batch_size: usize, device: &B::Device) -> CellState<B>;

    /// One timestep: input [batch, input_size] → output [batch, output_size].
    fn step(&self, input: Tensor<B, 2>, state: CellState<B>) -> (Tensor<B, 2>, CellState<B>);
}

// ─── GRU cell ─────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct GruCellConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
}

impl GruCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruCell<B> {
        let joined = self.input_size + self.hidden_size;
        GruCell {
            gates:       LinearConfig::new(joined, 2 * self.hidden_size).init(device),
            candidate:   LinearConfig::new(joined, self.hidden_size).init(device),
            input_size:  self.input_size,
            hidden_size: self.hidden_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    /// Reset and update gates, computed together
    pub gates:       Linear<B>,
    pub candidate:   Linear<B>,
    pub input_size:  usize,
    pub hidden_size: usize,
}

impl<B: Backend> GruCell<B> {
    /// x: [batch, input_size], h: [batch, hidden] → h': [batch, hidden]
    pub fn forward(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = h.dims();
        let hidden = self.hidden_size;

        let gates  = sigmoid(self.gates.forward(Tensor::cat(vec![x.clone(), h.clone()], 1)));
        let reset  = gates.clone().slice([0..batch, 0..hidden]);
        let update = gates.slice([0..batch, hidden..2 * hidden]);

        let candidate = tanh(self.candidate.forward(Tensor::cat(vec![x, reset * h.clone()], 1)));

        update.clone() * h + update.neg().add_scalar(1.0) * candidate
    }
}

impl<B: Backend> RecurrentCell<B> for GruCell<B> {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.hidden_size
    }

    fn zero_state(&self, batch_size: usize, device: &B::Device) -> CellState<B> {
        CellState::zeros(1, batch_size, self.hidden_size, device)
    }

    fn step(&self, input: Tensor<B, 2>, state: CellState<B>) -> (Tensor<B, 2>, CellState<B>) {
        let h = self.forward(input, state.top());
        (h.clone(), CellState::new(vec![h]))
    }
}

// ─── Stacked GRU ──────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct StackedGruConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
    #[config(default = 1)]
    pub num_layers:  usize,
}

impl StackedGruConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> StackedGru<B> {
        let layers = (0..self.num_layers)
            .map(|k| {
                // only the bottom layer sees the raw input
                let input_size = if k == 0 { self.input_size } else { self.hidden_size };
                GruCellConfig::new(input_size, self.hidden_size).init(device)
            })
            .collect();
        StackedGru { layers }
    }
}

#[derive(Module, Debug)]
pub struct StackedGru<B: Backend> {
    pub layers: Vec<GruCell<B>>,
}

impl<B: Backend> RecurrentCell<B> for StackedGru<B> {
    fn input_size(&self) -> usize {
        self.layers[0].input_size
    }

    fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].hidden_size
    }

    fn zero_state(&self, batch_size: usize, device: &B::Device) -> CellState<B> {
        let layers = self
            .layers
            .iter()
            .map(|cell| Tensor::zeros([batch_size, cell.hidden_size], device))
            .collect();
        CellState::new(layers)
    }

    fn step(&self, input: Tensor<B, 2>, state: CellState<B>) -> (Tensor<B, 2>, CellState<B>) {
        let mut x = input;
        let mut next = Vec::with_capacity(self.layers.len());
        for (cell, h) in self.layers.iter().zip(state.layers) {
            x = cell.forward(x, h);
            next.push(x.clone());
        }
        (x, CellState::new(next))
    }
}
