// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Validate the configuration
//   Step 2: Seed the sample generator      (Layer 4 - data)
//   Step 3: Save config for the sorter     (Layer 6 - infra)
//   Step 4: Open the metrics log           (Layer 6 - infra)
//   Step 5: Run the step loop              (Layer 5 - ml)
//
// There is no dataset on disk: every step draws fresh random
// lists, so the model never sees the same problem twice.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::generator::DataGenerator;
use crate::domain::error::PointerError;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::model::PointerNetworkConfig;
use crate::ml::trainer::{run_training, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the checkpoints so the sort command can rebuild
// exactly the same architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub checkpoint_dir:             String,
    /// L: how many numbers every list holds
    pub max_len:                    usize,
    pub input_size:                 usize,
    pub hidden_size:                usize,
    pub num_layers:                 usize,
    pub max_gradient_norm:          f32,
    pub batch_size:                 usize,
    pub learning_rate:              f64,
    pub learning_rate_decay_factor: f64,
    pub steps:                      usize,
    /// Report, log and checkpoint every this many steps
    pub log_every:                  usize,
    /// Multiply the learning rate by the decay factor every this many steps; 0 disables
    pub decay_every:                usize,
    pub seed:                       u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir:             "checkpoints".to_string(),
            max_len:                    10,
            input_size:                 1,
            hidden_size:                32,
            num_layers:                 1,
            max_gradient_norm:          5.0,
            batch_size:                 32,
            learning_rate:              1e-2,
            learning_rate_decay_factor: 0.95,
            steps:                      10_000,
            log_every:                  100,
            decay_every:                1_000,
            seed:                       42,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> PointerNetworkConfig {
        PointerNetworkConfig::new(self.max_len, self.input_size, self.hidden_size)
            .with_num_layers(self.num_layers)
    }

    pub fn validate(&self) -> Result<(), PointerError> {
        self.model_config().validate()?;

        // the generator produces scalar lists
        if self.input_size != 1 {
            return Err(PointerError::InvalidConfig(format!(
                "input_size must be 1 for generated sorting data, got {}",
                self.input_size
            )));
        }
        if self.batch_size == 0 || self.steps == 0 || self.log_every == 0 {
            return Err(PointerError::InvalidConfig(
                "batch_size, steps and log_every must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) || !(self.max_gradient_norm > 0.0) {
            return Err(PointerError::InvalidConfig(
                "learning_rate and max_gradient_norm must be positive".to_string(),
            ));
        }
        if !(self.learning_rate_decay_factor > 0.0 && self.learning_rate_decay_factor <= 1.0) {
            return Err(PointerError::InvalidConfig(format!(
                "learning_rate_decay_factor must be in (0, 1], got {}",
                self.learning_rate_decay_factor
            )));
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training run end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate().context("Invalid training configuration")?;

        // ── Step 2: Sample generator ──────────────────────────────────────────
        let mut source = DataGenerator::new(cfg.max_len, cfg.seed);
        tracing::info!(
            "Sorting lists of {} numbers, batch size {}, seed {}",
            cfg.max_len, cfg.batch_size, cfg.seed,
        );

        // ── Step 3: Save config for inference ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;

        // ── Step 4: Metrics log ───────────────────────────────────────────────
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 5: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, &mut source, &ckpt_manager, &metrics)
    }
}
