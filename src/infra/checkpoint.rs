// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. Model weights (.mpk.gz file) — all learned parameters
//   2. latest_step.json             — which step was last saved
//   3. train_config.json            — architecture + hyperparameters
//
// The config is needed to rebuild a PointerNetwork of the right
// shape (max_len, hidden_size, num_layers) before the weights
// can be loaded into it.
//
// File naming convention:
//   checkpoints/
//     model_step_{best}.mpk.gz
//     model_step_{latest}.mpk.gz
//     latest_step.json
//     train_config.json
//
// Older weight files are pruned after each save, so a run keeps
// at most the latest and the best-evaluated checkpoint.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::PointerNetwork;

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Self {
        let dir = PathBuf::from(dir.into());
        // failures surface on the first write with a proper message
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Write {dir}/model_step_{step}.mpk.gz and point latest_step.json at it.
    pub fn save_model<B: Backend>(&self, model: &PointerNetwork<B>, step: usize) -> Result<()> {
        // recorder adds the extension
        let path = self.dir.join(format!("model_step_{step}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join("latest_step.json");
        fs::write(&latest_path, serde_json::to_string(&step)?)
            .with_context(|| "Failed to write latest_step.json")?;

        tracing::debug!("Saved checkpoint: step {}", step);
        Ok(())
    }

    /// Delete every model_step_* file whose step is not in `keep`.
    /// Returns how many files were removed.
    pub fn prune(&self, keep: &[usize]) -> Result<usize> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot list '{}'", self.dir.display()))?;

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            let Some(step) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("model_step_"))
                .and_then(|rest| rest.split('.').next())
                .and_then(|n| n.parse::<usize>().ok())
            else {
                continue;
            };

            if !keep.contains(&step) {
                fs::remove_file(&path)
                    .with_context(|| format!("Cannot remove old checkpoint '{}'", path.display()))?;
                removed += 1;
            }
        }

        tracing::debug!("Pruned {} old checkpoint file(s)", removed);
        Ok(removed)
    }

    /// Load the latest saved weights into `model`.
    ///
    /// `model` must have the architecture the checkpoint was
    /// written with or the load fails.
    pub fn load_model<B: Backend>(
        &self,
        model:  PointerNetwork<B>,
        device: &B::Device,
    ) -> Result<PointerNetwork<B>> {
        let step = self.latest_step()?;
        let path = self.dir.join(format!("model_step_{step}"));

        tracing::info!("Loading checkpoint from step {}", step);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Must run before training so the sort command can rebuild the model.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'sort'.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }

    /// Step number of the most recent checkpoint.
    pub fn latest_step(&self) -> Result<usize> {
        let path = self.dir.join("latest_step.json");

        let s = fs::read_to_string(&path)
            .with_context(|| "Cannot find 'latest_step.json'. Have you run 'train' first?")?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
