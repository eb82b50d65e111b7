// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training progress to a CSV file at every report.
//
// Metrics recorded per report:
//   - step:          global training step (1, 2, 3, ...)
//   - train_loss:    smoothed teacher-forced loss
//   - eval_loss:     smoothed self-fed loss
//   - accuracy:      fraction of evaluation sequences sorted
//                    exactly since the previous report
//   - learning_rate: rate in effect at the report
//
// Output file: checkpoints/metrics.csv
//
//   step,train_loss,eval_loss,accuracy,learning_rate
//   100,1.912300,2.104500,0.000000,0.010000
//   200,0.873100,1.120400,0.031250,0.010000
//   ...
//
// Losses are exponential moving averages (0.9 · old + 0.1 · new)
// so one unlucky batch does not dominate the curve.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMetrics {
    pub step: usize,

    /// Smoothed cross-entropy with ground-truth feedback
    pub train_loss: f64,

    /// Smoothed cross-entropy with the model's own feedback.
    /// Stays above train_loss: errors compound when predictions are fed back
    pub eval_loss: f64,

    /// Range: [0.0, 1.0], 1.0 means every sequence came out perfectly sorted
    pub accuracy: f64,

    pub learning_rate: f64,
}

impl StepMetrics {
    pub fn new(
        step:          usize,
        train_loss:    f64,
        eval_loss:     f64,
        accuracy:      f64,
        learning_rate: f64,
    ) -> Self {
        Self { step, train_loss, eval_loss, accuracy, learning_rate }
    }

    /// Returns true if this report improved over the previous best eval_loss
    pub fn is_improvement(&self, best_eval_loss: f64) -> bool {
        self.eval_loss < best_eval_loss
    }
}

// ─── Running statistics ───────────────────────────────────────────────────────
/// Exponential moving average of a loss; the first value seeds it.
#[derive(Debug, Clone, Copy)]
pub struct SmoothedLoss {
    decay: f64,
    value: Option<f64>,
}

impl SmoothedLoss {
    pub fn new(decay: f64) -> Self {
        Self { decay, value: None }
    }

    pub fn update(&mut self, loss: f64) -> f64 {
        let next = match self.value {
            Some(old) => self.decay * old + (1.0 - self.decay) * loss,
            None      => loss,
        };
        self.value = Some(next);
        next
    }

    /// 0.0 before the first update
    pub fn value(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

/// Exact matches accumulated between two reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccuracyWindow {
    correct: usize,
    total:   usize,
}

impl AccuracyWindow {
    pub fn record(&mut self, correct: usize, total: usize) {
        self.correct += correct;
        self.total   += total;
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ─── CSV logger ───────────────────────────────────────────────────────────────
/// Logs step metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        // appending across runs keeps one header
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "step,train_loss,eval_loss,accuracy,learning_rate")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one row.
    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.step,
            m.train_loss,
            m.eval_loss,
            m.accuracy,
            m.learning_rate,
        )?;

        tracing::debug!(
            "Logged step {} metrics: train_loss={:.4}, eval_loss={:.4}",
            m.step,
            m.train_loss,
            m.eval_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
