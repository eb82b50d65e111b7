// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Trainer owns everything that changes during training:
// the model, the Adam state, the learning rate and the step
// counter. Nothing is global.
//
// Per step, strictly in this order:
//   1. fresh training batch → teacher-forced loss
//   2. backward pass + clipped Adam update
//   3. fresh evaluation batch → self-fed loss and accuracy,
//      on model.valid() (inner backend, no autodiff graph)
//
// Key Burn insight:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on MyInnerBackend (Wgpu)
//   - The evaluation batcher must also use MyInnerBackend

use anyhow::Result;
use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::{SortBatch, SortBatcher};
use crate::domain::error::PointerResult;
use crate::domain::traits::{SampleMode, SampleSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{AccuracyWindow, MetricsLogger, SmoothedLoss, StepMetrics};
use crate::ml::loss::finite_loss;
use crate::ml::model::{EvalMetrics, PointerNetwork};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

// ─── Trainer ──────────────────────────────────────────────────────────────────
pub struct Trainer<B: AutodiffBackend, O: Optimizer<PointerNetwork<B>, B>> {
    model:         PointerNetwork<B>,
    optimizer:     O,
    learning_rate: f64,
    decay_factor:  f64,
    global_step:   usize,
}

/// Adam with gradients clipped to `max_gradient_norm`.
pub fn create_optimizer<B: AutodiffBackend>(max_gradient_norm: f32) -> impl Optimizer<PointerNetwork<B>, B> {
    AdamConfig::new()
        .with_epsilon(1e-8)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(max_gradient_norm)))
        .init()
}

impl<B: AutodiffBackend, O: Optimizer<PointerNetwork<B>, B>> Trainer<B, O> {
    pub fn new(model: PointerNetwork<B>, optimizer: O, learning_rate: f64, decay_factor: f64) -> Self {
        Self { model, optimizer, learning_rate, decay_factor, global_step: 0 }
    }

    /// Teacher-forced forward, backward, optimizer update.
    ///
    /// A NaN or infinite loss is returned as an error before any
    /// parameter is touched.
    pub fn train_step(&mut self, batch: &SortBatch<B>) -> PointerResult<f64> {
        let loss  = self.model.forward_loss(batch)?;
        let value = finite_loss(loss.clone(), "training")?;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        // the optimizer hands back a whole new parameter set
        self.model = self.optimizer.step(self.learning_rate, self.model.clone(), grads);
        self.global_step += 1;

        Ok(value)
    }

    /// Self-fed evaluation on the current parameters.
    pub fn evaluate(&self, batch: &SortBatch<B::InnerBackend>) -> PointerResult<EvalMetrics> {
        self.model.valid().evaluate(batch)
    }

    /// lr ← lr · decay_factor; returns the new rate.
    pub fn decay_learning_rate(&mut self) -> f64 {
        self.learning_rate *= self.decay_factor;
        self.learning_rate
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn global_step(&self) -> usize {
        self.global_step
    }

    pub fn model(&self) -> &PointerNetwork<B> {
        &self.model
    }
}

// ─── Training driver ──────────────────────────────────────────────────────────
/// Final numbers of a training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainSummary {
    pub steps:         usize,
    pub train_loss:    f64,
    pub eval_loss:     f64,
    pub accuracy:      f64,
    pub learning_rate: f64,
}

pub fn run_training<S: SampleSource>(
    cfg:          &TrainConfig,
    source:       &mut S,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend, S>(cfg, source, ckpt_manager, metrics, device)
}

pub fn train_loop<B: AutodiffBackend, S: SampleSource>(
    cfg:          &TrainConfig,
    source:       &mut S,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
    device:       B::Device,
) -> Result<TrainSummary> {

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config();
    model_cfg.validate()?;
    let model: PointerNetwork<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: L={}, hidden={}, layers={}",
        cfg.max_len, cfg.hidden_size, cfg.num_layers,
    );

    let mut trainer = Trainer::new(
        model,
        create_optimizer::<B>(cfg.max_gradient_norm),
        cfg.learning_rate,
        cfg.learning_rate_decay_factor,
    );

    let train_batcher = SortBatcher::<B>::new(device.clone());
    let eval_batcher  = SortBatcher::<B::InnerBackend>::new(device);

    let mut train_loss = SmoothedLoss::new(0.9);
    let mut eval_loss  = SmoothedLoss::new(0.9);
    let mut window     = AccuracyWindow::default();
    let mut best_eval  = f64::INFINITY;
    let mut best_step  = 0;
    let mut last_accuracy = 0.0;

    // ── Step loop ─────────────────────────────────────────────────────────────
    for step in 1..=cfg.steps {

        // ── Train ─────────────────────────────────────────────────────────────
        let samples = source.next_batch(cfg.batch_size, SampleMode::Train)?;
        let loss    = trainer.train_step(&train_batcher.batch(samples)?)?;
        train_loss.update(loss);

        // ── Evaluate ──────────────────────────────────────────────────────────
        let samples = source.next_batch(cfg.batch_size, SampleMode::Eval)?;
        let eval    = trainer.evaluate(&eval_batcher.batch(samples)?)?;
        eval_loss.update(eval.loss);
        window.record(eval.exact_matches, eval.batch_size);

        if cfg.decay_every > 0 && step % cfg.decay_every == 0 {
            let lr = trainer.decay_learning_rate();
            tracing::debug!("Step {}: learning rate decayed to {:.6}", step, lr);
        }

        // ── Report ────────────────────────────────────────────────────────────
        if step % cfg.log_every.max(1) == 0 || step == cfg.steps {
            last_accuracy = window.accuracy();
            let m = StepMetrics::new(
                step,
                train_loss.value(),
                eval_loss.value(),
                last_accuracy,
                trainer.learning_rate(),
            );

            println!(
                "Step {:>6}/{} | train_loss={:.4} | eval_loss={:.4} | exact={:.1}% | lr={:.6}",
                step, cfg.steps, m.train_loss, m.eval_loss, m.accuracy * 100.0, m.learning_rate,
            );
            metrics.log(&m)?;

            if m.is_improvement(best_eval) {
                best_eval = m.eval_loss;
                best_step = step;
                tracing::info!("New best eval loss {:.4} at step {}", best_eval, step);
            }

            ckpt_manager.save_model(trainer.model(), step)?;
            ckpt_manager.prune(&[step, best_step])?;
            window.reset();
        }
    }

    tracing::info!("Training complete after {} steps", trainer.global_step());
    Ok(TrainSummary {
        steps:         trainer.global_step(),
        train_loss:    train_loss.value(),
        eval_loss:     eval_loss.value(),
        accuracy:      last_accuracy,
        learning_rate: trainer.learning_rate(),
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generator::DataGenerator;
    use crate::domain::error::PointerError;
    use crate::domain::sample::SortSample;
    use crate::ml::model::PointerNetworkConfig;
    use approx::assert_relative_eq;
    use burn::backend::{Autodiff, NdArray};

    type B = Autodiff<NdArray>;

    fn small_config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            max_len:        3,
            hidden_size:    8,
            batch_size:     4,
            steps:          6,
            log_every:      3,
            decay_every:    2,
            checkpoint_dir: dir.to_string_lossy().into_owned(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_train_step_updates_parameters() {
        let device = Default::default();
        let model: PointerNetwork<B> = PointerNetworkConfig::new(3, 1, 8).init(&device);
        let mut trainer = Trainer::new(model, create_optimizer::<B>(5.0), 1e-2, 0.95);

        let samples = DataGenerator::new(3, 1).next_batch(4, SampleMode::Train).unwrap();
        let batch = SortBatcher::<B>::new(device).batch(samples).unwrap();

        let before = trainer.model().parameter_snapshot().unwrap();
        let loss = trainer.train_step(&batch).unwrap();
        let after = trainer.model().parameter_snapshot().unwrap();

        assert!(loss.is_finite() && loss > 0.0);
        assert_eq!(trainer.global_step(), 1);
        assert_ne!(before, after);
    }

    #[test]
    fn test_loss_drops_on_a_fixed_batch() {
        let device = Default::default();
        let model: PointerNetwork<B> = PointerNetworkConfig::new(2, 1, 16).init(&device);
        let mut trainer = Trainer::new(model, create_optimizer::<B>(5.0), 1e-2, 1.0);

        let samples = DataGenerator::new(2, 4).next_batch(8, SampleMode::Train).unwrap();
        let batch = SortBatcher::<B>::new(device).batch(samples).unwrap();

        let first = trainer.train_step(&batch).unwrap();
        let mut last = first;
        for _ in 0..60 {
            last = trainer.train_step(&batch).unwrap();
        }
        assert!(last < first, "loss should fall: {first} → {last}");
    }

    #[test]
    fn test_evaluate_uses_inner_backend() {
        let device = Default::default();
        let model: PointerNetwork<B> = PointerNetworkConfig::new(3, 1, 8).init(&device);
        let trainer = Trainer::new(model, create_optimizer::<B>(5.0), 1e-2, 0.95);

        let samples = DataGenerator::new(3, 2).next_batch(5, SampleMode::Eval).unwrap();
        let batch = SortBatcher::<NdArray>::new(device).batch(samples).unwrap();

        let metrics = trainer.evaluate(&batch).unwrap();
        assert_eq!(metrics.batch_size, 5);
    }

    #[test]
    fn test_learning_rate_decay() {
        let device = Default::default();
        let model: PointerNetwork<B> = PointerNetworkConfig::new(2, 1, 4).init(&device);
        let mut trainer = Trainer::new(model, create_optimizer::<B>(5.0), 1e-2, 0.5);

        assert_relative_eq!(trainer.decay_learning_rate(), 5e-3);
        assert_relative_eq!(trainer.decay_learning_rate(), 2.5e-3);
        assert_relative_eq!(trainer.learning_rate(), 2.5e-3);
    }

    #[test]
    fn test_nan_batch_is_fatal_and_skips_update() {
        let device = Default::default();
        let model: PointerNetwork<B> = PointerNetworkConfig::new(2, 1, 4).init(&device);
        let mut trainer = Trainer::new(model, create_optimizer::<B>(5.0), 1e-2, 0.95);

        let sample = SortSample::from_parts(
            vec![vec![f32::NAN], vec![0.2]],
            vec![vec![0.0], vec![0.2], vec![f32::NAN]],
            vec![2, 1, 0],
        )
        .unwrap();
        let batch = SortBatcher::<B>::new(device).batch(vec![sample]).unwrap();

        let before = trainer.model().parameter_snapshot().unwrap();
        let err = trainer.train_step(&batch).unwrap_err();
        assert!(matches!(err, PointerError::NonFiniteLoss { what: "training", .. }));
        assert_eq!(trainer.global_step(), 0);
        assert_eq!(before, trainer.model().parameter_snapshot().unwrap());
    }

    #[test]
    fn test_train_loop_writes_checkpoints_and_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = small_config(dir.path());
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir).unwrap();
        let mut source = DataGenerator::new(cfg.max_len, cfg.seed);

        let summary = train_loop::<B, _>(&cfg, &mut source, &ckpt, &metrics, Default::default()).unwrap();

        assert_eq!(summary.steps, 6);
        assert!(summary.train_loss.is_finite());
        assert!(summary.eval_loss.is_finite());
        assert_relative_eq!(summary.learning_rate, cfg.learning_rate * 0.95f64.powi(3), epsilon = 1e-12);

        assert!(dir.path().join("latest_step.json").exists());
        // only the latest and the best checkpoint survive
        let kept = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with("model_step_"))
            .count();
        assert!((1..=2).contains(&kept), "kept {kept} checkpoints");
        assert!(std::fs::read_dir(dir.path())
            .unwrap()
            .any(|e| e.unwrap().file_name().to_string_lossy().starts_with("model_step_6.")));
        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        // header + reports at steps 3 and 6
        assert_eq!(csv.lines().count(), 3);
    }
}
