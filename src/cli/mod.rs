// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains the pointer network on random lists
//   2. `sort`  — loads a checkpoint and sorts the given numbers

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, SortArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "ptr-sort",
    version = "0.1.0",
    about = "Train a pointer network to sort numbers, then use it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The CLI layer only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => Self::run_train(args),
            Commands::Sort(args)  => Self::run_sort(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training, checkpoints go to: {}", args.checkpoint_dir);

        let summary = TrainUseCase::new(args.into()).execute()?;

        println!(
            "Training complete after {} steps. eval_loss={:.4}, exact={:.1}%",
            summary.steps,
            summary.eval_loss,
            summary.accuracy * 100.0,
        );
        Ok(())
    }

    fn run_sort(args: SortArgs) -> Result<()> {
        use crate::application::sort_use_case::SortUseCase;

        let use_case = SortUseCase::new(args.checkpoint_dir)?;
        let outcome  = use_case.sort(&args.numbers)?;

        println!("\nSorted:     {:?}", outcome.prediction.sorted);
        println!("Order:      {:?}", outcome.prediction.order);
        println!("Confidence: {:.4}", outcome.prediction.confidence);
        println!("Correct:    {}", if outcome.correct { "yes" } else { "no" });
        Ok(())
    }
}
