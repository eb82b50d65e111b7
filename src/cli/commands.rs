// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `sort`
// and all their configurable flags.

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the pointer network on random lists
    Train(TrainArgs),

    /// Sort a list of numbers with a trained checkpoint
    Sort(SortArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory to save checkpoints, config and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Length of every list the model learns to sort
    #[arg(long, default_value_t = 10)]
    pub max_len: usize,

    /// Hidden units per recurrent layer
    #[arg(long, default_value_t = 32)]
    pub hidden_size: usize,

    /// Stacked recurrent layers in encoder and decoder
    #[arg(long, default_value_t = 1)]
    pub num_layers: usize,

    /// Gradients are rescaled to at most this global norm
    #[arg(long, default_value_t = 5.0)]
    pub max_gradient_norm: f32,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-2)]
    pub learning_rate: f64,

    /// Multiplier applied to the learning rate every --decay-every steps
    #[arg(long, default_value_t = 0.95)]
    pub learning_rate_decay_factor: f64,

    /// Total optimizer steps
    #[arg(long, default_value_t = 10_000)]
    pub steps: usize,

    /// Report, log metrics and checkpoint every N steps
    #[arg(long, default_value_t = 100)]
    pub log_every: usize,

    /// Decay the learning rate every N steps (0 = never)
    #[arg(long, default_value_t = 1_000)]
    pub decay_every: usize,

    /// Seed for the random list generator
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            checkpoint_dir:             a.checkpoint_dir,
            max_len:                    a.max_len,
            input_size:                 1,
            hidden_size:                a.hidden_size,
            num_layers:                 a.num_layers,
            max_gradient_norm:          a.max_gradient_norm,
            batch_size:                 a.batch_size,
            learning_rate:              a.learning_rate,
            learning_rate_decay_factor: a.learning_rate_decay_factor,
            steps:                      a.steps,
            log_every:                  a.log_every,
            decay_every:                a.decay_every,
            seed:                       a.seed,
        }
    }
}

/// All arguments for the `sort` command
#[derive(Args, Debug)]
pub struct SortArgs {
    /// Comma-separated numbers, exactly as many as the model was trained on
    #[arg(long, value_delimiter = ',', num_args = 1.., allow_negative_numbers = true)]
    pub numbers: Vec<f32>,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use super::*;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["ptr-sort", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let cfg: TrainConfig = args.into();
        let def = TrainConfig::default();
        assert_eq!(cfg.max_len, def.max_len);
        assert_eq!(cfg.batch_size, def.batch_size);
        assert_eq!(cfg.steps, def.steps);
        assert_eq!(cfg.decay_every, def.decay_every);
        assert_eq!(cfg.learning_rate, def.learning_rate);
    }

    #[test]
    fn test_sort_parses_comma_list() {
        let cli = Cli::try_parse_from(["ptr-sort", "sort", "--numbers", "0.3,0.1,-0.2"]).unwrap();
        let Commands::Sort(args) = cli.command else { panic!("expected sort") };
        assert_eq!(args.numbers, vec![0.3, 0.1, -0.2]);
        assert_eq!(args.checkpoint_dir, "checkpoints");
    }
}
