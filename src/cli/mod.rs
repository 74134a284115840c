// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DataArgs, RunArgs};

use crate::application::pipeline_use_case::{PipelineConfig, PipelineUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "digit-ingest",
    version,
    about = "Acquire, cache, split and evaluate the MNIST digit dataset."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. This layer only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => run_pipeline(args),
            Commands::Fetch(args) => fetch(args),
            Commands::Materialize(args) => materialize(args),
        }
    }
}

fn run_pipeline(args: RunArgs) -> Result<()> {
    let config: PipelineConfig = args.into();
    tracing::info!("Starting run '{}' with {:?} encoding", config.model_id, config.encoding);

    let meta = PipelineUseCase::new(config).execute()?;

    println!(
        "Training: exact {:.2}%  generous {:.2}%  forgiveness {:.2}%",
        meta.last_training_accuracy,
        meta.last_training_accuracy_generous,
        meta.last_training_accuracy_forgiveness,
    );
    println!(
        "Testing:  exact {:.2}%  generous {:.2}%  forgiveness {:.2}%",
        meta.last_test_accuracy,
        meta.last_test_accuracy_generous,
        meta.last_test_accuracy_forgiveness,
    );
    Ok(())
}

fn fetch(args: DataArgs) -> Result<()> {
    let config: PipelineConfig = args.into();
    PipelineUseCase::new(config).fetch()?;
    println!("Archives are ready.");
    Ok(())
}

fn materialize(args: DataArgs) -> Result<()> {
    let config: PipelineConfig = args.into();
    let store = PipelineUseCase::new(config).materialize()?;
    println!("Sample cache holds {} samples.", store.len());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalizer::Encoding;

    #[test]
    fn test_run_args_map_into_config() {
        let cli = Cli::try_parse_from([
            "digit-ingest", "run", "--encoding", "one-hot", "--cap", "99", "--train", "--data-dir", "/tmp/d",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else { panic!("expected run") };
        let cfg: PipelineConfig = args.into();
        assert_eq!(cfg.encoding, Encoding::OneHot);
        assert_eq!(cfg.sample_cap, Some(99));
        assert!(cfg.train);
        assert_eq!(cfg.data_dir, "/tmp/d");
        assert_eq!(cfg.forgiveness_threshold, 0.8);
    }

    #[test]
    fn test_defaults_match_pipeline_defaults() {
        let cli = Cli::try_parse_from(["digit-ingest", "run"]).unwrap();
        let Commands::Run(args) = cli.command else { panic!("expected run") };
        assert_eq!(PipelineConfig::from(args), PipelineConfig::default());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["digit-ingest"]).is_err());
    }
}
