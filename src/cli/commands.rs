// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and their flags:
//   run          — full pipeline, writes run metadata
//   fetch        — download + unpack the archives only
//   materialize  — build the per-sample image cache only
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::pipeline_use_case::PipelineConfig;
use crate::data::normalizer::Encoding;
use crate::infra::acquisition::DEFAULT_BASE_URL;
use crate::ml::evaluator::{DEFAULT_FORGIVENESS_THRESHOLD, DEFAULT_GENEROUS_TOLERANCE};
use crate::ml::network::Activation;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Acquire, cache, split and evaluate the dataset
    Run(RunArgs),

    /// Download and unpack the dataset archives
    Fetch(DataArgs),

    /// Build the per-sample image cache and manifest
    Materialize(DataArgs),
}

/// Where archives and derived files live.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Directory holding the downloaded and unpacked archives
    #[arg(long, default_value = "data/mnist")]
    pub data_dir: String,

    /// Directory for per-sample images and the manifest
    #[arg(long, default_value = "host/MNIST")]
    pub cache_dir: String,

    /// Base URL the four archives are fetched from
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Directory for run_metadata.json and pipeline_config.json
    #[arg(long, default_value = "host/runs")]
    pub metadata_dir: String,

    /// Session encoding used for the whole run
    #[arg(long, value_enum, default_value_t = Encoding::ScalarLabel)]
    pub encoding: Encoding,

    /// Keep at most CAP+1 sessions per subset
    #[arg(long)]
    pub cap: Option<usize>,

    /// Hidden layer width
    #[arg(long, default_value_t = 28 * 28)]
    pub hidden: usize,

    /// Output activation (default: linear for scalar-label, sigmoid for one-hot)
    #[arg(long, value_enum)]
    pub output_activation: Option<Activation>,

    #[arg(long, default_value = "mnist-model-001")]
    pub model_id: String,

    #[arg(long, default_value = "MNIST Digit Classification")]
    pub project_name: String,

    /// Seed for the engine's initial weights
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Train the output layer once before evaluating
    #[arg(long)]
    pub train: bool,

    #[arg(long, default_value_t = 0.01)]
    pub weight_adjustment: f64,

    #[arg(long, default_value_t = 0.01)]
    pub bias_adjustment: f64,

    /// Fraction of the target scale an error may reach and still count as correct
    #[arg(long, default_value_t = DEFAULT_FORGIVENESS_THRESHOLD)]
    pub forgiveness_threshold: f64,

    /// Mean scaled deviation accepted by the generous tier
    #[arg(long, default_value_t = DEFAULT_GENEROUS_TOLERANCE)]
    pub generous_tolerance: f64,
}

impl From<DataArgs> for PipelineConfig {
    fn from(a: DataArgs) -> Self {
        PipelineConfig {
            data_dir:  a.data_dir,
            cache_dir: a.cache_dir,
            base_url:  a.base_url,
            ..Default::default()
        }
    }
}

/// The application layer never sees clap types.
impl From<RunArgs> for PipelineConfig {
    fn from(a: RunArgs) -> Self {
        PipelineConfig {
            metadata_dir:          a.metadata_dir,
            encoding:              a.encoding,
            sample_cap:            a.cap,
            hidden:                a.hidden,
            output_activation:     a.output_activation,
            model_id:              a.model_id,
            project_name:          a.project_name,
            seed:                  a.seed,
            train:                 a.train,
            weight_adjustment:     a.weight_adjustment,
            bias_adjustment:       a.bias_adjustment,
            forgiveness_threshold: a.forgiveness_threshold,
            generous_tolerance:    a.generous_tolerance,
            ..PipelineConfig::from(a.data)
        }
    }
}
