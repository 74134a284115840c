// ============================================================
// Layer 6 — Run Metadata Store
// ============================================================
// Persists the outcome of a run as pretty-printed JSON.
//
// What gets saved per run:
//   1. run_metadata.json    — network shape, knobs, last-run
//                             metrics and both session lists
//   2. pipeline_config.json — the configuration that produced it
//
// Each run overwrites both files (last run wins). The metadata
// is written to a temp file first and renamed, so an interrupted
// run never leaves half a JSON document behind.
//
// Reference: Rust Book §9 (Error Handling)
//            serde_json crate documentation

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::application::pipeline_use_case::PipelineConfig;
use crate::domain::metrics::RunMetadata;

pub const METADATA_FILE: &str = "run_metadata.json";
pub const CONFIG_FILE: &str = "pipeline_config.json";

/// Saves and loads run metadata and config in one directory.
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Write the run metadata, replacing any previous run.
    pub fn save_metadata(&self, meta: &RunMetadata) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create metadata directory '{}'", self.dir.display()))?;

        let path = self.metadata_path();
        let tmp  = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(meta)?;

        fs::write(&tmp, json)
            .with_context(|| format!("Cannot write run metadata to '{}'", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Cannot move run metadata into '{}'", path.display()))?;

        tracing::debug!("Saved run metadata to '{}'", path.display());
        Ok(())
    }

    /// Load the metadata written by the last run.
    pub fn load_metadata(&self) -> Result<RunMetadata> {
        let path = self.metadata_path();
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read run metadata from '{}'. Has a run completed yet?", path.display())
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_config(&self, cfg: &PipelineConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create metadata directory '{}'", self.dir.display()))?;

        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved pipeline config to '{}'", path.display());
        Ok(())
    }
}
