// ============================================================
// Layer 2 — PipelineUseCase
// ============================================================
// Orchestrates one full run, strictly in this order:
//
//   Step 1: Configure the network          (Layer 5 - ml)
//   Step 2: Acquire + cache the samples    (Layer 6 - infra)
//   Step 3: Partition into sessions        (Layer 4 - data)
//   Step 4: Train one layer (optional)     (Layer 5 - ml)
//   Step 5: Evaluate train, then test      (Layer 5 - ml)
//   Step 6: Record + persist metadata      (Layer 6 - infra)
//
// All run state lives in a PipelineContext that is handed from
// step to step: the engine, the run metadata and the config.
// Nothing is global, and nothing runs concurrently. Any error
// ends the run before evaluation results are written.
//
// Reference: Rust Book §13 (Iterators and Closures)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::normalizer::{Encoding, NUM_CLASSES};
use crate::data::session_builder::SessionBuilder;
use crate::data::splitter::{partition, Split};
use crate::domain::metrics::{MetricRecord, RunMetadata};
use crate::domain::sample::RawSampleStore;
use crate::domain::session::LABEL_SLOT;
use crate::domain::traits::{LearningEngine, Transport};
use crate::infra::acquisition::{Acquirer, HttpTransport, DEFAULT_BASE_URL};
use crate::infra::cache::DerivedCache;
use crate::infra::metadata_store::MetadataStore;
use crate::ml::evaluator::{Evaluator, DEFAULT_FORGIVENESS_THRESHOLD, DEFAULT_GENEROUS_TOLERANCE};
use crate::ml::network::{Activation, FeedForwardEngine, NetworkConfig};

// ─── Pipeline Configuration ──────────────────────────────────────────────────
// Everything a run depends on. Serialisable so it can be saved
// next to the run metadata it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data_dir:     String,
    pub cache_dir:    String,
    pub metadata_dir: String,
    pub base_url:     String,

    pub encoding:   Encoding,
    pub sample_cap: Option<usize>,

    pub inputs:            usize,
    pub hidden:            usize,
    /// Defaults to sigmoid for one-hot and linear for a scalar label
    pub output_activation: Option<Activation>,
    pub model_id:          String,
    pub project_name:      String,
    pub seed:              u64,

    pub train:             bool,
    pub weight_adjustment: f64,
    pub bias_adjustment:   f64,

    pub forgiveness_threshold: f64,
    pub generous_tolerance:    f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir:     "data/mnist".to_string(),
            cache_dir:    "host/MNIST".to_string(),
            metadata_dir: "host/runs".to_string(),
            base_url:     DEFAULT_BASE_URL.to_string(),

            encoding:   Encoding::ScalarLabel,
            sample_cap: None,

            inputs:            28 * 28,
            hidden:            28 * 28,
            output_activation: None,
            model_id:          "mnist-model-001".to_string(),
            project_name:      "MNIST Digit Classification".to_string(),
            seed:              42,

            train:             false,
            weight_adjustment: 0.01,
            bias_adjustment:   0.01,

            forgiveness_threshold: DEFAULT_FORGIVENESS_THRESHOLD,
            generous_tolerance:    DEFAULT_GENEROUS_TOLERANCE,
        }
    }
}

impl PipelineConfig {
    /// Output slot names the active encoding produces.
    pub fn output_slots(&self) -> Vec<String> {
        match self.encoding {
            Encoding::ScalarLabel => vec![LABEL_SLOT.to_string()],
            Encoding::OneHot => (0..NUM_CLASSES).map(|c| c.to_string()).collect(),
        }
    }

    pub fn resolved_output_activation(&self) -> Activation {
        self.output_activation.unwrap_or(match self.encoding {
            Encoding::ScalarLabel => Activation::Linear,
            Encoding::OneHot => Activation::Sigmoid,
        })
    }

    pub fn network(&self) -> Result<NetworkConfig> {
        let slots       = self.output_slots();
        let activations = vec![self.resolved_output_activation(); slots.len()];
        let network = NetworkConfig::configure(
            self.inputs,
            self.hidden,
            slots,
            activations,
            self.model_id.clone(),
            self.project_name.clone(),
        )?;
        Ok(network)
    }
}

// ─── PipelineContext ──────────────────────────────────────────────────────────
// The engine and the run metadata for one run, owned together
// and passed through every post-ingestion stage.
pub struct PipelineContext<E: LearningEngine> {
    pub config:   PipelineConfig,
    pub engine:   E,
    pub metadata: RunMetadata,
}

impl<E: LearningEngine> PipelineContext<E> {
    pub fn new(config: PipelineConfig, engine: E, metadata: RunMetadata) -> Self {
        Self { config, engine, metadata }
    }

    /// Split, optionally train, evaluate both subsets and record the results.
    pub fn run(&mut self, store: &RawSampleStore) -> Result<(MetricRecord, MetricRecord)> {
        let (rows, cols) = store.dimensions();
        if !store.is_empty() && rows * cols != self.config.inputs {
            bail!(
                "network expects {} inputs but samples are {}x{} = {} pixels",
                self.config.inputs,
                rows,
                cols,
                rows * cols
            );
        }

        tracing::info!("Starting to split data into training and testing sessions...");
        let builder   = SessionBuilder::new(self.config.encoding);
        let mut split = partition(store, &builder, self.config.sample_cap).context("partition stage failed")?;

        if self.config.train {
            self.train(&mut split)?;
        }

        let evaluator = Evaluator::new(self.config.forgiveness_threshold, self.config.generous_tolerance);

        tracing::info!("Evaluating model performance on the training set...");
        let training = evaluator
            .evaluate(&self.engine, &split.train)
            .context("evaluation of the training set failed")?;
        log_metrics("Training", &training);

        tracing::info!("Evaluating model performance on the testing set...");
        let testing = evaluator
            .evaluate(&self.engine, &split.test)
            .context("evaluation of the testing set failed")?;
        log_metrics("Testing", &testing);

        self.metadata.record_evaluation(&training, &testing, &split.train, &split.test);
        tracing::info!("Model performance evaluation completed and metadata updated.");
        Ok((training, testing))
    }

    /// One pass over the output layer (the last weight layer).
    fn train(&mut self, split: &mut Split) -> Result<()> {
        let output_layer = self.metadata.total_layers.saturating_sub(2);
        tracing::info!("Training layer {} on {} sessions", output_layer, split.train.len());
        self.engine
            .train_layer(output_layer, &mut split.train)
            .context("training stage failed")?;
        Ok(())
    }
}

fn log_metrics(set: &str, m: &MetricRecord) {
    tracing::info!("{} set exact accuracy: {:.2}%, Exact errors: {}", set, m.exact_accuracy, m.exact_error_count);
    tracing::info!(
        "{} set generous accuracy: {:.2}%, Average generous error: {:.2}",
        set,
        m.generous_accuracy,
        m.average_generous_error
    );
    tracing::info!(
        "{} set forgiveness accuracy: {:.2}%, Forgiveness errors: {}",
        set,
        m.forgiveness_accuracy,
        m.forgiveness_error_count
    );
}

// ─── PipelineUseCase ──────────────────────────────────────────────────────────
// Owns the config and runs the stages end to end.
pub struct PipelineUseCase {
    config: PipelineConfig,
}

impl PipelineUseCase {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Full run over HTTP.
    pub fn execute(&self) -> Result<RunMetadata> {
        let transport = HttpTransport::new().context("transport setup failed")?;
        self.execute_with(transport)
    }

    /// Full run with an explicit transport.
    pub fn execute_with<T: Transport>(&self, transport: T) -> Result<RunMetadata> {
        let cfg = &self.config;

        // ── Step 1: Configure the network ─────────────────────────────────────
        let network  = cfg.network().context("network configuration failed")?;
        let metadata = network.metadata(cfg.forgiveness_threshold, cfg.weight_adjustment, cfg.bias_adjustment);
        tracing::info!(
            "Model setup completed. Total Neurons: {}, Total Layers: {}",
            metadata.total_neurons,
            metadata.total_layers
        );
        let engine = FeedForwardEngine::new(network, cfg.seed, cfg.weight_adjustment, cfg.bias_adjustment);

        // ── Step 2: Acquire archives and the derived cache ────────────────────
        let store = self.materialize_with(transport)?;

        // ── Steps 3-5: Split, train, evaluate ─────────────────────────────────
        let mut context = PipelineContext::new(cfg.clone(), engine, metadata);
        context.run(&store)?;

        // ── Step 6: Persist ───────────────────────────────────────────────────
        let meta_store = MetadataStore::new(&cfg.metadata_dir);
        meta_store.save_config(cfg)?;
        meta_store.save_metadata(&context.metadata)?;
        tracing::info!("Run metadata written to '{}'", meta_store.metadata_path().display());

        Ok(context.metadata)
    }

    /// Only make sure the archives are downloaded and unpacked.
    pub fn fetch_with<T: Transport>(&self, transport: T) -> Result<()> {
        let acquirer = Acquirer::new(&self.config.data_dir, self.config.base_url.clone(), transport);
        acquirer
            .ensure_available()
            .with_context(|| format!("acquisition into '{}' failed", self.config.data_dir))
    }

    pub fn fetch(&self) -> Result<()> {
        self.fetch_with(HttpTransport::new().context("transport setup failed")?)
    }

    /// Build (or reuse) the derived cache and return the decoded samples.
    pub fn materialize_with<T: Transport>(&self, transport: T) -> Result<RawSampleStore> {
        let acquirer = Acquirer::new(&self.config.data_dir, self.config.base_url.clone(), transport);
        let cache    = DerivedCache::new(&self.config.cache_dir);
        let store    = cache
            .ensure(&acquirer)
            .with_context(|| format!("sample cache '{}' failed", self.config.cache_dir))?;
        tracing::info!("Loaded {} samples", store.len());
        Ok(store)
    }

    pub fn materialize(&self) -> Result<RawSampleStore> {
        self.materialize_with(HttpTransport::new().context("transport setup failed")?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::decoder::{encode_images, encode_labels};
    use crate::domain::error::PipelineResult;
    use crate::domain::sample::ImageSet;
    use crate::domain::session::{InputVariables, Prediction, TrainingSession};
    use crate::infra::acquisition::tests::FakeTransport;

    /// Reads the label back out of the first pixel.
    struct Oracle;

    impl LearningEngine for Oracle {
        fn infer(&self, input: &InputVariables) -> PipelineResult<Prediction> {
            let label = input.to_f64()[0];
            Ok([(LABEL_SLOT.to_string(), label)].into_iter().collect())
        }

        fn train_layer(&mut self, _: usize, sessions: &mut [TrainingSession]) -> PipelineResult<()> {
            sessions.iter_mut().for_each(|s| s.learned = true);
            Ok(())
        }
    }

    fn marked_images(n: usize, pixels: usize) -> Vec<Vec<u8>> {
        (0..n)
            .map(|i| {
                let mut img = vec![0u8; pixels];
                img[0] = (i % 10) as u8;
                img
            })
            .collect()
    }

    fn small_config(root: &std::path::Path) -> PipelineConfig {
        PipelineConfig {
            data_dir:     root.join("data").display().to_string(),
            cache_dir:    root.join("cache").display().to_string(),
            metadata_dir: root.join("runs").display().to_string(),
            base_url:     "https://host/mnist/".to_string(),
            inputs:       4,
            hidden:       3,
            ..Default::default()
        }
    }

    #[test]
    fn test_context_records_both_subsets() {
        let images = ImageSet { rows: 2, cols: 2, images: marked_images(50, 4) };
        let labels = (0..50).map(|i| (i % 10) as u8).collect();
        let store  = RawSampleStore::new(images, labels).unwrap();

        let cfg         = PipelineConfig { inputs: 4, train: true, ..Default::default() };
        let mut context = PipelineContext::new(cfg, Oracle, RunMetadata { total_layers: 3, ..Default::default() });
        let (training, testing) = context.run(&store).unwrap();

        assert_eq!(training.total, 40);
        assert_eq!(testing.total, 10);
        assert_eq!(context.metadata.last_training_accuracy, 100.0);
        assert_eq!(context.metadata.last_test_forgiveness_error_count, 0);
        assert_eq!(context.metadata.training_sessions.len(), 40);
        assert_eq!(context.metadata.testing_sessions.len(), 10);
        assert!(context.metadata.training_sessions.iter().all(|s| s.learned));
        assert!(context.metadata.testing_sessions.iter().all(|s| !s.learned));
    }

    #[test]
    fn test_context_rejects_dimension_mismatch() {
        let images = ImageSet { rows: 2, cols: 3, images: marked_images(5, 6) };
        let store  = RawSampleStore::new(images, vec![0; 5]).unwrap();
        let mut context = PipelineContext::new(PipelineConfig::default(), Oracle, RunMetadata::default());
        assert!(context.run(&store).is_err());
    }

    #[test]
    fn test_output_slots_follow_encoding() {
        let scalar = PipelineConfig::default();
        assert_eq!(scalar.output_slots(), vec!["label".to_string()]);
        assert_eq!(scalar.resolved_output_activation(), Activation::Linear);

        let one_hot = PipelineConfig { encoding: Encoding::OneHot, ..Default::default() };
        assert_eq!(one_hot.output_slots().len(), 10);
        assert_eq!(one_hot.resolved_output_activation(), Activation::Sigmoid);
    }

    #[test]
    fn test_end_to_end_run_with_fake_transport() {
        let tmp    = tempfile::tempdir().unwrap();
        let images = encode_images(2, 2, &marked_images(30, 4));
        let labels = encode_labels(&(0..30).map(|i| (i % 10) as u8).collect::<Vec<_>>());
        let transport = FakeTransport::serving(&[
            ("train-images-idx3-ubyte.gz", images.as_slice()),
            ("train-labels-idx1-ubyte.gz", labels.as_slice()),
            ("t10k-images-idx3-ubyte.gz", images.as_slice()),
            ("t10k-labels-idx1-ubyte.gz", labels.as_slice()),
        ]);

        let cfg = PipelineConfig { encoding: Encoding::OneHot, train: true, sample_cap: Some(9), ..small_config(tmp.path()) };
        let use_case = PipelineUseCase::new(cfg.clone());
        let meta     = use_case.execute_with(transport).unwrap();

        // capped to 10 + 6 sessions
        assert_eq!(meta.training_sessions.len(), 10);
        assert_eq!(meta.testing_sessions.len(), 6);
        assert_eq!(meta.total_neurons, 4 + 3 + 10);
        assert!(meta.training_sessions.iter().all(|s| s.learned));

        let saved = MetadataStore::new(&cfg.metadata_dir).load_metadata().unwrap();
        assert_eq!(saved, meta);

        // second run is served entirely from disk
        let again = use_case.execute_with(FakeTransport::default()).unwrap();
        assert_eq!(again.testing_sessions, meta.testing_sessions);
    }

    #[test]
    fn test_fetch_failure_names_the_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = small_config(tmp.path());
        let err = PipelineUseCase::new(cfg.clone()).fetch_with(FakeTransport::default()).unwrap_err();
        assert!(format!("{err:#}").contains(&cfg.data_dir));
    }
}
