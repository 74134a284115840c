// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The pipeline talks to two external collaborators, and it
// only ever does so through these traits:
//
//   LearningEngine → the model: inference and optional training
//   Transport      → the network: fetch one remote file
//
// Programming against traits keeps the data layer testable
// without a network or a real model. Tests plug in fakes that
// count calls or return canned predictions.

use std::path::Path;

use crate::domain::error::PipelineResult;
use crate::domain::session::{InputVariables, Prediction, TrainingSession};

// ─── LearningEngine ───────────────────────────────────────────────────────────
/// Anything that can turn a session's inputs into output slot values.
///
/// Implementations:
///   - FeedForwardEngine → small dense network in `ml::network`
pub trait LearningEngine {
    /// Predict output slot values for one input.
    /// Must accept both raw-byte and normalised-vector inputs.
    fn infer(&self, input: &InputVariables) -> PipelineResult<Prediction>;

    /// Train a single layer on the given sessions.
    /// The engine may push layer states onto each session
    /// and mark it as learned.
    fn train_layer(&mut self, layer_index: usize, sessions: &mut [TrainingSession]) -> PipelineResult<()>;
}

// ─── Transport ────────────────────────────────────────────────────────────────
/// Fetches a remote file to a local path.
///
/// Implementations:
///   - HttpTransport → blocking HTTP GET via reqwest
pub trait Transport {
    fn download(&self, dest: &Path, url: &str) -> PipelineResult<()>;
}
