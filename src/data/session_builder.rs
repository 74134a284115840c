// ============================================================
// Layer 4 — Session Builder
// ============================================================
// Turns one decoded sample into a TrainingSession the engine
// can consume. Every session starts fresh: no saved layer
// states and not yet learned. The encoding is fixed per
// builder, so a whole partition shares one layout.

use crate::data::normalizer::{encode, Encoding};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::RawSampleStore;
use crate::domain::session::TrainingSession;

/// Wraps store samples into fresh training sessions under one encoding.
#[derive(Debug, Clone, Copy)]
pub struct SessionBuilder {
    encoding: Encoding,
}

impl SessionBuilder {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    /// Session for sample `index`: no saved states, not learned.
    pub fn build(&self, store: &RawSampleStore, index: usize) -> PipelineResult<TrainingSession> {
        let (image, label) = store
            .get(index)
            .ok_or(PipelineError::IndexOutOfRange { index, len: store.len() })?;
        let (input, expected) = encode(self.encoding, image, label);
        Ok(TrainingSession::new(input, expected))
    }
}
