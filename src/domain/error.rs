// ============================================================
// Layer 3 — Pipeline Error Taxonomy
// ============================================================
// Every failure in the ingestion pipeline is fatal. There is
// no partial-success mode: either we end up with a complete,
// index-aligned sample store and a metric record, or the run
// stops with a diagnostic naming the stage and the file.
//
//   FormatError    → the binary archive header or length is wrong
//   PipelineError  → wraps FormatError with the offending path,
//                    plus transport, decompression, filesystem
//                    and engine failures
//
// The application layer converts these into anyhow errors
// with extra context, so the CLI prints the whole chain.

use std::path::PathBuf;
use thiserror::Error;

/// A binary archive is inconsistent with its own header.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("file is too short to hold a header ({len} bytes, need {needed})")]
    TruncatedHeader { len: usize, needed: usize },

    #[error("incorrect magic number {found:#010x} != {expected:#010x}")]
    BadMagic { expected: u32, found: u32 },

    #[error("header dimensions overflow ({count} images of {rows}x{cols})")]
    HeaderOverflow { count: usize, rows: usize, cols: usize },

    #[error("header declares {expected} payload bytes but file holds {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("image archive holds {images} samples but label archive holds {labels}")]
    CountMismatch { images: usize, labels: usize },
}

/// Fatal pipeline failures, each tagged with the stage that raised it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("decode '{}': {source}", .path.display())]
    Format {
        path:   PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("download '{url}' to '{}': {message}", .path.display())]
    Transport {
        url:     String,
        path:    PathBuf,
        message: String,
    },

    #[error("decompress '{}': {source}", .path.display())]
    Decompress {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("filesystem '{}': {source}", .path.display())]
    Filesystem {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write image '{}': {source}", .path.display())]
    ImageWrite {
        path:   PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("manifest '{}': {source}", .path.display())]
    Manifest {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("sample index {index} out of range for store of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("learning engine: {0}")]
    Engine(String),
}

impl PipelineError {
    /// Shorthand for wrapping an io::Error with the path it touched.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem { path: path.into(), source }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
