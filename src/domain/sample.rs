// ============================================================
// Layer 3 — Sample Domain Types
// ============================================================
// The raw material of the pipeline:
//
//   ArchiveDescriptor → which remote file maps to which local files
//   RawSampleStore    → decoded images + labels, index aligned
//   ManifestEntry     → one row of the on-disk derived cache index
//
// The store is the only place images and labels live together,
// and its constructor is the only way to build one, so the
// invariant `images.len() == labels.len()` always holds.

use serde::{Deserialize, Serialize};

use crate::domain::error::FormatError;

/// Static description of one compressed archive on the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    /// File name under the remote base URL
    pub remote_name:       &'static str,
    /// Where the gzip file is stored locally
    pub compressed_name:   &'static str,
    /// Where the unpacked IDX file is stored locally
    pub decompressed_name: &'static str,
}

/// Decoded image archive: `count` buffers of `rows * cols` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSet {
    pub rows:   usize,
    pub cols:   usize,
    pub images: Vec<Vec<u8>>,
}

/// Index-aligned images and labels in source archive order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSampleStore {
    rows:   usize,
    cols:   usize,
    images: Vec<Vec<u8>>,
    labels: Vec<u8>,
}

impl RawSampleStore {
    /// Pair a decoded image set with its labels.
    /// Fails if the two archives disagree on the sample count.
    pub fn new(images: ImageSet, labels: Vec<u8>) -> Result<Self, FormatError> {
        if images.images.len() != labels.len() {
            return Err(FormatError::CountMismatch {
                images: images.images.len(),
                labels: labels.len(),
            });
        }
        Ok(Self {
            rows:   images.rows,
            cols:   images.cols,
            images: images.images,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// The (image, label) pair at `index`, if it exists.
    pub fn get(&self, index: usize) -> Option<(&[u8], u8)> {
        let image = self.images.get(index)?;
        let label = *self.labels.get(index)?;
        Some((image.as_slice(), label))
    }

    pub fn images(&self) -> &[Vec<u8>] {
        &self.images
    }

    /// Labels widened to plain integers, as written to the manifest.
    pub fn int_labels(&self) -> Vec<u32> {
        self.labels.iter().map(|&l| u32::from(l)).collect()
    }
}

/// One manifest row: sample index → image file → label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub index:      usize,
    pub image_path: String,
    pub label:      u32,
}
