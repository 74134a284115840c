// ============================================================
// Layer 6 — Derived Sample Cache
// ============================================================
// Materialises a human-inspectable copy of the dataset:
//
//   {cache_dir}/
//     images/00000.png      ← one greyscale PNG per sample
//     images/00001.png
//     ...
//     mnist_data.json       ← [{index, image_path, label}, ...]
//
// The manifest and the image files must agree. The cache is
// valid only if the manifest parses AND every image it lists
// exists. Anything less counts as "no cache", and the whole
// thing is rebuilt from scratch, never patched.
//
// With a valid cache nothing is fetched or written: samples
// are decoded straight from the already-unpacked archives.
//
// The manifest is written to a temp file and renamed into
// place, so a reader sees either every entry or none.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use image::error::{ImageError, ParameterError, ParameterErrorKind};
use image::{GrayImage, ImageFormat};

use crate::data::decoder::load_sample_store;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::{ArchiveDescriptor, ManifestEntry, RawSampleStore};
use crate::domain::traits::Transport;
use crate::infra::acquisition::{Acquirer, TRAIN_IMAGES, TRAIN_LABELS};

pub const MANIFEST_FILE: &str = "mnist_data.json";
pub const IMAGES_DIR: &str = "images";

/// On-disk cache of per-sample images plus a JSON manifest.
pub struct DerivedCache {
    cache_dir: PathBuf,
    images:    ArchiveDescriptor,
    labels:    ArchiveDescriptor,
}

impl DerivedCache {
    /// Cache over the training-split archives.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self::for_archives(cache_dir, TRAIN_IMAGES, TRAIN_LABELS)
    }

    pub fn for_archives(
        cache_dir: impl Into<PathBuf>,
        images:    ArchiveDescriptor,
        labels:    ArchiveDescriptor,
    ) -> Self {
        Self { cache_dir: cache_dir.into(), images, labels }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.cache_dir.join(MANIFEST_FILE)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.cache_dir.join(IMAGES_DIR)
    }

    /// Return the raw sample store, building the derived cache first if it is absent.
    pub fn ensure<T: Transport>(&self, acquirer: &Acquirer<T>) -> PipelineResult<RawSampleStore> {
        let images_path = acquirer.decompressed_path(&self.images);
        let labels_path = acquirer.decompressed_path(&self.labels);

        // Step 1: a valid cache only needs the archives decoded again
        if self.is_valid() {
            tracing::info!("Sample cache already exists. Skipping image generation and manifest creation.");
            return load_sample_store(&images_path, &labels_path);
        }

        // Step 2: partial caches are never patched, start from nothing
        self.clear()?;
        let images_dir = self.images_dir();
        fs::create_dir_all(&images_dir).map_err(|e| PipelineError::fs(&images_dir, e))?;

        // Step 3: archives on disk, then decode
        acquirer.ensure_available()?;
        let store = load_sample_store(&images_path, &labels_path)?;

        // Step 4: images first, manifest last, so a crash leaves no manifest behind
        let entries = self.write_images(&store)?;
        self.write_manifest(&entries)?;

        tracing::info!("Sample cache completed: {} images and labels saved.", entries.len());
        Ok(store)
    }

    /// Read the manifest back. Paths are relative to the cache directory.
    pub fn read_manifest(&self) -> PipelineResult<Vec<ManifestEntry>> {
        let path = self.manifest_path();
        let file = File::open(&path).map_err(|e| PipelineError::fs(&path, e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|source| PipelineError::Manifest { path, source })
    }

    /// Manifest parses and every image it references exists.
    pub fn is_valid(&self) -> bool {
        if !self.manifest_path().exists() {
            return false;
        }
        match self.read_manifest() {
            Ok(entries) => {
                let missing = entries
                    .iter()
                    .find(|e| !self.cache_dir.join(&e.image_path).exists());
                if let Some(entry) = missing {
                    tracing::warn!(
                        "Cached image '{}' is missing, rebuilding the whole cache",
                        entry.image_path
                    );
                    return false;
                }
                true
            }
            Err(e) => {
                tracing::warn!("Unreadable manifest ({}), rebuilding the whole cache", e);
                false
            }
        }
    }

    /// Remove every derived artifact so a rebuild starts clean.
    fn clear(&self) -> PipelineResult<()> {
        let manifest = self.manifest_path();
        if manifest.exists() {
            fs::remove_file(&manifest).map_err(|e| PipelineError::fs(&manifest, e))?;
        }
        let images_dir = self.images_dir();
        if images_dir.exists() {
            fs::remove_dir_all(&images_dir).map_err(|e| PipelineError::fs(&images_dir, e))?;
        }
        Ok(())
    }

    fn write_images(&self, store: &RawSampleStore) -> PipelineResult<Vec<ManifestEntry>> {
        let (rows, cols) = store.dimensions();
        let labels       = store.int_labels();

        let mut entries = Vec::with_capacity(store.len());
        for (index, (pixels, label)) in store.images().iter().zip(labels).enumerate() {
            let relative = format!("{IMAGES_DIR}/{index:05}.png");
            let path     = self.cache_dir.join(&relative);
            write_png(&path, cols, rows, pixels)?;
            entries.push(ManifestEntry { index, image_path: relative, label });
        }
        Ok(entries)
    }

    fn write_manifest(&self, entries: &[ManifestEntry]) -> PipelineResult<()> {
        let path = self.manifest_path();
        let tmp  = path.with_extension("json.tmp");

        let file       = File::create(&tmp).map_err(|e| PipelineError::fs(&tmp, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, entries)
            .map_err(|source| PipelineError::Manifest { path: tmp.clone(), source })?;
        writer.flush().map_err(|e| PipelineError::fs(&tmp, e))?;
        drop(writer);

        fs::rename(&tmp, &path).map_err(|e| PipelineError::fs(&path, e))
    }
}

fn write_png(path: &Path, width: usize, height: usize, pixels: &[u8]) -> PipelineResult<()> {
    let img = GrayImage::from_raw(width as u32, height as u32, pixels.to_vec()).ok_or_else(|| {
        PipelineError::ImageWrite {
            path:   path.to_path_buf(),
            source: ImageError::Parameter(ParameterError::from_kind(ParameterErrorKind::DimensionMismatch)),
        }
    })?;
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|source| PipelineError::ImageWrite { path: path.to_path_buf(), source })
}
