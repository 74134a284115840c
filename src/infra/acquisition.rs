// ============================================================
// Layer 6 — Archive Acquisition
// ============================================================
// Makes sure the four dataset archives are present and
// unpacked in the data directory, fetching each one at most
// once per machine.
//
// Per archive:
//   1. decompressed file exists?  → skip entirely
//   2. compressed file missing?   → download it
//   3. gunzip compressed → decompressed (via a .part file,
//      renamed into place only once fully written)
//
// The compressed file is left on disk after unpacking.
//
// Validation is EXISTENCE-based, not checksum-based: a partial
// or corrupted file that merely exists is treated as valid and
// will surface later as a FormatError from the decoder. Delete
// the file to force a refetch.
//
// The HTTP fetch has no timeout and nothing is retried. A
// failed download or unpack aborts the run before any decoding.
//
// Reference: flate2 crate documentation (GzDecoder)
//            reqwest crate documentation (blocking client)

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::sample::ArchiveDescriptor;
use crate::domain::traits::Transport;

/// Remote location of the dataset archives
pub const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com/cvdf-datasets/mnist/";

pub const TRAIN_IMAGES: ArchiveDescriptor = ArchiveDescriptor {
    remote_name:       "train-images-idx3-ubyte.gz",
    compressed_name:   "train-images-idx3-ubyte.gz",
    decompressed_name: "train-images-idx3-ubyte",
};

pub const TRAIN_LABELS: ArchiveDescriptor = ArchiveDescriptor {
    remote_name:       "train-labels-idx1-ubyte.gz",
    compressed_name:   "train-labels-idx1-ubyte.gz",
    decompressed_name: "train-labels-idx1-ubyte",
};

pub const TEST_IMAGES: ArchiveDescriptor = ArchiveDescriptor {
    remote_name:       "t10k-images-idx3-ubyte.gz",
    compressed_name:   "t10k-images-idx3-ubyte.gz",
    decompressed_name: "t10k-images-idx3-ubyte",
};

pub const TEST_LABELS: ArchiveDescriptor = ArchiveDescriptor {
    remote_name:       "t10k-labels-idx1-ubyte.gz",
    compressed_name:   "t10k-labels-idx1-ubyte.gz",
    decompressed_name: "t10k-labels-idx1-ubyte",
};

/// Every archive a run needs, in fetch order
pub const MNIST_ARCHIVES: [ArchiveDescriptor; 4] = [TRAIN_IMAGES, TRAIN_LABELS, TEST_IMAGES, TEST_LABELS];

/// Sibling path used while a file is being written.
fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

// ─── HttpTransport ────────────────────────────────────────────────────────────
/// Blocking HTTP GET. No timeout: a stalled transfer blocks the run.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> PipelineResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| PipelineError::Transport {
                url:     String::new(),
                path:    PathBuf::new(),
                message: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    fn fetch_to(&self, dest: &Path, url: &str) -> Result<(), String> {
        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;

        let file       = File::create(dest).map_err(|e| e.to_string())?;
        let mut writer = BufWriter::new(file);
        response.copy_to(&mut writer).map_err(|e| e.to_string())?;
        writer.flush().map_err(|e| e.to_string())
    }
}

impl Transport for HttpTransport {
    fn download(&self, dest: &Path, url: &str) -> PipelineResult<()> {
        let tmp = part_path(dest);
        if let Err(message) = self.fetch_to(&tmp, url) {
            let _ = fs::remove_file(&tmp);
            return Err(PipelineError::Transport {
                url: url.to_string(),
                path: dest.to_path_buf(),
                message,
            });
        }
        fs::rename(&tmp, dest).map_err(|e| PipelineError::fs(dest, e))
    }
}

// ─── Decompression ────────────────────────────────────────────────────────────
/// Gunzip `compressed` into `dest`. `dest` only appears once complete.
pub fn decompress(compressed: &Path, dest: &Path) -> PipelineResult<()> {
    let tmp = part_path(dest);

    let result = (|| -> io::Result<()> {
        let input      = File::open(compressed)?;
        let mut reader = GzDecoder::new(BufReader::new(input));
        let mut writer = BufWriter::new(File::create(&tmp)?);
        io::copy(&mut reader, &mut writer)?;
        writer.flush()
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(PipelineError::Decompress { path: compressed.to_path_buf(), source });
    }
    fs::rename(&tmp, dest).map_err(|e| PipelineError::fs(dest, e))
}

// ─── Acquirer ─────────────────────────────────────────────────────────────────
/// Fetches and unpacks archives into a data directory.
pub struct Acquirer<T: Transport> {
    data_dir:  PathBuf,
    base_url:  String,
    archives:  Vec<ArchiveDescriptor>,
    transport: T,
}

impl<T: Transport> Acquirer<T> {
    /// Acquirer for the standard four archives.
    pub fn new(data_dir: impl Into<PathBuf>, base_url: impl Into<String>, transport: T) -> Self {
        Self::with_archives(data_dir, base_url, transport, MNIST_ARCHIVES.to_vec())
    }

    pub fn with_archives(
        data_dir:  impl Into<PathBuf>,
        base_url:  impl Into<String>,
        transport: T,
        archives:  Vec<ArchiveDescriptor>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            base_url: base_url.into(),
            archives,
            transport,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Local path of an archive's unpacked IDX file
    pub fn decompressed_path(&self, archive: &ArchiveDescriptor) -> PathBuf {
        self.data_dir.join(archive.decompressed_name)
    }

    /// Ensure every archive is present and decompressed.
    pub fn ensure_available(&self) -> PipelineResult<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| PipelineError::fs(&self.data_dir, e))?;

        for archive in &self.archives {
            self.ensure_archive(archive)?;
        }
        Ok(())
    }

    fn ensure_archive(&self, archive: &ArchiveDescriptor) -> PipelineResult<()> {
        let decompressed = self.decompressed_path(archive);
        if decompressed.exists() {
            tracing::info!("{} already exists, skipping download", archive.decompressed_name);
            return Ok(());
        }

        let compressed = self.data_dir.join(archive.compressed_name);
        if !compressed.exists() {
            let url = format!("{}{}", self.base_url, archive.remote_name);
            tracing::info!("Downloading {}...", url);
            self.transport.download(&compressed, &url)?;
            tracing::info!("Downloaded {}", archive.compressed_name);
        }

        decompress(&compressed, &decompressed)?;
        tracing::info!("Unpacked {}", archive.decompressed_name);
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    pub(crate) fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    /// Serves canned gzip bodies by file name and records every URL asked for.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        pub bodies: HashMap<String, Vec<u8>>,
        pub calls:  RefCell<Vec<String>>,
    }

    impl FakeTransport {
        pub(crate) fn serving(files: &[(&str, &[u8])]) -> Self {
            let bodies = files
                .iter()
                .map(|(name, raw)| (name.to_string(), gzip(raw)))
                .collect();
            Self { bodies, calls: RefCell::default() }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl Transport for FakeTransport {
        fn download(&self, dest: &Path, url: &str) -> PipelineResult<()> {
            self.calls.borrow_mut().push(url.to_string());
            let name = url.rsplit('/').next().unwrap_or_default();
            match self.bodies.get(name) {
                Some(body) => fs::write(dest, body).map_err(|e| PipelineError::fs(dest, e)),
                None => Err(PipelineError::Transport {
                    url:     url.to_string(),
                    path:    dest.to_path_buf(),
                    message: "404 Not Found".to_string(),
                }),
            }
        }
    }

    fn all_archives() -> FakeTransport {
        FakeTransport::serving(&[
            ("train-images-idx3-ubyte.gz", &b"train images"[..]),
            ("train-labels-idx1-ubyte.gz", &b"train labels"[..]),
            ("t10k-images-idx3-ubyte.gz", &b"test images"[..]),
            ("t10k-labels-idx1-ubyte.gz", &b"test labels"[..]),
        ])
    }

    #[test]
    fn test_first_call_fetches_and_unpacks_everything() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = Acquirer::new(dir.path().join("data"), "https://host/mnist/", all_archives());

        acquirer.ensure_available().unwrap();

        assert_eq!(acquirer.transport().call_count(), 4);
        assert_eq!(
            acquirer.transport().calls.borrow()[0],
            "https://host/mnist/train-images-idx3-ubyte.gz"
        );
        let unpacked = fs::read(acquirer.decompressed_path(&TRAIN_LABELS)).unwrap();
        assert_eq!(unpacked, &b"train labels"[..]);
        // compressed artifact is left in place
        assert!(dir.path().join("data/train-labels-idx1-ubyte.gz").exists());
    }

    #[test]
    fn test_second_call_makes_no_network_calls() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = Acquirer::new(dir.path(), "https://host/", all_archives());

        acquirer.ensure_available().unwrap();
        let after_first = acquirer.transport().call_count();
        acquirer.ensure_available().unwrap();

        assert_eq!(acquirer.transport().call_count(), after_first);
    }

    #[test]
    fn test_preseeded_decompressed_file_is_trusted() {
        let dir = tempfile::tempdir().unwrap();
        // existence is all that is checked, even for garbage
        for archive in MNIST_ARCHIVES {
            fs::write(dir.path().join(archive.decompressed_name), b"not idx").unwrap();
        }
        let acquirer = Acquirer::new(dir.path(), "https://host/", FakeTransport::default());

        acquirer.ensure_available().unwrap();
        assert_eq!(acquirer.transport().call_count(), 0);
    }

    #[test]
    fn test_existing_compressed_file_is_unpacked_without_fetch() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TEST_LABELS.compressed_name), gzip(b"local")).unwrap();
        let acquirer = Acquirer::with_archives(
            dir.path(),
            "https://host/",
            FakeTransport::default(),
            vec![TEST_LABELS],
        );

        acquirer.ensure_available().unwrap();
        assert_eq!(acquirer.transport().call_count(), 0);
        assert_eq!(fs::read(acquirer.decompressed_path(&TEST_LABELS)).unwrap(), b"local");
    }

    #[test]
    fn test_download_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = Acquirer::new(dir.path(), "https://host/", FakeTransport::default());

        let err = acquirer.ensure_available().unwrap_err();
        assert!(matches!(err, PipelineError::Transport { .. }));
        // stops at the first failing archive
        assert_eq!(acquirer.transport().call_count(), 1);
    }

    #[test]
    fn test_corrupt_gzip_is_decompress_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TRAIN_IMAGES.compressed_name), b"definitely not gzip").unwrap();
        let acquirer = Acquirer::with_archives(
            dir.path(),
            "https://host/",
            FakeTransport::default(),
            vec![TRAIN_IMAGES],
        );

        let err = acquirer.ensure_available().unwrap_err();
        assert!(matches!(err, PipelineError::Decompress { .. }));
        assert!(!acquirer.decompressed_path(&TRAIN_IMAGES).exists());
        assert!(!part_path(&acquirer.decompressed_path(&TRAIN_IMAGES)).exists());
    }
}
