// ============================================================
// Layer 4 — Binary Dataset Decoder (IDX format)
// ============================================================
// Parses the fixed-header binary archives the digit dataset
// ships in. All integers are big-endian u32.
//
// Image archive:
//   [magic 0x00000803][count][rows][cols][count*rows*cols bytes]
//
// Label archive:
//   [magic 0x00000801][count][count bytes]
//
// The payload must be EXACTLY the declared size. A short file
// means a truncated download; a long one means the header is
// lying. Either way the dataset is unusable, so both are a
// FormatError and the run stops.
//
// Label failures are fatal exactly like image failures. A
// silently empty label store would misalign every sample.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §8 (Vectors and slices)

use std::fs;
use std::path::Path;

use crate::domain::error::{FormatError, PipelineError, PipelineResult};
use crate::domain::sample::{ImageSet, RawSampleStore};

pub const IMAGE_MAGIC: u32 = 0x0000_0803;
pub const LABEL_MAGIC: u32 = 0x0000_0801;

const IMAGE_HEADER_LEN: usize = 16;
const LABEL_HEADER_LEN: usize = 8;

/// Read the big-endian u32 at word `word` of the header.
/// Callers have already checked the header length.
fn header_u32(bytes: &[u8], word: usize) -> u32 {
    let start = word * 4;
    u32::from_be_bytes([bytes[start], bytes[start + 1], bytes[start + 2], bytes[start + 3]])
}

fn check_header(bytes: &[u8], needed: usize, magic: u32) -> Result<(), FormatError> {
    if bytes.len() < needed {
        return Err(FormatError::TruncatedHeader { len: bytes.len(), needed });
    }
    let found = header_u32(bytes, 0);
    if found != magic {
        return Err(FormatError::BadMagic { expected: magic, found });
    }
    Ok(())
}

/// Decode an image archive into `count` buffers of `rows * cols` bytes.
pub fn decode_images(bytes: &[u8]) -> Result<ImageSet, FormatError> {
    check_header(bytes, IMAGE_HEADER_LEN, IMAGE_MAGIC)?;

    let count = header_u32(bytes, 1) as usize;
    let rows  = header_u32(bytes, 2) as usize;
    let cols  = header_u32(bytes, 3) as usize;

    // The header is untrusted: a product that overflows cannot match any payload
    let size     = rows.checked_mul(cols);
    let expected = size.and_then(|s| s.checked_mul(count));
    let (size, expected) = match (size, expected) {
        (Some(size), Some(expected)) => (size, expected),
        _ => return Err(FormatError::HeaderOverflow { count, rows, cols }),
    };

    let payload = &bytes[IMAGE_HEADER_LEN..];
    if payload.len() != expected {
        return Err(FormatError::LengthMismatch { expected, found: payload.len() });
    }

    // chunks_exact(0) panics, so a zero-sized image gets empty buffers
    let images: Vec<Vec<u8>> = if size == 0 {
        vec![Vec::new(); count]
    } else {
        payload.chunks_exact(size).map(<[u8]>::to_vec).collect()
    };

    if images.len() != count {
        return Err(FormatError::LengthMismatch { expected: count, found: images.len() });
    }

    Ok(ImageSet { rows, cols, images })
}

/// Decode a label archive into one byte per sample.
pub fn decode_labels(bytes: &[u8]) -> Result<Vec<u8>, FormatError> {
    check_header(bytes, LABEL_HEADER_LEN, LABEL_MAGIC)?;

    let count   = header_u32(bytes, 1) as usize;
    let payload = &bytes[LABEL_HEADER_LEN..];
    if payload.len() != count {
        return Err(FormatError::LengthMismatch { expected: count, found: payload.len() });
    }

    Ok(payload.to_vec())
}

fn read_archive(path: &Path) -> PipelineResult<Vec<u8>> {
    fs::read(path).map_err(|e| PipelineError::fs(path, e))
}

pub fn load_images(path: &Path) -> PipelineResult<ImageSet> {
    let bytes = read_archive(path)?;
    decode_images(&bytes).map_err(|source| PipelineError::Format { path: path.to_path_buf(), source })
}

pub fn load_labels(path: &Path) -> PipelineResult<Vec<u8>> {
    let bytes = read_archive(path)?;
    decode_labels(&bytes).map_err(|source| PipelineError::Format { path: path.to_path_buf(), source })
}

/// Decode an image/label archive pair into an index-aligned store.
pub fn load_sample_store(images_path: &Path, labels_path: &Path) -> PipelineResult<RawSampleStore> {
    let images = load_images(images_path)?;
    let labels = load_labels(labels_path)?;

    tracing::debug!(
        "Decoded {} images ({}x{}) and {} labels",
        images.images.len(),
        images.rows,
        images.cols,
        labels.len()
    );

    RawSampleStore::new(images, labels)
        .map_err(|source| PipelineError::Format { path: labels_path.to_path_buf(), source })
}

/// Build an image archive. Every image must be `rows * cols` bytes.
pub fn encode_images(rows: usize, cols: usize, images: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(IMAGE_HEADER_LEN + images.len() * rows * cols);
    out.extend_from_slice(&IMAGE_MAGIC.to_be_bytes());
    out.extend_from_slice(&(images.len() as u32).to_be_bytes());
    out.extend_from_slice(&(rows as u32).to_be_bytes());
    out.extend_from_slice(&(cols as u32).to_be_bytes());
    for image in images {
        debug_assert_eq!(image.len(), rows * cols);
        out.extend_from_slice(image);
    }
    out
}

/// Build a label archive.
pub fn encode_labels(labels: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(LABEL_HEADER_LEN + labels.len());
    out.extend_from_slice(&LABEL_MAGIC.to_be_bytes());
    out.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    out.extend_from_slice(labels);
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// N images of 3x4 whose first pixel is the sample's own label,
    /// so a misaligned pair is easy to spot.
    fn marked_dataset(n: usize) -> (Vec<Vec<u8>>, Vec<u8>) {
        let labels: Vec<u8> = (0..n).map(|i| (i % 10) as u8).collect();
        let images = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let mut img = vec![(i % 251) as u8; 12];
                img[0] = label;
                img
            })
            .collect();
        (images, labels)
    }

    #[test]
    fn test_images_decode_bit_for_bit() {
        let (images, _) = marked_dataset(25);
        let decoded = decode_images(&encode_images(3, 4, &images)).unwrap();
        assert_eq!(decoded.rows, 3);
        assert_eq!(decoded.cols, 4);
        assert_eq!(decoded.images, images);
    }

    #[test]
    fn test_truncated_image_archive_rejected() {
        let (images, _) = marked_dataset(5);
        let mut bytes = encode_images(3, 4, &images);
        bytes.pop();
        assert_eq!(
            decode_images(&bytes).unwrap_err(),
            FormatError::LengthMismatch { expected: 60, found: 59 }
        );
    }

    /// Header for an image archive with the given dimensions and no payload.
    fn image_header(count: u32, rows: u32, cols: u32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(IMAGE_HEADER_LEN);
        for word in [IMAGE_MAGIC, count, rows, cols] {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn test_overflowing_image_header_rejected() {
        let mut bytes = image_header(u32::MAX, u32::MAX, u32::MAX);
        bytes.extend_from_slice(&[0; 8]);
        assert!(matches!(decode_images(&bytes), Err(FormatError::HeaderOverflow { .. })));
    }

    #[test]
    fn test_wrapping_image_header_rejected() {
        // 65536 * 2^24 * 2^24 wraps to zero in 64-bit arithmetic
        let bytes = image_header(1 << 16, 1 << 24, 1 << 24);
        assert_eq!(
            decode_images(&bytes).unwrap_err(),
            FormatError::HeaderOverflow { count: 1 << 16, rows: 1 << 24, cols: 1 << 24 }
        );
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode_labels(&[1, 2, 3]);
        bytes.push(0);
        assert!(matches!(decode_labels(&bytes), Err(FormatError::LengthMismatch { .. })));
    }

    #[test]
    fn test_truncated_label_archive_rejected() {
        let mut bytes = encode_labels(&[1, 2, 3]);
        bytes.pop();
        assert_eq!(
            decode_labels(&bytes).unwrap_err(),
            FormatError::LengthMismatch { expected: 3, found: 2 }
        );
    }

    #[test]
    fn test_magic_is_checked_per_archive_kind() {
        let labels = encode_labels(&[1, 2]);
        assert!(matches!(decode_images(&labels), Err(FormatError::TruncatedHeader { .. })));

        let (images, _) = marked_dataset(2);
        let images = encode_images(3, 4, &images);
        assert_eq!(
            decode_labels(&images).unwrap_err(),
            FormatError::BadMagic { expected: LABEL_MAGIC, found: IMAGE_MAGIC }
        );
    }

    #[test]
    fn test_short_header_rejected() {
        assert_eq!(
            decode_labels(&[0, 0, 8]).unwrap_err(),
            FormatError::TruncatedHeader { len: 3, needed: 8 }
        );
    }

    #[test]
    fn test_store_keeps_index_alignment() {
        let dir = tempfile::tempdir().unwrap();
        let (images, labels) = marked_dataset(40);
        let img_path = dir.path().join("images-idx3-ubyte");
        let lbl_path = dir.path().join("labels-idx1-ubyte");
        fs::write(&img_path, encode_images(3, 4, &images)).unwrap();
        fs::write(&lbl_path, encode_labels(&labels)).unwrap();

        let store = load_sample_store(&img_path, &lbl_path).unwrap();
        assert_eq!(store.len(), 40);
        for i in 0..store.len() {
            let (image, label) = store.get(i).unwrap();
            assert_eq!(image[0], label, "sample {i} is misaligned");
        }
    }

    #[test]
    fn test_label_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (images, labels) = marked_dataset(4);
        let img_path = dir.path().join("images");
        let lbl_path = dir.path().join("labels");
        fs::write(&img_path, encode_images(3, 4, &images)).unwrap();
        let mut lbl = encode_labels(&labels);
        lbl.truncate(lbl.len() - 1);
        fs::write(&lbl_path, lbl).unwrap();

        let err = load_sample_store(&img_path, &lbl_path).unwrap_err();
        match err {
            PipelineError::Format { path, .. } => assert_eq!(path, lbl_path),
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_archive_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_labels(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, PipelineError::Filesystem { .. }));
    }
}
