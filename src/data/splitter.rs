// ============================================================
// Layer 4 — Train/Test Partitioner
// ============================================================
// Splits the ordered sample sequence into two sets:
//   - Training set: samples [0, split_index)
//   - Testing set:  samples [split_index, total)
//
// split_index = floor(0.8 * total)
//
// The split is POSITIONAL. No shuffling and no stratification,
// so repeated runs over the same archives always produce the
// same partition. Class balance across the two sets is
// whatever the archive order gives us.
//
// Optional cap:
//   For fast iteration a cap K keeps at most K+1 sessions per
//   subset (local index <= K). This truncates silently and is
//   never an error. Downstream sizes simply differ between
//   capped and uncapped runs, and the cap is logged so the two
//   are never confused.
//
// Reference: Rust Book §8 (Vectors)
//            Rust Book §13 (Iterators)

use crate::data::session_builder::SessionBuilder;
use crate::domain::error::PipelineResult;
use crate::domain::sample::RawSampleStore;
use crate::domain::session::TrainingSession;

/// Fraction of samples that go to the training set
pub const TRAIN_FRACTION: f64 = 0.8;

/// Training and testing sessions, each in archive order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split {
    pub train: Vec<TrainingSession>,
    pub test:  Vec<TrainingSession>,
}

impl Split {
    /// Total sessions across both subsets
    pub fn len(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty() && self.test.is_empty()
    }
}

/// Index of the first testing sample: floor(0.8 * total).
pub fn split_index(total: usize) -> usize {
    ((total as f64) * TRAIN_FRACTION).floor() as usize
}

/// Keep at most `cap + 1` items of a range when a cap is set.
fn capped(range: std::ops::Range<usize>, cap: Option<usize>) -> std::ops::Range<usize> {
    match cap {
        Some(k) => range.start..range.end.min(range.start.saturating_add(k).saturating_add(1)),
        None => range,
    }
}

/// Partition every sample in `store` into training and testing sessions.
pub fn partition(
    store:   &RawSampleStore,
    builder: &SessionBuilder,
    cap:     Option<usize>,
) -> PipelineResult<Split> {
    let total    = store.len();
    let split_at = split_index(total);

    tracing::info!("Total images: {}", total);
    tracing::info!("80% of images (training set): {}", split_at);
    tracing::info!("20% of images (testing set): {}", total - split_at);

    let train_range = capped(0..split_at, cap);
    let test_range  = capped(split_at..total, cap);

    if let Some(k) = cap {
        tracing::warn!(
            "Session cap {} active: keeping {} training and {} testing samples",
            k,
            train_range.len(),
            test_range.len()
        );
    }

    let train = train_range
        .map(|i| builder.build(store, i))
        .collect::<PipelineResult<Vec<_>>>()?;
    let test = test_range
        .map(|i| builder.build(store, i))
        .collect::<PipelineResult<Vec<_>>>()?;

    tracing::info!("Training sessions count: {}", train.len());
    tracing::info!("Testing sessions count: {}", test.len());

    Ok(Split { train, test })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalizer::Encoding;
    use crate::domain::sample::ImageSet;
    use crate::domain::session::ExpectedOutput;

    /// Store whose labels encode the sample index (mod 256).
    fn store(n: usize) -> RawSampleStore {
        let images = ImageSet { rows: 1, cols: 1, images: (0..n).map(|i| vec![i as u8]).collect() };
        RawSampleStore::new(images, (0..n).map(|i| i as u8).collect()).unwrap()
    }

    fn labels(sessions: &[TrainingSession]) -> Vec<f64> {
        sessions
            .iter()
            .map(|s| match s.expected_output {
                ExpectedOutput::Label(v) => v,
                ExpectedOutput::OneHot(_) => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_split_index_floors() {
        assert_eq!(split_index(1000), 800);
        assert_eq!(split_index(9), 7);
        assert_eq!(split_index(1), 0);
        assert_eq!(split_index(0), 0);
    }

    #[test]
    fn test_thousand_sample_split() {
        let builder = SessionBuilder::new(Encoding::ScalarLabel);
        let split   = partition(&store(1000), &builder, None).unwrap();
        assert_eq!(split.train.len(), 800);
        assert_eq!(split.test.len(), 200);
        assert_eq!(split.len(), 1000);
    }

    #[test]
    fn test_split_is_deterministic_and_ordered() {
        let builder = SessionBuilder::new(Encoding::ScalarLabel);
        let s       = store(20);
        let first   = partition(&s, &builder, None).unwrap();
        let second  = partition(&s, &builder, None).unwrap();
        assert_eq!(first, second);

        // Concatenation reproduces the full sequence in order
        let mut all = labels(&first.train);
        all.extend(labels(&first.test));
        let expected: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_cap_truncates_each_subset() {
        let builder = SessionBuilder::new(Encoding::ScalarLabel);
        let split   = partition(&store(100), &builder, Some(4)).unwrap();
        assert_eq!(labels(&split.train), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(labels(&split.test), vec![80.0, 81.0, 82.0, 83.0, 84.0]);
    }

    #[test]
    fn test_cap_larger_than_subset_is_noop() {
        let builder = SessionBuilder::new(Encoding::ScalarLabel);
        let split   = partition(&store(10), &builder, Some(usize::MAX)).unwrap();
        assert_eq!(split.train.len(), 8);
        assert_eq!(split.test.len(), 2);
    }

    #[test]
    fn test_empty_dataset() {
        let builder = SessionBuilder::new(Encoding::OneHot);
        let split   = partition(&store(0), &builder, None).unwrap();
        assert!(split.is_empty());
    }
}
