// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer takes decompressed IDX archives all the way to
// training sessions ready for the learning engine.
//
// The pipeline flows in this order:
//
//   IDX archives (images + labels)
//       │
//       ▼
//   decoder          → header checks, bytes → RawSampleStore
//       │
//       ▼
//   splitter         → positional 80/20 partition (+ optional cap)
//       │
//       ▼
//   session_builder  → one TrainingSession per retained index
//       │
//       ▼
//   normalizer       → scalar-label or one-hot/normalised slots
//
// Each module is responsible for exactly one step, and none
// of them hold state between calls.
//
// Reference: Rust Book §8 (Collections)
//            Rust Book §13 (Iterators and Closures)

/// Parses IDX image and label archives
pub mod decoder;

/// Converts raw pixels and labels into session slots
pub mod normalizer;

/// Wraps one sample into a fresh TrainingSession
pub mod session_builder;

/// Positional train/test split with optional cap
pub mod splitter;
