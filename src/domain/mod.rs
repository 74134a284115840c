// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that define what the
// pipeline works with. Nothing here touches the network or
// the filesystem.
//
// Rules for this layer:
//   - NO HTTP or gzip code
//   - NO model math
//   - Only data types, their invariants, and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

/// Fatal error taxonomy for every stage
pub mod error;

/// Archive descriptors, decoded samples, manifest rows
pub mod sample;

/// Training sessions and their tagged input/output slots
pub mod session;

/// Metric record and run-wide metadata
pub mod metrics;

/// Seams to the learning engine and the network transport
pub mod traits;
