// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the network or the disk:
//
//   acquisition.rs    — Archive download and unpacking
//                       Fetches each gzip archive at most once
//                       (existence check only), then gunzips it
//                       next to the compressed file.
//
//   cache.rs          — Derived sample cache
//                       One PNG per sample plus a JSON manifest.
//                       Valid as a whole or rebuilt as a whole;
//                       a valid cache skips materialisation.
//
//   metadata_store.rs — Run metadata persistence
//                       Writes the last-run metrics, sessions
//                       and config as JSON after each run.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling)

/// Archive fetch + gunzip, existence-based idempotency
pub mod acquisition;

/// Per-sample images and manifest
pub mod cache;

/// Run metadata and config JSON
pub mod metadata_store;
