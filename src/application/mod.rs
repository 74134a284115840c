// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer wires the other layers together into a run.
//
// Rules for this layer:
//   - No decoding, gzip or HTTP code here (Layers 4 and 6)
//   - No model math here (Layer 5)
//   - No argument parsing or printing here (Layer 1)
//   - Only workflow coordination and error context
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// The acquire → cache → split → evaluate workflow
pub mod pipeline_use_case;
