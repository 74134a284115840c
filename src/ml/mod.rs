// ============================================================
// Layer 5 — ML Layer
// ============================================================
// This is the only layer that reasons about model outputs.
//
// What's in this layer:
//
//   network.rs   — Network description and a reference engine
//                  • NetworkConfig: shape, activations, identity
//                  • FeedForwardEngine: seeded dense network that
//                    implements LearningEngine (infer + one-pass
//                    layer training)
//
//   evaluator.rs — Three-tier scoring of sessions
//                  Exact / generous / forgiveness accuracy and
//                  error counts, returned as a MetricRecord
//
// The evaluator only sees the LearningEngine trait, so any
// other engine can be scored the same way.

/// Network configuration and the reference engine
pub mod network;

/// Exact / generous / forgiveness evaluation
pub mod evaluator;
