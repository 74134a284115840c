// ============================================================
// Layer 3 — Metric Record and Run Metadata
// ============================================================
// MetricRecord is the six-value result of evaluating one set
// of sessions. RunMetadata is the single owner of run history:
// the network shape, the tuning knobs, the last-run metrics
// for both subsets, and the session lists they came from.
//
// Metrics are last-run-wins: each evaluation overwrites the
// previous values, nothing accumulates across runs.

use serde::{Deserialize, Serialize};

use crate::domain::session::TrainingSession;

/// Outcome of evaluating one subset under the three tolerances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// % of sessions whose predicted class equals the true class
    pub exact_accuracy:         f64,
    /// % of sessions whose mean deviation is within the generous band
    pub generous_accuracy:      f64,
    /// % of sessions whose every slot is within the forgiveness threshold
    pub forgiveness_accuracy:   f64,
    pub exact_error_count:      usize,
    pub average_generous_error: f64,
    pub forgiveness_error_count: usize,
    /// Number of sessions evaluated
    pub total:                  usize,
}

/// Mutable record of one run: network shape, knobs and results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub model_id:     String,
    pub project_name: String,

    pub total_neurons: usize,
    pub total_layers:  usize,

    pub forgiveness_threshold: f64,
    pub bias_adjustment:       f64,
    pub weight_adjustment:     f64,

    pub last_training_accuracy:             f64,
    pub last_training_accuracy_generous:    f64,
    pub last_training_accuracy_forgiveness: f64,
    pub last_training_exact_error_count:    usize,
    pub last_training_average_generous_error: f64,
    pub last_training_forgiveness_error_count: usize,

    pub last_test_accuracy:             f64,
    pub last_test_accuracy_generous:    f64,
    pub last_test_accuracy_forgiveness: f64,
    pub last_test_exact_error_count:    usize,
    pub last_test_average_generous_error: f64,
    pub last_test_forgiveness_error_count: usize,

    pub training_sessions: Vec<TrainingSession>,
    pub testing_sessions:  Vec<TrainingSession>,
}

impl RunMetadata {
    /// Overwrite the last-run metrics and snapshot both session lists.
    pub fn record_evaluation(
        &mut self,
        training: &MetricRecord,
        testing:  &MetricRecord,
        training_sessions: &[TrainingSession],
        testing_sessions:  &[TrainingSession],
    ) {
        self.last_training_accuracy                = training.exact_accuracy;
        self.last_training_accuracy_generous       = training.generous_accuracy;
        self.last_training_accuracy_forgiveness    = training.forgiveness_accuracy;
        self.last_training_exact_error_count       = training.exact_error_count;
        self.last_training_average_generous_error  = training.average_generous_error;
        self.last_training_forgiveness_error_count = training.forgiveness_error_count;

        self.last_test_accuracy                = testing.exact_accuracy;
        self.last_test_accuracy_generous       = testing.generous_accuracy;
        self.last_test_accuracy_forgiveness    = testing.forgiveness_accuracy;
        self.last_test_exact_error_count       = testing.exact_error_count;
        self.last_test_average_generous_error  = testing.average_generous_error;
        self.last_test_forgiveness_error_count = testing.forgiveness_error_count;

        self.training_sessions = training_sessions.to_vec();
        self.testing_sessions  = testing_sessions.to_vec();
    }
}
