// ============================================================
// Layer 5 — Three-Tier Evaluator
// ============================================================
// Scores a set of sessions against the engine's predictions
// under three criteria, each more lenient than the last:
//
//   Exact       → predicted class == true class
//                 (argmax for one-hot, rounded value for a
//                 scalar label)
//
//   Generous    → mean scaled deviation over the output slots
//                 is within `generous_tolerance`
//                 deviation(slot) = |p - e| / max(|e|, 1.0)
//
//   Forgiveness → EVERY slot satisfies
//                 |p - e| <= forgiveness_threshold * max(|e|, 1.0)
//
// accuracy = 100 * correct / total, or 0.0 for an empty set.
// A prediction missing a slot counts as 0.0 for that slot.
// A non-finite prediction fails all three tiers and records a
// full-scale deviation of 1.0.
//
// Evaluation is read-only: sessions and engine are borrowed
// immutably, and the result goes back as a MetricRecord for
// the caller to store in RunMetadata.

use crate::domain::error::PipelineResult;
use crate::domain::metrics::MetricRecord;
use crate::domain::session::{argmax, ExpectedOutput, Prediction, TrainingSession};
use crate::domain::traits::LearningEngine;

/// Default band for the generous tier, in scaled deviation units
pub const DEFAULT_GENEROUS_TOLERANCE: f64 = 0.25;

/// Default fraction of the target scale a forgiven error may reach
pub const DEFAULT_FORGIVENESS_THRESHOLD: f64 = 0.8;

/// Per-session verdict under the three tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Verdict {
    exact:       bool,
    deviation:   f64,
    forgiven:    bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    forgiveness_threshold: f64,
    generous_tolerance:    f64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_FORGIVENESS_THRESHOLD, DEFAULT_GENEROUS_TOLERANCE)
    }
}

impl Evaluator {
    pub fn new(forgiveness_threshold: f64, generous_tolerance: f64) -> Self {
        Self { forgiveness_threshold, generous_tolerance }
    }

    /// Run inference on every session and tally the three tiers.
    pub fn evaluate<E>(&self, engine: &E, sessions: &[TrainingSession]) -> PipelineResult<MetricRecord>
    where
        E: LearningEngine + ?Sized,
    {
        let mut exact_correct    = 0usize;
        let mut generous_correct = 0usize;
        let mut forgiven_correct = 0usize;
        let mut deviation_sum    = 0.0f64;

        for session in sessions {
            let prediction = engine.infer(&session.input_variables)?;
            let verdict    = self.judge(&session.expected_output, &prediction);

            if verdict.exact {
                exact_correct += 1;
            }
            if verdict.deviation <= self.generous_tolerance {
                generous_correct += 1;
            }
            if verdict.forgiven {
                forgiven_correct += 1;
            }
            deviation_sum += verdict.deviation;
        }

        // Empty sets report 0% rather than dividing by zero
        let total = sessions.len();
        let record = MetricRecord {
            exact_accuracy:          percentage(exact_correct, total),
            generous_accuracy:       percentage(generous_correct, total),
            forgiveness_accuracy:    percentage(forgiven_correct, total),
            exact_error_count:       total - exact_correct,
            average_generous_error:  if total > 0 { deviation_sum / total as f64 } else { 0.0 },
            forgiveness_error_count: total - forgiven_correct,
            total,
        };
        Ok(record)
    }

    fn judge(&self, expected: &ExpectedOutput, prediction: &Prediction) -> Verdict {
        // Line the prediction up with the expected slots; absent slots read as 0.0
        let slots = expected.slots();
        let predicted: Vec<f64> = slots
            .iter()
            .map(|(name, _)| prediction.get(name).copied().unwrap_or(0.0))
            .collect();

        // NaN or infinity cannot pass any tier
        if predicted.iter().any(|p| !p.is_finite()) {
            return Verdict { exact: false, deviation: 1.0, forgiven: false };
        }

        // Exact tier: the class the engine committed to
        let predicted_class = match expected {
            ExpectedOutput::Label(_) => predicted.first().map_or(0, |p| p.round().max(0.0) as usize),
            ExpectedOutput::OneHot(_) => argmax(&predicted),
        };

        // Generous and forgiveness tiers share the scaled per-slot error
        let mut deviation_sum = 0.0;
        let mut forgiven      = true;
        for ((_, target), p) in slots.iter().zip(&predicted) {
            let scale = target.abs().max(1.0);
            let error = (p - target).abs();
            deviation_sum += error / scale;
            if error > self.forgiveness_threshold * scale {
                forgiven = false;
            }
        }
        let deviation = if slots.is_empty() { 0.0 } else { deviation_sum / slots.len() as f64 };

        Verdict {
            exact: predicted_class == expected.class(),
            deviation,
            forgiven,
        }
    }
}

fn percentage(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * correct as f64 / total as f64
    }
}
