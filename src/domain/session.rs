// ============================================================
// Layer 3 — Training Session Domain Types
// ============================================================
// A TrainingSession is one sample packaged for the learning
// engine:
//
//   input_variables     → what the engine sees
//   expected_output     → what the engine should answer
//   saved_layer_states  → snapshots pushed by the engine while
//                         training (empty at creation)
//   learned             → set by the engine once trained
//
// Inputs and outputs are tagged enums rather than loose
// string → any maps, so every consumer matches exhaustively
// on the encoding that is actually active.
//
// Serialised form keeps the familiar slot names:
//   {"image": [..]}  or  {"input": [..]}
//   {"label": 3.0}   or  {"one_hot": [0.0, .., 1.0, ..]}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Engine output: output slot name → numeric value.
pub type Prediction = BTreeMap<String, f64>;

/// Slot name used by the scalar-label encoding.
pub const LABEL_SLOT: &str = "label";

/// Input side of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputVariables {
    /// Raw, unnormalised pixel bytes
    #[serde(rename = "image")]
    Image(Vec<u8>),

    /// Flattened pixels scaled into [0.0, 1.0]
    #[serde(rename = "input")]
    Input(Vec<f64>),
}

impl InputVariables {
    /// The named input slot this variant fills
    pub fn slot_name(&self) -> &'static str {
        match self {
            InputVariables::Image(_) => "image",
            InputVariables::Input(_) => "input",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            InputVariables::Image(bytes) => bytes.len(),
            InputVariables::Input(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values as floats. Raw bytes are widened without scaling.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            InputVariables::Image(bytes) => bytes.iter().map(|&b| f64::from(b)).collect(),
            InputVariables::Input(values) => values.clone(),
        }
    }
}

/// Target side of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpectedOutput {
    #[serde(rename = "label")]
    Label(f64),

    #[serde(rename = "one_hot")]
    OneHot(Vec<f64>),
}

impl ExpectedOutput {
    /// Output slots as (name, target) pairs in class order.
    /// One-hot slots are named by their class index: "0".."9".
    pub fn slots(&self) -> Vec<(String, f64)> {
        match self {
            ExpectedOutput::Label(value) => vec![(LABEL_SLOT.to_string(), *value)],
            ExpectedOutput::OneHot(targets) => targets
                .iter()
                .enumerate()
                .map(|(class, &t)| (class.to_string(), t))
                .collect(),
        }
    }

    /// The true class this target encodes
    pub fn class(&self) -> usize {
        match self {
            ExpectedOutput::Label(value) => value.round().max(0.0) as usize,
            ExpectedOutput::OneHot(targets) => argmax(targets),
        }
    }
}

/// Index of the largest value; the first one wins on ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Intermediate activations the engine captured for one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerState {
    pub layer_index: usize,
    pub activations: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub input_variables:    InputVariables,
    pub expected_output:    ExpectedOutput,
    pub saved_layer_states: Vec<LayerState>,
    pub learned:            bool,
}

impl TrainingSession {
    /// A fresh, untrained session.
    pub fn new(input_variables: InputVariables, expected_output: ExpectedOutput) -> Self {
        Self {
            input_variables,
            expected_output,
            saved_layer_states: Vec::new(),
            learned:            false,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot_slots_named_by_class() {
        let out = ExpectedOutput::OneHot(vec![0.0, 0.0, 1.0]);
        let slots = out.slots();
        assert_eq!(slots[2], ("2".to_string(), 1.0));
        assert_eq!(out.class(), 2);
    }

    #[test]
    fn test_serialised_slot_names() {
        let session = TrainingSession::new(
            InputVariables::Image(vec![1, 2]),
            ExpectedOutput::Label(4.0),
        );
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["input_variables"]["image"], serde_json::json!([1, 2]));
        assert_eq!(json["expected_output"]["label"], serde_json::json!(4.0));
        assert_eq!(json["learned"], serde_json::json!(false));
    }

    #[test]
    fn test_argmax_first_wins_on_tie() {
        assert_eq!(argmax(&[0.5, 0.9, 0.9]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
