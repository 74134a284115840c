// ============================================================
// Layer 4 — Sample Normalizer
// ============================================================
// Turns one raw (image bytes, label byte) pair into the
// representation the learning engine consumes. Two encodings
// exist and exactly one is active for a whole run:
//
//   ScalarLabel → input  {"image": raw bytes}
//                 output {"label": label as f64}
//
//   OneHot      → input  {"input": pixel / 255.0 for each pixel}
//                 output one slot per class, 1.0 on the true
//                 class and 0.0 everywhere else
//
// The divisor is the same fixed 255.0 for every pixel of every
// sample. There is no per-image rescaling, so a given byte
// always maps to the same float.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::session::{ExpectedOutput, InputVariables};

/// Number of digit classes
pub const NUM_CLASSES: usize = 10;

const PIXEL_SCALE: f64 = 255.0;

/// Which session encoding the run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Raw bytes in, scalar label out
    #[default]
    ScalarLabel,
    /// Normalised pixels in, one-hot class vector out
    OneHot,
}

/// Map one raw byte onto [0.0, 1.0].
pub fn normalize_pixel(pixel: u8) -> f64 {
    f64::from(pixel) / PIXEL_SCALE
}

/// One-hot vector of length `classes` for `label`.
/// A label outside the class range yields all zeros.
pub fn one_hot(label: u8, classes: usize) -> Vec<f64> {
    let mut targets = vec![0.0; classes];
    if let Some(slot) = targets.get_mut(label as usize) {
        *slot = 1.0;
    }
    targets
}

/// Encode one sample under the given encoding.
pub fn encode(encoding: Encoding, image: &[u8], label: u8) -> (InputVariables, ExpectedOutput) {
    match encoding {
        Encoding::ScalarLabel => (
            InputVariables::Image(image.to_vec()),
            ExpectedOutput::Label(f64::from(label)),
        ),
        Encoding::OneHot => (
            InputVariables::Input(image.iter().map(|&p| normalize_pixel(p)).collect()),
            ExpectedOutput::OneHot(one_hot(label, NUM_CLASSES)),
        ),
    }
}
