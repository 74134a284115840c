// ============================================================
// Layer 5 — Network Configuration and Reference Engine
// ============================================================
// The pipeline only needs a LearningEngine. This module
// provides the network description and a small engine that
// implements that trait, so the binary can run on its own:
//
//   NetworkConfig     → inputs / hidden / output slots,
//                       output activations, model id, project
//   FeedForwardEngine → one sigmoid hidden layer followed by
//                       the configured output activations,
//                       seeded weights
//
// Layers are indexed by their weight matrices:
//   layer 0 = input  → hidden
//   layer 1 = hidden → output
//
// train_layer runs one delta-rule pass over the sessions,
// touching only the requested layer's weights. Each session
// receives a LayerState snapshot of that layer's activations
// and is marked learned.

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::metrics::RunMetadata;
use crate::domain::session::{InputVariables, LayerState, Prediction, TrainingSession};
use crate::domain::traits::LearningEngine;

const INIT_RANGE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Sigmoid,
    Relu,
    Linear,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Sigmoid => 1.0 / (1.0 + (-z).exp()),
            Activation::Relu => z.max(0.0),
            Activation::Linear => z,
        }
    }

    /// Derivative expressed through the activation's own output.
    fn derivative(self, out: f64) -> f64 {
        match self {
            Activation::Sigmoid => out * (1.0 - out),
            Activation::Relu => if out > 0.0 { 1.0 } else { 0.0 },
            Activation::Linear => 1.0,
        }
    }
}

/// Shape and identity of the network behind a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub inputs:             usize,
    pub hidden:             usize,
    /// One name per output neuron, matching the expected-output slots
    pub output_slots:       Vec<String>,
    pub output_activations: Vec<Activation>,
    pub model_id:           String,
    pub project_name:       String,
}

impl NetworkConfig {
    /// Describe a three-layer network. Fails if the activation list
    /// does not have one entry per output slot.
    pub fn configure(
        inputs:             usize,
        hidden:             usize,
        output_slots:       Vec<String>,
        output_activations: Vec<Activation>,
        model_id:           impl Into<String>,
        project_name:       impl Into<String>,
    ) -> PipelineResult<Self> {
        if output_slots.len() != output_activations.len() {
            return Err(PipelineError::Engine(format!(
                "{} output slots but {} output activations",
                output_slots.len(),
                output_activations.len()
            )));
        }
        Ok(Self {
            inputs,
            hidden,
            output_slots,
            output_activations,
            model_id:     model_id.into(),
            project_name: project_name.into(),
        })
    }

    pub fn outputs(&self) -> usize {
        self.output_slots.len()
    }

    pub fn total_neurons(&self) -> usize {
        self.inputs + self.hidden + self.outputs()
    }

    pub fn total_layers(&self) -> usize {
        3
    }

    /// Fresh run metadata describing this network.
    pub fn metadata(&self, forgiveness_threshold: f64, weight_adjustment: f64, bias_adjustment: f64) -> RunMetadata {
        RunMetadata {
            model_id:      self.model_id.clone(),
            project_name:  self.project_name.clone(),
            total_neurons: self.total_neurons(),
            total_layers:  self.total_layers(),
            forgiveness_threshold,
            weight_adjustment,
            bias_adjustment,
            ..Default::default()
        }
    }
}

/// Dense layer: `weights[out][in]`, one bias per output neuron.
#[derive(Debug, Clone, PartialEq)]
struct Dense {
    weights: Vec<Vec<f64>>,
    biases:  Vec<f64>,
}

impl Dense {
    fn random(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let weights = (0..outputs)
            .map(|_| (0..inputs).map(|_| rng.gen_range(-INIT_RANGE..INIT_RANGE)).collect())
            .collect();
        Self { weights, biases: vec![0.0; outputs] }
    }

    fn pre_activations(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }

    /// Nudge weights and biases along `deltas`.
    fn adjust(&mut self, deltas: &[f64], input: &[f64], weight_rate: f64, bias_rate: f64) {
        for ((row, bias), delta) in self.weights.iter_mut().zip(&mut self.biases).zip(deltas) {
            for (w, x) in row.iter_mut().zip(input) {
                *w += weight_rate * delta * x;
            }
            *bias += bias_rate * delta;
        }
    }
}

/// Activations of one forward pass.
struct Trace {
    input:  Vec<f64>,
    hidden: Vec<f64>,
    output: Vec<f64>,
}

pub struct FeedForwardEngine {
    config:      NetworkConfig,
    hidden:      Dense,
    output:      Dense,
    weight_rate: f64,
    bias_rate:   f64,
}

impl FeedForwardEngine {
    /// Seeded engine: the same seed always yields the same weights.
    pub fn new(config: NetworkConfig, seed: u64, weight_rate: f64, bias_rate: f64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let hidden  = Dense::random(config.inputs, config.hidden, &mut rng);
        let output  = Dense::random(config.hidden, config.outputs(), &mut rng);
        tracing::debug!(
            "Engine '{}' ready: {} → {} → {}",
            config.model_id,
            config.inputs,
            config.hidden,
            config.outputs()
        );
        Self { config, hidden, output, weight_rate, bias_rate }
    }

    fn forward(&self, input: &InputVariables) -> PipelineResult<Trace> {
        if input.len() != self.config.inputs {
            return Err(PipelineError::Engine(format!(
                "'{}' input has {} values, network expects {}",
                input.slot_name(),
                input.len(),
                self.config.inputs
            )));
        }
        let input  = input.to_f64();
        let hidden = self
            .hidden
            .pre_activations(&input)
            .into_iter()
            .map(|z| Activation::Sigmoid.apply(z))
            .collect::<Vec<_>>();
        let output = self
            .output
            .pre_activations(&hidden)
            .into_iter()
            .zip(&self.config.output_activations)
            .map(|(z, act)| act.apply(z))
            .collect();
        Ok(Trace { input, hidden, output })
    }

    /// Targets for this network's output slots, 0.0 where the session has none.
    fn targets(&self, session: &TrainingSession) -> Vec<f64> {
        let slots = session.expected_output.slots();
        self.config
            .output_slots
            .iter()
            .map(|name| slots.iter().find(|(slot, _)| slot == name).map_or(0.0, |(_, t)| *t))
            .collect()
    }

    fn output_deltas(&self, trace: &Trace, targets: &[f64]) -> Vec<f64> {
        trace
            .output
            .iter()
            .zip(targets)
            .zip(&self.config.output_activations)
            .map(|((o, t), act)| (t - o) * act.derivative(*o))
            .collect()
    }
}

impl LearningEngine for FeedForwardEngine {
    fn infer(&self, input: &InputVariables) -> PipelineResult<Prediction> {
        let trace = self.forward(input)?;
        Ok(self.config.output_slots.iter().cloned().zip(trace.output).collect())
    }

    fn train_layer(&mut self, layer_index: usize, sessions: &mut [TrainingSession]) -> PipelineResult<()> {
        if layer_index > 1 {
            return Err(PipelineError::Engine(format!(
                "layer {layer_index} does not exist, network has layers 0 and 1"
            )));
        }

        for session in sessions.iter_mut() {
            let trace   = self.forward(&session.input_variables)?;
            let targets = self.targets(session);
            let deltas  = self.output_deltas(&trace, &targets);

            let snapshot = if layer_index == 1 {
                self.output.adjust(&deltas, &trace.hidden, self.weight_rate, self.bias_rate);
                trace.output
            } else {
                let hidden_deltas: Vec<f64> = trace
                    .hidden
                    .iter()
                    .enumerate()
                    .map(|(j, h)| {
                        let back: f64 = self.output.weights.iter().zip(&deltas).map(|(row, d)| row[j] * d).sum();
                        back * Activation::Sigmoid.derivative(*h)
                    })
                    .collect();
                self.hidden.adjust(&hidden_deltas, &trace.input, self.weight_rate, self.bias_rate);
                trace.hidden
            };

            session.saved_layer_states.push(LayerState { layer_index, activations: snapshot });
            session.learned = true;
        }

        tracing::info!("Trained layer {} on {} sessions", layer_index, sessions.len());
        Ok(())
    }
}
