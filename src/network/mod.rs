//! Scoring Network - small feed-forward network with online training
//!
//! Fixed topology 15 -> 30 -> 20 -> 10 -> 5: ReLU hidden layers,
//! softmax output over the five action classes. Inference is a plain
//! forward pass; training is online and incremental, one gradient step
//! per labeled trade outcome, so the model learns in real time with no
//! training pause.
//!
//! The update rule is a standard cross-entropy backprop step with a
//! small fixed learning rate (the weights are additionally clamped so
//! a pathological example cannot blow the state up).

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::config::NetworkConfig;
use crate::features::{FeatureVector, NUM_FEATURES};
use crate::types::Action;

/// Layer widths, input to output.
pub const LAYERS: [usize; 5] = [NUM_FEATURES, 30, 20, 10, 5];

const WEIGHT_BOUND: f64 = 10.0;

/// One labeled example: features at entry, realized return at exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    pub features: FeatureVector,
    pub return_pct: f64,
    pub target: Action,
    pub timestamp: i64,
}

impl TrainingExample {
    pub fn new(features: FeatureVector, return_pct: f64) -> Self {
        Self {
            features,
            return_pct,
            target: Action::from_return_pct(return_pct),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Result of a forward pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inference {
    /// Probability per action, indexed by `Action::index`
    pub probabilities: Vec<f64>,
    pub action: Action,
    /// Probability of the winning action
    pub confidence: f64,
}

impl Inference {
    /// Neutral hold-weighted fallback used for malformed input.
    pub fn neutral() -> Self {
        Self {
            probabilities: vec![0.10, 0.20, 0.40, 0.20, 0.10],
            action: Action::Hold,
            confidence: 0.40,
        }
    }
}

/// Full network state: weight matrices, running quality metrics and
/// the bounded training-example buffer. Persisted as a whole.
/// Weight matrices are required fields; the metrics and the buffer
/// carry defaults so older persisted documents still load when a
/// field is added (merge-on-load).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkState {
    #[serde(default = "default_version")]
    pub version: String,
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
    w3: Array2<f64>,
    b3: Array1<f64>,
    w4: Array2<f64>,
    b4: Array1<f64>,
    /// Direction-agreement accuracy over the recent buffer (0.5 cold)
    #[serde(default = "default_metric")]
    pub accuracy: f64,
    /// Accuracy shrunk toward 0.5 while the sample count is small
    #[serde(default = "default_metric")]
    pub confidence: f64,
    #[serde(default)]
    pub training_samples: usize,
    #[serde(default)]
    buffer: VecDeque<TrainingExample>,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_metric() -> f64 {
    0.5
}

impl Default for NetworkState {
    fn default() -> Self {
        Self::new()
    }
}

fn init_layer(rows: usize, cols: usize, rng: &mut impl Rng) -> Array2<f64> {
    let scale = (2.0 / cols as f64).sqrt();
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-scale..scale))
}

impl NetworkState {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            version: default_version(),
            w1: init_layer(LAYERS[1], LAYERS[0], &mut rng),
            b1: Array1::zeros(LAYERS[1]),
            w2: init_layer(LAYERS[2], LAYERS[1], &mut rng),
            b2: Array1::zeros(LAYERS[2]),
            w3: init_layer(LAYERS[3], LAYERS[2], &mut rng),
            b3: Array1::zeros(LAYERS[3]),
            w4: init_layer(LAYERS[4], LAYERS[3], &mut rng),
            b4: Array1::zeros(LAYERS[4]),
            accuracy: 0.5,
            confidence: 0.5,
            training_samples: 0,
            buffer: VecDeque::new(),
        }
    }

    /// Forward pass. A slice of the wrong length never panics; it
    /// falls back to the neutral hold-weighted distribution.
    pub fn infer(&self, input: &[f64]) -> Inference {
        if input.len() != NUM_FEATURES || input.iter().any(|v| !v.is_finite()) {
            return Inference::neutral();
        }
        let x = Array1::from_vec(input.to_vec());
        let (_, _, _, probs) = self.forward(&x);

        let (best_idx, best_p) = probs
            .iter()
            .copied()
            .enumerate()
            .fold((Action::Hold.index(), 0.0), |acc, (i, p)| {
                if p > acc.1 {
                    (i, p)
                } else {
                    acc
                }
            });

        Inference {
            probabilities: probs.to_vec(),
            action: Action::from_index(best_idx),
            confidence: best_p,
        }
    }

    pub fn infer_features(&self, features: &FeatureVector) -> Inference {
        self.infer(features.values())
    }

    fn forward(&self, x: &Array1<f64>) -> (Array1<f64>, Array1<f64>, Array1<f64>, Array1<f64>) {
        let a1 = relu(&(self.w1.dot(x) + &self.b1));
        let a2 = relu(&(self.w2.dot(&a1) + &self.b2));
        let a3 = relu(&(self.w3.dot(&a2) + &self.b3));
        let out = softmax(&(self.w4.dot(&a3) + &self.b4));
        (a1, a2, a3, out)
    }

    /// One online gradient step for a single labeled example, then
    /// buffer bookkeeping and a periodic accuracy refresh.
    pub fn train(&mut self, example: TrainingExample, config: &NetworkConfig) {
        let lr = config.learning_rate;
        let x = Array1::from_vec(example.features.values().to_vec());
        let (a1, a2, a3, probs) = self.forward(&x);

        let mut target = Array1::zeros(LAYERS[4]);
        target[example.target.index()] = 1.0;

        // Softmax + cross-entropy: output delta is probs - target
        let d4 = &probs - &target;
        let d3 = self.w4.t().dot(&d4) * relu_mask(&a3);
        let d2 = self.w3.t().dot(&d3) * relu_mask(&a2);
        let d1 = self.w2.t().dot(&d2) * relu_mask(&a1);

        apply_update(&mut self.w4, &mut self.b4, &d4, &a3, lr);
        apply_update(&mut self.w3, &mut self.b3, &d3, &a2, lr);
        apply_update(&mut self.w2, &mut self.b2, &d2, &a1, lr);
        apply_update(&mut self.w1, &mut self.b1, &d1, &x, lr);

        self.buffer.push_back(example);
        while self.buffer.len() > config.buffer_cap {
            self.buffer.pop_front();
        }
        self.training_samples += 1;

        if self.training_samples % config.accuracy_every == 0 {
            self.refresh_accuracy(config.accuracy_window);
            debug!(
                samples = self.training_samples,
                accuracy = self.accuracy,
                "network accuracy refreshed"
            );
        }
    }

    /// Re-score the recent buffer with the current weights: a
    /// prediction counts as correct when its direction agrees with the
    /// realized return sign (hold agrees with the +-3% band).
    fn refresh_accuracy(&mut self, window: usize) {
        let recent: Vec<TrainingExample> = self
            .buffer
            .iter()
            .rev()
            .take(window)
            .cloned()
            .collect();
        if recent.is_empty() {
            return;
        }
        let correct = recent
            .iter()
            .filter(|ex| {
                let inference = self.infer_features(&ex.features);
                direction_agrees(inference.action, ex.return_pct)
            })
            .count();
        self.accuracy = correct as f64 / recent.len() as f64;

        let maturity = (self.training_samples.min(100) as f64) / 100.0;
        self.confidence = 0.5 + (self.accuracy - 0.5) * maturity;
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

fn direction_agrees(action: Action, return_pct: f64) -> bool {
    (action.is_bullish() && return_pct > 0.0)
        || (action.is_bearish() && return_pct < 0.0)
        || (action == Action::Hold && return_pct.abs() <= 3.0)
}

fn relu(z: &Array1<f64>) -> Array1<f64> {
    z.mapv(|v| v.max(0.0))
}

fn relu_mask(a: &Array1<f64>) -> Array1<f64> {
    a.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}

fn softmax(z: &Array1<f64>) -> Array1<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp = z.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    if sum > 0.0 && sum.is_finite() {
        exp / sum
    } else {
        Array1::from_elem(z.len(), 1.0 / z.len() as f64)
    }
}

fn apply_update(
    w: &mut Array2<f64>,
    b: &mut Array1<f64>,
    delta: &Array1<f64>,
    activation: &Array1<f64>,
    lr: f64,
) {
    let grad = delta
        .clone()
        .insert_axis(Axis(1))
        .dot(&activation.clone().insert_axis(Axis(0)));
    *w -= &(grad * lr);
    w.mapv_inplace(|v| v.clamp(-WEIGHT_BOUND, WEIGHT_BOUND));
    *b -= &(delta * lr);
    b.mapv_inplace(|v| v.clamp(-WEIGHT_BOUND, WEIGHT_BOUND));
}
