//! Built-in fully connected feed-forward engine.
//!
//! ```text
//! input -> hidden_1 -> [hidden_2] -> output
//!   hidden: a = tanh(W x + b)
//!   output: y = W h + b        (linear, predictions live in centered space)
//! ```
//!
//! Training is incremental: one sample per step, gradient of
//! `E = 1/2 * sum((y - t)^2)`, classical momentum
//! `v <- momentum * v - rate * dE/dw`, `w <- w + v`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{EngineCheckpoint, NetworkEngine};
use crate::config::NarxConfig;
use crate::error::{NarxError, Result};

/// Multi-layer perceptron with flat parameter storage.
///
/// Layer `l` occupies `params[offsets[l]..]`: an `out x in` row-major weight
/// matrix followed by `out` biases.
#[derive(Debug, Clone)]
pub struct Mlp {
    sizes: Vec<usize>,
    offsets: Vec<usize>,
    params: Vec<f64>,
    velocity: Vec<f64>,
    /// Per-layer activations of the last forward pass (`[0]` is the input).
    activations: Vec<Vec<f64>>,
    learning_rate: f64,
    momentum: f64,
    mse: f64,
}

impl Mlp {
    /// Build a network with layer widths `sizes` (input first, output last),
    /// all weights and biases drawn uniformly from `[-weight_init, weight_init]`.
    pub fn new(sizes: &[usize], weight_init: f64, seed: u64) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(NarxError::InvalidTopology(format!(
                "need at least input and output layers, got {} layer(s)",
                sizes.len()
            )));
        }
        if let Some(i) = sizes.iter().position(|&s| s == 0) {
            return Err(NarxError::InvalidTopology(format!("layer {i} has zero width")));
        }
        if !weight_init.is_finite() || weight_init <= 0.0 {
            return Err(NarxError::InvalidTopology(format!(
                "weight_init must be finite and > 0, got {weight_init}"
            )));
        }

        let mut offsets = Vec::with_capacity(sizes.len() - 1);
        let mut total = 0usize;
        for pair in sizes.windows(2) {
            offsets.push(total);
            total += (pair[0] + 1) * pair[1];
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let params: Vec<f64> = (0..total)
            .map(|_| rng.gen_range(-weight_init..=weight_init))
            .collect();

        Ok(Self {
            sizes: sizes.to_vec(),
            offsets,
            params,
            velocity: vec![0.0; total],
            activations: sizes.iter().map(|&s| vec![0.0; s]).collect(),
            learning_rate: 0.0,
            momentum: 0.0,
            mse: 0.0,
        })
    }

    /// Network sized for a NARX config: `feature_len -> hidden.. -> signal_len`,
    /// with the configured initial learning rate and momentum.
    pub fn from_config(config: &NarxConfig) -> Result<Self> {
        let mut sizes = Vec::with_capacity(4);
        sizes.push(config.feature_len());
        sizes.extend(config.hidden_layers());
        sizes.push(config.signal_len);

        let mut mlp = Self::new(&sizes, config.weight_init, config.seed)?;
        mlp.learning_rate = config.learning_rate_init;
        mlp.momentum = config.momentum_init;
        Ok(mlp)
    }

    /// Layer widths, input first.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Total number of trainable parameters.
    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    fn num_layers(&self) -> usize {
        self.sizes.len() - 1
    }

    fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
        if expected == got {
            Ok(())
        } else {
            Err(NarxError::DimensionMismatch { what, expected, got })
        }
    }

    /// Forward pass, leaving every layer's activation in `self.activations`.
    fn propagate(&mut self, input: &[f64]) {
        self.activations[0].copy_from_slice(input);
        let n_layers = self.num_layers();

        for l in 0..n_layers {
            let (n_in, n_out) = (self.sizes[l], self.sizes[l + 1]);
            let w_off = self.offsets[l];
            let b_off = w_off + n_in * n_out;
            let (prev, next) = self.activations.split_at_mut(l + 1);
            let x = &prev[l];
            let y = &mut next[0];

            for (j, y_j) in y.iter_mut().enumerate() {
                let row = &self.params[w_off + j * n_in..w_off + (j + 1) * n_in];
                let z = self.params[b_off + j]
                    + row.iter().zip(x.iter()).map(|(w, xi)| w * xi).sum::<f64>();
                *y_j = if l + 1 < n_layers { z.tanh() } else { z };
            }
        }
    }
}

impl NetworkEngine for Mlp {
    fn input_len(&self) -> usize {
        self.sizes[0]
    }

    fn output_len(&self) -> usize {
        self.sizes[self.num_layers()]
    }

    fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        Self::check_len("network input", self.input_len(), input.len())?;
        self.propagate(input);
        Ok(self.activations[self.num_layers()].clone())
    }

    fn train_step(&mut self, input: &[f64], target: &[f64]) -> Result<f64> {
        Self::check_len("network input", self.input_len(), input.len())?;
        Self::check_len("training target", self.output_len(), target.len())?;
        self.propagate(input);

        let n_layers = self.num_layers();
        let mut delta: Vec<f64> = self.activations[n_layers]
            .iter()
            .zip(target)
            .map(|(y, t)| y - t)
            .collect();
        let mse = delta.iter().map(|e| e * e).sum::<f64>() / delta.len() as f64;

        // Full gradient first: earlier layers need the pre-update weights
        let mut grad = vec![0.0; self.params.len()];
        for l in (0..n_layers).rev() {
            let (n_in, n_out) = (self.sizes[l], self.sizes[l + 1]);
            let w_off = self.offsets[l];
            let b_off = w_off + n_in * n_out;
            let x = &self.activations[l];

            for (j, &d) in delta.iter().enumerate() {
                let g_row = &mut grad[w_off + j * n_in..w_off + (j + 1) * n_in];
                for (g, xi) in g_row.iter_mut().zip(x.iter()) {
                    *g = d * xi;
                }
                grad[b_off + j] = d;
            }

            if l > 0 {
                let mut back = vec![0.0; n_in];
                for (j, &d) in delta.iter().enumerate() {
                    let row = &self.params[w_off + j * n_in..w_off + (j + 1) * n_in];
                    for (b, w) in back.iter_mut().zip(row) {
                        *b += w * d;
                    }
                }
                // tanh'(z) = 1 - a^2
                for (b, a) in back.iter_mut().zip(x.iter()) {
                    *b *= 1.0 - a * a;
                }
                delta = back;
            }
        }

        for ((p, v), g) in self
            .params
            .iter_mut()
            .zip(self.velocity.iter_mut())
            .zip(&grad)
        {
            *v = self.momentum * *v - self.learning_rate * g;
            *p += *v;
        }

        self.mse = mse;
        Ok(mse)
    }

    fn mse(&self) -> f64 {
        self.mse
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, rate: f64) {
        self.learning_rate = rate;
    }

    fn momentum(&self) -> f64 {
        self.momentum
    }

    fn set_momentum(&mut self, momentum: f64) {
        self.momentum = momentum;
    }

    fn checkpoint(&self) -> Option<EngineCheckpoint> {
        Some(EngineCheckpoint {
            params: self.params.clone(),
            velocity: self.velocity.clone(),
            mse: self.mse,
        })
    }

    fn restore(&mut self, checkpoint: &EngineCheckpoint) -> Result<()> {
        if checkpoint.params.len() != self.params.len()
            || checkpoint.velocity.len() != self.velocity.len()
        {
            return Err(NarxError::CheckpointMismatch(format!(
                "checkpoint has {} params, network has {}",
                checkpoint.params.len(),
                self.params.len()
            )));
        }
        self.params.copy_from_slice(&checkpoint.params);
        self.velocity.copy_from_slice(&checkpoint.velocity);
        self.mse = checkpoint.mse;
        Ok(())
    }

    fn supports_checkpoint(&self) -> bool {
        true
    }
}
