//! Feed-forward network engine behind the NARX model.
//!
//! The NARX model never looks inside the network. It drives it through the
//! `NetworkEngine` capability trait:
//!
//! - **forward**: pure inference on one feature vector
//! - **train_step**: one supervised per-sample update, returning the MSE of
//!   the forward pass the update was computed from
//! - **learning rate / momentum** accessors, so the rate controller can steer
//! - **checkpoint / restore** (optional), needed only for bold-driver rollback
//!
//! `Mlp` is the built-in implementation; tests inject mocks.

pub mod mlp;

pub use mlp::Mlp;

use crate::error::Result;

/// Snapshot of an engine's trainable state.
///
/// Opaque to the NARX model; only the engine that produced it interprets
/// `params` and `velocity`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCheckpoint {
    pub params: Vec<f64>,
    pub velocity: Vec<f64>,
    pub mse: f64,
}

pub trait NetworkEngine {
    /// Width of the input layer.
    fn input_len(&self) -> usize;

    /// Width of the output layer.
    fn output_len(&self) -> usize;

    /// Evaluate the network on one input vector.
    fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>>;

    /// One supervised update on `(input, target)`.
    ///
    /// Returns the mean-squared error (averaged over outputs) of the forward
    /// pass that produced the gradient, i.e. the error *before* the update.
    fn train_step(&mut self, input: &[f64], target: &[f64]) -> Result<f64>;

    /// Error reported by the most recent `train_step` (0.0 before any).
    fn mse(&self) -> f64;

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, rate: f64);

    fn momentum(&self) -> f64;

    fn set_momentum(&mut self, momentum: f64);

    /// Capture trainable state. `None` when the engine cannot roll back.
    fn checkpoint(&self) -> Option<EngineCheckpoint> {
        None
    }

    /// Restore state captured by `checkpoint`.
    fn restore(&mut self, _checkpoint: &EngineCheckpoint) -> Result<()> {
        Err(crate::error::NarxError::RollbackUnsupported)
    }

    /// Whether `checkpoint`/`restore` are implemented.
    fn supports_checkpoint(&self) -> bool {
        self.checkpoint().is_some()
    }
}
