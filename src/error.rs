//! Error types for the NARX model and its network engine.
//!
//! Every precondition the update cycle relies on (vector widths, finite
//! inputs, a single learning-rate strategy) is checked up front and reported
//! here instead of corrupting the delay buffers.

use thiserror::Error;

use crate::config::ConfigError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NarxError>;

#[derive(Debug, Error)]
pub enum NarxError {
    #[error("{what}: expected length {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{what} contains NaN or Inf values")]
    NonFinite { what: &'static str },

    #[error("both proportional and bold-driver learning-rate adaptation requested; choose one")]
    ConflictingRateStrategies,

    #[error("unknown option bits: {0:#x}")]
    UnknownOptionBits(u32),

    #[error("engine {engine_in}->{engine_out} does not fit NARX layout {layout_in}->{layout_out}")]
    TopologyMismatch {
        engine_in: usize,
        engine_out: usize,
        layout_in: usize,
        layout_out: usize,
    },

    #[error("invalid network topology: {0}")]
    InvalidTopology(String),

    #[error("bold-driver rollback requires an engine that supports weight checkpoints")]
    RollbackUnsupported,

    #[error("checkpoint does not fit engine: {0}")]
    CheckpointMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}
