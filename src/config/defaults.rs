//! Default constants for the NARX model.
//!
//! Centralises the magic numbers used by `NarxConfig::default()` and the
//! serde field defaults. Grouped by subsystem for easy discovery.

// ============================================================================
// Config Loading
// ============================================================================

/// Environment variable holding an explicit config file path.
pub const CONFIG_ENV_VAR: &str = "NARX_CONFIG";

/// Config file looked up in the working directory when the env var is unset.
pub const LOCAL_CONFIG_FILE: &str = "narx.toml";

// ============================================================================
// Topology
// ============================================================================

/// Width of the measured output signal block.
pub const SIGNAL_LEN: usize = 1;

/// Width of the exogenous input block.
pub const INPUT_LEN: usize = 1;

/// Number of (output, input) lag pairs kept in the delay line.
pub const ORDER: usize = 4;

/// Hidden layer count (1 or 2).
pub const N_HIDDEN_LAYERS: usize = 1;

pub const HIDDEN_LEN_1: usize = 16;
pub const HIDDEN_LEN_2: usize = 8;

// ============================================================================
// Training
// ============================================================================

/// Weights are drawn uniformly from `[-WEIGHT_INIT, WEIGHT_INIT]`.
pub const WEIGHT_INIT: f64 = 0.1;

pub const LEARNING_RATE_INIT: f64 = 0.01;

pub const MOMENTUM_INIT: f64 = 0.1;

/// Seed for weight initialization.
pub const SEED: u64 = 42;

// ============================================================================
// Learning-Rate Control
// ============================================================================

/// Lowest learning rate any adaptive strategy may set.
pub const RATE_FLOOR: f64 = 1e-5;

/// Highest learning rate any adaptive strategy may set.
pub const RATE_CEILING: f64 = 0.5;

/// Proportional strategy: `rate = gain * mse`, clamped to floor/ceiling.
pub const PROPORTIONAL_GAIN: f64 = 1.0;

/// Bold driver: multiplicative growth after an improving step.
pub const BOLD_INCREASE: f64 = 1.05;

/// Bold driver: multiplicative cut after a regressing step.
pub const BOLD_DECREASE: f64 = 0.5;

/// Bold driver: relative MSE growth tolerated before the rate is cut.
pub const BOLD_TOLERANCE: f64 = 0.0;
