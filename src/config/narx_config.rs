//! NARX configuration: topology, initial training parameters and
//! learning-rate control limits, loadable from TOML.
//!
//! Every field carries a serde default so partial files work. A config is
//! immutable once a model has been created from it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Model configuration.
///
/// Load with `NarxConfig::load()` which searches:
/// 1. `$NARX_CONFIG` env var
/// 2. `./narx.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarxConfig {
    /// Length of a measured output signal block.
    #[serde(default = "default_signal_len")]
    pub signal_len: usize,

    /// Length of an exogenous input block.
    #[serde(default = "default_input_len")]
    pub input_len: usize,

    /// Number of input-layer delays.
    #[serde(default = "default_order")]
    pub order: usize,

    /// Strictly 1 or 2.
    #[serde(default = "default_n_hidden_layers")]
    pub n_hidden_layers: usize,

    #[serde(default = "default_hidden_len_1")]
    pub hidden_len_1: usize,

    /// Only meaningful when `n_hidden_layers == 2`.
    #[serde(default = "default_hidden_len_2")]
    pub hidden_len_2: usize,

    /// Weight init range `[-weight_init, weight_init]`.
    #[serde(default = "default_weight_init")]
    pub weight_init: f64,

    #[serde(default = "default_learning_rate_init")]
    pub learning_rate_init: f64,

    #[serde(default = "default_momentum_init")]
    pub momentum_init: f64,

    /// Seed for weight initialization.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Where the training error is read from.
    #[serde(default)]
    pub mse_source: MseSource,

    /// Learning-rate adaptation limits.
    #[serde(default)]
    pub rate: RateControlConfig,
}

fn default_signal_len() -> usize { defaults::SIGNAL_LEN }
fn default_input_len() -> usize { defaults::INPUT_LEN }
fn default_order() -> usize { defaults::ORDER }
fn default_n_hidden_layers() -> usize { defaults::N_HIDDEN_LAYERS }
fn default_hidden_len_1() -> usize { defaults::HIDDEN_LEN_1 }
fn default_hidden_len_2() -> usize { defaults::HIDDEN_LEN_2 }
fn default_weight_init() -> f64 { defaults::WEIGHT_INIT }
fn default_learning_rate_init() -> f64 { defaults::LEARNING_RATE_INIT }
fn default_momentum_init() -> f64 { defaults::MOMENTUM_INIT }
fn default_seed() -> u64 { defaults::SEED }

impl Default for NarxConfig {
    fn default() -> Self {
        Self {
            signal_len: default_signal_len(),
            input_len: default_input_len(),
            order: default_order(),
            n_hidden_layers: default_n_hidden_layers(),
            hidden_len_1: default_hidden_len_1(),
            hidden_len_2: default_hidden_len_2(),
            weight_init: default_weight_init(),
            learning_rate_init: default_learning_rate_init(),
            momentum_init: default_momentum_init(),
            seed: default_seed(),
            mse_source: MseSource::default(),
            rate: RateControlConfig::default(),
        }
    }
}

/// Source of the training error the model reports and adapts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MseSource {
    /// Error returned by the engine's training step.
    #[default]
    Engine,
    /// Error between the model's own prediction and the measured signal,
    /// computed in centered space.
    Prediction,
}

// ============================================================================
// Learning-Rate Control
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateControlConfig {
    #[serde(default = "default_rate_floor")]
    pub floor: f64,

    #[serde(default = "default_rate_ceiling")]
    pub ceiling: f64,

    /// Proportional strategy gain: `rate = gain * mse`.
    #[serde(default = "default_proportional_gain")]
    pub proportional_gain: f64,

    /// Bold driver growth factor on improvement (> 1).
    #[serde(default = "default_bold_increase")]
    pub bold_increase: f64,

    /// Bold driver cut factor on regression (0..1).
    #[serde(default = "default_bold_decrease")]
    pub bold_decrease: f64,

    /// Relative MSE growth tolerated before cutting the rate.
    #[serde(default = "default_bold_tolerance")]
    pub bold_tolerance: f64,

    /// Undo the weight update of a regressing step.
    #[serde(default)]
    pub bold_rollback: bool,
}

fn default_rate_floor() -> f64 { defaults::RATE_FLOOR }
fn default_rate_ceiling() -> f64 { defaults::RATE_CEILING }
fn default_proportional_gain() -> f64 { defaults::PROPORTIONAL_GAIN }
fn default_bold_increase() -> f64 { defaults::BOLD_INCREASE }
fn default_bold_decrease() -> f64 { defaults::BOLD_DECREASE }
fn default_bold_tolerance() -> f64 { defaults::BOLD_TOLERANCE }

impl Default for RateControlConfig {
    fn default() -> Self {
        Self {
            floor: default_rate_floor(),
            ceiling: default_rate_ceiling(),
            proportional_gain: default_proportional_gain(),
            bold_increase: default_bold_increase(),
            bold_decrease: default_bold_decrease(),
            bold_tolerance: default_bold_tolerance(),
            bold_rollback: false,
        }
    }
}

impl NarxConfig {
    /// Load configuration using the standard search order:
    /// 1. `$NARX_CONFIG` environment variable
    /// 2. `./narx.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded NARX config from NARX_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(
                            path = %p.display(),
                            error = %e,
                            "Failed to load config from NARX_CONFIG, falling back"
                        );
                    }
                }
            } else {
                warn!(path = %path, "NARX_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded NARX config from ./narx.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./narx.toml, using defaults");
                }
            }
        }

        info!("No narx.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse_checked(&contents).map_err(|e| match e {
            ConfigError::ParseStr(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse_checked(contents)
    }

    fn parse_checked(contents: &str) -> Result<Self, ConfigError> {
        // Two-pass: unknown keys only warn
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents).map_err(ConfigError::ParseStr)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Width of one (output, input) lag pair.
    pub fn block_len(&self) -> usize {
        self.signal_len + self.input_len
    }

    /// Length of the assembled feature vector fed to the network.
    pub fn feature_len(&self) -> usize {
        self.block_len() * self.order
    }

    /// Hidden layer widths actually used by the topology.
    pub fn hidden_layers(&self) -> Vec<usize> {
        match self.n_hidden_layers {
            2 => vec![self.hidden_len_1, self.hidden_len_2],
            _ => vec![self.hidden_len_1],
        }
    }

    /// Validate every field for internal consistency.
    ///
    /// All violations are collected so a bad file reports everything at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.signal_len == 0 {
            errors.push("signal_len must be > 0".to_string());
        }
        if self.input_len == 0 {
            errors.push("input_len must be > 0".to_string());
        }
        if self.order == 0 {
            errors.push("order must be >= 1".to_string());
        }
        match self.n_hidden_layers {
            1 => {}
            2 => {
                if self.hidden_len_2 == 0 {
                    errors.push("hidden_len_2 must be > 0 when n_hidden_layers = 2".to_string());
                }
            }
            n => errors.push(format!("n_hidden_layers must be 1 or 2, got {n}")),
        }
        if self.hidden_len_1 == 0 {
            errors.push("hidden_len_1 must be > 0".to_string());
        }

        Self::check_positive(self.weight_init, "weight_init", &mut errors);
        Self::check_positive(self.learning_rate_init, "learning_rate_init", &mut errors);
        if !self.momentum_init.is_finite() || !(0.0..1.0).contains(&self.momentum_init) {
            errors.push(format!(
                "momentum_init must be in [0, 1), got {}",
                self.momentum_init
            ));
        }

        let r = &self.rate;
        Self::check_positive(r.floor, "rate.floor", &mut errors);
        Self::check_positive(r.ceiling, "rate.ceiling", &mut errors);
        Self::check_positive(r.proportional_gain, "rate.proportional_gain", &mut errors);
        if r.floor.is_finite() && r.ceiling.is_finite() && self.learning_rate_init.is_finite() {
            if r.floor > r.ceiling {
                errors.push(format!(
                    "rate.floor ({}) must be <= rate.ceiling ({})",
                    r.floor, r.ceiling
                ));
            } else if !(r.floor..=r.ceiling).contains(&self.learning_rate_init) {
                errors.push(format!(
                    "learning_rate_init ({}) must lie within [rate.floor, rate.ceiling] = [{}, {}]",
                    self.learning_rate_init, r.floor, r.ceiling
                ));
            }
        }
        if !r.bold_increase.is_finite() || r.bold_increase <= 1.0 {
            errors.push(format!("rate.bold_increase must be > 1, got {}", r.bold_increase));
        }
        if !r.bold_decrease.is_finite() || r.bold_decrease <= 0.0 || r.bold_decrease >= 1.0 {
            errors.push(format!(
                "rate.bold_decrease must be in (0, 1), got {}",
                r.bold_decrease
            ));
        }
        if !r.bold_tolerance.is_finite() || r.bold_tolerance < 0.0 {
            errors.push(format!(
                "rate.bold_tolerance must be >= 0, got {}",
                r.bold_tolerance
            ));
        }

        let (range_errors, range_warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
        // NaN comparisons silently pass, so check finiteness first
        if !value.is_finite() {
            errors.push(format!("{name} must be finite, got {value}"));
        } else if value <= 0.0 {
            errors.push(format!("{name} must be > 0, got {value}"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config parse error ({}): {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config parse error: {0}")]
    ParseStr(toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}
