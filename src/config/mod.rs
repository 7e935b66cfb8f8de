//! NARX configuration module.
//!
//! Provides the model configuration loaded from TOML files.
//!
//! ## Loading Order
//!
//! 1. `NARX_CONFIG` environment variable (path to TOML file)
//! 2. `narx.toml` in the current working directory
//! 3. Built-in defaults
//!
//! There is no process-wide config: each `NarxModel` is created from its own
//! `NarxConfig` value.

mod narx_config;
pub mod defaults;
pub mod validation;

pub use narx_config::*;
