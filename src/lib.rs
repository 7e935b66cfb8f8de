//! narxnet: NARX (Nonlinear AutoRegressive with eXogenous inputs) predictor
//!
//! A recurrent one-step-ahead predictor built on a feed-forward network.
//! Past outputs and exogenous inputs are kept in a lag queue, assembled into
//! one feature vector per step and fed to the network, which can be trained
//! online while the learning rate follows the error trend.
//!
//! ## Architecture
//!
//! - **Network Engine** (`engine`): capability trait plus the built-in `Mlp`
//! - **Delay Buffer Manager** (`narx::buffer`): fixed-capacity lag ring
//! - **Mode Router** (`narx::router`): parallel vs. series-parallel feedback
//! - **Learning-Rate Controller** (`narx::rate`): proportional and bold driver
//! - **Update Orchestrator** (`narx::model`): `NarxModel::update`
//!
//! ```no_run
//! use narxnet::{NarxConfig, NarxMode, NarxModel, UpdateOptions};
//!
//! # fn main() -> narxnet::Result<()> {
//! let mut model = NarxModel::new(NarxConfig::default())?;
//! model.update(&[0.2], &[0.1], NarxMode::SeriesParallel, UpdateOptions::train())?;
//! println!("next: {:?}, mse: {}", model.prediction(), model.mse());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod narma;
pub mod narx;

pub use config::{ConfigError, MseSource, NarxConfig, RateControlConfig};
pub use engine::{EngineCheckpoint, Mlp, NetworkEngine};
pub use error::{NarxError, Result};
pub use narx::{
    NarxMode, NarxModel, RateDiagnostics, RateStrategy, UpdateOptions, UpdatePhase,
};
