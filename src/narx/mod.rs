//! NARX model: delay buffers, feedback routing, learning-rate control and
//! the update orchestrator that ties them to a network engine.

pub mod buffer;
pub mod model;
pub mod normalizer;
pub mod options;
pub mod rate;
pub mod router;

pub use buffer::{BufferLayout, DelayBuffer, OutputHistory};
pub use model::{NarxModel, UpdatePhase};
pub use normalizer::RunningMean;
pub use options::{
    UpdateOptions, NARX_LR_ADAPTIVE_BOLD, NARX_LR_ADAPTIVE_PROP, NARX_PREDICT, NARX_TRAIN,
};
pub use rate::{RateAdjustment, RateChange, RateController, RateDiagnostics, RateStrategy};
pub use router::{select_feedback, NarxMode};
