//! Per-update options: train/predict switches and learning-rate strategy.

use serde::{Deserialize, Serialize};

use super::rate::RateStrategy;
use crate::error::{NarxError, Result};

/// Legacy option bits, accepted through [`UpdateOptions::from_bits`].
pub const NARX_LR_ADAPTIVE_PROP: u32 = 0x01;
pub const NARX_LR_ADAPTIVE_BOLD: u32 = 0x02;
pub const NARX_TRAIN: u32 = 0x04;
pub const NARX_PREDICT: u32 = 0x08;

const ALL_BITS: u32 = NARX_LR_ADAPTIVE_PROP | NARX_LR_ADAPTIVE_BOLD | NARX_TRAIN | NARX_PREDICT;

/// What a single `NarxModel::update` call does beyond the mandatory
/// forward pass and buffer shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Run one training step on (features, measured signal).
    pub train: bool,
    /// Publish this step's prediction.
    pub predict: bool,
    /// Learning-rate adaptation after the training step.
    pub rate: RateStrategy,
}

impl UpdateOptions {
    /// Predict without training.
    pub fn predict() -> Self {
        Self {
            train: false,
            predict: true,
            rate: RateStrategy::Fixed,
        }
    }

    /// Train and predict with a fixed learning rate.
    pub fn train() -> Self {
        Self {
            train: true,
            predict: true,
            rate: RateStrategy::Fixed,
        }
    }

    pub fn with_rate(mut self, rate: RateStrategy) -> Self {
        self.rate = rate;
        self
    }

    /// Decode a legacy flag word. Both adaptive bits at once are rejected.
    pub fn from_bits(bits: u32) -> Result<Self> {
        let unknown = bits & !ALL_BITS;
        if unknown != 0 {
            return Err(NarxError::UnknownOptionBits(unknown));
        }
        let rate = match (bits & NARX_LR_ADAPTIVE_PROP != 0, bits & NARX_LR_ADAPTIVE_BOLD != 0) {
            (true, true) => return Err(NarxError::ConflictingRateStrategies),
            (true, false) => RateStrategy::Proportional,
            (false, true) => RateStrategy::BoldDriver,
            (false, false) => RateStrategy::Fixed,
        };
        Ok(Self {
            train: bits & NARX_TRAIN != 0,
            predict: bits & NARX_PREDICT != 0,
            rate,
        })
    }

    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        match self.rate {
            RateStrategy::Proportional => bits |= NARX_LR_ADAPTIVE_PROP,
            RateStrategy::BoldDriver => bits |= NARX_LR_ADAPTIVE_BOLD,
            RateStrategy::Fixed => {}
        }
        if self.train {
            bits |= NARX_TRAIN;
        }
        if self.predict {
            bits |= NARX_PREDICT;
        }
        bits
    }
}
