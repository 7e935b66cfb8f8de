//! Feedback selection between the measured and predicted output.

use serde::{Deserialize, Serialize};

/// Feedback architecture of one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NarxMode {
    /// Closed loop: the model's own prediction is fed back.
    Parallel,
    /// Open loop (teacher forcing): the measured signal is fed back.
    #[default]
    SeriesParallel,
}

impl NarxMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::SeriesParallel => "series_parallel",
        }
    }
}

impl std::fmt::Display for NarxMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The vector that enters the output part of the next lag block.
pub fn select_feedback<'a>(mode: NarxMode, measured: &'a [f64], predicted: &'a [f64]) -> &'a [f64] {
    match mode {
        NarxMode::Parallel => predicted,
        NarxMode::SeriesParallel => measured,
    }
}
