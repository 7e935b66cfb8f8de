//! Learning-rate control driven by the training-error trend.
//!
//! Two adaptive strategies are available besides a fixed rate:
//!
//! - **Proportional**: `rate = gain * mse`, clamped to `[floor, ceiling]`.
//!   Large errors take large steps, small errors settle.
//! - **Bold driver**: on improvement the rate grows by `bold_increase` up to
//!   the ceiling. On a regression beyond `bold_tolerance` (relative) it is cut
//!   by `bold_decrease` down to the floor, and the last weight update may be
//!   rolled back.
//!
//! A non-finite error drops the rate straight to the floor under either
//! adaptive strategy. Every clamp, rollback and divergence is reported in
//! the returned `RateAdjustment` so the model can count it.

use serde::{Deserialize, Serialize};

use crate::config::RateControlConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateStrategy {
    /// Rate stays at its last value.
    #[default]
    Fixed,
    Proportional,
    BoldDriver,
}

/// Direction the rate moved in one adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateChange {
    Held,
    Set,
    Increased,
    Decreased,
}

/// Result of one `RateController::adjust` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateAdjustment {
    pub rate: f64,
    pub change: RateChange,
    /// The unclamped rate fell outside `[floor, ceiling]`.
    pub clamped: bool,
    /// The error was NaN or infinite.
    pub diverged: bool,
    /// The weight update that produced this error should be undone.
    pub rollback: bool,
}

impl RateAdjustment {
    fn held(rate: f64) -> Self {
        Self {
            rate,
            change: RateChange::Held,
            clamped: false,
            diverged: false,
            rollback: false,
        }
    }
}

/// Running counts of controller events, exposed by the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateDiagnostics {
    pub increases: u64,
    pub decreases: u64,
    pub clamps: u64,
    pub divergences: u64,
    pub rollbacks: u64,
}

impl RateDiagnostics {
    pub fn record(&mut self, adj: &RateAdjustment) {
        match adj.change {
            RateChange::Increased => self.increases += 1,
            RateChange::Decreased => self.decreases += 1,
            RateChange::Held | RateChange::Set => {}
        }
        if adj.clamped {
            self.clamps += 1;
        }
        if adj.diverged {
            self.divergences += 1;
        }
        if adj.rollback {
            self.rollbacks += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateController {
    floor: f64,
    ceiling: f64,
    proportional_gain: f64,
    bold_increase: f64,
    bold_decrease: f64,
    bold_tolerance: f64,
    bold_rollback: bool,
}

impl RateController {
    pub fn from_config(cfg: &RateControlConfig) -> Self {
        Self {
            floor: cfg.floor,
            ceiling: cfg.ceiling,
            proportional_gain: cfg.proportional_gain,
            bold_increase: cfg.bold_increase,
            bold_decrease: cfg.bold_decrease,
            bold_tolerance: cfg.bold_tolerance,
            bold_rollback: cfg.bold_rollback,
        }
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Whether a bold-driver regression undoes the weight update.
    pub fn rollback_enabled(&self) -> bool {
        self.bold_rollback
    }

    /// Compute the next learning rate.
    ///
    /// `mse_prev` is `None` until a previous training error exists; the bold
    /// driver holds the rate in that case.
    pub fn adjust(
        &self,
        strategy: RateStrategy,
        rate: f64,
        mse: f64,
        mse_prev: Option<f64>,
    ) -> RateAdjustment {
        if strategy == RateStrategy::Fixed {
            return RateAdjustment {
                diverged: !mse.is_finite(),
                ..RateAdjustment::held(rate)
            };
        }

        if !mse.is_finite() {
            return RateAdjustment {
                rate: self.floor,
                change: if self.floor < rate {
                    RateChange::Decreased
                } else {
                    RateChange::Held
                },
                clamped: true,
                diverged: true,
                rollback: strategy == RateStrategy::BoldDriver && self.bold_rollback,
            };
        }

        match strategy {
            RateStrategy::Fixed => RateAdjustment::held(rate),
            RateStrategy::Proportional => self.proportional(rate, mse),
            RateStrategy::BoldDriver => self.bold_driver(rate, mse, mse_prev),
        }
    }

    fn proportional(&self, rate: f64, mse: f64) -> RateAdjustment {
        let raw = self.proportional_gain * mse;
        let next = raw.clamp(self.floor, self.ceiling);
        RateAdjustment {
            rate: next,
            change: if next > rate {
                RateChange::Increased
            } else if next < rate {
                RateChange::Decreased
            } else {
                RateChange::Set
            },
            clamped: raw < self.floor || raw > self.ceiling,
            diverged: false,
            rollback: false,
        }
    }

    fn bold_driver(&self, rate: f64, mse: f64, mse_prev: Option<f64>) -> RateAdjustment {
        let Some(prev) = mse_prev.filter(|p| p.is_finite()) else {
            return RateAdjustment::held(rate);
        };

        if mse < prev {
            let raw = rate * self.bold_increase;
            let next = raw.min(self.ceiling);
            RateAdjustment {
                rate: next,
                change: if next > rate {
                    RateChange::Increased
                } else {
                    RateChange::Held
                },
                clamped: raw > self.ceiling,
                diverged: false,
                rollback: false,
            }
        } else if mse > prev * (1.0 + self.bold_tolerance) {
            let raw = rate * self.bold_decrease;
            let next = raw.max(self.floor);
            RateAdjustment {
                rate: next,
                change: if next < rate {
                    RateChange::Decreased
                } else {
                    RateChange::Held
                },
                clamped: raw < self.floor,
                diverged: false,
                rollback: self.bold_rollback,
            }
        } else {
            RateAdjustment::held(rate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> RateController {
        RateController::from_config(&RateControlConfig {
            floor: 1e-4,
            ceiling: 0.1,
            proportional_gain: 2.0,
            bold_increase: 1.05,
            bold_decrease: 0.5,
            bold_tolerance: 0.0,
            bold_rollback: false,
        })
    }

    #[test]
    fn test_fixed_strategy_holds() {
        let adj = controller().adjust(RateStrategy::Fixed, 0.01, 1e9, Some(0.0));
        assert_eq!(adj.rate, 0.01);
        assert_eq!(adj.change, RateChange::Held);
        assert!(!adj.diverged);

        let adj = controller().adjust(RateStrategy::Fixed, 0.01, f64::NAN, None);
        assert_eq!(adj.rate, 0.01);
        assert!(adj.diverged);
    }

    #[test]
    fn test_proportional_scales_with_error() {
        let ctl = controller();
        let small = ctl.adjust(RateStrategy::Proportional, 0.01, 0.001, None);
        let large = ctl.adjust(RateStrategy::Proportional, 0.01, 0.04, None);
        assert!((small.rate - 0.002).abs() < 1e-12);
        assert!((large.rate - 0.08).abs() < 1e-12);
        assert!(large.rate > small.rate);
        assert!(!small.clamped && !large.clamped);
    }

    #[test]
    fn test_proportional_clamps_to_range() {
        let ctl = controller();
        let high = ctl.adjust(RateStrategy::Proportional, 0.01, 10.0, None);
        assert_eq!(high.rate, 0.1);
        assert!(high.clamped);

        let low = ctl.adjust(RateStrategy::Proportional, 0.01, 0.0, None);
        assert_eq!(low.rate, 1e-4);
        assert!(low.clamped);
    }

    #[test]
    fn test_bold_needs_previous_error() {
        let adj = controller().adjust(RateStrategy::BoldDriver, 0.01, 0.5, None);
        assert_eq!(adj.change, RateChange::Held);
        assert_eq!(adj.rate, 0.01);
    }

    #[test]
    fn test_bold_nondecreasing_on_improvement_up_to_ceiling() {
        let ctl = controller();
        let mut rate = 0.05;
        let mut prev = 1.0;
        let mut saw_ceiling = false;
        for k in 1..100 {
            let mse = 1.0 / f64::from(k + 1);
            let adj = ctl.adjust(RateStrategy::BoldDriver, rate, mse, Some(prev));
            assert!(adj.rate >= rate);
            assert!(adj.rate <= 0.1);
            saw_ceiling |= adj.clamped;
            rate = adj.rate;
            prev = mse;
        }
        assert_eq!(rate, 0.1);
        assert!(saw_ceiling);
    }

    #[test]
    fn test_bold_cuts_on_sharp_increase() {
        let adj = controller().adjust(RateStrategy::BoldDriver, 0.02, 4.0, Some(0.1));
        assert!((adj.rate - 0.01).abs() < 1e-12);
        assert_eq!(adj.change, RateChange::Decreased);
        assert!(!adj.rollback);
    }

    #[test]
    fn test_bold_tolerance_band_holds() {
        let mut cfg = RateControlConfig::default();
        cfg.bold_tolerance = 0.1;
        let ctl = RateController::from_config(&cfg);
        let adj = ctl.adjust(RateStrategy::BoldDriver, 0.01, 1.05, Some(1.0));
        assert_eq!(adj.change, RateChange::Held);
        let adj = ctl.adjust(RateStrategy::BoldDriver, 0.01, 1.2, Some(1.0));
        assert_eq!(adj.change, RateChange::Decreased);
    }

    #[test]
    fn test_bold_rollback_flagged_on_regression() {
        let mut cfg = RateControlConfig::default();
        cfg.bold_rollback = true;
        let ctl = RateController::from_config(&cfg);
        assert!(ctl.rollback_enabled());
        let adj = ctl.adjust(RateStrategy::BoldDriver, 0.01, 2.0, Some(1.0));
        assert!(adj.rollback);
        let adj = ctl.adjust(RateStrategy::BoldDriver, 0.01, 0.5, Some(1.0));
        assert!(!adj.rollback);
    }

    #[test]
    fn test_divergence_drops_to_floor() {
        let ctl = controller();
        for strategy in [RateStrategy::Proportional, RateStrategy::BoldDriver] {
            let adj = ctl.adjust(strategy, 0.05, f64::NAN, Some(0.1));
            assert!(adj.diverged);
            assert!(adj.clamped);
            assert_eq!(adj.rate, 1e-4);
        }
    }

    #[test]
    fn test_diagnostics_count_events() {
        let ctl = controller();
        let mut diag = RateDiagnostics::default();
        diag.record(&ctl.adjust(RateStrategy::BoldDriver, 0.01, 0.5, Some(1.0)));
        diag.record(&ctl.adjust(RateStrategy::BoldDriver, 0.01, 2.0, Some(1.0)));
        diag.record(&ctl.adjust(RateStrategy::Proportional, 0.01, 100.0, None));
        diag.record(&ctl.adjust(RateStrategy::BoldDriver, 0.01, f64::INFINITY, Some(1.0)));
        assert_eq!(diag.increases, 2);
        assert_eq!(diag.decreases, 2);
        assert_eq!(diag.clamps, 2);
        assert_eq!(diag.divergences, 1);
        assert_eq!(diag.rollbacks, 0);
    }
}
