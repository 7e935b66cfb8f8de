//! NARX update orchestrator.
//!
//! One `update` call advances the model by exactly one time step:
//!
//! ```text
//! Idle -> FeatureAssembled -> Predicted -> [Trained -> RateAdjusted] -> BuffersShifted -> Idle
//! ```
//!
//! All argument checks happen before the first state change, and every
//! engine call (forward, training step, rollback) happens before the model
//! commits anything, so a rejected or failed update leaves the model state
//! exactly as it was. Only the engine's own weights may have moved when its
//! rollback fails.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::buffer::{BufferLayout, DelayBuffer, OutputHistory};
use super::normalizer::RunningMean;
use super::options::UpdateOptions;
use super::rate::{RateAdjustment, RateController, RateDiagnostics, RateStrategy};
use super::router::{select_feedback, NarxMode};
use crate::config::{MseSource, NarxConfig};
use crate::engine::{EngineCheckpoint, Mlp, NetworkEngine};
use crate::error::{NarxError, Result};

/// Orchestrator state. Observable only as `Idle` between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdatePhase {
    Idle,
    FeatureAssembled,
    Predicted,
    Trained,
    RateAdjusted,
    BuffersShifted,
}

/// Engine-side result of a training step, not yet committed to the model.
struct TrainedStep {
    mse: f64,
    checkpoint: Option<EngineCheckpoint>,
}

/// Live NARX instance: delay buffers, centering statistics, error history
/// and the exclusively owned network engine.
#[derive(Debug)]
pub struct NarxModel<E: NetworkEngine = Mlp> {
    config: NarxConfig,
    layout: BufferLayout,
    engine: E,
    buffer: DelayBuffer,
    output: OutputHistory,
    output_mean: RunningMean,
    input_mean: RunningMean,
    /// Feature vector fed to the engine on the last update.
    last_features: Vec<f64>,
    mse: Option<f64>,
    mse_prev: Option<f64>,
    rate: RateController,
    diagnostics: RateDiagnostics,
    published: bool,
    phase: UpdatePhase,
    step: u64,
    train_steps: u64,
}

impl NarxModel<Mlp> {
    /// Build a model with the built-in `Mlp` engine sized from `config`.
    pub fn new(config: NarxConfig) -> Result<Self> {
        config.validate()?;
        let engine = Mlp::from_config(&config)?;
        Self::with_engine(config, engine)
    }
}

impl<E: NetworkEngine> NarxModel<E> {
    /// Build a model around an injected engine.
    ///
    /// The engine's input width must equal `(signal_len + input_len) * order`
    /// and its output width `signal_len`. Its learning rate and momentum are
    /// reset to the configured initial values.
    pub fn with_engine(config: NarxConfig, mut engine: E) -> Result<Self> {
        config.validate()?;
        let layout = BufferLayout::from_config(&config);

        if engine.input_len() != layout.input_buffer_len
            || engine.output_len() != layout.output_buffer_len
        {
            return Err(NarxError::TopologyMismatch {
                engine_in: engine.input_len(),
                engine_out: engine.output_len(),
                layout_in: layout.input_buffer_len,
                layout_out: layout.output_buffer_len,
            });
        }

        let rate = RateController::from_config(&config.rate);
        if rate.rollback_enabled() && !engine.supports_checkpoint() {
            return Err(NarxError::RollbackUnsupported);
        }

        engine.set_learning_rate(config.learning_rate_init);
        engine.set_momentum(config.momentum_init);

        info!(
            signal_len = layout.signal_len,
            input_len = layout.input_len,
            order = layout.order,
            hidden = ?config.hidden_layers(),
            feature_len = layout.input_buffer_len,
            learning_rate = config.learning_rate_init,
            momentum = config.momentum_init,
            "NARX model created"
        );

        Ok(Self {
            buffer: DelayBuffer::new(layout),
            output: OutputHistory::new(layout.output_buffer_len),
            output_mean: RunningMean::new(layout.signal_len),
            input_mean: RunningMean::new(layout.input_len),
            last_features: vec![0.0; layout.input_buffer_len],
            mse: None,
            mse_prev: None,
            rate,
            diagnostics: RateDiagnostics::default(),
            published: false,
            phase: UpdatePhase::Idle,
            step: 0,
            train_steps: 0,
            config,
            layout,
            engine,
        })
    }

    /// Advance the model by one time step.
    ///
    /// `new_signal` is the measured output at this step (also the training
    /// target), `new_input` the exogenous input. `mode` picks which of the
    /// measured signal or the prediction is fed back into the lag queue.
    pub fn update(
        &mut self,
        new_signal: &[f64],
        new_input: &[f64],
        mode: NarxMode,
        opts: UpdateOptions,
    ) -> Result<()> {
        check_len("new_signal", self.layout.signal_len, new_signal.len())?;
        check_len("new_input", self.layout.input_len, new_input.len())?;
        check_finite("new_signal", new_signal)?;
        check_finite("new_input", new_input)?;

        let result = self.run_cycle(new_signal, new_input, mode, opts);
        self.phase = UpdatePhase::Idle;
        result
    }

    fn run_cycle(
        &mut self,
        new_signal: &[f64],
        new_input: &[f64],
        mode: NarxMode,
        opts: UpdateOptions,
    ) -> Result<()> {
        let features = self.buffer.features();
        self.phase = UpdatePhase::FeatureAssembled;

        let net_out = self.engine.forward(&features)?;
        check_len("engine output", self.layout.output_buffer_len, net_out.len())?;
        let prediction = self.output_mean.decenter(&net_out);
        self.phase = UpdatePhase::Predicted;

        // Engine calls come first; model state is committed only once none
        // of them can fail.
        let outcome = if opts.train {
            let trained = self.train(&features, new_signal, &net_out, opts.rate)?;
            self.phase = UpdatePhase::Trained;
            let adj = self.control_rate(opts.rate, &trained)?;
            self.phase = UpdatePhase::RateAdjusted;
            Some((trained.mse, adj))
        } else {
            None
        };

        self.last_features = features;
        self.output.record(&prediction);
        self.published = opts.predict;
        if let Some((mse, adj)) = outcome {
            self.commit_training(new_signal, new_input, mse, &adj);
        }

        let feedback = select_feedback(mode, new_signal, &prediction);
        self.buffer
            .shift(feedback, new_input, &self.output_mean, &self.input_mean);
        self.phase = UpdatePhase::BuffersShifted;

        self.step += 1;
        debug!(
            step = self.step,
            mode = %mode,
            train = opts.train,
            mse = self.mse(),
            learning_rate = self.engine.learning_rate(),
            "NARX update"
        );
        Ok(())
    }

    /// One engine training step on `(features, centered signal)`.
    fn train(
        &mut self,
        features: &[f64],
        new_signal: &[f64],
        net_out: &[f64],
        strategy: RateStrategy,
    ) -> Result<TrainedStep> {
        let checkpoint = if strategy == RateStrategy::BoldDriver && self.rate.rollback_enabled() {
            self.engine.checkpoint()
        } else {
            None
        };

        let target = self.output_mean.center(new_signal);
        let engine_mse = self.engine.train_step(features, &target)?;
        let mse = match self.config.mse_source {
            MseSource::Engine => engine_mse,
            MseSource::Prediction => mean_squared_error(net_out, &target),
        };
        Ok(TrainedStep { mse, checkpoint })
    }

    /// Ask the controller for the next rate and undo the weight update if it
    /// rejects the step.
    fn control_rate(
        &mut self,
        strategy: RateStrategy,
        trained: &TrainedStep,
    ) -> Result<RateAdjustment> {
        let current = self.engine.learning_rate();
        let adj = self.rate.adjust(strategy, current, trained.mse, self.mse);

        if adj.rollback {
            if let Some(ckpt) = &trained.checkpoint {
                self.engine.restore(ckpt)?;
                warn!(
                    step = self.step,
                    rejected_mse = trained.mse,
                    restored_mse = ?self.mse,
                    "weight update rolled back"
                );
            }
        }
        Ok(adj)
    }

    /// Fold a completed training step into the model state.
    fn commit_training(
        &mut self,
        new_signal: &[f64],
        new_input: &[f64],
        mse: f64,
        adj: &RateAdjustment,
    ) {
        self.mse_prev = self.mse;
        self.mse = if adj.rollback { self.mse_prev } else { Some(mse) };
        self.train_steps += 1;

        self.output_mean.update(new_signal);
        self.input_mean.update(new_input);

        self.diagnostics.record(adj);
        if adj.diverged {
            warn!(step = self.step, mse, rate = adj.rate, "training error diverged");
        } else if adj.clamped {
            warn!(step = self.step, mse, rate = adj.rate, "learning rate clamped");
        }
        if adj.rate.to_bits() != self.engine.learning_rate().to_bits() {
            self.engine.set_learning_rate(adj.rate);
        }
    }

    /// Clear lag queue, prediction history and error history. Weights,
    /// learning rate and centering statistics are kept.
    pub fn reset_state(&mut self) {
        self.buffer.clear();
        self.output.clear();
        self.last_features.fill(0.0);
        self.mse = None;
        self.mse_prev = None;
        self.published = false;
        info!(step = self.step, "NARX state reset");
    }

    /// Most recent prediction (`signal_len` values). All zeros before the
    /// first update.
    pub fn prediction(&self) -> &[f64] {
        self.output.current()
    }

    /// The prediction, only if the last update asked for it to be published.
    pub fn published_prediction(&self) -> Option<&[f64]> {
        self.published.then(|| self.output.current())
    }

    pub fn output_prev(&self) -> &[f64] {
        self.output.prev()
    }

    /// `prediction() - output_prev()`.
    pub fn output_diff(&self) -> &[f64] {
        self.output.diff()
    }

    /// Training error of the last accepted training step (0.0 before any).
    pub fn mse(&self) -> f64 {
        self.mse.unwrap_or(0.0)
    }

    pub fn mse_prev(&self) -> Option<f64> {
        self.mse_prev
    }

    /// Feature vector used for the most recent prediction.
    pub fn last_features(&self) -> &[f64] {
        &self.last_features
    }

    /// Current lag pair at `lag` (0 = newest), centered.
    pub fn lag_pair(&self, lag: usize) -> Option<(&[f64], &[f64])> {
        self.buffer.pair(lag)
    }

    /// Full lag queue as the next update will see it.
    pub fn features(&self) -> Vec<f64> {
        self.buffer.features()
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    pub fn config(&self) -> &NarxConfig {
        &self.config
    }

    pub fn output_mean(&self) -> &[f64] {
        self.output_mean.mean()
    }

    pub fn input_mean(&self) -> &[f64] {
        self.input_mean.mean()
    }

    pub fn learning_rate(&self) -> f64 {
        self.engine.learning_rate()
    }

    pub fn momentum(&self) -> f64 {
        self.engine.momentum()
    }

    pub fn diagnostics(&self) -> &RateDiagnostics {
        &self.diagnostics
    }

    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    /// Completed updates.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn train_steps(&self) -> u64 {
        self.train_steps
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Tear the model down, handing the trained engine back.
    pub fn into_engine(self) -> E {
        self.engine
    }
}

fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(NarxError::DimensionMismatch {
            what,
            expected,
            got,
        })
    }
}

fn check_finite(what: &'static str, values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(NarxError::NonFinite { what })
    }
}

fn mean_squared_error(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().max(1) as f64;
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>() / n
}
