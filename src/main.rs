//! narxnet: online NARX identification of a NARMA-10 plant.
//!
//! Runs a series-parallel training phase (measured output fed back, weights
//! updated every step) followed by a parallel free-run (the model feeds back
//! its own predictions, no training) and prints one record per step.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use serde::Serialize;
use tracing::info;

use narxnet::narma::Narma10;
use narxnet::{NarxConfig, NarxMode, NarxModel, RateStrategy, UpdateOptions};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "narxnet")]
#[command(about = "Online NARX identification of a NARMA-10 plant")]
#[command(version)]
struct CliArgs {
    /// Model config (TOML). Without it: $NARX_CONFIG, ./narx.toml, built-in defaults
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Total number of time steps
    #[arg(long, default_value = "3000")]
    steps: u64,

    /// Series-parallel training steps before the parallel free-run
    #[arg(long, default_value = "2500")]
    train_steps: u64,

    /// Learning-rate adaptation during training
    #[arg(long, value_enum, default_value = "bold")]
    rate: RateArg,

    /// Seed for weights and excitation (overrides the config seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Per-step record format
    #[arg(long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Only print the summary
    #[arg(short, long)]
    quiet: bool,

    /// Emit logs as JSON
    #[arg(long, env = "NARX_LOG_JSON")]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RateArg {
    Fixed,
    Prop,
    Bold,
}

impl From<RateArg> for RateStrategy {
    fn from(arg: RateArg) -> Self {
        match arg {
            RateArg::Fixed => Self::Fixed,
            RateArg::Prop => Self::Proportional,
            RateArg::Bold => Self::BoldDriver,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Serialize)]
struct StepRecord {
    step: u64,
    mode: NarxMode,
    input: f64,
    measured: f64,
    predicted: f64,
    mse: f64,
    learning_rate: f64,
}

/// Squared-error accumulator for one phase.
#[derive(Debug, Default)]
struct PhaseError {
    sum_sq: f64,
    count: u64,
}

impl PhaseError {
    fn add(&mut self, err: f64) {
        self.sum_sq += err * err;
        self.count += 1;
    }

    fn rmse(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sum_sq / self.count as f64).sqrt()
    }
}

fn write_record(out: &mut impl Write, format: OutputFormat, rec: &StepRecord) -> Result<()> {
    match format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string(rec)?)?;
        }
        OutputFormat::Csv => {
            writeln!(
                out,
                "{},{},{:.6},{:.6},{:.6},{:.6e},{:.6e}",
                rec.step,
                rec.mode,
                rec.input,
                rec.measured,
                rec.predicted,
                rec.mse,
                rec.learning_rate
            )?;
        }
    }
    Ok(())
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let mut config = match &args.config {
        Some(path) => NarxConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => NarxConfig::load(),
    };
    if config.signal_len != 1 || config.input_len != 1 {
        bail!(
            "NARMA-10 is single-input single-output; got signal_len={} input_len={}",
            config.signal_len,
            config.input_len
        );
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.train_steps > args.steps {
        bail!("--train-steps ({}) exceeds --steps ({})", args.train_steps, args.steps);
    }

    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
    let excitation = Uniform::new_inclusive(0.0, 0.5);
    let mut plant = Narma10::new();
    let mut model = NarxModel::new(config).context("Failed to create NARX model")?;

    let train_opts = UpdateOptions::train().with_rate(args.rate.into());
    let free_opts = UpdateOptions::predict();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if !args.quiet && matches!(args.format, OutputFormat::Csv) {
        writeln!(out, "step,mode,input,measured,predicted,mse,learning_rate")?;
    }

    info!(
        steps = args.steps,
        train_steps = args.train_steps,
        rate = ?args.rate,
        "Starting NARMA-10 identification"
    );

    let mut train_err = PhaseError::default();
    let mut free_err = PhaseError::default();
    let mut u_prev = 0.0;

    for k in 0..args.steps {
        let measured = plant.step(u_prev);
        let u = excitation.sample(&mut rng);

        let training = k < args.train_steps;
        let (mode, opts) = if training {
            (NarxMode::SeriesParallel, train_opts)
        } else {
            (NarxMode::Parallel, free_opts)
        };
        model
            .update(&[measured], &[u], mode, opts)
            .with_context(|| format!("Update failed at step {k}"))?;

        let predicted = model.prediction()[0];
        if training {
            train_err.add(measured - predicted);
        } else {
            free_err.add(measured - predicted);
        }

        if !args.quiet {
            let rec = StepRecord {
                step: k,
                mode,
                input: u,
                measured,
                predicted,
                mse: model.mse(),
                learning_rate: model.learning_rate(),
            };
            write_record(&mut out, args.format, &rec)?;
        }
        u_prev = u;
    }
    out.flush().context("Failed to flush output")?;

    let diag = model.diagnostics();
    info!(
        train_rmse = train_err.rmse(),
        free_run_rmse = free_err.rmse(),
        final_mse = model.mse(),
        learning_rate = model.learning_rate(),
        increases = diag.increases,
        decreases = diag.decreases,
        clamps = diag.clamps,
        divergences = diag.divergences,
        rollbacks = diag.rollbacks,
        "Run complete"
    );

    Ok(())
}
