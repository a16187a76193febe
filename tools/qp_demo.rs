// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Micro-NEF demonstration of the weight solver.
//!
//! Builds two random LIF ensembles, computes the target currents of the
//! second one over a one-dimensional stimulus `x ∈ [-1, 1]` and solves for
//! the weights connecting the first ensemble to the second. Reports the
//! elapsed time and the RMS current error. Ctrl+C cancels the solve.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use ndarray::{Array1, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use bioneuron_observability::{init_logging_with, parse_debug_flags, LogFormat, LoggingSettings};
use bioneuronqp::config::{load_config, BioneuronConfig};
use bioneuronqp::{solve, SolveOptions};

const LIF_SLOPE: f64 = 2.0 / 3.0;

/// Solve synaptic weights between two random LIF ensembles
#[derive(Parser, Debug)]
#[command(name = "qp_demo", version, long_about = None)]
struct Args {
    /// Configuration file; built-in demo settings are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Relax samples whose target current lies below this value
    #[arg(long)]
    threshold: Option<f64>,

    /// Solver tolerance (demo default: 1e-1)
    #[arg(long)]
    tolerance: Option<f64>,

    /// Regularisation (demo default: 1e-2)
    #[arg(long)]
    regularisation: Option<f64>,

    #[arg(long, default_value_t = 34812)]
    seed: u64,

    #[arg(long, default_value_t = 101)]
    n_pre: usize,

    #[arg(long, default_value_t = 102)]
    n_post: usize,

    #[arg(long, default_value_t = 100)]
    n_samples: usize,

    /// Worker threads (0 = all cores)
    #[arg(long, default_value_t = 0)]
    n_threads: usize,

    /// Print a JSON summary to stdout
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable debug logging for a crate, or "all" (repeatable)
    #[arg(long = "debug", value_name = "CRATE")]
    debug: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    seed: u64,
    n_pre: usize,
    n_post: usize,
    n_samples: usize,
    threshold: Option<f64>,
    elapsed_s: f64,
    rms_error: f64,
}

fn lif_inverse(rate: f64) -> f64 {
    let rate = if rate > 0.0 { rate } else { 0.0 };
    1.0 / (1.0 - (LIF_SLOPE - 1.0 / (rate + 1e-6)).exp())
}

fn lif_activity(j: f64) -> f64 {
    if j > 1.0 + 1e-6 {
        1.0 / (LIF_SLOPE - (1.0 - 1.0 / j).ln())
    } else {
        0.0
    }
}

/// One-dimensional LIF ensemble with random intercepts and maximum rates
struct Ensemble {
    gain: Vec<f64>,
    bias: Vec<f64>,
    encoders: Vec<f64>,
}

impl Ensemble {
    fn random(n_neurons: usize, rng: &mut StdRng) -> Self {
        let j_0 = lif_inverse(0.0);
        let mut gain = Vec::with_capacity(n_neurons);
        let mut bias = Vec::with_capacity(n_neurons);
        let mut encoders = Vec::with_capacity(n_neurons);
        for _ in 0..n_neurons {
            let intercept: f64 = rng.gen_range(-0.95..0.95);
            let max_rate: f64 = rng.gen_range(0.5..1.0);
            let j_max = lif_inverse(max_rate);
            let g = (j_0 - j_max) / (intercept - 1.0);
            gain.push(g);
            bias.push(j_max - g);
            encoders.push(if rng.gen_bool(0.5) { 1.0 } else { -1.0 });
        }
        Self {
            gain,
            bias,
            encoders,
        }
    }

    /// Somatic currents, `n_samples × n_neurons`
    fn currents(&self, xs: &Array1<f64>) -> Array2<f64> {
        Array2::from_shape_fn((xs.len(), self.gain.len()), |(s, i)| {
            self.gain[i] * self.encoders[i] * xs[s] + self.bias[i]
        })
    }

    fn activities(&self, xs: &Array1<f64>) -> Array2<f64> {
        self.currents(xs).mapv(lif_activity)
    }
}

/// RMS error; with a threshold, subthreshold targets only count when the
/// decoded current crosses it
fn rms_error(j_tar: ArrayView2<'_, f64>, j_dec: ArrayView2<'_, f64>, threshold: Option<f64>) -> f64 {
    let sum: f64 = j_tar
        .iter()
        .zip(j_dec.iter())
        .map(|(&tar, &dec)| match threshold {
            None => (tar - dec).powi(2),
            Some(th) if tar > th => (tar - dec).powi(2),
            Some(th) if tar < th && dec > th => (th - dec).powi(2),
            Some(_) => 0.0,
        })
        .sum();
    (sum / j_tar.len() as f64).sqrt()
}

fn solve_options(args: &Args, config: Option<&BioneuronConfig>) -> SolveOptions {
    let mut options = match config {
        Some(config) => SolveOptions::from_config(config),
        None => {
            let mut options = SolveOptions::default();
            options.params.tolerance = 1e-1;
            options.params.renormalise = false;
            options.regularisation = 1e-2;
            options
        }
    };
    if let Some(tolerance) = args.tolerance {
        options.params.tolerance = tolerance;
    }
    if let Some(regularisation) = args.regularisation {
        options.regularisation = regularisation;
    }
    if args.threshold.is_some() {
        options.j_threshold = args.threshold;
    }
    if args.n_threads > 0 {
        options.params.n_threads = args.n_threads;
    }
    options
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Some(
            load_config(Some(path), None)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
        ),
        None => None,
    };

    let logging = match &config {
        Some(config) => LoggingSettings {
            level: config.logging.level.clone(),
            format: config.logging.format.parse::<LogFormat>()?,
        },
        None => LoggingSettings::default(),
    };
    let debug_flags = parse_debug_flags(args.debug.iter().map(|c| format!("--debug-{}", c)));
    init_logging_with(&debug_flags, &logging)?;

    let canceled = Arc::new(AtomicBool::new(false));
    let flag = canceled.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let pre = Ensemble::random(args.n_pre, &mut rng);
    let post = Ensemble::random(args.n_post, &mut rng);

    let xs = Array1::linspace(-1.0, 1.0, args.n_samples);
    let a_pre = pre.activities(&xs);
    let j_post = post.currents(&xs);

    let mut options = solve_options(&args, config.as_ref());
    options.params = options.params.with_progress(move |done, total| {
        if canceled.load(Ordering::SeqCst) {
            return false;
        }
        eprint!("\rSolved {}/{} neuron weights", done, total);
        true
    });

    info!(
        target: "bioneuronqp",
        n_pre = args.n_pre,
        n_post = args.n_post,
        n_samples = args.n_samples,
        "Solving weights"
    );
    let started = Instant::now();
    let result = solve(a_pre.view(), j_post.view(), &options);
    eprintln!();
    let solution = result.context("Solving weights failed")?;
    let elapsed_s = started.elapsed().as_secs_f64();

    let j_dec = a_pre.dot(&solution.weights_exc) - a_pre.dot(&solution.weights_inh);
    let summary = Summary {
        seed: args.seed,
        n_pre: args.n_pre,
        n_post: args.n_post,
        n_samples: args.n_samples,
        threshold: options.j_threshold,
        elapsed_s,
        rms_error: rms_error(j_post.view(), j_dec.view(), options.j_threshold),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Time : {:.3} s", summary.elapsed_s);
        println!("Error: {:.6}", summary.rms_error);
    }
    Ok(())
}
