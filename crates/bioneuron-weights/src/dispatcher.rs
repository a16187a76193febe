// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Population Dispatcher
//!
//! Runs the per-neuron pipeline for every post-neuron on a rayon pool.
//! Each unit owns one column of each output matrix, so no locking is needed
//! on the outputs. Cancellation is checked before a unit starts; units that
//! are already running always finish.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ndarray::Axis;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::adapter::{AdmmSolver, QpSolver};
use crate::pipeline::{solve_neuron, NeuronSlot};
use crate::{BioneuronError, SolverParameters, WeightOutputs, WeightProblem};

/// Terminal status of a run that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Ok,
    Canceled,
}

impl SolveStatus {
    /// `0` for OK, the [`BioneuronError::Canceled`] code otherwise
    pub fn code(self) -> i32 {
        match self {
            SolveStatus::Ok => 0,
            SolveStatus::Canceled => BioneuronError::Canceled.code(),
        }
    }

    pub fn into_result(self) -> Result<(), BioneuronError> {
        match self {
            SolveStatus::Ok => Ok(()),
            SolveStatus::Canceled => Err(BioneuronError::Canceled),
        }
    }
}

/// Shared flag that stops new post-neurons from being scheduled
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    canceled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Solve all post-neurons with the default ADMM solver
pub fn solve_weights(
    problem: &WeightProblem<'_>,
    outputs: WeightOutputs<'_>,
    params: &SolverParameters,
) -> Result<SolveStatus, BioneuronError> {
    solve_weights_with(
        problem,
        outputs,
        params,
        &AdmmSolver::default(),
        &CancellationToken::new(),
    )
}

/// Solve all post-neurons with `solver`, observing `cancel`
///
/// Returns an error only when the inputs are invalid; per-neuron solver
/// failures are reported through `params.warn`.
pub fn solve_weights_with<S>(
    problem: &WeightProblem<'_>,
    outputs: WeightOutputs<'_>,
    params: &SolverParameters,
    solver: &S,
    cancel: &CancellationToken,
) -> Result<SolveStatus, BioneuronError>
where
    S: QpSolver + ?Sized,
{
    problem.validate()?;
    params.validate()?;
    outputs.validate(problem)?;

    let started = Instant::now();
    let n_post = problem.n_post;
    info!(
        target: "bioneuron-weights",
        n_pre = problem.n_pre,
        n_post,
        n_samples = problem.n_samples,
        n_threads = params.n_threads,
        "Solving synaptic weights"
    );

    let WeightOutputs {
        mut weights_exc,
        mut weights_inh,
        objective_vals,
    } = outputs;
    let objectives: Vec<Option<&mut f64>> = match objective_vals {
        Some(view) => view.into_iter().map(Some).collect(),
        None => (0..n_post).map(|_| None).collect(),
    };
    let slots: Vec<NeuronSlot<'_>> = weights_exc
        .axis_iter_mut(Axis(1))
        .zip(weights_inh.axis_iter_mut(Axis(1)))
        .zip(objectives)
        .enumerate()
        .map(|(index, ((exc, inh), objective))| NeuronSlot {
            index,
            exc,
            inh,
            objective,
        })
        .collect();

    // A single neuron runs inline, without a pool and without progress
    if n_post == 1 {
        if cancel.is_canceled() {
            return Ok(SolveStatus::Canceled);
        }
        for slot in slots {
            solve_neuron(problem, params, solver, slot);
        }
        info!(
            target: "bioneuron-weights",
            "Solved 1 neuron in {:.1} ms",
            started.elapsed().as_secs_f64() * 1000.0
        );
        return Ok(SolveStatus::Ok);
    }

    let completed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let run_unit = |slot: NeuronSlot<'_>| {
        if cancel.is_canceled() {
            return;
        }
        let report = solve_neuron(problem, params, solver, slot);
        if report.failure.is_some() {
            failed.fetch_add(1, Ordering::Relaxed);
        }
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(progress) = &params.progress {
            if !progress(done, n_post) {
                debug!(target: "bioneuron-weights", done, "Cancellation requested");
                cancel.cancel();
            }
        }
    };

    let mut builder = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("bioneuron-worker-{}", i));
    if params.n_threads > 0 {
        builder = builder.num_threads(params.n_threads);
    }
    match builder.build() {
        Ok(pool) => pool.install(|| slots.into_par_iter().for_each(|slot| run_unit(slot))),
        Err(e) => {
            warn!(
                target: "bioneuron-weights",
                "Failed to build worker pool, solving sequentially: {}", e
            );
            slots.into_iter().for_each(|slot| run_unit(slot));
        }
    }

    let status = if cancel.is_canceled() {
        SolveStatus::Canceled
    } else {
        SolveStatus::Ok
    };
    info!(
        target: "bioneuron-weights",
        completed = completed.load(Ordering::SeqCst),
        failed = failed.load(Ordering::Relaxed),
        ?status,
        "Solved {} neurons in {:.1} ms",
        n_post,
        started.elapsed().as_secs_f64() * 1000.0
    );
    Ok(status)
}
