// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Per-Neuron Pipeline
//!
//! Computes the incoming weights of a single post-neuron `j`:
//!
//! 1. zero column `j` of both output matrices
//! 2. count the connected presynaptic neurons (nothing else happens if none)
//! 3. optionally renormalise the model
//! 4. warn when the largest target current is out of reach
//! 5. build the regression `A x ≈ b` (excitatory columns first)
//! 6. mark subthreshold samples as relaxed
//! 7. assemble and solve the QP
//! 8. clamp weights to be nonnegative if requested
//! 9. scatter the weights back into column `j`
//! 10. record the objective value

use ndarray::{Array1, Array2, ArrayViewMut1, Zip};
use tracing::{debug, trace};

use crate::adapter::QpSolver;
use crate::assembler::assemble;
use crate::model::{ModelCoefficients, Normalisation};
use crate::{SolveFailure, SolverParameters, WeightProblem};

/// Output locations owned by one post-neuron
#[derive(Debug)]
pub struct NeuronSlot<'o> {
    pub index: usize,
    /// Column `index` of the excitatory weight matrix
    pub exc: ArrayViewMut1<'o, f64>,
    /// Column `index` of the inhibitory weight matrix
    pub inh: ArrayViewMut1<'o, f64>,
    pub objective: Option<&'o mut f64>,
}

/// What happened while solving one post-neuron
#[derive(Debug, Clone, PartialEq)]
pub struct NeuronReport {
    pub index: usize,
    pub n_exc: usize,
    pub n_inh: usize,
    /// Rows of the regression matrix, zero when no QP was built
    pub n_rows: usize,
    /// Weight variables plus slack variables
    pub n_vars: usize,
    pub n_slack: usize,
    pub solved: bool,
    pub failure: Option<SolveFailure>,
}

impl NeuronReport {
    fn skipped(index: usize) -> Self {
        Self {
            index,
            n_exc: 0,
            n_inh: 0,
            n_rows: 0,
            n_vars: 0,
            n_slack: 0,
            solved: false,
            failure: None,
        }
    }
}

/// Run the full pipeline for the post-neuron described by `slot`
///
/// Solver failures never abort: they are passed to the warning callback and
/// the neuron keeps whatever (possibly partial) weights the solver returned.
pub fn solve_neuron<S>(
    problem: &WeightProblem<'_>,
    params: &SolverParameters,
    solver: &S,
    slot: NeuronSlot<'_>,
) -> NeuronReport
where
    S: QpSolver + ?Sized,
{
    let NeuronSlot {
        index: j,
        mut exc,
        mut inh,
        objective,
    } = slot;

    exc.fill(0.0);
    inh.fill(0.0);

    let exc_mask = problem.connection_exc.column(j);
    let inh_mask = problem.connection_inh.column(j);
    let n_exc = exc_mask.iter().filter(|&&c| c).count();
    let n_inh = inh_mask.iter().filter(|&&c| c).count();
    let n_tot = n_exc + n_inh;
    if n_tot == 0 {
        trace!(target: "bioneuron-weights", neuron = j, "No presynaptic connections");
        return NeuronReport::skipped(j);
    }

    let Some(model) = ModelCoefficients::from_row(problem.model_weights.row(j)) else {
        debug!(target: "bioneuron-weights", neuron = j, "Model row must hold six coefficients");
        return NeuronReport::skipped(j);
    };
    let (model, norm) = if params.renormalise {
        model.renormalised()
    } else {
        (model, Normalisation::IDENTITY)
    };

    let j_post = problem.j_post.column(j);
    if params.warn.is_some() {
        let j_max = j_post.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        if let Some(message) = model.feasibility_warning(j, j_max) {
            params.emit_warning(&message, j);
        }
    }

    // Excitatory columns occupy [0, n_exc), inhibitory ones [n_exc, n_tot)
    let exc_gain: Array1<f64> = j_post.mapv(|v| model.excitatory_gain(v));
    let inh_gain: Array1<f64> = j_post.mapv(|v| model.inhibitory_gain(v));
    let mut a = Array2::<f64>::zeros((problem.n_samples, n_tot));
    let (mut i_exc, mut i_inh) = (0, n_exc);
    for i in 0..problem.n_pre {
        let activity = problem.a_pre.column(i);
        if exc_mask[i] {
            Zip::from(a.column_mut(i_exc))
                .and(&exc_gain)
                .and(&activity)
                .for_each(|out, &gain, &act| *out = gain * act);
            i_exc += 1;
        }
        if inh_mask[i] {
            Zip::from(a.column_mut(i_inh))
                .and(&inh_gain)
                .and(&activity)
                .for_each(|out, &gain, &act| *out = gain * act);
            i_inh += 1;
        }
    }
    let b: Array1<f64> = j_post.mapv(|v| model.target(v));

    let valid: Vec<bool> = j_post
        .iter()
        .map(|&v| !(problem.relax_subthreshold && v < problem.j_threshold))
        .collect();

    let instance = assemble(
        a.view(),
        b.view(),
        &valid,
        model.threshold_bound(problem.j_threshold),
        problem.regularisation * norm.lambda_scale,
        problem.non_negative,
    );
    debug!(
        target: "bioneuron-weights",
        neuron = j,
        n_exc,
        n_inh,
        n_slack = instance.n_slack,
        n_constraints = instance.n_constraints(),
        "Solving weights"
    );

    let mut outcome = solver.solve(&instance, params.tolerance, params.max_iter);
    let failure = outcome.status.err();
    if let Some(reason) = failure {
        let message = format!(
            "Error while computing weights for post-neuron {}. {}",
            j, reason
        );
        debug!(target: "bioneuron-weights", neuron = j, "{}", message);
        params.emit_warning(&message, j);
    }

    if problem.non_negative {
        // f64::max maps NaN to 0 as well
        for w in outcome.x.iter_mut().take(n_tot) {
            *w = w.max(0.0);
        }
    }

    if outcome.x.len() >= n_tot {
        let (mut i_exc, mut i_inh) = (0, n_exc);
        for i in 0..problem.n_pre {
            if exc_mask[i] {
                exc[i] = outcome.x[i_exc] * norm.weight_scale;
                i_exc += 1;
            }
            if inh_mask[i] {
                inh[i] = outcome.x[i_inh] * norm.weight_scale;
                i_inh += 1;
            }
        }
    }

    if let Some(objective) = objective {
        *objective = outcome.objective;
    }

    NeuronReport {
        index: j,
        n_exc,
        n_inh,
        n_rows: a.nrows(),
        n_vars: instance.n_vars(),
        n_slack: instance.n_slack,
        solved: failure.is_none(),
        failure,
    }
}
