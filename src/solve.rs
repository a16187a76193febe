// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! High-level weight solving on owned matrices
//!
//! Wraps [`solve_weights_with`] with the conveniences most callers want:
//! all-to-all connectivity when no connection matrix is given, one model
//! vector shared by every post-neuron, and freshly allocated outputs.

use ndarray::{Array1, Array2, ArrayView2, CowArray, Ix2};
use tracing::debug;

use bioneuron_config::BioneuronConfig;
use bioneuron_weights::model::MODEL_COEFFICIENTS;
use bioneuron_weights::problem::DEFAULT_REGULARISATION;
use bioneuron_weights::{
    solve_weights_with, AdmmSolver, BioneuronError, CancellationToken, SolverParameters,
    WeightOutputs, WeightProblem,
};

/// Model of a current-based LIF neuron, `J = g_E - g_I`
pub const LIF_CURRENT_MODEL: [f64; MODEL_COEFFICIENTS] = [0.0, 1.0, -1.0, 1.0, 0.0, 0.0];

/// Current-response model coefficients `[a0, a1, a2, b0, b1, b2]`
#[derive(Debug, Clone, PartialEq)]
pub enum ModelWeights {
    /// Same coefficients for every post-neuron
    Shared([f64; MODEL_COEFFICIENTS]),
    /// One row per post-neuron, `n_post × 6`
    PerNeuron(Array2<f64>),
}

impl Default for ModelWeights {
    fn default() -> Self {
        ModelWeights::Shared(LIF_CURRENT_MODEL)
    }
}

#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub model: ModelWeights,
    /// Excitatory candidate synapses `n_pre × n_post`, all-to-all if `None`
    pub connection_exc: Option<Array2<bool>>,
    /// Inhibitory candidate synapses `n_pre × n_post`, all-to-all if `None`
    pub connection_inh: Option<Array2<bool>>,
    /// Relax samples whose target lies below this current; `None` disables relaxation
    pub j_threshold: Option<f64>,
    pub non_negative: bool,
    pub regularisation: f64,
    pub return_objective_vals: bool,
    pub params: SolverParameters,
    pub solver: AdmmSolver,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            model: ModelWeights::default(),
            connection_exc: None,
            connection_inh: None,
            j_threshold: None,
            non_negative: true,
            regularisation: DEFAULT_REGULARISATION,
            return_objective_vals: false,
            params: SolverParameters::default(),
            solver: AdmmSolver::default(),
        }
    }
}

impl SolveOptions {
    /// Options taken from the `[solver]` and `[problem]` configuration sections
    pub fn from_config(config: &BioneuronConfig) -> Self {
        Self {
            j_threshold: config
                .problem
                .relax_subthreshold
                .then_some(config.problem.j_threshold),
            non_negative: config.problem.non_negative,
            regularisation: config.problem.regularisation,
            params: SolverParameters::from_config(&config.solver),
            solver: AdmmSolver::from_config(&config.solver),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: ModelWeights) -> Self {
        self.model = model;
        self
    }

    pub fn with_connectivity(mut self, exc: Array2<bool>, inh: Array2<bool>) -> Self {
        self.connection_exc = Some(exc);
        self.connection_inh = Some(inh);
        self
    }

    pub fn with_threshold(mut self, j_threshold: Option<f64>) -> Self {
        self.j_threshold = j_threshold;
        self
    }
}

/// Weights solved by [`solve`]
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSolution {
    /// `n_pre × n_post`
    pub weights_exc: Array2<f64>,
    /// `n_pre × n_post`
    pub weights_inh: Array2<f64>,
    /// Objective value per post-neuron, if requested
    pub objective_vals: Option<Array1<f64>>,
}

fn connectivity(
    matrix: Option<&Array2<bool>>,
    n_pre: usize,
    n_post: usize,
) -> CowArray<'_, bool, Ix2> {
    match matrix {
        Some(matrix) => CowArray::from(matrix.view()),
        None => CowArray::from(Array2::from_elem((n_pre, n_post), true)),
    }
}

fn model_matrix(model: &ModelWeights, n_post: usize) -> CowArray<'_, f64, Ix2> {
    match model {
        ModelWeights::Shared(coefficients) => CowArray::from(Array2::from_shape_fn(
            (n_post, MODEL_COEFFICIENTS),
            |(_, c)| coefficients[c],
        )),
        ModelWeights::PerNeuron(matrix) => CowArray::from(matrix.view()),
    }
}

/// Solve for the weights of every post-neuron
///
/// `a_pre` is `n_samples × n_pre`, `j_post` is `n_samples × n_post`.
///
/// # Errors
///
/// Returns the [`BioneuronError`] of the first invalid input, or
/// [`BioneuronError::Canceled`] if the progress callback stopped the run.
pub fn solve(
    a_pre: ArrayView2<'_, f64>,
    j_post: ArrayView2<'_, f64>,
    options: &SolveOptions,
) -> Result<WeightSolution, BioneuronError> {
    solve_with_cancel(a_pre, j_post, options, &CancellationToken::new())
}

/// [`solve`] observing an external cancellation token
pub fn solve_with_cancel(
    a_pre: ArrayView2<'_, f64>,
    j_post: ArrayView2<'_, f64>,
    options: &SolveOptions,
    cancel: &CancellationToken,
) -> Result<WeightSolution, BioneuronError> {
    let n_pre = a_pre.ncols();
    let n_post = j_post.ncols();

    let model = model_matrix(&options.model, n_post);
    let exc = connectivity(options.connection_exc.as_ref(), n_pre, n_post);
    let inh = connectivity(options.connection_inh.as_ref(), n_pre, n_post);

    let mut problem = WeightProblem::new(a_pre, j_post, model.view(), exc.view(), inh.view())
        .with_regularisation(options.regularisation)
        .with_non_negative(options.non_negative);
    if let Some(j_threshold) = options.j_threshold {
        problem = problem.with_subthreshold_relaxation(j_threshold);
    }

    let mut weights_exc = Array2::zeros((n_pre, n_post));
    let mut weights_inh = Array2::zeros((n_pre, n_post));
    let mut objective_vals = options
        .return_objective_vals
        .then(|| Array1::zeros(n_post));

    let mut outputs = WeightOutputs::new(weights_exc.view_mut(), weights_inh.view_mut());
    if let Some(objective_vals) = objective_vals.as_mut() {
        outputs = outputs.with_objective_vals(objective_vals.view_mut());
    }

    let status = solve_weights_with(&problem, outputs, &options.params, &options.solver, cancel)?;
    debug!(target: "bioneuronqp", ?status, "High-level solve finished");
    status.into_result()?;

    Ok(WeightSolution {
        weights_exc,
        weights_inh,
        objective_vals,
    })
}
