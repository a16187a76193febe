// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Solver Adapter
//!
//! Hands an assembled [`QpInstance`] to a QP solver and normalises the
//! result into a `(status, objective, x)` triple. The inequality rows are
//! one-sided: every lower bound is the most negative representable value.

use bioneuron_config::SolverConfig;
use bioneuron_qp::{Problem, Settings};
use tracing::trace;

use crate::assembler::QpInstance;
use crate::SolveFailure;

/// Normalised solver result
#[derive(Debug, Clone)]
pub struct QpOutcome {
    pub status: Result<(), SolveFailure>,
    pub objective: f64,
    /// Primal solution; empty when the solver could not be set up
    pub x: Vec<f64>,
}

/// Anything able to solve `min ½xᵀPx + qᵀx  s.t.  Gx ≤ h`
///
/// Implementations are shared by all worker threads.
pub trait QpSolver: Sync {
    /// `max_iter == 0` keeps the solver's own iteration cap
    fn solve(&self, instance: &QpInstance, tolerance: f64, max_iter: usize) -> QpOutcome;
}

/// The ADMM solver from `bioneuron-qp`, configured for weight problems
///
/// Scaling and scaled termination stay off because the model is already
/// renormalised before assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmmSolver {
    pub rho: f64,
    pub alpha: f64,
    pub polish: bool,
    pub polish_refine_iter: usize,
}

impl Default for AdmmSolver {
    fn default() -> Self {
        Self {
            rho: 0.1,
            alpha: 1.6,
            polish: true,
            polish_refine_iter: 3,
        }
    }
}

impl AdmmSolver {
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            rho: config.rho,
            polish: config.polish,
            polish_refine_iter: config.polish_refine_iter,
            ..Self::default()
        }
    }

    pub fn settings(&self, tolerance: f64, max_iter: usize) -> Settings {
        let defaults = Settings::default();
        Settings {
            rho: self.rho,
            alpha: self.alpha,
            eps_abs: tolerance,
            eps_rel: tolerance,
            max_iter: if max_iter > 0 { max_iter } else { defaults.max_iter },
            scaling: 0,
            scaled_termination: false,
            polish: self.polish,
            polish_refine_iter: self.polish_refine_iter,
            ..defaults
        }
    }
}

impl QpSolver for AdmmSolver {
    fn solve(&self, instance: &QpInstance, tolerance: f64, max_iter: usize) -> QpOutcome {
        let lower = vec![f64::MIN; instance.n_constraints()];
        let problem = Problem::new(
            instance.p.view(),
            &instance.q,
            instance.g.view(),
            &lower,
            &instance.h,
        );

        match bioneuron_qp::solve(&problem, &self.settings(tolerance, max_iter)) {
            Ok(solution) => {
                trace!(
                    target: "bioneuron-weights",
                    status = %solution.status,
                    iterations = solution.iterations,
                    polished = solution.polished,
                    "QP solved"
                );
                QpOutcome {
                    status: SolveFailure::check(solution.status),
                    objective: solution.obj_val,
                    x: solution.x,
                }
            }
            Err(err) => {
                trace!(target: "bioneuron-weights", "QP setup failed: {}", err);
                QpOutcome {
                    status: Err(SolveFailure::from(&err)),
                    objective: 0.0,
                    x: Vec::new(),
                }
            }
        }
    }
}
