// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # bioneuronqp - Biologically Constrained Synaptic Weights
//!
//! Solves for the incoming excitatory and inhibitory weights of a
//! population of post-neurons so that presynaptic activities reproduce
//! target somatic currents. Each post-neuron is an independent sparse
//! convex QP; the population is solved in parallel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bioneuronqp::prelude::*;
//! use ndarray::Array2;
//!
//! let a_pre = Array2::<f64>::zeros((100, 20));   // n_samples × n_pre
//! let j_post = Array2::<f64>::zeros((100, 10));  // n_samples × n_post
//!
//! let options = SolveOptions::default().with_threshold(Some(0.0));
//! let solution = solve(a_pre.view(), j_post.view(), &options)?;
//! println!("{:?}", solution.weights_exc.dim());
//! # Ok::<(), BioneuronError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: bioneuron-config, bioneuron-observability  │
//! │  (TOML + overrides, logging setup)                      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Solver: bioneuron-qp                                   │
//! │  (ADMM, sparse LDLᵀ, infeasibility detection, polish)   │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Weights: bioneuron-weights                             │
//! │  (QP assembly, per-neuron pipeline, parallel dispatch)  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use bioneuron_config as config;
pub use bioneuron_qp as qp;
pub use bioneuron_weights as weights;

pub mod solve;

pub use solve::{
    solve, solve_with_cancel, ModelWeights, SolveOptions, WeightSolution, LIF_CURRENT_MODEL,
};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::solve::{
        solve, solve_with_cancel, ModelWeights, SolveOptions, WeightSolution, LIF_CURRENT_MODEL,
    };

    pub use bioneuron_config::{load_config, BioneuronConfig};
    pub use bioneuron_weights::{
        solve_weights, solve_weights_with, strerror, AdmmSolver, BioneuronError,
        CancellationToken, QpSolver, SolveStatus, SolverParameters, WeightOutputs, WeightProblem,
    };
}
