/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # Synaptic Weight Solver
//!
//! Computes the incoming synaptic weights of a population of post-neurons
//! so that the weighted presynaptic activities reproduce recorded target
//! currents under a rational current-response model.
//!
//! Every post-neuron is an independent convex QP:
//! - **Assembler** ([`assembler`]): regularised least squares with
//!   slack-relaxed subthreshold samples and optional nonnegativity rows
//! - **Solver Adapter** ([`adapter`]): the [`QpSolver`] seam, backed by the
//!   ADMM solver from `bioneuron-qp`
//! - **Pipeline** ([`pipeline`]): model renormalisation, regression
//!   assembly, post-processing and scattering into the output columns
//! - **Dispatcher** ([`dispatcher`]): parallel execution over all
//!   post-neurons with progress reporting and cancellation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bioneuron_weights::{solve_weights, SolverParameters, WeightOutputs, WeightProblem};
//! use ndarray::Array2;
//!
//! let a_pre = Array2::<f64>::zeros((100, 20));
//! let j_post = Array2::<f64>::zeros((100, 10));
//! let model = Array2::<f64>::zeros((10, 6));
//! let exc = Array2::from_elem((20, 10), true);
//! let inh = Array2::from_elem((20, 10), false);
//! let mut w_exc = Array2::<f64>::zeros((20, 10));
//! let mut w_inh = Array2::<f64>::zeros((20, 10));
//!
//! let problem = WeightProblem::new(a_pre.view(), j_post.view(), model.view(), exc.view(), inh.view());
//! let outputs = WeightOutputs::new(w_exc.view_mut(), w_inh.view_mut());
//! let status = solve_weights(&problem, outputs, &SolverParameters::default()).unwrap();
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod adapter;
pub mod assembler;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod params;
pub mod pipeline;
pub mod problem;

pub use adapter::{AdmmSolver, QpOutcome, QpSolver};
pub use assembler::{assemble, QpInstance};
pub use dispatcher::{solve_weights, solve_weights_with, CancellationToken, SolveStatus};
pub use error::{strerror, BioneuronError, SolveFailure};
pub use model::{ModelCoefficients, Normalisation};
pub use params::{ProgressCallback, SolverParameters, WarningCallback};
pub use pipeline::{solve_neuron, NeuronReport, NeuronSlot};
pub use problem::{WeightOutputs, WeightProblem};
