/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! # Sparse Convex QP Solver
//!
//! Solves problems of the form
//!
//! ```text
//! minimize    ½ xᵀ P x + qᵀ x
//! subject to  l ≤ A x ≤ u
//! ```
//!
//! using the operator-splitting (ADMM) scheme popularised by OSQP:
//! - **Setup**: optional Ruiz equilibration, factorisation of the quasi-definite
//!   KKT matrix `[[P + σI, Aᵀ], [A, -ρ⁻¹I]]` with a sparse LDLᵀ
//! - **Iteration**: one back-substitution per step, projection onto `[l, u]`
//! - **Termination**: primal/dual residual tests plus primal and dual
//!   infeasibility certificates
//! - **Polishing**: optional active-set refinement of the ADMM solution
//!
//! `P` is given as the upper triangle of a symmetric matrix in CSC storage.
//! Bounds beyond ±[`INFTY`] are treated as infinite.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod admm;
mod kkt;
mod linalg;
mod polish;
mod scaling;

pub mod problem;
pub mod settings;
pub mod status;

pub use admm::{solve, Solution};
pub use problem::Problem;
pub use settings::Settings;
pub use status::{QpSetupError, QpStatus};

/// Bounds with magnitude above this value are treated as infinite
pub const INFTY: f64 = 1e30;

/// Result type for solver setup
pub type Result<T> = std::result::Result<T, QpSetupError>;
