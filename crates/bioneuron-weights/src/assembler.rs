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

//! # Sparse QP Assembler
//!
//! Turns the dense regression `A x ≈ b` of one post-neuron into
//!
//! ```text
//! minimize    ½ [x; s]ᵀ P [x; s] + qᵀ [x; s]
//! subject to  G [x; s] ≤ h
//! ```
//!
//! with
//! - `P = [[Aᵀ_v A_v + λI, 0], [0, I]]` (upper triangle only),
//!   `λ = n_samples · regularisation`
//! - `q = [-Aᵀ_v b_v; 0]`
//! - one row `A_i x - s_i ≤ threshold_bound` per relaxed sample `i`
//! - one row `-100·x_k ≤ 0` per weight when weights must be nonnegative
//!
//! where `A_v`, `b_v` hold the valid samples and `s` the slack variables.

use ndarray::{ArrayView1, ArrayView2, Axis};
use sprs::{CsMat, TriMat};

/// Coefficient of the soft nonnegativity rows
pub const NON_NEGATIVE_PENALTY: f64 = 100.0;

/// A fully assembled QP for one post-neuron
#[derive(Debug, Clone)]
pub struct QpInstance {
    /// Upper triangle of the objective matrix, CSC
    pub p: CsMat<f64>,
    pub q: Vec<f64>,
    /// Inequality matrix, CSC
    pub g: CsMat<f64>,
    /// Upper bounds of the inequality rows
    pub h: Vec<f64>,
    pub n_weights: usize,
    pub n_slack: usize,
}

impl QpInstance {
    /// Weights followed by slack variables
    pub fn n_vars(&self) -> usize {
        self.n_weights + self.n_slack
    }

    pub fn n_constraints(&self) -> usize {
        self.h.len()
    }
}

/// Build the QP for the regression `a x ≈ b`
///
/// `valid[i] == false` moves sample `i` out of the least-squares term and
/// into a slack-relaxed inequality bounded by `threshold_bound`.
pub fn assemble(
    a: ArrayView2<'_, f64>,
    b: ArrayView1<'_, f64>,
    valid: &[bool],
    threshold_bound: f64,
    regularisation: f64,
    non_negative: bool,
) -> QpInstance {
    let (n_samples, n_weights) = a.dim();
    debug_assert_eq!(b.len(), n_samples);
    debug_assert_eq!(valid.len(), n_samples);

    let valid_rows: Vec<usize> = (0..n_samples).filter(|&i| valid[i]).collect();
    let invalid_rows: Vec<usize> = (0..n_samples).filter(|&i| !valid[i]).collect();
    let n_slack = invalid_rows.len();
    let n_vars = n_weights + n_slack;

    let a_valid = a.select(Axis(0), &valid_rows);
    let b_valid = b.select(Axis(0), &valid_rows);

    let mut gram = a_valid.t().dot(&a_valid);
    let lambda = n_samples as f64 * regularisation;
    gram.diag_mut().mapv_inplace(|d| d + lambda);

    // Objective: dense upper triangle of the Gram block, unit slack penalty
    let mut p = TriMat::with_capacity((n_vars, n_vars), n_weights * (n_weights + 1) / 2 + n_slack);
    for j in 0..n_weights {
        for i in 0..=j {
            p.add_triplet(i, j, gram[[i, j]]);
        }
    }
    for k in n_weights..n_vars {
        p.add_triplet(k, k, 1.0);
    }

    let mut q = vec![0.0; n_vars];
    for (qk, v) in q.iter_mut().zip(a_valid.t().dot(&b_valid).iter()) {
        *qk = -v;
    }

    let n_rows = n_slack + if non_negative { n_weights } else { 0 };
    let mut g = TriMat::with_capacity((n_rows, n_vars), n_slack * (n_weights + 1) + n_weights);
    let mut h = vec![0.0; n_rows];
    for (row, &i) in invalid_rows.iter().enumerate() {
        for (k, &v) in a.row(i).iter().enumerate() {
            g.add_triplet(row, k, v);
        }
        g.add_triplet(row, n_weights + row, -1.0);
        h[row] = threshold_bound;
    }
    if non_negative {
        for k in 0..n_weights {
            g.add_triplet(n_slack + k, k, -NON_NEGATIVE_PENALTY);
        }
    }

    QpInstance {
        p: p.to_csc(),
        q,
        g: g.to_csc(),
        h,
        n_weights,
        n_slack,
    }
}
