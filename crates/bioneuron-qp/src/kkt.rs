// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Quasi-definite KKT assembly and factorisation

use sprs::{CsMat, CsMatView, FillInReduction, SymmetryCheck, TriMat};
use sprs_ldl::{Ldl, LdlNumeric};

use crate::{QpSetupError, Result};

/// Assemble `[[P + σI, Aᵀ], [A, -diag(1/ρ)]]` with both triangles populated
pub(crate) fn assemble(
    p: CsMatView<'_, f64>,
    a: CsMatView<'_, f64>,
    sigma: f64,
    rho_vec: &[f64],
) -> CsMat<f64> {
    let n = p.cols();
    let m = a.rows();
    let capacity = 2 * (p.nnz() + a.nnz()) + n + m;
    let mut tri = TriMat::with_capacity((n + m, n + m), capacity);

    for (j, col) in p.outer_iterator().enumerate() {
        for (i, &v) in col.iter() {
            tri.add_triplet(i, j, v);
            if i != j {
                tri.add_triplet(j, i, v);
            }
        }
    }
    // Duplicates are summed on compression, so the diagonal is always present
    for i in 0..n {
        tri.add_triplet(i, i, sigma);
    }
    for (j, col) in a.outer_iterator().enumerate() {
        for (i, &v) in col.iter() {
            tri.add_triplet(n + i, j, v);
            tri.add_triplet(j, n + i, v);
        }
    }
    for (i, &rho) in rho_vec.iter().enumerate() {
        tri.add_triplet(n + i, n + i, -1.0 / rho);
    }
    tri.to_csc()
}

/// LDLᵀ factorisation of a quasi-definite KKT matrix
///
/// `sprs-ldl` needs at least two rows, so a 1×1 system keeps its single
/// pivot instead.
pub(crate) enum KktFactor {
    Scalar(f64),
    Ldl(LdlNumeric<f64, usize>),
}

impl KktFactor {
    /// Factor `kkt`, whose leading `n` rows belong to the primal block
    ///
    /// A convex problem yields exactly `n` positive pivots; fewer means the
    /// primal block is indefinite.
    pub(crate) fn new(kkt: CsMatView<'_, f64>, n: usize) -> Result<Self> {
        if kkt.rows() == 1 {
            let d = kkt.get(0, 0).copied().unwrap_or(0.0);
            if n == 1 && !(d > 0.0) {
                return Err(QpSetupError::NonConvex);
            }
            if d == 0.0 || !d.is_finite() {
                return Err(QpSetupError::LinsysSolverInit(format!(
                    "singular 1x1 KKT system (pivot {})",
                    d
                )));
            }
            return Ok(Self::Scalar(d));
        }

        let ldl = Ldl::new()
            .fill_in_reduction(FillInReduction::ReverseCuthillMcKee)
            .check_symmetry(SymmetryCheck::DontCheckSymmetry)
            .numeric(kkt)
            .map_err(|e| QpSetupError::LinsysSolverInit(format!("{:?}", e)))?;

        let positive = ldl.d().iter().filter(|&&d| d > 0.0).count();
        if positive < n {
            return Err(QpSetupError::NonConvex);
        }
        Ok(Self::Ldl(ldl))
    }

    pub(crate) fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        match self {
            Self::Scalar(d) => rhs.iter().map(|r| r / d).collect(),
            Self::Ldl(ldl) => ldl.solve(rhs),
        }
    }
}
