// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Ruiz equilibration
//!
//! Produces `P̄ = c·D P D`, `q̄ = c·D q`, `Ā = E A D`, `l̄ = E l`, `ū = E u`.
//! Solutions map back with `x = D x̄`, `z = E⁻¹ z̄`, `y = E ȳ / c`.

use sprs::{CsMat, CsMatView};

use crate::linalg::{col_row_norms, norm_inf, rescale, sym_col_norms};

const MIN_SCALING: f64 = 1e-4;
const MAX_SCALING: f64 = 1e4;

/// Owned copy of the equilibrated problem
pub(crate) struct ScaledData {
    pub p: CsMat<f64>,
    pub q: Vec<f64>,
    pub a: CsMat<f64>,
    pub l: Vec<f64>,
    pub u: Vec<f64>,
}

/// Accumulated scaling factors
#[derive(Debug, Clone)]
pub(crate) struct Scaling {
    pub d: Vec<f64>,
    pub e: Vec<f64>,
    pub c: f64,
}

impl Scaling {
    pub(crate) fn unscale_x(&self, x: &[f64]) -> Vec<f64> {
        x.iter().zip(&self.d).map(|(v, d)| v * d).collect()
    }

    pub(crate) fn unscale_z(&self, z: &[f64]) -> Vec<f64> {
        z.iter().zip(&self.e).map(|(v, e)| v / e).collect()
    }

    pub(crate) fn unscale_y(&self, y: &[f64]) -> Vec<f64> {
        y.iter().zip(&self.e).map(|(v, e)| v * e / self.c).collect()
    }
}

#[inline]
fn limit(v: f64) -> f64 {
    if v < MIN_SCALING {
        1.0
    } else if v > MAX_SCALING {
        MAX_SCALING
    } else {
        v
    }
}

/// Run `iterations` Ruiz passes over already-clipped bounds
pub(crate) fn equilibrate(
    p: CsMatView<'_, f64>,
    q: &[f64],
    a: CsMatView<'_, f64>,
    l: &[f64],
    u: &[f64],
    iterations: usize,
) -> (ScaledData, Scaling) {
    let n = p.cols();
    let m = a.rows();

    let mut p_s = p.to_owned();
    let mut a_s = a.to_owned();
    let mut q_s = q.to_vec();
    let mut scaling = Scaling {
        d: vec![1.0; n],
        e: vec![1.0; m],
        c: 1.0,
    };

    for _ in 0..iterations {
        let p_norms = sym_col_norms(p_s.view());
        let (a_col_norms, a_row_norms) = col_row_norms(a_s.view());

        let d_step: Vec<f64> = (0..n)
            .map(|j| 1.0 / limit(p_norms[j].max(a_col_norms[j])).sqrt())
            .collect();
        let e_step: Vec<f64> = a_row_norms.iter().map(|&r| 1.0 / limit(r).sqrt()).collect();

        p_s = rescale(p_s.view(), &d_step, &d_step, 1.0);
        a_s = rescale(a_s.view(), &e_step, &d_step, 1.0);
        for (qj, dj) in q_s.iter_mut().zip(&d_step) {
            *qj *= dj;
        }
        for (dj, step) in scaling.d.iter_mut().zip(&d_step) {
            *dj *= step;
        }
        for (ei, step) in scaling.e.iter_mut().zip(&e_step) {
            *ei *= step;
        }

        // Cost normalisation
        let p_norms = sym_col_norms(p_s.view());
        let mean_norm = if n > 0 {
            p_norms.iter().sum::<f64>() / n as f64
        } else {
            0.0
        };
        let c_step = 1.0 / limit(limit(mean_norm).max(limit(norm_inf(&q_s))));
        p_s = rescale(p_s.view(), &vec![1.0; n], &vec![1.0; n], c_step);
        for qj in q_s.iter_mut() {
            *qj *= c_step;
        }
        scaling.c *= c_step;
    }

    let l_s = l.iter().zip(&scaling.e).map(|(v, e)| v * e).collect();
    let u_s = u.iter().zip(&scaling.e).map(|(v, e)| v * e).collect();

    (
        ScaledData {
            p: p_s,
            q: q_s,
            a: a_s,
            l: l_s,
            u: u_s,
        },
        scaling,
    )
}
