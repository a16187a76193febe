// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Active-set polishing of an ADMM solution
//!
//! Guesses the active constraints from the sign of the dual variables,
//! solves the equality-constrained QP on that set with iterative refinement
//! and hands the candidate back to the caller for acceptance.

use tracing::trace;

use crate::admm::{Iterate, Residuals, Workspace};
use crate::kkt::{assemble, KktFactor};
use crate::linalg::{mat_t_vec, mat_vec, select_rows, sym_mat_vec};

pub(crate) fn polish(ws: &Workspace<'_, '_>) -> Option<(Iterate, Residuals)> {
    let n = ws.problem.n();
    let m = ws.problem.m();
    let delta = ws.settings.delta;
    let (l, u) = (ws.l(), ws.u());
    let Iterate { z, y, .. } = &ws.current;

    let mut rows = Vec::new();
    let mut bounds = Vec::new();
    for i in 0..m {
        if z[i] - l[i] < -y[i] {
            rows.push(i);
            bounds.push(l[i]);
        } else if u[i] - z[i] < y[i] {
            rows.push(i);
            bounds.push(u[i]);
        }
    }

    let a_red = select_rows(ws.a(), &rows);
    let kkt = assemble(ws.p(), a_red.view(), delta, &vec![1.0 / delta; rows.len()]);
    let factor = match KktFactor::new(kkt.view(), n) {
        Ok(factor) => factor,
        Err(e) => {
            trace!(target: "bioneuron-qp", "polish factorisation failed: {}", e);
            return None;
        }
    };

    let mut rhs: Vec<f64> = ws.q().iter().map(|q| -q).collect();
    rhs.extend_from_slice(&bounds);

    let mut sol = factor.solve(&rhs);
    for _ in 0..ws.settings.polish_refine_iter {
        let (x, nu) = sol.split_at(n);
        let px = sym_mat_vec(ws.p(), x);
        let at_nu = mat_t_vec(a_red.view(), nu);
        let ax = mat_vec(a_red.view(), x);

        let residual: Vec<f64> = rhs
            .iter()
            .zip(px.iter().zip(&at_nu).map(|(a, b)| a + b).chain(ax))
            .map(|(r, k)| r - k)
            .collect();
        let correction = factor.solve(&residual);
        for (s, c) in sol.iter_mut().zip(&correction) {
            *s += c;
        }
    }

    let x = sol[..n].to_vec();
    let ax = mat_vec(ws.a(), &x);
    let mut y_pol = vec![0.0; m];
    for (&i, &nu) in rows.iter().zip(&sol[n..]) {
        y_pol[i] = nu;
    }

    // Keep (z, y) in the normal cone of [l, u]
    let mut z_pol = vec![0.0; m];
    for i in 0..m {
        let shifted = ax[i] + y_pol[i];
        z_pol[i] = shifted.max(l[i]).min(u[i]);
        y_pol[i] = shifted - z_pol[i];
    }

    let candidate = Iterate {
        x,
        z: z_pol,
        y: y_pol,
    };
    let residuals = ws.termination_residuals(&candidate);
    trace!(
        target: "bioneuron-qp",
        active = rows.len(),
        prim_res = residuals.prim,
        dual_res = residuals.dual,
        "polish candidate"
    );
    Some((candidate, residuals))
}
