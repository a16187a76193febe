// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! ADMM iteration, termination and infeasibility detection

use std::sync::atomic::Ordering;
use std::time::Instant;

use sprs::CsMatView;
use tracing::{debug, trace};

use crate::kkt::{self, KktFactor};
use crate::linalg::{dot, mat_t_vec, mat_vec, norm_inf, objective, sym_mat_vec};
use crate::polish;
use crate::scaling::{equilibrate, ScaledData, Scaling};
use crate::{Problem, QpSetupError, QpStatus, Result, Settings, INFTY};

const RHO_MIN: f64 = 1e-6;
const RHO_MAX: f64 = 1e6;
const RHO_EQ_OVER_RHO_INEQ: f64 = 1e3;
const RHO_TOL: f64 = 1e-4;
const DIVISION_TOL: f64 = 1e-10;
/// Bounds beyond this magnitude (after scaling) count as infinite
const INF_THRESHOLD: f64 = INFTY * 1e-4;

/// Result of a solve that got past setup
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: QpStatus,
    /// Objective value at `x`; ±∞ for infeasibility certificates
    pub obj_val: f64,
    /// Primal solution (NaN-filled for infeasible problems)
    pub x: Vec<f64>,
    /// Dual solution (NaN-filled for infeasible problems)
    pub y: Vec<f64>,
    pub iterations: usize,
    pub polished: bool,
    pub prim_res: f64,
    pub dual_res: f64,
    pub rho: f64,
}

/// Solve the QP described by `problem`
///
/// # Errors
///
/// Returns a [`QpSetupError`] when the data or settings are invalid, the
/// KKT system cannot be factored, or the objective is not convex. Failures
/// during the iteration are reported through [`Solution::status`].
pub fn solve(problem: &Problem<'_>, settings: &Settings) -> Result<Solution> {
    settings.validate()?;
    problem.validate()?;
    let mut workspace = Workspace::setup(problem, settings)?;
    Ok(workspace.run())
}

/// Residuals and the norms used to build relative tolerances
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Residuals {
    pub prim: f64,
    pub dual: f64,
    pub ax_norm: f64,
    pub z_norm: f64,
    pub px_norm: f64,
    pub aty_norm: f64,
    pub q_norm: f64,
}

impl Residuals {
    pub(crate) fn compute(
        p: CsMatView<'_, f64>,
        q: &[f64],
        a: CsMatView<'_, f64>,
        x: &[f64],
        z: &[f64],
        y: &[f64],
    ) -> Self {
        let ax = mat_vec(a, x);
        let px = sym_mat_vec(p, x);
        let aty = mat_t_vec(a, y);

        let prim = ax.iter().zip(z).fold(0.0_f64, |acc, (a, z)| acc.max((a - z).abs()));
        let dual = px
            .iter()
            .zip(q)
            .zip(&aty)
            .fold(0.0_f64, |acc, ((p, q), r)| acc.max((p + q + r).abs()));

        Self {
            prim,
            dual,
            ax_norm: norm_inf(&ax),
            z_norm: norm_inf(z),
            px_norm: norm_inf(&px),
            aty_norm: norm_inf(&aty),
            q_norm: norm_inf(q),
        }
    }

    fn converged(&self, eps_abs: f64, eps_rel: f64) -> bool {
        let eps_prim = eps_abs + eps_rel * self.ax_norm.max(self.z_norm);
        let eps_dual = eps_abs + eps_rel * self.px_norm.max(self.aty_norm).max(self.q_norm);
        self.prim <= eps_prim && self.dual <= eps_dual
    }
}

/// Primal and dual iterates (in the scaled space)
#[derive(Debug, Clone)]
pub(crate) struct Iterate {
    pub x: Vec<f64>,
    pub z: Vec<f64>,
    pub y: Vec<f64>,
}

pub(crate) struct Workspace<'p, 's> {
    pub(crate) problem: &'p Problem<'p>,
    pub(crate) settings: &'s Settings,
    pub(crate) scaled: Option<(ScaledData, Scaling)>,
    /// Clipped original bounds
    l_orig: Vec<f64>,
    u_orig: Vec<f64>,
    rho: f64,
    rho_vec: Vec<f64>,
    factor: KktFactor,
    pub(crate) current: Iterate,
    previous: Iterate,
    started: Instant,
}

/// Per-constraint step sizes: tiny for free rows, large for equalities
fn rho_vector(l: &[f64], u: &[f64], rho: f64) -> Vec<f64> {
    l.iter()
        .zip(u)
        .map(|(&l, &u)| {
            if l < -INF_THRESHOLD && u > INF_THRESHOLD {
                RHO_MIN
            } else if u - l < RHO_TOL {
                RHO_EQ_OVER_RHO_INEQ * rho
            } else {
                rho
            }
        })
        .collect()
}

fn factor_kkt(
    p: CsMatView<'_, f64>,
    a: CsMatView<'_, f64>,
    sigma: f64,
    rho_vec: &[f64],
) -> Result<KktFactor> {
    let n = p.cols();
    let kkt = kkt::assemble(p, a, sigma, rho_vec);
    KktFactor::new(kkt.view(), n)
}

fn allocate(len: usize) -> Result<Vec<f64>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| QpSetupError::MemoryAllocation(e.to_string()))?;
    v.resize(len, 0.0);
    Ok(v)
}

impl<'p, 's> Workspace<'p, 's> {
    pub(crate) fn setup(problem: &'p Problem<'p>, settings: &'s Settings) -> Result<Self> {
        let started = Instant::now();
        let n = problem.n();
        let m = problem.m();

        let l_orig: Vec<f64> = problem.l.iter().map(|v| v.max(-INFTY)).collect();
        let u_orig: Vec<f64> = problem.u.iter().map(|v| v.min(INFTY)).collect();

        let scaled = if settings.scaling > 0 {
            Some(equilibrate(
                problem.p.view(),
                problem.q,
                problem.a.view(),
                &l_orig,
                &u_orig,
                settings.scaling,
            ))
        } else {
            None
        };

        let current = Iterate {
            x: allocate(n)?,
            z: allocate(m)?,
            y: allocate(m)?,
        };
        let previous = current.clone();

        let rho = settings.rho.clamp(RHO_MIN, RHO_MAX);
        let (rho_vec, factor) = match &scaled {
            Some((data, _)) => {
                let rho_vec = rho_vector(&data.l, &data.u, rho);
                let factor = factor_kkt(data.p.view(), data.a.view(), settings.sigma, &rho_vec)?;
                (rho_vec, factor)
            }
            None => {
                let rho_vec = rho_vector(&l_orig, &u_orig, rho);
                let factor = factor_kkt(problem.p.view(), problem.a.view(), settings.sigma, &rho_vec)?;
                (rho_vec, factor)
            }
        };

        let workspace = Self {
            problem,
            settings,
            scaled,
            l_orig,
            u_orig,
            rho,
            rho_vec,
            factor,
            current,
            previous,
            started,
        };

        debug!(
            target: "bioneuron-qp",
            n,
            m,
            scaling = settings.scaling,
            "QP workspace ready in {:.3} ms",
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(workspace)
    }

    pub(crate) fn p(&self) -> CsMatView<'_, f64> {
        match &self.scaled {
            Some((data, _)) => data.p.view(),
            None => self.problem.p.view(),
        }
    }

    pub(crate) fn a(&self) -> CsMatView<'_, f64> {
        match &self.scaled {
            Some((data, _)) => data.a.view(),
            None => self.problem.a.view(),
        }
    }

    pub(crate) fn q(&self) -> &[f64] {
        match &self.scaled {
            Some((data, _)) => &data.q,
            None => self.problem.q,
        }
    }

    pub(crate) fn l(&self) -> &[f64] {
        match &self.scaled {
            Some((data, _)) => &data.l,
            None => &self.l_orig,
        }
    }

    pub(crate) fn u(&self) -> &[f64] {
        match &self.scaled {
            Some((data, _)) => &data.u,
            None => &self.u_orig,
        }
    }

    /// Map an iterate back to the original problem space
    pub(crate) fn unscale(&self, it: &Iterate) -> Iterate {
        match &self.scaled {
            Some((_, s)) => Iterate {
                x: s.unscale_x(&it.x),
                z: s.unscale_z(&it.z),
                y: s.unscale_y(&it.y),
            },
            None => it.clone(),
        }
    }

    /// Residuals in the space selected by `scaled_termination`
    pub(crate) fn termination_residuals(&self, it: &Iterate) -> Residuals {
        if self.settings.scaled_termination || self.scaled.is_none() {
            Residuals::compute(self.p(), self.q(), self.a(), &it.x, &it.z, &it.y)
        } else {
            let orig = self.unscale(it);
            Residuals::compute(
                self.problem.p.view(),
                self.problem.q,
                self.problem.a.view(),
                &orig.x,
                &orig.z,
                &orig.y,
            )
        }
    }

    fn step(&mut self) {
        let n = self.problem.n();
        let sigma = self.settings.sigma;
        let alpha = self.settings.alpha;

        self.previous.x.copy_from_slice(&self.current.x);
        self.previous.z.copy_from_slice(&self.current.z);
        self.previous.y.copy_from_slice(&self.current.y);

        let q = self.q();
        let mut rhs = Vec::with_capacity(n + self.rho_vec.len());
        rhs.extend(self.previous.x.iter().zip(q).map(|(x, q)| sigma * x - q));
        rhs.extend(
            self.previous
                .z
                .iter()
                .zip(&self.current.y)
                .zip(&self.rho_vec)
                .map(|((z, y), rho)| z - y / rho),
        );
        let sol = self.factor.solve(&rhs);
        let (x_tilde, nu) = sol.split_at(n);

        for j in 0..n {
            self.current.x[j] = alpha * x_tilde[j] + (1.0 - alpha) * self.previous.x[j];
        }

        let l = match &self.scaled {
            Some((data, _)) => data.l.as_slice(),
            None => self.l_orig.as_slice(),
        };
        let u = match &self.scaled {
            Some((data, _)) => data.u.as_slice(),
            None => self.u_orig.as_slice(),
        };
        for i in 0..self.rho_vec.len() {
            let rho = self.rho_vec[i];
            let z_prev = self.previous.z[i];
            let y = self.current.y[i];
            let z_tilde = z_prev + (nu[i] - y) / rho;
            let z_relaxed = alpha * z_tilde + (1.0 - alpha) * z_prev;
            let z = (z_relaxed + y / rho).max(l[i]).min(u[i]);
            self.current.z[i] = z;
            self.current.y[i] = y + rho * (z_relaxed - z);
        }
    }

    /// Primal infeasibility certificate from `δy`
    fn primal_infeasible(&self, eps: f64) -> bool {
        let mut delta_y: Vec<f64> = self
            .current
            .y
            .iter()
            .zip(&self.previous.y)
            .map(|(a, b)| a - b)
            .collect();
        let (l, u, a) = if self.settings.scaled_termination || self.scaled.is_none() {
            (self.l(), self.u(), self.a())
        } else {
            if let Some((_, s)) = &self.scaled {
                delta_y = s.unscale_y(&delta_y);
            }
            (
                self.l_orig.as_slice(),
                self.u_orig.as_slice(),
                self.problem.a.view(),
            )
        };

        // Project onto the polar of the recession cone of [l, u]
        for i in 0..delta_y.len() {
            let upper_inf = u[i] > INF_THRESHOLD;
            let lower_inf = l[i] < -INF_THRESHOLD;
            if upper_inf && lower_inf {
                delta_y[i] = 0.0;
            } else if upper_inf {
                delta_y[i] = delta_y[i].min(0.0);
            } else if lower_inf {
                delta_y[i] = delta_y[i].max(0.0);
            }
        }

        let norm = norm_inf(&delta_y);
        if norm <= DIVISION_TOL {
            return false;
        }
        let threshold = eps * norm;
        let support: f64 = delta_y
            .iter()
            .zip(l.iter().zip(u))
            .map(|(&dy, (&l, &u))| u * dy.max(0.0) + l * dy.min(0.0))
            .sum();
        support < -threshold && norm_inf(&mat_t_vec(a, &delta_y)) < threshold
    }

    /// Dual infeasibility certificate from `δx`
    fn dual_infeasible(&self, eps: f64) -> bool {
        let mut delta_x: Vec<f64> = self
            .current
            .x
            .iter()
            .zip(&self.previous.x)
            .map(|(a, b)| a - b)
            .collect();
        let (p, q, a, l, u) = if self.settings.scaled_termination || self.scaled.is_none() {
            (self.p(), self.q(), self.a(), self.l(), self.u())
        } else {
            if let Some((_, s)) = &self.scaled {
                delta_x = s.unscale_x(&delta_x);
            }
            (
                self.problem.p.view(),
                self.problem.q,
                self.problem.a.view(),
                self.l_orig.as_slice(),
                self.u_orig.as_slice(),
            )
        };

        let norm = norm_inf(&delta_x);
        if norm <= DIVISION_TOL {
            return false;
        }
        let threshold = eps * norm;
        if dot(q, &delta_x) >= -threshold {
            return false;
        }
        if norm_inf(&sym_mat_vec(p, &delta_x)) >= threshold {
            return false;
        }
        mat_vec(a, &delta_x)
            .iter()
            .zip(l.iter().zip(u))
            .all(|(&ad, (&l, &u))| {
                let upper_ok = u > INF_THRESHOLD || ad <= threshold;
                let lower_ok = l < -INF_THRESHOLD || ad >= -threshold;
                upper_ok && lower_ok
            })
    }

    fn check_termination(&self, approximate: bool) -> (Option<QpStatus>, Residuals) {
        let factor = if approximate { 10.0 } else { 1.0 };
        let s = self.settings;
        let residuals = self.termination_residuals(&self.current);

        if residuals.converged(factor * s.eps_abs, factor * s.eps_rel) {
            let status = if approximate {
                QpStatus::SolvedInaccurate
            } else {
                QpStatus::Solved
            };
            return (Some(status), residuals);
        }
        if self.problem.m() > 0 && self.primal_infeasible(factor * s.eps_prim_inf) {
            let status = if approximate {
                QpStatus::PrimalInfeasibleInaccurate
            } else {
                QpStatus::PrimalInfeasible
            };
            return (Some(status), residuals);
        }
        if self.dual_infeasible(factor * s.eps_dual_inf) {
            let status = if approximate {
                QpStatus::DualInfeasibleInaccurate
            } else {
                QpStatus::DualInfeasible
            };
            return (Some(status), residuals);
        }
        (None, residuals)
    }

    /// Rebalance rho from the ratio of scaled primal and dual residuals
    fn adapt_rho(&mut self) -> Result<()> {
        let r = Residuals::compute(
            self.p(),
            self.q(),
            self.a(),
            &self.current.x,
            &self.current.z,
            &self.current.y,
        );
        let prim = r.prim / (r.ax_norm.max(r.z_norm) + DIVISION_TOL);
        let dual = r.dual / (r.px_norm.max(r.aty_norm).max(r.q_norm) + DIVISION_TOL);
        let new_rho = (self.rho * (prim / (dual + DIVISION_TOL)).sqrt()).clamp(RHO_MIN, RHO_MAX);

        let tolerance = self.settings.adaptive_rho_tolerance;
        if new_rho > self.rho * tolerance || new_rho < self.rho / tolerance {
            trace!(target: "bioneuron-qp", old = self.rho, new = new_rho, "updating rho");
            let rho_vec = rho_vector(self.l(), self.u(), new_rho);
            self.factor = factor_kkt(self.p(), self.a(), self.settings.sigma, &rho_vec)?;
            self.rho = new_rho;
            self.rho_vec = rho_vec;
        }
        Ok(())
    }

    fn interrupted(&self) -> bool {
        self.settings
            .interrupt
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    fn out_of_time(&self) -> bool {
        self.settings.time_limit > 0.0
            && self.started.elapsed().as_secs_f64() > self.settings.time_limit
    }

    pub(crate) fn run(&mut self) -> Solution {
        let s = self.settings;
        let mut status = None;
        let mut residuals = Residuals::default();
        let mut iterations = 0;
        let mut adaptive_rho = s.adaptive_rho;

        for k in 1..=s.max_iter {
            if self.interrupted() {
                status = Some(QpStatus::Interrupted);
                break;
            }
            if self.out_of_time() {
                status = Some(QpStatus::TimeLimitReached);
                break;
            }

            self.step();
            iterations = k;

            if s.check_termination > 0 && k % s.check_termination == 0 {
                let (found, res) = self.check_termination(false);
                residuals = res;
                if found.is_some() {
                    status = found;
                    break;
                }
            }

            if adaptive_rho && self.problem.m() > 0 && k % s.adaptive_rho_interval == 0 {
                if let Err(e) = self.adapt_rho() {
                    debug!(
                        target: "bioneuron-qp",
                        "rho update failed, keeping rho = {}: {}", self.rho, e
                    );
                    adaptive_rho = false;
                }
            }
        }

        let status = match status {
            Some(status) => status,
            None => {
                let (found, res) = self.check_termination(true);
                residuals = res;
                found.unwrap_or(QpStatus::MaxIterReached)
            }
        };

        let mut polished = false;
        if s.polish && status == QpStatus::Solved {
            if let Some((candidate, candidate_res)) = polish::polish(self) {
                let accept = (candidate_res.prim < residuals.prim
                    && candidate_res.dual < residuals.dual)
                    || (candidate_res.prim < residuals.prim && residuals.dual < 1e-10)
                    || (candidate_res.dual < residuals.dual && residuals.prim < 1e-10);
                if accept {
                    self.current = candidate;
                    residuals = candidate_res;
                    polished = true;
                } else {
                    trace!(target: "bioneuron-qp", "polished solution rejected");
                }
            }
        }

        self.finish(status, iterations, residuals, polished)
    }

    fn finish(
        &self,
        status: QpStatus,
        iterations: usize,
        residuals: Residuals,
        polished: bool,
    ) -> Solution {
        let n = self.problem.n();
        let m = self.problem.m();
        let (x, y, obj_val) = match status {
            QpStatus::PrimalInfeasible | QpStatus::PrimalInfeasibleInaccurate => {
                (vec![f64::NAN; n], vec![f64::NAN; m], f64::INFINITY)
            }
            QpStatus::DualInfeasible | QpStatus::DualInfeasibleInaccurate => {
                (vec![f64::NAN; n], vec![f64::NAN; m], f64::NEG_INFINITY)
            }
            _ => {
                let orig = self.unscale(&self.current);
                let obj = objective(self.problem.p.view(), self.problem.q, &orig.x);
                (orig.x, orig.y, obj)
            }
        };

        debug!(
            target: "bioneuron-qp",
            %status,
            iterations,
            polished,
            prim_res = residuals.prim,
            dual_res = residuals.dual,
            "QP solve finished"
        );

        Solution {
            status,
            obj_val,
            x,
            y,
            iterations,
            polished,
            prim_res: residuals.prim,
            dual_res: residuals.dual,
            rho: self.rho,
        }
    }
}
