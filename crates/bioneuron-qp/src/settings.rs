// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Solver settings

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::{QpSetupError, Result};

/// ADMM solver settings
///
/// Defaults match the usual OSQP defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// ADMM step size
    pub rho: f64,
    /// Primal regularisation of the KKT matrix
    pub sigma: f64,
    /// Over-relaxation parameter, must lie in (0, 2)
    pub alpha: f64,
    pub eps_abs: f64,
    pub eps_rel: f64,
    pub eps_prim_inf: f64,
    pub eps_dual_inf: f64,
    pub max_iter: usize,
    /// Check termination every N iterations (0 = only after the last one)
    pub check_termination: usize,
    /// Number of Ruiz equilibration passes (0 disables scaling)
    pub scaling: usize,
    /// Evaluate termination on the scaled problem instead of the original one
    pub scaled_termination: bool,
    pub adaptive_rho: bool,
    pub adaptive_rho_interval: usize,
    /// Refactor only when the new rho differs by more than this factor
    pub adaptive_rho_tolerance: f64,
    pub polish: bool,
    /// Regularisation of the reduced KKT system during polishing
    pub delta: f64,
    pub polish_refine_iter: usize,
    /// Wall clock limit in seconds (0 disables)
    pub time_limit: f64,
    /// Setting this flag stops the iteration with [`crate::QpStatus::Interrupted`]
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rho: 0.1,
            sigma: 1e-6,
            alpha: 1.6,
            eps_abs: 1e-3,
            eps_rel: 1e-3,
            eps_prim_inf: 1e-4,
            eps_dual_inf: 1e-4,
            max_iter: 4000,
            check_termination: 25,
            scaling: 10,
            scaled_termination: false,
            adaptive_rho: true,
            adaptive_rho_interval: 25,
            adaptive_rho_tolerance: 5.0,
            polish: false,
            delta: 1e-6,
            polish_refine_iter: 3,
            time_limit: 0.0,
            interrupt: None,
        }
    }
}

impl Settings {
    /// Reject settings the iteration cannot work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(QpSetupError::SettingsValidation(reason.to_string()));

        if !(self.rho > 0.0) {
            return invalid("rho must be positive");
        }
        if !(self.sigma > 0.0) {
            return invalid("sigma must be positive");
        }
        if !(self.alpha > 0.0 && self.alpha < 2.0) {
            return invalid("alpha must lie in (0, 2)");
        }
        if self.eps_abs < 0.0 || self.eps_rel < 0.0 {
            return invalid("eps_abs and eps_rel must be nonnegative");
        }
        if self.eps_abs == 0.0 && self.eps_rel == 0.0 {
            return invalid("eps_abs and eps_rel cannot both be zero");
        }
        if !(self.eps_prim_inf > 0.0) || !(self.eps_dual_inf > 0.0) {
            return invalid("infeasibility tolerances must be positive");
        }
        if self.max_iter == 0 {
            return invalid("max_iter must be positive");
        }
        if self.adaptive_rho && self.adaptive_rho_interval == 0 {
            return invalid("adaptive_rho_interval must be positive");
        }
        if !(self.adaptive_rho_tolerance >= 1.0) {
            return invalid("adaptive_rho_tolerance must be at least 1");
        }
        if !(self.delta > 0.0) {
            return invalid("delta must be positive");
        }
        if !(self.time_limit >= 0.0) {
            return invalid("time_limit must be nonnegative");
        }
        Ok(())
    }
}
