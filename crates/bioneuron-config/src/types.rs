// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to a section in `bioneuron_configuration.toml`.

use serde::{Deserialize, Serialize};

/// Name of the configuration file searched for by [`crate::find_config_file`]
pub const CONFIG_FILE_NAME: &str = "bioneuron_configuration.toml";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BioneuronConfig {
    pub solver: SolverConfig,
    pub problem: ProblemConfig,
    pub logging: LoggingConfig,
}

/// QP solver and population dispatch settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Absolute and relative convergence tolerance
    pub tolerance: f64,
    /// Iteration cap per neuron, 0 = solver default
    pub max_iter: usize,
    /// Worker threads, 0 = hardware concurrency
    pub n_threads: usize,
    /// Rescale the model coefficients before assembling
    pub renormalise: bool,
    /// Emit per-neuron warnings through the log
    pub warn: bool,
    pub polish: bool,
    pub polish_refine_iter: usize,
    /// Initial ADMM step size
    pub rho: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iter: 0,
            n_threads: 0,
            renormalise: true,
            warn: true,
            polish: true,
            polish_refine_iter: 3,
            rho: 0.1,
        }
    }
}

/// Defaults applied to every weight problem built from configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProblemConfig {
    pub regularisation: f64,
    pub non_negative: bool,
    pub relax_subthreshold: bool,
    /// Current below which samples are relaxed
    pub j_threshold: f64,
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            regularisation: 0.1,
            non_negative: true,
            relax_subthreshold: false,
            j_threshold: 0.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "text" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}
