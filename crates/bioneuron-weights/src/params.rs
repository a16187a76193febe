// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Solver parameters and caller callbacks

use std::fmt;
use std::sync::Arc;

use bioneuron_config::SolverConfig;
use tracing::warn;

use crate::BioneuronError;

/// Called as `progress(completed, total)`; returning `false` cancels the run
///
/// Invoked from worker threads.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) -> bool + Send + Sync>;

/// Called as `warn(message, post_neuron_index)` from worker threads
pub type WarningCallback = Arc<dyn Fn(&str, usize) + Send + Sync>;

pub const DEFAULT_TOLERANCE: f64 = 1e-6;

#[derive(Clone)]
pub struct SolverParameters {
    /// Rescale the model before solving to improve conditioning
    pub renormalise: bool,
    /// Absolute and relative convergence tolerance of the QP solver
    pub tolerance: f64,
    /// Iteration cap per neuron, `0` keeps the solver default
    pub max_iter: usize,
    /// Worker threads, `0` uses one per available core
    pub n_threads: usize,
    pub progress: Option<ProgressCallback>,
    pub warn: Option<WarningCallback>,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            renormalise: true,
            tolerance: DEFAULT_TOLERANCE,
            max_iter: 0,
            n_threads: 0,
            progress: None,
            warn: None,
        }
    }
}

impl fmt::Debug for SolverParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverParameters")
            .field("renormalise", &self.renormalise)
            .field("tolerance", &self.tolerance)
            .field("max_iter", &self.max_iter)
            .field("n_threads", &self.n_threads)
            .field("progress", &self.progress.is_some())
            .field("warn", &self.warn.is_some())
            .finish()
    }
}

impl SolverParameters {
    /// Build parameters from the `[solver]` configuration section
    ///
    /// With `warn = true` warnings are forwarded to the `tracing` subscriber.
    pub fn from_config(config: &SolverConfig) -> Self {
        let warn: Option<WarningCallback> = if config.warn {
            Some(Arc::new(|message: &str, neuron: usize| {
                warn!(target: "bioneuron-weights", neuron, "{}", message);
            }))
        } else {
            None
        };
        Self {
            renormalise: config.renormalise,
            tolerance: config.tolerance,
            max_iter: config.max_iter,
            n_threads: config.n_threads,
            progress: None,
            warn,
        }
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(usize, usize) -> bool + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn with_warn<F>(mut self, warn: F) -> Self
    where
        F: Fn(&str, usize) + Send + Sync + 'static,
    {
        self.warn = Some(Arc::new(warn));
        self
    }

    pub fn validate(&self) -> Result<(), BioneuronError> {
        if !(self.tolerance > 0.0) {
            return Err(BioneuronError::InvalidTolerance);
        }
        Ok(())
    }

    pub(crate) fn emit_warning(&self, message: &str, neuron: usize) {
        if let Some(warn) = &self.warn {
            warn(message, neuron);
        }
    }
}
