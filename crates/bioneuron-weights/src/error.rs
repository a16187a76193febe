// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomies
//!
//! [`BioneuronError`] is returned to the caller and aborts a run before any
//! neuron is solved (or reports cancellation). [`SolveFailure`] is local to a
//! single post-neuron and only ever travels through the warning channel.

use bioneuron_qp::{QpSetupError, QpStatus};

/// Boundary-level error returned by the population solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BioneuronError {
    #[error("n_pre is invalid")]
    InvalidNPre,

    #[error("n_post is invalid")]
    InvalidNPost,

    #[error("n_samples is invalid")]
    InvalidNSamples,

    #[error("a_pre is invalid")]
    InvalidAPre,

    #[error("j_post is invalid")]
    InvalidJPost,

    #[error("model_weights is invalid")]
    InvalidModelWeights,

    #[error("connection_matrix_exc is invalid")]
    InvalidConnectionMatrixExc,

    #[error("connection_matrix_inh is invalid")]
    InvalidConnectionMatrixInh,

    #[error("regularisation is invalid")]
    InvalidRegularisation,

    #[error("synaptic_weights_exc is invalid")]
    InvalidSynapticWeightsExc,

    #[error("synaptic_weights_inh is invalid")]
    InvalidSynapticWeightsInh,

    #[error("tolerance is invalid")]
    InvalidTolerance,

    #[error("canceled by user")]
    Canceled,

    #[error("objective_vals is invalid")]
    InvalidObjectiveVals,
}

impl BioneuronError {
    /// Stable integer code; `0` is reserved for success
    pub fn code(self) -> i32 {
        match self {
            Self::InvalidNPre => -1,
            Self::InvalidNPost => -2,
            Self::InvalidNSamples => -3,
            Self::InvalidAPre => -4,
            Self::InvalidJPost => -5,
            Self::InvalidModelWeights => -6,
            Self::InvalidConnectionMatrixExc => -7,
            Self::InvalidConnectionMatrixInh => -8,
            Self::InvalidRegularisation => -9,
            Self::InvalidSynapticWeightsExc => -10,
            Self::InvalidSynapticWeightsInh => -11,
            Self::InvalidTolerance => -12,
            Self::Canceled => -13,
            Self::InvalidObjectiveVals => -14,
        }
    }

    /// Inverse of [`BioneuronError::code`]
    pub fn from_code(code: i32) -> Option<Self> {
        let err = match code {
            -1 => Self::InvalidNPre,
            -2 => Self::InvalidNPost,
            -3 => Self::InvalidNSamples,
            -4 => Self::InvalidAPre,
            -5 => Self::InvalidJPost,
            -6 => Self::InvalidModelWeights,
            -7 => Self::InvalidConnectionMatrixExc,
            -8 => Self::InvalidConnectionMatrixInh,
            -9 => Self::InvalidRegularisation,
            -10 => Self::InvalidSynapticWeightsExc,
            -11 => Self::InvalidSynapticWeightsInh,
            -12 => Self::InvalidTolerance,
            -13 => Self::Canceled,
            -14 => Self::InvalidObjectiveVals,
            _ => return None,
        };
        Some(err)
    }
}

/// Human-readable message for an integer result code
///
/// Known codes use the [`BioneuronError`] `Display` text.
pub fn strerror(code: i32) -> String {
    if code == 0 {
        return "no error".to_string();
    }
    match BioneuronError::from_code(code) {
        Some(err) => err.to_string(),
        None => "unknown error code".to_string(),
    }
}

/// Why the QP for one post-neuron did not produce a solution
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SolveFailure {
    #[error("Data validation error.")]
    DataValidation,

    #[error("Settings validation error.")]
    SettingsValidation,

    #[error("Cannot load linear solver.")]
    LinearSolver,

    #[error("Cannot allocate workspace memory.")]
    MemoryAllocation,

    #[error("Time limit reached.")]
    TimeLimitReached,

    #[error("Maximum numbers of iterations reached.")]
    MaxIterReached,

    #[error("Primal infeasible.")]
    PrimalInfeasible,

    #[error("Dual infeasible.")]
    DualInfeasible,

    #[error("Interrupted by user.")]
    Interrupted,

    #[error("Unsolved.")]
    Unsolved,

    #[error("Problem not convex.")]
    NonConvex,

    #[error("Unknown/unhandled error.")]
    Unknown,
}

impl SolveFailure {
    /// Classify a finished solve; `Ok` for (possibly inaccurate) solutions
    pub fn check(status: QpStatus) -> Result<(), SolveFailure> {
        match status {
            QpStatus::Solved | QpStatus::SolvedInaccurate => Ok(()),
            QpStatus::PrimalInfeasible | QpStatus::PrimalInfeasibleInaccurate => {
                Err(Self::PrimalInfeasible)
            }
            QpStatus::DualInfeasible | QpStatus::DualInfeasibleInaccurate => {
                Err(Self::DualInfeasible)
            }
            QpStatus::MaxIterReached => Err(Self::MaxIterReached),
            QpStatus::TimeLimitReached => Err(Self::TimeLimitReached),
            QpStatus::Interrupted => Err(Self::Interrupted),
            QpStatus::NonConvex => Err(Self::NonConvex),
            QpStatus::Unsolved => Err(Self::Unsolved),
        }
    }
}

impl From<&QpSetupError> for SolveFailure {
    fn from(err: &QpSetupError) -> Self {
        match err {
            QpSetupError::DataValidation(_) => Self::DataValidation,
            QpSetupError::SettingsValidation(_) => Self::SettingsValidation,
            QpSetupError::LinsysSolverInit(_) => Self::LinearSolver,
            QpSetupError::NonConvex => Self::NonConvex,
            QpSetupError::MemoryAllocation(_) => Self::MemoryAllocation,
        }
    }
}
