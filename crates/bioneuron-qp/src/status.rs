// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Solve status and setup error taxonomy
//!
//! Integer codes follow the conventional OSQP numbering so that logs and
//! stored objective tables stay comparable with other tooling.

use std::fmt;

/// Terminal status of a solve that got past setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QpStatus {
    Solved,
    SolvedInaccurate,
    PrimalInfeasible,
    PrimalInfeasibleInaccurate,
    DualInfeasible,
    DualInfeasibleInaccurate,
    MaxIterReached,
    TimeLimitReached,
    Interrupted,
    NonConvex,
    Unsolved,
}

impl QpStatus {
    /// Stable integer code (positive: solved or inaccurate, negative: failure)
    pub fn code(self) -> i32 {
        match self {
            QpStatus::Solved => 1,
            QpStatus::SolvedInaccurate => 2,
            QpStatus::PrimalInfeasible => -3,
            QpStatus::PrimalInfeasibleInaccurate => 3,
            QpStatus::DualInfeasible => -4,
            QpStatus::DualInfeasibleInaccurate => 4,
            QpStatus::MaxIterReached => -2,
            QpStatus::TimeLimitReached => -6,
            QpStatus::Interrupted => -5,
            QpStatus::NonConvex => -7,
            QpStatus::Unsolved => -10,
        }
    }

    /// True when the iterate is usable as a solution
    pub fn is_solved(self) -> bool {
        matches!(self, QpStatus::Solved | QpStatus::SolvedInaccurate)
    }

    /// True for the infeasibility certificates (accurate or not)
    pub fn is_infeasible(self) -> bool {
        matches!(
            self,
            QpStatus::PrimalInfeasible
                | QpStatus::PrimalInfeasibleInaccurate
                | QpStatus::DualInfeasible
                | QpStatus::DualInfeasibleInaccurate
        )
    }
}

impl fmt::Display for QpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            QpStatus::Solved => "solved",
            QpStatus::SolvedInaccurate => "solved inaccurate",
            QpStatus::PrimalInfeasible => "primal infeasible",
            QpStatus::PrimalInfeasibleInaccurate => "primal infeasible inaccurate",
            QpStatus::DualInfeasible => "dual infeasible",
            QpStatus::DualInfeasibleInaccurate => "dual infeasible inaccurate",
            QpStatus::MaxIterReached => "maximum iterations reached",
            QpStatus::TimeLimitReached => "run time limit reached",
            QpStatus::Interrupted => "interrupted",
            QpStatus::NonConvex => "problem non convex",
            QpStatus::Unsolved => "unsolved",
        };
        f.write_str(text)
    }
}

/// Failures detected before the first iteration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QpSetupError {
    #[error("Data validation error: {0}")]
    DataValidation(String),

    #[error("Settings validation error: {0}")]
    SettingsValidation(String),

    #[error("Linear system solver initialisation failed: {0}")]
    LinsysSolverInit(String),

    #[error("Problem is not convex")]
    NonConvex,

    #[error("Workspace allocation failed: {0}")]
    MemoryAllocation(String),
}

impl QpSetupError {
    /// Stable integer code of the setup failure
    pub fn code(&self) -> i32 {
        match self {
            QpSetupError::DataValidation(_) => 1,
            QpSetupError::SettingsValidation(_) => 2,
            QpSetupError::LinsysSolverInit(_) => 4,
            QpSetupError::NonConvex => 5,
            QpSetupError::MemoryAllocation(_) => 6,
        }
    }
}
