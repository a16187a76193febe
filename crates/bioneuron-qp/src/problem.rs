// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Borrowed QP problem data

use sprs::CsMatView;

use crate::{QpSetupError, Result};

/// Problem data borrowed from the caller
///
/// `p` holds only the upper triangle of the symmetric objective matrix.
/// Both matrices must use compressed sparse column storage.
#[derive(Debug, Clone)]
pub struct Problem<'a> {
    pub p: CsMatView<'a, f64>,
    pub q: &'a [f64],
    pub a: CsMatView<'a, f64>,
    pub l: &'a [f64],
    pub u: &'a [f64],
}

impl<'a> Problem<'a> {
    pub fn new(
        p: CsMatView<'a, f64>,
        q: &'a [f64],
        a: CsMatView<'a, f64>,
        l: &'a [f64],
        u: &'a [f64],
    ) -> Self {
        Self { p, q, a, l, u }
    }

    /// Number of variables
    pub fn n(&self) -> usize {
        self.p.cols()
    }

    /// Number of constraints
    pub fn m(&self) -> usize {
        self.a.rows()
    }

    /// Check dimensions, storage order, triangularity and bound ordering
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(QpSetupError::DataValidation(reason));

        let n = self.n();
        let m = self.m();
        if n == 0 {
            return invalid("problem has no variables".to_string());
        }
        if !self.p.is_csc() || !self.a.is_csc() {
            return invalid("P and A must be stored in CSC format".to_string());
        }
        if self.p.rows() != n {
            return invalid(format!("P must be square, got {}x{}", self.p.rows(), n));
        }
        if self.a.cols() != n {
            return invalid(format!("A has {} columns, expected {}", self.a.cols(), n));
        }
        if self.q.len() != n {
            return invalid(format!("q has length {}, expected {}", self.q.len(), n));
        }
        if self.l.len() != m || self.u.len() != m {
            return invalid(format!(
                "bounds have lengths {}/{}, expected {}",
                self.l.len(),
                self.u.len(),
                m
            ));
        }
        for (j, col) in self.p.outer_iterator().enumerate() {
            if col.iter().any(|(i, _)| i > j) {
                return invalid(format!("P is not upper triangular in column {}", j));
            }
        }
        if let Some(i) = (0..m).find(|&i| !(self.l[i] <= self.u[i])) {
            return invalid(format!(
                "lower bound exceeds upper bound in row {} ({} > {})",
                i, self.l[i], self.u[i]
            ));
        }
        if self.q.iter().any(|v| !v.is_finite()) {
            return invalid("q contains non-finite values".to_string());
        }
        Ok(())
    }
}
