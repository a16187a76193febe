// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Rational current-response model of a post-neuron
//!
//! The somatic current produced by excitatory and inhibitory conductances
//! `g_E`, `g_I` is modelled as
//!
//! ```text
//! J = (a0 + a1·g_E + a2·g_I) / (b0 + b1·g_E + b2·g_I)
//! ```
//!
//! Rearranged for a known target `J`, the conductances enter linearly:
//! `(a1 - b1·J)·g_E + (a2 - b2·J)·g_I = b0·J - a0`.

use ndarray::ArrayView1;
use tracing::debug;

/// Number of coefficients per post-neuron
pub const MODEL_COEFFICIENTS: usize = 6;

/// Weights are solved in nano-units when renormalising
pub const WEIGHT_SCALE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelCoefficients {
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
}

/// Factors that map a renormalised problem back to physical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalisation {
    /// Multiplies the regularisation strength
    pub lambda_scale: f64,
    /// Multiplies the solved weights
    pub weight_scale: f64,
}

impl Normalisation {
    pub const IDENTITY: Normalisation = Normalisation {
        lambda_scale: 1.0,
        weight_scale: 1.0,
    };
}

impl ModelCoefficients {
    pub fn new(coefficients: [f64; MODEL_COEFFICIENTS]) -> Self {
        let [a0, a1, a2, b0, b1, b2] = coefficients;
        Self {
            a0,
            a1,
            a2,
            b0,
            b1,
            b2,
        }
    }

    /// Read one row of the model weight matrix; `None` unless it has six entries
    pub fn from_row(row: ArrayView1<'_, f64>) -> Option<Self> {
        if row.len() != MODEL_COEFFICIENTS {
            return None;
        }
        Some(Self::new([row[0], row[1], row[2], row[3], row[4], row[5]]))
    }

    pub fn to_array(self) -> [f64; MODEL_COEFFICIENTS] {
        [self.a0, self.a1, self.a2, self.b0, self.b1, self.b2]
    }

    /// Rescale so that `a1 == 1` and the weights come out in nano-units
    ///
    /// The regularisation strength has to be multiplied by
    /// `lambda_scale` and the solved weights by `weight_scale` to obtain the
    /// same optimum as the unscaled problem. A model with a zero or
    /// non-finite `a1` cannot be renormalised and is returned unchanged.
    pub fn renormalised(self) -> (Self, Normalisation) {
        if self.a1 == 0.0 || !self.a1.is_finite() {
            debug!(
                target: "bioneuron-weights",
                a1 = self.a1,
                "Skipping renormalisation of degenerate model"
            );
            return (self, Normalisation::IDENTITY);
        }

        let lambda_scale = 1.0 / (self.a1 * self.a1);
        let scaled = Self {
            a1: self.a1 * WEIGHT_SCALE,
            a2: self.a2 * WEIGHT_SCALE,
            b1: self.b1 * WEIGHT_SCALE,
            b2: self.b2 * WEIGHT_SCALE,
            ..self
        };
        let lead = scaled.a1;
        let normalised = Self::new(scaled.to_array().map(|c| c / lead));

        (
            normalised,
            Normalisation {
                lambda_scale,
                weight_scale: WEIGHT_SCALE,
            },
        )
    }

    /// Gain applied to an excitatory presynaptic activity at target current `j`
    #[inline]
    pub fn excitatory_gain(&self, j: f64) -> f64 {
        self.a1 - self.b1 * j
    }

    #[inline]
    pub fn inhibitory_gain(&self, j: f64) -> f64 {
        self.a2 - self.b2 * j
    }

    /// Right-hand side of the linearised model
    #[inline]
    pub fn target(&self, j: f64) -> f64 {
        self.b0 * j - self.a0
    }

    /// Bound on a relaxed sample given the subthreshold cutoff
    #[inline]
    pub fn threshold_bound(&self, j_threshold: f64) -> f64 {
        j_threshold * self.b0 - self.a0
    }

    /// Currents attainable for arbitrarily large conductances, `[a2/b2, a1/b1]`
    ///
    /// Only defined when both conductance channels saturate.
    pub fn reachable_range(&self) -> Option<(f64, f64)> {
        if self.b1.abs() > 0.0 && self.b2.abs() > 0.0 {
            Some((self.a2 / self.b2, self.a1 / self.b1))
        } else {
            None
        }
    }

    /// Diagnostic for a neuron whose largest target current cannot be reached
    pub fn feasibility_warning(&self, neuron: usize, j_max: f64) -> Option<String> {
        let (low, high) = self.reachable_range()?;
        if high < j_max {
            Some(format!(
                "Target currents for neuron {} cannot be reached! {} ∉ [{}, {}]",
                neuron, j_max, low, high
            ))
        } else {
            None
        }
    }
}
