// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Weight-solving problem descriptor and output buffers
//!
//! Both structures only borrow caller-owned matrices. Dimensions are stated
//! explicitly and every view is checked against them before solving starts.

use ndarray::{ArrayView2, ArrayViewMut1, ArrayViewMut2};

use crate::model::MODEL_COEFFICIENTS;
use crate::BioneuronError;

/// Default Tikhonov regularisation strength
pub const DEFAULT_REGULARISATION: f64 = 0.1;

/// Read-only description of a population weight-solving problem
#[derive(Debug, Clone)]
pub struct WeightProblem<'a> {
    pub n_pre: usize,
    pub n_post: usize,
    pub n_samples: usize,
    /// Presynaptic activities, `n_samples × n_pre`
    pub a_pre: ArrayView2<'a, f64>,
    /// Target currents, `n_samples × n_post`
    pub j_post: ArrayView2<'a, f64>,
    /// Current-response model per post-neuron, `n_post × 6`, laid out as
    /// `[a0, a1, a2, b0, b1, b2]`
    pub model_weights: ArrayView2<'a, f64>,
    /// Excitatory candidate synapses, `n_pre × n_post`
    pub connection_exc: ArrayView2<'a, bool>,
    /// Inhibitory candidate synapses, `n_pre × n_post`
    pub connection_inh: ArrayView2<'a, bool>,
    pub regularisation: f64,
    /// Samples with a target current below this value may be relaxed
    pub j_threshold: f64,
    pub relax_subthreshold: bool,
    pub non_negative: bool,
}

impl<'a> WeightProblem<'a> {
    /// Create a problem whose dimensions are taken from `a_pre` and `j_post`
    ///
    /// Scalars start at their defaults: regularisation 0.1, threshold 0,
    /// no subthreshold relaxation, signed weights.
    pub fn new(
        a_pre: ArrayView2<'a, f64>,
        j_post: ArrayView2<'a, f64>,
        model_weights: ArrayView2<'a, f64>,
        connection_exc: ArrayView2<'a, bool>,
        connection_inh: ArrayView2<'a, bool>,
    ) -> Self {
        let (n_samples, n_pre) = a_pre.dim();
        let n_post = j_post.ncols();
        Self {
            n_pre,
            n_post,
            n_samples,
            a_pre,
            j_post,
            model_weights,
            connection_exc,
            connection_inh,
            regularisation: DEFAULT_REGULARISATION,
            j_threshold: 0.0,
            relax_subthreshold: false,
            non_negative: false,
        }
    }

    pub fn with_regularisation(mut self, regularisation: f64) -> Self {
        self.regularisation = regularisation;
        self
    }

    /// Relax every sample whose target current lies below `j_threshold`
    pub fn with_subthreshold_relaxation(mut self, j_threshold: f64) -> Self {
        self.j_threshold = j_threshold;
        self.relax_subthreshold = true;
        self
    }

    pub fn with_non_negative(mut self, non_negative: bool) -> Self {
        self.non_negative = non_negative;
        self
    }

    /// Check counts and shapes, in the order the error codes are numbered
    pub fn validate(&self) -> Result<(), BioneuronError> {
        if self.n_pre == 0 {
            return Err(BioneuronError::InvalidNPre);
        }
        if self.n_post == 0 {
            return Err(BioneuronError::InvalidNPost);
        }
        if self.n_samples == 0 {
            return Err(BioneuronError::InvalidNSamples);
        }
        if self.a_pre.dim() != (self.n_samples, self.n_pre) {
            return Err(BioneuronError::InvalidAPre);
        }
        if self.j_post.dim() != (self.n_samples, self.n_post) {
            return Err(BioneuronError::InvalidJPost);
        }
        if self.model_weights.dim() != (self.n_post, MODEL_COEFFICIENTS) {
            return Err(BioneuronError::InvalidModelWeights);
        }
        if self.connection_exc.dim() != (self.n_pre, self.n_post) {
            return Err(BioneuronError::InvalidConnectionMatrixExc);
        }
        if self.connection_inh.dim() != (self.n_pre, self.n_post) {
            return Err(BioneuronError::InvalidConnectionMatrixInh);
        }
        if !(self.regularisation >= 0.0) {
            return Err(BioneuronError::InvalidRegularisation);
        }
        Ok(())
    }
}

/// Caller-owned output buffers, overwritten column by column
#[derive(Debug)]
pub struct WeightOutputs<'a> {
    /// Excitatory weights, `n_pre × n_post`
    pub weights_exc: ArrayViewMut2<'a, f64>,
    /// Inhibitory weights, `n_pre × n_post`
    pub weights_inh: ArrayViewMut2<'a, f64>,
    /// Optional objective value per post-neuron
    pub objective_vals: Option<ArrayViewMut1<'a, f64>>,
}

impl<'a> WeightOutputs<'a> {
    pub fn new(weights_exc: ArrayViewMut2<'a, f64>, weights_inh: ArrayViewMut2<'a, f64>) -> Self {
        Self {
            weights_exc,
            weights_inh,
            objective_vals: None,
        }
    }

    pub fn with_objective_vals(mut self, objective_vals: ArrayViewMut1<'a, f64>) -> Self {
        self.objective_vals = Some(objective_vals);
        self
    }

    pub fn validate(&self, problem: &WeightProblem<'_>) -> Result<(), BioneuronError> {
        let shape = (problem.n_pre, problem.n_post);
        if self.weights_exc.dim() != shape {
            return Err(BioneuronError::InvalidSynapticWeightsExc);
        }
        if self.weights_inh.dim() != shape {
            return Err(BioneuronError::InvalidSynapticWeightsInh);
        }
        if let Some(objective_vals) = &self.objective_vals {
            if objective_vals.len() != problem.n_post {
                return Err(BioneuronError::InvalidObjectiveVals);
            }
        }
        Ok(())
    }
}
