//! Configuration for assessing a fitted composite-likelihood model.

use serde::{Deserialize, Serialize};

use crate::error::{ClicError, Result};
use crate::stepping::StepOptions;
use crate::validation::ValidationPolicy;

/// Aggregated configuration used by [`claic`](crate::claic), [`clbic`](crate::clbic)
/// and [`CriterionProblem::assess`](crate::CriterionProblem::assess).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriterionOptions {
    /// Finite-difference step configuration shared by the Jacobian and Hessian.
    pub step: StepOptions,
    /// Response to zero or negative estimates.
    pub zeros: ValidationPolicy,
    /// Response to NaN or infinite estimates.
    pub nan_infs: ValidationPolicy,
    /// Number of independent observations used in fitting; required for CLBIC.
    pub n_samples: Option<usize>,
}

impl Default for CriterionOptions {
    fn default() -> Self {
        Self {
            step: StepOptions::default(),
            zeros: ValidationPolicy::Allow,
            nan_infs: ValidationPolicy::Error,
            n_samples: None,
        }
    }
}

impl CriterionOptions {
    /// Override the step configuration while preserving other defaults.
    pub fn with_step(mut self, step: StepOptions) -> Self {
        self.step = step;
        self
    }

    /// Set the initial finite-difference step.
    pub fn with_initial_step(mut self, initial_step: f64) -> Self {
        self.step.initial_step = initial_step;
        self
    }

    /// Set the factor by which the step shrinks after a non-finite estimate.
    pub fn with_step_factor(mut self, step_factor: f64) -> Self {
        self.step.step_factor = step_factor;
        self
    }

    /// Cap the number of step shrinks attempted per derivative matrix.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.step.max_retries = max_retries;
        self
    }

    /// Set the policy for zero or negative estimates.
    pub fn with_zeros(mut self, policy: ValidationPolicy) -> Self {
        self.zeros = policy;
        self
    }

    /// Set the policy for NaN or infinite estimates.
    pub fn with_nan_infs(mut self, policy: ValidationPolicy) -> Self {
        self.nan_infs = policy;
        self
    }

    /// Record the sample size used to fit the model.
    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = Some(n_samples);
        self
    }

    /// Returns the sample size, rejecting a missing or zero value.
    pub fn require_n_samples(&self) -> Result<usize> {
        match self.n_samples {
            None => Err(ClicError::MissingSampleSize),
            Some(0) => Err(ClicError::InvalidSampleSize { n_samples: 0 }),
            Some(n) => Ok(n),
        }
    }

    /// Validates everything that can be checked without the likelihood.
    pub fn validate(&self) -> Result<()> {
        self.step.validate()?;
        if self.n_samples == Some(0) {
            return Err(ClicError::InvalidSampleSize { n_samples: 0 });
        }
        Ok(())
    }
}
