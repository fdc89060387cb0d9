//! Finite-difference step configuration and diagnostics.

use serde::{Deserialize, Serialize};

use crate::error::{ClicError, Result};

/// Configuration for the adaptive finite-difference step used by the differentiation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepOptions {
    /// Perturbation size used for the first derivative estimate.
    pub initial_step: f64,
    /// Multiplicative shrink applied to the step whenever an estimate is non-finite.
    pub step_factor: f64,
    /// Maximum number of shrinks attempted before giving up.
    pub max_retries: usize,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            initial_step: 1e-2,
            step_factor: 0.5,
            max_retries: 30,
        }
    }
}

impl StepOptions {
    /// Creates step options with the given initial step and shrink factor.
    pub fn new(initial_step: f64, step_factor: f64) -> Self {
        Self {
            initial_step,
            step_factor,
            ..Self::default()
        }
    }

    /// Overrides the retry cap while preserving other settings.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Checks that the step is positive and finite and that the factor lies in `(0, 1)`.
    ///
    /// A factor outside that interval would never shrink the step, so the retry
    /// loop could not make progress.
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_step.is_finite() && self.initial_step > 0.0) {
            return Err(ClicError::invalid_step(
                "initial_step",
                self.initial_step,
                "must be positive and finite",
            ));
        }
        if !(self.step_factor > 0.0 && self.step_factor < 1.0) {
            return Err(ClicError::invalid_step(
                "step_factor",
                self.step_factor,
                "must lie strictly between 0 and 1",
            ));
        }
        Ok(())
    }

    /// Step size used on the given zero-based attempt.
    pub fn step_for_attempt(&self, attempt: usize) -> f64 {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        self.initial_step * self.step_factor.powi(exponent)
    }
}

/// Diagnostics returned alongside a derivative estimate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Number of estimates computed, including the first.
    pub attempts: usize,
    /// Step size that produced the accepted estimate.
    pub step: f64,
}

impl StepSummary {
    /// Number of times the step had to be shrunk.
    pub fn retries(&self) -> usize {
        self.attempts.saturating_sub(1)
    }
}
