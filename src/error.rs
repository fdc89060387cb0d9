use thiserror::Error;

/// Unified error type for `clic` operations.
#[derive(Debug, Error)]
pub enum ClicError {
    /// Raised when a validation policy set to `error` finds an offending estimate.
    #[error("{check} detected in estimates: entry {index} is {value}")]
    InvalidEstimates {
        /// Which screening check fired.
        check: &'static str,
        /// Position of the first offending entry.
        index: usize,
        /// The offending value.
        value: f64,
    },

    /// Raised when a validation policy string is not one of `allow`, `warn`, `error`.
    #[error("unknown validation policy `{value}`; expected one of allow, warn, error")]
    InvalidPolicy { value: String },

    /// Raised when CLBIC is requested without a sample size.
    #[error("n_samples must be provided when calculating CLBIC")]
    MissingSampleSize,

    /// Raised when the supplied sample size is zero.
    #[error("n_samples must be positive, found {n_samples}")]
    InvalidSampleSize { n_samples: usize },

    /// Raised when the finite-difference step configuration is unusable.
    #[error("invalid step configuration: {parameter} = {value} ({requirement})")]
    InvalidStep {
        /// Name of the offending setting.
        parameter: &'static str,
        /// The value that was supplied.
        value: f64,
        /// What the setting must satisfy.
        requirement: &'static str,
    },

    /// Raised when the parameter vector has no entries.
    #[error("estimates must contain at least one parameter")]
    EmptyEstimates,

    /// Raised when provided matrices have incompatible dimensions.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required dimension.
        expected: usize,
        /// The dimension that was actually supplied.
        found: usize,
    },

    /// Raised when linear algebra operations encounter a singular system.
    #[error("matrix in {context} is singular")]
    SingularMatrix { context: &'static str },

    /// Raised when a derivative estimate stays non-finite after every allowed step shrink.
    #[error(
        "{derivative} estimate still non-finite after {attempts} attempts; last step {last_step}"
    )]
    StepRetriesExhausted {
        /// Which derivative matrix was being estimated.
        derivative: &'static str,
        /// Number of estimates attempted, including the first.
        attempts: usize,
        /// Step size used for the final attempt.
        last_step: f64,
    },

    /// Error raised by a caller-supplied likelihood, passed through untouched.
    #[error(transparent)]
    Likelihood(Box<dyn std::error::Error + Send + Sync>),
}

impl ClicError {
    /// Helper to format a [`DimensionMismatch`](ClicError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper to raise when a matrix inversion fails due to singularity.
    pub fn singular(context: &'static str) -> Self {
        Self::SingularMatrix { context }
    }

    /// Helper for rejecting a step setting.
    pub fn invalid_step(parameter: &'static str, value: f64, requirement: &'static str) -> Self {
        Self::InvalidStep {
            parameter,
            value,
            requirement,
        }
    }

    /// Wraps an error produced by a caller-supplied likelihood.
    pub fn likelihood<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Likelihood(err.into())
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, ClicError>;
