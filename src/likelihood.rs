//! The seam between caller-supplied log-likelihoods and the assessment pipeline.

use nalgebra::DVector;

use crate::error::{ClicError, Result};

/// A composite log-likelihood evaluated at a parameter vector.
///
/// Any `Fn(&DVector<f64>) -> f64` implements this trait directly. Likelihoods
/// that can fail should be wrapped in [`Fallible`]; their errors reach the
/// caller unchanged as [`ClicError::Likelihood`].
pub trait CompositeLikelihood {
    /// Log-likelihood value at `theta`.
    fn log_likelihood(&self, theta: &DVector<f64>) -> Result<f64>;
}

impl<F> CompositeLikelihood for F
where
    F: Fn(&DVector<f64>) -> f64,
{
    fn log_likelihood(&self, theta: &DVector<f64>) -> Result<f64> {
        Ok(self(theta))
    }
}

/// Adapter for likelihoods that return their own error type.
#[derive(Clone, Copy, Debug)]
pub struct Fallible<F>(pub F);

impl<F, E> CompositeLikelihood for Fallible<F>
where
    F: Fn(&DVector<f64>) -> std::result::Result<f64, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn log_likelihood(&self, theta: &DVector<f64>) -> Result<f64> {
        (self.0)(theta).map_err(ClicError::likelihood)
    }
}
