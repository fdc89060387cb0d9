//! Assembly of CLAIC and CLBIC from a likelihood and its fitted estimates.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::differentiation::{try_compute_hessian, try_compute_jacobian};
use crate::error::{ClicError, Result};
use crate::likelihood::{CompositeLikelihood, Fallible};
use crate::options::CriterionOptions;
use crate::stepping::StepSummary;
use crate::validation::{screen_estimates, ValidationWarning};

/// Which information criterion to report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Composite-likelihood Akaike information criterion.
    Claic,
    /// Composite-likelihood Bayesian information criterion.
    Clbic,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claic => f.write_str("CLAIC"),
            Self::Clbic => f.write_str("CLBIC"),
        }
    }
}

/// A fitted composite-likelihood model ready to be assessed.
#[derive(Clone)]
pub struct CriterionProblem<L> {
    likelihood: L,
    estimates: DVector<f64>,
}

impl<L> fmt::Debug for CriterionProblem<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CriterionProblem")
            .field("estimates", &self.estimates)
            .finish_non_exhaustive()
    }
}

impl<L: CompositeLikelihood> CriterionProblem<L> {
    /// Pairs a likelihood with the estimates at which it should be assessed.
    pub fn new(likelihood: L, estimates: DVector<f64>) -> Result<Self> {
        if estimates.is_empty() {
            return Err(ClicError::EmptyEstimates);
        }
        Ok(Self {
            likelihood,
            estimates,
        })
    }

    /// Accessor for the likelihood.
    pub fn likelihood(&self) -> &L {
        &self.likelihood
    }

    /// Accessor for the fitted estimates.
    pub fn estimates(&self) -> &DVector<f64> {
        &self.estimates
    }

    /// Computes both criteria in a single pass over the derivatives.
    ///
    /// CLBIC is only filled in when `options.n_samples` is set.
    pub fn assess(&self, options: &CriterionOptions) -> Result<CriterionReport> {
        assess_likelihood(&self.likelihood, &self.estimates, options)
    }
}

/// Everything computed while assessing a model.
#[derive(Clone, Debug, Serialize)]
pub struct CriterionReport {
    /// Log-likelihood at the estimates.
    pub likelihood: f64,
    /// Gradient row of the log-likelihood (`1 × n`).
    pub jacobian: DMatrix<f64>,
    /// Hessian of the log-likelihood (`n × n`).
    pub hessian: DMatrix<f64>,
    /// `trace(J · H⁻¹)`, the penalty shared by both criteria.
    pub penalty_trace: f64,
    /// Composite-likelihood AIC.
    pub claic: f64,
    /// Composite-likelihood BIC, present when a sample size was supplied.
    pub clbic: Option<f64>,
    /// Step diagnostics for the Jacobian estimate.
    pub jacobian_steps: StepSummary,
    /// Step diagnostics for the Hessian estimate.
    pub hessian_steps: StepSummary,
    /// Findings raised by validation policies set to `warn`.
    pub warnings: Vec<ValidationWarning>,
}

impl CriterionReport {
    /// Returns the requested criterion.
    pub fn value(&self, criterion: Criterion) -> Result<f64> {
        match criterion {
            Criterion::Claic => Ok(self.claic),
            Criterion::Clbic => self.clbic.ok_or(ClicError::MissingSampleSize),
        }
    }
}

/// Composite-likelihood AIC of `f` at `estimates`.
pub fn claic<F>(f: F, estimates: &DVector<f64>, options: &CriterionOptions) -> Result<f64>
where
    F: Fn(&DVector<f64>) -> f64,
{
    Ok(assess_likelihood(&f, estimates, options)?.claic)
}

/// Composite-likelihood BIC of `f` at `estimates`; `options.n_samples` must be set.
pub fn clbic<F>(f: F, estimates: &DVector<f64>, options: &CriterionOptions) -> Result<f64>
where
    F: Fn(&DVector<f64>) -> f64,
{
    options.require_n_samples()?;
    assess_likelihood(&f, estimates, options)?.value(Criterion::Clbic)
}

/// [`claic`] for a likelihood that can fail.
pub fn try_claic<F, E>(f: F, estimates: &DVector<f64>, options: &CriterionOptions) -> Result<f64>
where
    F: Fn(&DVector<f64>) -> std::result::Result<f64, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    Ok(assess_likelihood(&Fallible(f), estimates, options)?.claic)
}

/// [`clbic`] for a likelihood that can fail.
pub fn try_clbic<F, E>(f: F, estimates: &DVector<f64>, options: &CriterionOptions) -> Result<f64>
where
    F: Fn(&DVector<f64>) -> std::result::Result<f64, E>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    options.require_n_samples()?;
    assess_likelihood(&Fallible(f), estimates, options)?.value(Criterion::Clbic)
}

/// Computes `trace(J · H⁻¹)`.
///
/// `hessian` must be square with side `n` and `jacobian` must have `n`
/// columns. The trace is summed along the leading diagonal of the product, so
/// a `1 × n` gradient contributes only its first entry while an `n × n`
/// outer-product matrix gives the usual trace.
pub fn penalty_trace(jacobian: &DMatrix<f64>, hessian: &DMatrix<f64>) -> Result<f64> {
    let n = hessian.nrows();
    if hessian.ncols() != n {
        return Err(ClicError::dimension_mismatch("hessian columns", n, hessian.ncols()));
    }
    if jacobian.ncols() != n {
        return Err(ClicError::dimension_mismatch("jacobian columns", n, jacobian.ncols()));
    }

    let inverse = hessian
        .clone()
        .try_inverse()
        .ok_or_else(|| ClicError::singular("hessian inversion"))?;
    let product = jacobian * inverse;

    let diagonal = product.nrows().min(product.ncols());
    Ok((0..diagonal).map(|i| product[(i, i)]).sum())
}

/// CLAIC from a likelihood value and precomputed derivative matrices.
pub fn claic_from_matrices(
    likelihood: f64,
    jacobian: &DMatrix<f64>,
    hessian: &DMatrix<f64>,
) -> Result<f64> {
    Ok(akaike(likelihood, penalty_trace(jacobian, hessian)?))
}

/// CLBIC from a likelihood value and precomputed derivative matrices.
pub fn clbic_from_matrices(
    likelihood: f64,
    jacobian: &DMatrix<f64>,
    hessian: &DMatrix<f64>,
    n_samples: usize,
) -> Result<f64> {
    if n_samples == 0 {
        return Err(ClicError::InvalidSampleSize { n_samples });
    }
    Ok(bayes(likelihood, penalty_trace(jacobian, hessian)?, n_samples))
}

fn akaike(likelihood: f64, trace: f64) -> f64 {
    -2.0 * likelihood + 2.0 * trace
}

fn bayes(likelihood: f64, trace: f64, n_samples: usize) -> f64 {
    -2.0 * likelihood + (n_samples as f64).ln() * trace
}

pub(crate) fn assess_likelihood<L>(
    likelihood: &L,
    estimates: &DVector<f64>,
    options: &CriterionOptions,
) -> Result<CriterionReport>
where
    L: CompositeLikelihood + ?Sized,
{
    options.validate()?;
    if estimates.is_empty() {
        return Err(ClicError::EmptyEstimates);
    }

    // Screening happens before any call to the likelihood.
    let warnings = screen_estimates(estimates, options.zeros, options.nan_infs)?;

    let value = likelihood.log_likelihood(estimates)?;
    let evaluate = |theta: &DVector<f64>| likelihood.log_likelihood(theta);
    let (jacobian, jacobian_steps) = try_compute_jacobian(evaluate, estimates, &options.step)?;
    let (hessian, hessian_steps) = try_compute_hessian(evaluate, estimates, &options.step)?;

    let trace = penalty_trace(&jacobian, &hessian)?;
    let claic = akaike(value, trace);
    let clbic = options.n_samples.map(|n| bayes(value, trace, n));

    log::debug!(
        "assessed {} parameters: loglik {value}, trace {trace}, CLAIC {claic}, CLBIC {clbic:?}",
        estimates.len()
    );

    Ok(CriterionReport {
        likelihood: value,
        jacobian,
        hessian,
        penalty_trace: trace,
        claic,
        clbic,
        jacobian_steps,
        hessian_steps,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::validation::{EstimateCheck, ValidationPolicy};

    fn sum_of_squares(theta: &DVector<f64>) -> f64 {
        theta.iter().map(|x| x * x).sum()
    }

    fn point(values: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(values)
    }

    #[test]
    fn gradient_trace_uses_leading_diagonal() {
        let jacobian = DMatrix::from_row_slice(1, 3, &[2.0, 4.0, 6.0]);
        let hessian = DMatrix::from_diagonal_element(3, 3, 2.0);
        // J·H⁻¹ = [1, 2, 3]; only the (0, 0) entry sits on the diagonal.
        assert_abs_diff_eq!(penalty_trace(&jacobian, &hessian).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn square_jacobian_gives_full_trace() {
        let jacobian = DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 9.0]);
        let hessian = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 3.0]);
        assert_abs_diff_eq!(penalty_trace(&jacobian, &hessian).unwrap(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_hessian_is_reported() {
        let jacobian = DMatrix::from_row_slice(1, 3, &[10.0, 2.0, 14.0]);
        let hessian = DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 0.0, 2.0]));
        let err = penalty_trace(&jacobian, &hessian).unwrap_err();
        assert!(matches!(err, ClicError::SingularMatrix { .. }));
    }

    #[test]
    fn mismatched_dimensions_are_reported() {
        let jacobian = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let hessian = DMatrix::identity(3, 3);
        let err = penalty_trace(&jacobian, &hessian).unwrap_err();
        assert!(matches!(
            err,
            ClicError::DimensionMismatch {
                expected: 3,
                found: 2,
                ..
            }
        ));

        let rectangular = DMatrix::zeros(2, 3);
        assert!(penalty_trace(&jacobian, &rectangular).is_err());
    }

    #[test]
    fn matrix_level_criteria_follow_their_formulas() {
        let jacobian = DMatrix::from_row_slice(1, 2, &[3.0, 1.0]);
        let hessian = DMatrix::from_row_slice(2, 2, &[1.5, 0.0, 0.0, 4.0]);
        let trace = 2.0;

        let aic = claic_from_matrices(-10.0, &jacobian, &hessian).unwrap();
        assert_abs_diff_eq!(aic, 20.0 + 2.0 * trace, epsilon = 1e-12);

        let bic = clbic_from_matrices(-10.0, &jacobian, &hessian, 50).unwrap();
        assert_abs_diff_eq!(bic, 20.0 + 50f64.ln() * trace, epsilon = 1e-12);

        let err = clbic_from_matrices(-10.0, &jacobian, &hessian, 0).unwrap_err();
        assert!(matches!(err, ClicError::InvalidSampleSize { n_samples: 0 }));
    }

    #[test]
    fn report_carries_both_criteria() {
        let problem = CriterionProblem::new(sum_of_squares, point(&[1.0, 2.0, 3.0])).unwrap();
        let options = CriterionOptions::default().with_n_samples(100);
        let report = problem.assess(&options).unwrap();

        assert_eq!(report.likelihood, 14.0);
        assert_abs_diff_eq!(report.penalty_trace, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(report.claic, -26.0, epsilon = 1e-5);
        assert_abs_diff_eq!(
            report.value(Criterion::Clbic).unwrap(),
            -28.0 + 100f64.ln(),
            epsilon = 1e-5
        );
        assert_eq!(report.jacobian_steps.attempts, 1);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn report_without_sample_size_has_no_clbic() {
        let problem = CriterionProblem::new(sum_of_squares, point(&[1.0, 2.0])).unwrap();
        let report = problem.assess(&CriterionOptions::default()).unwrap();
        assert!(report.clbic.is_none());
        assert!(matches!(
            report.value(Criterion::Clbic),
            Err(ClicError::MissingSampleSize)
        ));
    }

    #[test]
    fn clbic_requires_sample_size_before_evaluating() {
        let calls = Cell::new(0usize);
        let f = |theta: &DVector<f64>| {
            calls.set(calls.get() + 1);
            sum_of_squares(theta)
        };
        let err = clbic(f, &point(&[1.0, 2.0, 3.0]), &CriterionOptions::default()).unwrap_err();
        assert!(matches!(err, ClicError::MissingSampleSize));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn validation_errors_abort_before_evaluation() {
        let calls = Cell::new(0usize);
        let f = |theta: &DVector<f64>| {
            calls.set(calls.get() + 1);
            sum_of_squares(theta)
        };
        let options = CriterionOptions::default().with_zeros(ValidationPolicy::Error);
        let err = claic(&f, &point(&[1.0, 0.0]), &options).unwrap_err();
        assert!(matches!(err, ClicError::InvalidEstimates { index: 1, .. }));

        let err = claic(&f, &point(&[1.0, f64::NAN]), &CriterionOptions::default()).unwrap_err();
        assert!(matches!(err, ClicError::InvalidEstimates { index: 1, .. }));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn warnings_are_returned_with_the_result() {
        let problem = CriterionProblem::new(sum_of_squares, point(&[-1.0, 2.0])).unwrap();
        let options = CriterionOptions::default().with_zeros(ValidationPolicy::Warn);
        let report = problem.assess(&options).unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].check, EstimateCheck::NonPositive);
        assert_eq!(report.warnings[0].indices, vec![0]);
        assert!(report.claic.is_finite());
    }

    #[test]
    fn non_finite_estimates_under_allow_hit_the_retry_cap() {
        let options = CriterionOptions::default()
            .with_nan_infs(ValidationPolicy::Allow)
            .with_max_retries(3);
        let err = claic(sum_of_squares, &point(&[f64::NAN, 1.0]), &options).unwrap_err();
        assert!(matches!(
            err,
            ClicError::StepRetriesExhausted {
                derivative: "jacobian",
                attempts: 4,
                ..
            }
        ));
    }

    #[test]
    fn fallible_likelihood_errors_propagate() {
        let f = |theta: &DVector<f64>| -> std::result::Result<f64, String> {
            if theta[0] > 1.005 {
                Err(format!("theta[0] = {} leaves the support", theta[0]))
            } else {
                Ok(theta[0])
            }
        };
        let options = CriterionOptions::default().with_n_samples(10);
        let err = try_clbic(f, &point(&[1.0]), &options).unwrap_err();
        assert!(matches!(err, ClicError::Likelihood(_)));
        assert!(err.to_string().contains("leaves the support"));
    }

    #[test]
    fn problems_over_closures_are_debug() {
        let problem =
            CriterionProblem::new(|t: &DVector<f64>| t.sum(), point(&[1.0, 2.0])).unwrap();
        let rendered = format!("{problem:?}");
        assert!(rendered.starts_with("CriterionProblem"));
        assert!(rendered.contains("estimates"));
    }

    #[test]
    fn empty_estimates_are_rejected() {
        let err = CriterionProblem::new(sum_of_squares, DVector::zeros(0)).unwrap_err();
        assert!(matches!(err, ClicError::EmptyEstimates));
        let err = claic(sum_of_squares, &DVector::zeros(0), &CriterionOptions::default())
            .unwrap_err();
        assert!(matches!(err, ClicError::EmptyEstimates));
    }

    #[test]
    fn invalid_step_factor_is_a_configuration_error() {
        let options = CriterionOptions::default().with_step_factor(2.0);
        let err = claic(sum_of_squares, &point(&[1.0]), &options).unwrap_err();
        assert!(matches!(err, ClicError::InvalidStep { .. }));
    }
}
