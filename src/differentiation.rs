//! Central-difference Jacobian and Hessian estimation with adaptive step control.
//!
//! Each estimate is checked entry by entry. If any entry is NaN or infinite the
//! whole matrix is discarded, the step is multiplied by
//! [`StepOptions::step_factor`] and the estimate is recomputed at the same
//! point. The loop stops at the first fully finite matrix, or fails with
//! [`ClicError::StepRetriesExhausted`] after [`StepOptions::max_retries`]
//! shrinks, or as soon as the next step would underflow to zero or a
//! subnormal value.

use nalgebra::{DMatrix, DVector};

use crate::error::{ClicError, Result};
use crate::stepping::{StepOptions, StepSummary};

/// Estimates the `1 × n` gradient row of `f` at `point`.
pub fn compute_jacobian<F>(
    f: F,
    point: &DVector<f64>,
    options: &StepOptions,
) -> Result<(DMatrix<f64>, StepSummary)>
where
    F: Fn(&DVector<f64>) -> f64,
{
    try_compute_jacobian(|theta: &DVector<f64>| Ok(f(theta)), point, options)
}

/// Estimates the `n × n` Hessian of `f` at `point`.
pub fn compute_hessian<F>(
    f: F,
    point: &DVector<f64>,
    options: &StepOptions,
) -> Result<(DMatrix<f64>, StepSummary)>
where
    F: Fn(&DVector<f64>) -> f64,
{
    try_compute_hessian(|theta: &DVector<f64>| Ok(f(theta)), point, options)
}

/// Fallible variant of [`compute_jacobian`]; the first error returned by `f` aborts the estimate.
pub fn try_compute_jacobian<F>(
    f: F,
    point: &DVector<f64>,
    options: &StepOptions,
) -> Result<(DMatrix<f64>, StepSummary)>
where
    F: Fn(&DVector<f64>) -> Result<f64>,
{
    shrink_until_finite("jacobian", options, |step| central_gradient(&f, point, step))
}

/// Fallible variant of [`compute_hessian`]; the first error returned by `f` aborts the estimate.
pub fn try_compute_hessian<F>(
    f: F,
    point: &DVector<f64>,
    options: &StepOptions,
) -> Result<(DMatrix<f64>, StepSummary)>
where
    F: Fn(&DVector<f64>) -> Result<f64>,
{
    shrink_until_finite("hessian", options, |step| central_hessian(&f, point, step))
}

fn shrink_until_finite<E>(
    derivative: &'static str,
    options: &StepOptions,
    mut estimate: E,
) -> Result<(DMatrix<f64>, StepSummary)>
where
    E: FnMut(f64) -> Result<DMatrix<f64>>,
{
    options.validate()?;

    let mut step = options.initial_step;
    let mut attempts = 0usize;

    loop {
        let matrix = estimate(step)?;
        attempts += 1;

        if matrix.iter().all(|value| value.is_finite()) {
            log::debug!("{derivative} estimate accepted after {attempts} attempt(s) at step {step}");
            return Ok((matrix, StepSummary { attempts, step }));
        }

        if attempts > options.max_retries {
            return Err(ClicError::StepRetriesExhausted {
                derivative,
                attempts,
                last_step: step,
            });
        }

        let next = options.step_for_attempt(attempts);
        if !next.is_normal() {
            // Underflowed steps only produce 0/0 estimates.
            return Err(ClicError::StepRetriesExhausted {
                derivative,
                attempts,
                last_step: step,
            });
        }
        log::warn!("non-finite {derivative} entries at step {step}; retrying with step {next}");
        step = next;
    }
}

fn central_gradient<F>(f: &F, point: &DVector<f64>, step: f64) -> Result<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> Result<f64>,
{
    let n = point.len();
    let mut gradient = DMatrix::zeros(1, n);
    let mut shifted = point.clone();

    for i in 0..n {
        let xi = point[i];

        shifted[i] = xi + step;
        let forward = f(&shifted)?;
        shifted[i] = xi - step;
        let backward = f(&shifted)?;
        shifted[i] = xi;

        gradient[(0, i)] = (forward - backward) / (2.0 * step);
    }

    Ok(gradient)
}

fn central_hessian<F>(f: &F, point: &DVector<f64>, step: f64) -> Result<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> Result<f64>,
{
    let n = point.len();
    let mut hessian = DMatrix::zeros(n, n);
    let mut shifted = point.clone();
    let center = f(point)?;
    let step_sq = step * step;

    for i in 0..n {
        let xi = point[i];

        shifted[i] = xi + step;
        let forward = f(&shifted)?;
        shifted[i] = xi - step;
        let backward = f(&shifted)?;
        shifted[i] = xi;

        hessian[(i, i)] = (forward - 2.0 * center + backward) / step_sq;

        for j in (i + 1)..n {
            let xj = point[j];

            shifted[i] = xi + step;
            shifted[j] = xj + step;
            let pp = f(&shifted)?;
            shifted[j] = xj - step;
            let pm = f(&shifted)?;
            shifted[i] = xi - step;
            let mm = f(&shifted)?;
            shifted[j] = xj + step;
            let mp = f(&shifted)?;
            shifted[i] = xi;
            shifted[j] = xj;

            let mixed = (pp - pm - mp + mm) / (4.0 * step_sq);
            hessian[(i, j)] = mixed;
            hessian[(j, i)] = mixed;
        }
    }

    Ok(hessian)
}
