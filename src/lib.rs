//! Composite-likelihood information criteria for model selection.
//!
//! Composite likelihoods break the regularity conditions behind the usual AIC
//! and BIC penalties. This crate replaces the parameter-count penalty with the
//! trace correction `trace(J · H⁻¹)`, where `J` and `H` are the Jacobian and
//! Hessian of the log-likelihood at the fitted estimates. It offers tools to
//!
//! - estimate both derivative matrices by central differences, shrinking the
//!   step whenever an estimate contains non-finite entries (`differentiation`
//!   module),
//! - screen parameter estimates against configurable policies (`validation`
//!   module),
//! - assemble CLAIC and CLBIC (`criterion` module), and
//! - rank competing fitted models by either criterion (`selection` module).
//!
//! # Quick start
//!
//! ```
//! use clic::{claic, clbic, CriterionOptions};
//! use nalgebra::DVector;
//!
//! let loglik = |theta: &DVector<f64>| theta.iter().map(|x| x * x).sum::<f64>();
//! let estimates = DVector::from_vec(vec![1.0, 2.0, 3.0]);
//!
//! let options = CriterionOptions::default().with_n_samples(100);
//! let aic = claic(loglik, &estimates, &options).expect("finite derivatives");
//! let bic = clbic(loglik, &estimates, &options).expect("sample size supplied");
//!
//! assert!((aic - -26.0).abs() < 1e-5);
//! assert!((bic - (-28.0 + 100f64.ln())).abs() < 1e-5);
//! ```
//!
//! Diagnostics go through the [`log`] facade; install any logger to see step
//! retries and validation warnings.

pub mod criterion;
pub mod differentiation;
pub mod error;
pub mod likelihood;
pub mod options;
pub mod selection;
pub mod stepping;
pub mod validation;

pub use criterion::{
    claic, claic_from_matrices, clbic, clbic_from_matrices, penalty_trace, try_claic, try_clbic,
    Criterion, CriterionProblem, CriterionReport,
};
pub use differentiation::{compute_hessian, compute_jacobian};
pub use error::{ClicError, Result};
pub use likelihood::{CompositeLikelihood, Fallible};
pub use options::CriterionOptions;
pub use selection::{rank_candidates, ModelCandidate, RankedModel};
pub use stepping::{StepOptions, StepSummary};
pub use validation::{ValidationPolicy, ValidationWarning};
