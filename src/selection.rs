//! Ranking competing composite-likelihood models by an information criterion.

use std::cmp::Ordering;

use nalgebra::DVector;
use rayon::prelude::*;

use crate::criterion::{assess_likelihood, Criterion, CriterionReport};
use crate::error::Result;
use crate::likelihood::CompositeLikelihood;
use crate::options::CriterionOptions;

/// A fitted model entered into a comparison.
pub struct ModelCandidate {
    name: String,
    likelihood: Box<dyn CompositeLikelihood + Send + Sync>,
    estimates: DVector<f64>,
}

impl ModelCandidate {
    /// Creates a candidate from a name, its log-likelihood and fitted estimates.
    pub fn new<S, L>(name: S, likelihood: L, estimates: DVector<f64>) -> Self
    where
        S: Into<String>,
        L: CompositeLikelihood + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            likelihood: Box::new(likelihood),
            estimates,
        }
    }

    /// Name used to identify the candidate in rankings.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fitted estimates of the candidate.
    pub fn estimates(&self) -> &DVector<f64> {
        &self.estimates
    }

    /// Assesses this candidate on its own.
    pub fn assess(&self, options: &CriterionOptions) -> Result<CriterionReport> {
        assess_likelihood(self.likelihood.as_ref(), &self.estimates, options)
    }
}

impl std::fmt::Debug for ModelCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCandidate")
            .field("name", &self.name)
            .field("estimates", &self.estimates)
            .finish_non_exhaustive()
    }
}

/// One entry of a ranking, best model first.
#[derive(Clone, Debug)]
pub struct RankedModel {
    /// Candidate name.
    pub name: String,
    /// Value of the criterion used for ranking.
    pub score: f64,
    /// Full assessment of the candidate.
    pub report: CriterionReport,
}

/// Assesses every candidate in parallel and sorts them by `criterion`, lowest first.
///
/// Candidates with equal scores keep their input order. Non-finite scores
/// (NaN or infinite) rank after every finite score. If any candidate fails,
/// the error of the earliest failing candidate is returned.
pub fn rank_candidates(
    candidates: &[ModelCandidate],
    criterion: Criterion,
    options: &CriterionOptions,
) -> Result<Vec<RankedModel>> {
    if criterion == Criterion::Clbic {
        options.require_n_samples()?;
    }

    let mut ranked = candidates
        .par_iter()
        .map(|candidate| -> Result<RankedModel> {
            let report = candidate.assess(options)?;
            let score = report.value(criterion)?;
            Ok(RankedModel {
                name: candidate.name.clone(),
                score,
                report,
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    ranked.sort_by(|a, b| by_score(a.score, b.score));

    for model in ranked.iter().filter(|model| !model.score.is_finite()) {
        log::warn!("{criterion} for `{}` is {}; ranked last", model.name, model.score);
    }

    if let Some(best) = ranked.first() {
        log::debug!(
            "{criterion} ranking over {} candidates: best `{}` at {}",
            ranked.len(),
            best.name,
            best.score
        );
    }

    Ok(ranked)
}

fn by_score(a: f64, b: f64) -> Ordering {
    match (a.is_finite(), b.is_finite()) {
        (true, true) => a.total_cmp(&b),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}
