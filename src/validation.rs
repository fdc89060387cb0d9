//! Screening of parameter estimates before any derivative work is attempted.

use std::fmt;
use std::str::FromStr;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{ClicError, Result};

/// How a screening check reacts when it finds offending entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Skip the check entirely.
    #[default]
    Allow,
    /// Log a warning, record it, and continue.
    Warn,
    /// Abort with [`ClicError::InvalidEstimates`].
    Error,
}

impl ValidationPolicy {
    /// Lowercase name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationPolicy {
    type Err = ClicError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "allow" => Ok(Self::Allow),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ClicError::InvalidPolicy {
                value: other.to_string(),
            }),
        }
    }
}

/// The two independent checks applied to estimates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateCheck {
    /// Entries less than or equal to zero.
    NonPositive,
    /// NaN or infinite entries.
    NonFinite,
}

impl EstimateCheck {
    fn label(&self) -> &'static str {
        match self {
            Self::NonPositive => "zero or negative value",
            Self::NonFinite => "NaN or infinite value",
        }
    }

    fn flags(&self, value: f64) -> bool {
        match self {
            Self::NonPositive => value <= 0.0,
            Self::NonFinite => !value.is_finite(),
        }
    }
}

/// A non-fatal finding recorded under [`ValidationPolicy::Warn`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Which check fired.
    pub check: EstimateCheck,
    /// Indices of every offending entry.
    pub indices: Vec<usize>,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} detected in estimates at indices {:?}",
            self.check.label(),
            self.indices
        )
    }
}

/// Applies both checks to `estimates`.
///
/// Returns the warnings raised under [`ValidationPolicy::Warn`], or the first
/// violation found under [`ValidationPolicy::Error`]. The non-finite check runs
/// first so that a NaN is reported as such rather than slipping past the
/// non-positive comparison.
pub fn screen_estimates(
    estimates: &DVector<f64>,
    zeros: ValidationPolicy,
    nan_infs: ValidationPolicy,
) -> Result<Vec<ValidationWarning>> {
    let mut warnings = Vec::new();
    for (check, policy) in [
        (EstimateCheck::NonFinite, nan_infs),
        (EstimateCheck::NonPositive, zeros),
    ] {
        if let Some(warning) = apply_check(estimates, check, policy)? {
            warnings.push(warning);
        }
    }
    Ok(warnings)
}

fn apply_check(
    estimates: &DVector<f64>,
    check: EstimateCheck,
    policy: ValidationPolicy,
) -> Result<Option<ValidationWarning>> {
    if policy == ValidationPolicy::Allow {
        return Ok(None);
    }

    let indices: Vec<usize> = estimates
        .iter()
        .enumerate()
        .filter(|(_, value)| check.flags(**value))
        .map(|(index, _)| index)
        .collect();

    let Some(&first) = indices.first() else {
        return Ok(None);
    };

    if policy == ValidationPolicy::Error {
        return Err(ClicError::InvalidEstimates {
            check: check.label(),
            index: first,
            value: estimates[first],
        });
    }

    let warning = ValidationWarning { check, indices };
    log::warn!("{warning}");
    Ok(Some(warning))
}
