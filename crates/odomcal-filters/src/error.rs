use std::fmt;

use odomcal_core::{ModelError, Real};
use thiserror::Error;

/// Filter operation that raised an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Predict,
    Update,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Predict => write!(f, "predict"),
            Stage::Update => write!(f, "update"),
        }
    }
}

/// Errors returned by the estimators.
///
/// Numeric variants leave the estimator untouched. `Model` wraps domain errors
/// (invalid covariance, non-positive calibration) raised by the models or by the
/// constructors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    /// The covariance (or its factor) produced by the operation is not finite.
    #[error("{stage}: covariance is not finite")]
    NonFiniteCovariance { stage: Stage },
    /// The state produced by the operation is not finite.
    #[error("{stage}: state is not finite")]
    NonFiniteState { stage: Stage },
    /// The covariance cannot be factored as symmetric positive semi-definite.
    #[error("{stage}: covariance is not positive semi-definite")]
    IndefiniteCovariance { stage: Stage },
    /// `H P Hᵀ + R` is not positive definite.
    #[error("innovation covariance is not positive definite")]
    InnovationNotPositiveDefinite,
    /// The on-manifold sigma-point mean did not settle.
    #[error("karcher mean did not converge after {iterations} iterations (last step {step:e})")]
    KarcherMeanNotConverged { iterations: usize, step: Real },
    /// Invalid model, measurement or filter configuration.
    #[error(transparent)]
    Model(#[from] ModelError),
}
