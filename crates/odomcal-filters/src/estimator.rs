use std::fmt;
use std::str::FromStr;

use odomcal_core::{LieGroup, MatN, MeasurementModel, Real, SystemModel, VecN};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Ekf, FilterError, Iekf, KalmanFilter, Sekf, Ukfm};

/// Estimator variant selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Ekf,
    Sekf,
    Iekf,
    Ukfm,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::Ekf,
        FilterKind::Sekf,
        FilterKind::Iekf,
        FilterKind::Ukfm,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterKind::Ekf => "EKF",
            FilterKind::Sekf => "SEKF",
            FilterKind::Iekf => "IEKF",
            FilterKind::Ukfm => "UKFM",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown filter kind `{0}` (expected ekf, sekf, iekf or ukfm)")]
pub struct ParseFilterKindError(pub String);

impl FromStr for FilterKind {
    type Err = ParseFilterKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ekf" => Ok(FilterKind::Ekf),
            "sekf" => Ok(FilterKind::Sekf),
            "iekf" => Ok(FilterKind::Iekf),
            "ukfm" | "ukf" => Ok(FilterKind::Ukfm),
            _ => Err(ParseFilterKindError(s.to_string())),
        }
    }
}

/// One of the estimator variants, chosen at construction.
#[derive(Clone, Debug, PartialEq)]
pub enum Estimator<S, const N: usize> {
    Ekf(Ekf<S, N>),
    Sekf(Sekf<S, N>),
    Iekf(Iekf<S, N>),
    Ukfm(Ukfm<S, N>),
}

macro_rules! dispatch {
    ($self:expr, $f:ident => $body:expr) => {
        match $self {
            Estimator::Ekf($f) => $body,
            Estimator::Sekf($f) => $body,
            Estimator::Iekf($f) => $body,
            Estimator::Ukfm($f) => $body,
        }
    };
}

impl<S, const N: usize> Estimator<S, N>
where
    S: LieGroup<N>,
{
    /// Build the `kind` variant from the same initial mean and covariance.
    pub fn new(kind: FilterKind, x0: S, p0: MatN<N, N>) -> Result<Self, FilterError> {
        Ok(match kind {
            FilterKind::Ekf => Estimator::Ekf(Ekf::new(x0, p0)?),
            FilterKind::Sekf => Estimator::Sekf(Sekf::new(x0, p0)?),
            FilterKind::Iekf => Estimator::Iekf(Iekf::new(x0, p0)?),
            FilterKind::Ukfm => Estimator::Ukfm(Ukfm::new(x0, p0)?),
        })
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Estimator::Ekf(_) => FilterKind::Ekf,
            Estimator::Sekf(_) => FilterKind::Sekf,
            Estimator::Iekf(_) => FilterKind::Iekf,
            Estimator::Ukfm(_) => FilterKind::Ukfm,
        }
    }
}

impl<S, const N: usize> KalmanFilter<S, N> for Estimator<S, N>
where
    S: LieGroup<N>,
{
    fn state(&self) -> &S {
        dispatch!(self, f => f.state())
    }

    fn covariance(&self) -> MatN<N, N> {
        dispatch!(self, f => f.covariance())
    }

    fn set_state(&mut self, x: S) {
        dispatch!(self, f => f.set_state(x))
    }

    fn set_covariance(&mut self, p: MatN<N, N>) -> Result<(), FilterError> {
        dispatch!(self, f => f.set_covariance(p))
    }

    fn predict<F, const U: usize>(
        &mut self,
        model: &F,
        u: &VecN<U>,
        dt: Real,
    ) -> Result<(), FilterError>
    where
        F: SystemModel<N, U, State = S>,
    {
        dispatch!(self, f => f.predict(model, u, dt))
    }

    fn update<H, const M: usize>(&mut self, model: &H, y: &VecN<M>) -> Result<(), FilterError>
    where
        H: MeasurementModel<N, M, State = S>,
    {
        dispatch!(self, f => f.update(model, y))
    }
}
