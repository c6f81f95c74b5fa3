//! Recursive estimators on Lie groups for `odomcal`.
//!
//! Four variants share the [`KalmanFilter`] contract:
//! - [`Ekf`]: on-manifold EKF with right-composition retraction and Joseph update,
//! - [`Sekf`]: square-root EKF propagating an upper-triangular factor of `P`,
//! - [`Iekf`]: invariant EKF carrying its covariance in the left tangent,
//! - [`Ukfm`]: unscented filter with sigma points in the tangent and a Karcher mean.
//!
//! [`Estimator`] is the sum type over the variants, selected with [`FilterKind`].
//!
//! Every variant reports its state covariance in the right tangent of its current
//! estimate, so readouts are directly comparable. Operations are transactional: when
//! `predict` or `update` returns an error the state and covariance are unchanged.
//! Nothing in this crate logs; all diagnostics are returned as [`FilterError`].

mod ekf;
mod error;
mod estimator;
mod gain;
mod iekf;
mod sekf;
mod traits;
mod ukfm;

pub use ekf::Ekf;
pub use error::{FilterError, Stage};
pub use estimator::{Estimator, FilterKind, ParseFilterKindError};
pub use iekf::Iekf;
pub use sekf::Sekf;
pub use traits::KalmanFilter;
pub use ukfm::{KarcherOptions, UnscentedParams, Ukfm};
