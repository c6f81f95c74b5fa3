//! Core math primitives for `odomcal`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `VecN`, `MatN`, ...),
//! - matrix Lie groups used as estimator state ([`Se2`], [`Rn`], [`Bundle`]) behind
//!   the [`LieGroup`] trait,
//! - the model contracts consumed by the estimators ([`SystemModel`],
//!   [`MeasurementModel`]),
//! - small dense helpers for covariance handling (symmetrization, PSD factors,
//!   Givens row folding for square-root filters).
//!
//! Tangent conventions follow the right-trivialized ("local") tangent:
//! `X ⊞ τ = X ∘ Exp(τ)` and `X ⊟ Y = Log(Y⁻¹ ∘ X)`.

/// Dense helpers on fixed-size covariance matrices.
pub mod linalg;
/// Lie groups and their tangent-space calculus.
pub mod lie;
/// Linear algebra type aliases.
pub mod math;
/// System and measurement model contracts.
pub mod model;

pub use lie::*;
pub use linalg::*;
pub use math::*;
pub use model::*;
