use thiserror::Error;

use crate::{is_psd, LieGroup, MatN, Real, VecN};

/// Errors raised by model construction and validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// A physical parameter that must be strictly positive is not.
    #[error("parameter `{name}` must be positive, got {value}")]
    NonPositiveParameter { name: &'static str, value: Real },
    /// A covariance matrix is not finite, symmetric and positive semi-definite.
    #[error("{what} is not a symmetric positive semi-definite matrix")]
    InvalidCovariance { what: &'static str },
    /// A rate or variance that must be non-negative is negative or not finite.
    #[error("parameter `{name}` must be finite and non-negative, got {value}")]
    NegativeParameter { name: &'static str, value: Real },
}

/// Reject `P` unless it is finite, symmetric and positive semi-definite.
pub fn validate_covariance<const N: usize>(
    p: &MatN<N, N>,
    what: &'static str,
) -> Result<(), ModelError> {
    if is_psd(p) {
        Ok(())
    } else {
        Err(ModelError::InvalidCovariance { what })
    }
}

pub fn ensure_positive(name: &'static str, value: Real) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModelError::NonPositiveParameter { name, value })
    }
}

pub fn ensure_non_negative(name: &'static str, value: Real) -> Result<(), ModelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ModelError::NegativeParameter { name, value })
    }
}

/// Process model `x' = f(x, u)` over a state with an `N`-dimensional tangent, driven
/// by a `U`-dimensional control.
///
/// The control passed in is already integrated over the step (`u·Δt`); `dt` only
/// scales the noise terms. Jacobians are expressed in the right tangent: `F` maps a
/// perturbation of `x` to one of `f(x, u)`, `W` maps control noise to it.
pub trait SystemModel<const N: usize, const U: usize> {
    type State: LieGroup<N>;

    /// Deterministic transition.
    fn propagate(&self, x: &Self::State, u: &VecN<U>, dt: Real) -> Self::State;

    /// `(F, W)` evaluated at `(x, u)`.
    fn jacobians(&self, x: &Self::State, u: &VecN<U>, dt: Real) -> (MatN<N, N>, MatN<N, U>);

    /// Covariance of the noise on the integrated control over one step.
    fn control_covariance(&self, dt: Real) -> MatN<U, U>;

    /// Noise injected directly in the tangent of the propagated state, on top of
    /// the control noise.
    fn additive_covariance(&self, _x: &Self::State, _u: &VecN<U>, _dt: Real) -> MatN<N, N> {
        MatN::<N, N>::zeros()
    }

    /// Rejects states the model cannot propagate.
    fn validate(&self, _x: &Self::State) -> Result<(), ModelError> {
        Ok(())
    }

    /// `W Qu Wᵀ + Qa` for one step.
    fn process_covariance(&self, x: &Self::State, u: &VecN<U>, dt: Real) -> MatN<N, N> {
        let (_, w) = self.jacobians(x, u, dt);
        w * self.control_covariance(dt) * w.transpose() + self.additive_covariance(x, u, dt)
    }
}

/// Measurement model `y = h(x) + v`, `v ~ N(0, R)`, with `M`-dimensional output.
pub trait MeasurementModel<const N: usize, const M: usize> {
    type State: LieGroup<N>;

    fn expectation(&self, x: &Self::State) -> VecN<M>;

    /// `∂h/∂x` in the right tangent of `x`.
    fn jacobian(&self, x: &Self::State) -> MatN<M, N>;

    fn expectation_and_jacobian(&self, x: &Self::State) -> (VecN<M>, MatN<M, N>) {
        (self.expectation(x), self.jacobian(x))
    }

    /// Measurement noise covariance `R`.
    fn covariance(&self) -> MatN<M, M>;

    /// Innovation `y ⊖ ŷ`.
    fn residual(&self, y: &VecN<M>, expected: &VecN<M>) -> VecN<M> {
        y - expected
    }
}
