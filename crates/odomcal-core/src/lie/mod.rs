use std::fmt::Debug;

use crate::{MatN, Real, VecN};

mod bundle;
mod rn;
mod se2;
pub mod series;

pub use bundle::{Bundle, BundleElement};
pub use rn::Rn;
pub use se2::Se2;

/// A Lie group with an `N`-dimensional tangent space.
///
/// Jacobians and the adjoint follow the right-trivialized convention:
/// - `Exp(τ + δ) ≈ Exp(τ) ∘ Exp(Jr(τ) δ)`,
/// - `X ∘ Exp(τ) = Exp(Ad_X τ) ∘ X`.
pub trait LieGroup<const N: usize>: Clone + Debug + PartialEq {
    /// Neutral element.
    fn identity() -> Self;

    fn inverse(&self) -> Self;

    /// Group composition `self ∘ other`.
    fn compose(&self, other: &Self) -> Self;

    /// Exponential map from the tangent space.
    fn exp(tau: &VecN<N>) -> Self;

    /// Logarithmic map to the tangent space.
    fn log(&self) -> VecN<N>;

    /// Adjoint matrix, mapping right-tangent increments to left-tangent increments.
    fn adjoint(&self) -> MatN<N, N>;

    /// Right Jacobian of the exponential map.
    fn right_jacobian(tau: &VecN<N>) -> MatN<N, N>;

    /// Inverse of [`LieGroup::right_jacobian`].
    fn right_jacobian_inv(tau: &VecN<N>) -> MatN<N, N>;

    /// Whether every stored coefficient is finite.
    fn is_finite(&self) -> bool;

    /// Left Jacobian, `Jl(τ) = Jr(-τ)`.
    fn left_jacobian(tau: &VecN<N>) -> MatN<N, N> {
        Self::right_jacobian(&(-tau))
    }

    fn left_jacobian_inv(tau: &VecN<N>) -> MatN<N, N> {
        Self::right_jacobian_inv(&(-tau))
    }

    /// Right plus: `self ∘ Exp(τ)`.
    fn rplus(&self, tau: &VecN<N>) -> Self {
        self.compose(&Self::exp(tau))
    }

    /// Right minus: `Log(other⁻¹ ∘ self)`.
    fn rminus(&self, other: &Self) -> VecN<N> {
        other.inverse().compose(self).log()
    }

    /// Left plus: `Exp(τ) ∘ self`.
    fn lplus(&self, tau: &VecN<N>) -> Self {
        Self::exp(tau).compose(self)
    }

    /// Left minus: `Log(self ∘ other⁻¹)`.
    fn lminus(&self, other: &Self) -> VecN<N> {
        self.compose(&other.inverse()).log()
    }
}

/// `sqrt(τᵀ W τ)` with `τ = a ⊟ b`.
pub fn weighted_norm<G, const N: usize>(a: &G, b: &G, weights: &MatN<N, N>) -> Real
where
    G: LieGroup<N>,
{
    let tau = a.rminus(b);
    tau.dot(&(weights * tau)).max(0.0).sqrt()
}
