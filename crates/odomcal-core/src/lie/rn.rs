use super::LieGroup;
use crate::{MatN, VecN};

/// The translation group `(ℝⁿ, +)`.
///
/// Exp and Log are the identity map and every Jacobian is the identity matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rn<const N: usize>(pub VecN<N>);

impl<const N: usize> Rn<N> {
    pub fn new(v: VecN<N>) -> Self {
        Self(v)
    }

    pub fn coeffs(&self) -> &VecN<N> {
        &self.0
    }

    pub fn coeffs_mut(&mut self) -> &mut VecN<N> {
        &mut self.0
    }
}

impl<const N: usize> From<VecN<N>> for Rn<N> {
    fn from(v: VecN<N>) -> Self {
        Self(v)
    }
}

impl<const N: usize> LieGroup<N> for Rn<N> {
    fn identity() -> Self {
        Self(VecN::<N>::zeros())
    }

    fn inverse(&self) -> Self {
        Self(-self.0)
    }

    fn compose(&self, other: &Self) -> Self {
        Self(self.0 + other.0)
    }

    fn exp(tau: &VecN<N>) -> Self {
        Self(*tau)
    }

    fn log(&self) -> VecN<N> {
        self.0
    }

    fn adjoint(&self) -> MatN<N, N> {
        MatN::<N, N>::identity()
    }

    fn right_jacobian(_tau: &VecN<N>) -> MatN<N, N> {
        MatN::<N, N>::identity()
    }

    fn right_jacobian_inv(_tau: &VecN<N>) -> MatN<N, N> {
        MatN::<N, N>::identity()
    }

    fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}
