use super::LieGroup;
use crate::{MatN, VecN};

/// Direct product of two Lie groups.
///
/// `NA` and `NB` are the tangent dimensions of the blocks and `N = NA + NB` the
/// dimension of the product tangent, ordered first block then second block. Exp, Log
/// and every Jacobian are block diagonal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bundle<A, B, const NA: usize, const NB: usize, const N: usize> {
    first: A,
    second: B,
}

impl<A, B, const NA: usize, const NB: usize, const N: usize> Bundle<A, B, NA, NB, N>
where
    A: LieGroup<NA>,
    B: LieGroup<NB>,
{
    const DIMS_MATCH: () = assert!(NA + NB == N, "bundle tangent must be NA + NB");

    pub fn new(first: A, second: B) -> Self {
        let () = Self::DIMS_MATCH;
        Self { first, second }
    }

    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }

    pub fn first_mut(&mut self) -> &mut A {
        &mut self.first
    }

    pub fn second_mut(&mut self) -> &mut B {
        &mut self.second
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }

    fn split(tau: &VecN<N>) -> (VecN<NA>, VecN<NB>) {
        (
            tau.fixed_rows::<NA>(0).into_owned(),
            tau.fixed_rows::<NB>(NA).into_owned(),
        )
    }

    fn join(a: &VecN<NA>, b: &VecN<NB>) -> VecN<N> {
        let mut tau = VecN::<N>::zeros();
        tau.fixed_rows_mut::<NA>(0).copy_from(a);
        tau.fixed_rows_mut::<NB>(NA).copy_from(b);
        tau
    }

    fn block_diag(a: &MatN<NA, NA>, b: &MatN<NB, NB>) -> MatN<N, N> {
        let mut m = MatN::<N, N>::zeros();
        m.fixed_view_mut::<NA, NA>(0, 0).copy_from(a);
        m.fixed_view_mut::<NB, NB>(NA, NA).copy_from(b);
        m
    }
}

impl<A, B, const NA: usize, const NB: usize, const N: usize> LieGroup<N>
    for Bundle<A, B, NA, NB, N>
where
    A: LieGroup<NA>,
    B: LieGroup<NB>,
{
    fn identity() -> Self {
        Self::new(A::identity(), B::identity())
    }

    fn inverse(&self) -> Self {
        Self::new(self.first.inverse(), self.second.inverse())
    }

    fn compose(&self, other: &Self) -> Self {
        Self::new(
            self.first.compose(&other.first),
            self.second.compose(&other.second),
        )
    }

    fn exp(tau: &VecN<N>) -> Self {
        let (a, b) = Self::split(tau);
        Self::new(A::exp(&a), B::exp(&b))
    }

    fn log(&self) -> VecN<N> {
        Self::join(&self.first.log(), &self.second.log())
    }

    fn adjoint(&self) -> MatN<N, N> {
        Self::block_diag(&self.first.adjoint(), &self.second.adjoint())
    }

    fn right_jacobian(tau: &VecN<N>) -> MatN<N, N> {
        let (a, b) = Self::split(tau);
        Self::block_diag(&A::right_jacobian(&a), &B::right_jacobian(&b))
    }

    fn right_jacobian_inv(tau: &VecN<N>) -> MatN<N, N> {
        let (a, b) = Self::split(tau);
        Self::block_diag(&A::right_jacobian_inv(&a), &B::right_jacobian_inv(&b))
    }

    fn is_finite(&self) -> bool {
        self.first.is_finite() && self.second.is_finite()
    }

    fn rplus(&self, tau: &VecN<N>) -> Self {
        let (a, b) = Self::split(tau);
        Self::new(self.first.rplus(&a), self.second.rplus(&b))
    }

    fn rminus(&self, other: &Self) -> VecN<N> {
        Self::join(
            &self.first.rminus(&other.first),
            &self.second.rminus(&other.second),
        )
    }
}

/// Indexed access to a block of a product group, with the block's position in the
/// product tangent.
pub trait BundleElement<const I: usize> {
    type Element;

    /// Row of the product tangent where the block starts.
    const OFFSET: usize;

    fn element(&self) -> &Self::Element;

    fn element_mut(&mut self) -> &mut Self::Element;
}

impl<A, B, const NA: usize, const NB: usize, const N: usize> BundleElement<0>
    for Bundle<A, B, NA, NB, N>
{
    type Element = A;
    const OFFSET: usize = 0;

    fn element(&self) -> &A {
        &self.first
    }

    fn element_mut(&mut self) -> &mut A {
        &mut self.first
    }
}

impl<A, B, const NA: usize, const NB: usize, const N: usize> BundleElement<1>
    for Bundle<A, B, NA, NB, N>
{
    type Element = B;
    const OFFSET: usize = NA;

    fn element(&self) -> &B {
        &self.second
    }

    fn element_mut(&mut self) -> &mut B {
        &mut self.second
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Rn, Se2, Vec3};

    type PoseOffset = Bundle<Se2, Rn<3>, 3, 3, 6>;

    fn sample() -> PoseOffset {
        Bundle::new(
            Se2::new(1.0, -0.5, 0.4),
            Rn::new(Vec3::new(0.15, 0.14, 0.4)),
        )
    }

    #[test]
    fn tangent_is_block_ordered() {
        let x = sample();
        let tau = VecN::<6>::from_column_slice(&[0.1, -0.2, 0.3, 0.01, 0.02, -0.03]);
        let y = x.rplus(&tau);
        let pose_tau = Vec3::new(0.1, -0.2, 0.3);
        assert!(y.first().rminus(&x.first().rplus(&pose_tau)).norm() < 1e-12);
        assert!((y.second().0 - Vec3::new(0.16, 0.16, 0.37)).norm() < 1e-12);
        assert!((y.rminus(&x) - tau).norm() < 1e-12);
    }

    #[test]
    fn jacobians_are_block_diagonal() {
        let tau = VecN::<6>::from_column_slice(&[0.1, -0.2, 0.3, 0.01, 0.02, -0.03]);
        let jr = PoseOffset::right_jacobian(&tau);
        let pose_jr = Se2::right_jacobian(&Vec3::new(0.1, -0.2, 0.3));
        assert!((jr.fixed_view::<3, 3>(0, 0) - pose_jr).norm() < 1e-15);
        assert_eq!(jr.fixed_view::<3, 3>(0, 3).norm(), 0.0);
        assert_eq!(jr.fixed_view::<3, 3>(3, 0).norm(), 0.0);
        assert_eq!(jr.fixed_view::<3, 3>(3, 3).into_owned(), MatN::<3, 3>::identity());
        let prod = jr * PoseOffset::right_jacobian_inv(&tau);
        assert!((prod - MatN::<6, 6>::identity()).norm() < 1e-12);
    }

    #[test]
    fn element_access_reports_offsets() {
        let mut x = sample();
        assert_eq!(<PoseOffset as BundleElement<0>>::OFFSET, 0);
        assert_eq!(<PoseOffset as BundleElement<1>>::OFFSET, 3);
        BundleElement::<1>::element_mut(&mut x).0[2] = 0.5;
        assert_eq!(BundleElement::<1>::element(&x).0[2], 0.5);
        assert_eq!(*BundleElement::<0>::element(&x), Se2::new(1.0, -0.5, 0.4));
    }
}
