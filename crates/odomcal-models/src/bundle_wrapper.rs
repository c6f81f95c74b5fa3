use std::marker::PhantomData;

use odomcal_core::{BundleElement, LieGroup, MatN, MeasurementModel, VecN};

use crate::{PoseCalibState, POSE_DIM};

/// Lifts a measurement model defined on block `I` (tangent dimension `K`) of a product
/// state `S` to `S` itself.
///
/// The expectation, covariance and residual are those of the wrapped model; the
/// Jacobian is padded with zero columns outside the block.
#[derive(Debug)]
pub struct BundleWrapper<Mdl, S, const I: usize, const K: usize> {
    inner: Mdl,
    _state: PhantomData<fn() -> S>,
}

/// Pose-block measurement on a [`PoseCalibState`].
pub type OnPose<Mdl> = BundleWrapper<Mdl, PoseCalibState, 0, POSE_DIM>;

pub fn on_pose<Mdl>(model: Mdl) -> OnPose<Mdl> {
    BundleWrapper::new(model)
}

impl<Mdl, S, const I: usize, const K: usize> BundleWrapper<Mdl, S, I, K> {
    pub fn new(inner: Mdl) -> Self {
        Self {
            inner,
            _state: PhantomData,
        }
    }

    pub fn inner(&self) -> &Mdl {
        &self.inner
    }
}

impl<Mdl: Clone, S, const I: usize, const K: usize> Clone for BundleWrapper<Mdl, S, I, K> {
    fn clone(&self) -> Self {
        Self::new(self.inner.clone())
    }
}

impl<Mdl: Copy, S, const I: usize, const K: usize> Copy for BundleWrapper<Mdl, S, I, K> {}

impl<Mdl, S, const I: usize, const K: usize, const N: usize, const M: usize>
    MeasurementModel<N, M> for BundleWrapper<Mdl, S, I, K>
where
    S: LieGroup<N> + BundleElement<I>,
    Mdl: MeasurementModel<K, M, State = <S as BundleElement<I>>::Element>,
{
    type State = S;

    fn expectation(&self, x: &S) -> VecN<M> {
        self.inner.expectation(x.element())
    }

    fn jacobian(&self, x: &S) -> MatN<M, N> {
        pad_columns::<S, I, K, N, M>(&self.inner.jacobian(x.element()))
    }

    fn expectation_and_jacobian(&self, x: &S) -> (VecN<M>, MatN<M, N>) {
        let (h, j) = self.inner.expectation_and_jacobian(x.element());
        (h, pad_columns::<S, I, K, N, M>(&j))
    }

    fn covariance(&self) -> MatN<M, M> {
        self.inner.covariance()
    }

    fn residual(&self, y: &VecN<M>, expected: &VecN<M>) -> VecN<M> {
        self.inner.residual(y, expected)
    }
}

fn pad_columns<S, const I: usize, const K: usize, const N: usize, const M: usize>(
    j: &MatN<M, K>,
) -> MatN<M, N>
where
    S: BundleElement<I>,
{
    let mut out = MatN::<M, N>::zeros();
    out.fixed_view_mut::<M, K>(0, S::OFFSET).copy_from(j);
    out
}
