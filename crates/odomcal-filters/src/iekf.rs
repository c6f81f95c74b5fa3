use odomcal_core::{
    symmetrize, validate_covariance, LieGroup, MatN, MeasurementModel, Real, SystemModel, VecN,
};

use crate::gain::{ensure_finite, linear_correction};
use crate::{FilterError, KalmanFilter, Stage};

/// Invariant extended Kalman filter.
///
/// The error is the left perturbation `X = Exp(ξ) ∘ X̂`, i.e. `ξ = Log(X ∘ X̂⁻¹)`,
/// and the internal covariance lives in that left tangent. This is the error that
/// pairs with the left retraction used for corrections; the body-frame error
/// `Log(X̂⁻¹ ∘ X)` would pair with a right retraction and is not used here. Jacobians supplied by the models in the right tangent
/// are conjugated with the adjoint:
///
/// - `F_L = Ad(X̂⁺) F Ad(X̂)⁻¹`, `Q_L = Ad(X̂⁺) Q Ad(X̂⁺)ᵀ`,
/// - `H_L = H Ad(X̂)⁻¹`.
///
/// For rigid-body motion the pose block of `F_L` is the identity, independent of the
/// estimate. Corrections retract on the left, `X̂ ← Exp(K r) ∘ X̂`.
#[derive(Clone, Debug, PartialEq)]
pub struct Iekf<S, const N: usize> {
    x: S,
    p_left: MatN<N, N>,
}

fn to_left<S: LieGroup<N>, const N: usize>(x: &S, p_right: &MatN<N, N>) -> MatN<N, N> {
    let ad = x.adjoint();
    symmetrize(&(ad * p_right * ad.transpose()))
}

fn to_right<S: LieGroup<N>, const N: usize>(x: &S, p_left: &MatN<N, N>) -> MatN<N, N> {
    let ad_inv = x.inverse().adjoint();
    symmetrize(&(ad_inv * p_left * ad_inv.transpose()))
}

impl<S, const N: usize> Iekf<S, N>
where
    S: LieGroup<N>,
{
    pub fn new(x0: S, p0: MatN<N, N>) -> Result<Self, FilterError> {
        validate_covariance(&p0, "initial state covariance")?;
        let p_left = to_left(&x0, &p0);
        Ok(Self { x: x0, p_left })
    }

    /// Covariance in the left tangent of the estimate.
    pub fn left_covariance(&self) -> &MatN<N, N> {
        &self.p_left
    }
}

impl<S, const N: usize> KalmanFilter<S, N> for Iekf<S, N>
where
    S: LieGroup<N>,
{
    fn state(&self) -> &S {
        &self.x
    }

    fn covariance(&self) -> MatN<N, N> {
        to_right(&self.x, &self.p_left)
    }

    /// The right-tangent covariance is carried over to the new estimate.
    fn set_state(&mut self, x: S) {
        let p_right = to_right(&self.x, &self.p_left);
        self.p_left = to_left(&x, &p_right);
        self.x = x;
    }

    fn set_covariance(&mut self, p: MatN<N, N>) -> Result<(), FilterError> {
        validate_covariance(&p, "state covariance")?;
        self.p_left = to_left(&self.x, &p);
        Ok(())
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
        model.validate(&self.x)?;
        let (f, w) = model.jacobians(&self.x, u, dt);
        let q = w * model.control_covariance(dt) * w.transpose()
            + model.additive_covariance(&self.x, u, dt);
        let x = model.propagate(&self.x, u, dt);

        let ad_next = x.adjoint();
        let f_left = ad_next * f * self.x.inverse().adjoint();
        let q_left = ad_next * q * ad_next.transpose();
        let p = symmetrize(&(f_left * self.p_left * f_left.transpose() + q_left));
        ensure_finite(&x, &p, Stage::Predict)?;
        self.x = x;
        self.p_left = p;
        Ok(())
    }

    fn update<H, const M: usize>(&mut self, model: &H, y: &VecN<M>) -> Result<(), FilterError>
    where
        H: MeasurementModel<N, M, State = S>,
    {
        let (expected, h_right) = model.expectation_and_jacobian(&self.x);
        let h_left = h_right * self.x.inverse().adjoint();
        let (dx, p) = linear_correction(model, &self.p_left, y, &expected, &h_left)?;
        let x = self.x.lplus(&dx);
        ensure_finite(&x, &p, Stage::Update)?;
        self.x = x;
        self.p_left = p;
        Ok(())
    }
}
