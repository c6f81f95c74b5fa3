use odomcal_core::{
    symmetrize, validate_covariance, LieGroup, MatN, MeasurementModel, Real, SystemModel, VecN,
};

use crate::gain::{ensure_finite, linear_correction};
use crate::{FilterError, KalmanFilter, Stage};

/// Extended Kalman filter on a Lie group.
///
/// The error is the right-tangent perturbation `X = X̂ ∘ Exp(ξ)`; updates retract with
/// `X̂ ⊞ K r` and the covariance uses the Joseph form.
#[derive(Clone, Debug, PartialEq)]
pub struct Ekf<S, const N: usize> {
    x: S,
    p: MatN<N, N>,
}

impl<S, const N: usize> Ekf<S, N>
where
    S: LieGroup<N>,
{
    pub fn new(x0: S, p0: MatN<N, N>) -> Result<Self, FilterError> {
        validate_covariance(&p0, "initial state covariance")?;
        Ok(Self { x: x0, p: p0 })
    }
}

impl<S, const N: usize> KalmanFilter<S, N> for Ekf<S, N>
where
    S: LieGroup<N>,
{
    fn state(&self) -> &S {
        &self.x
    }

    fn covariance(&self) -> MatN<N, N> {
        self.p
    }

    fn set_state(&mut self, x: S) {
        self.x = x;
    }

    fn set_covariance(&mut self, p: MatN<N, N>) -> Result<(), FilterError> {
        validate_covariance(&p, "state covariance")?;
        self.p = p;
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
        let p = symmetrize(&(f * self.p * f.transpose() + q));
        ensure_finite(&x, &p, Stage::Predict)?;
        self.x = x;
        self.p = p;
        Ok(())
    }

    fn update<H, const M: usize>(&mut self, model: &H, y: &VecN<M>) -> Result<(), FilterError>
    where
        H: MeasurementModel<N, M, State = S>,
    {
        let (expected, h) = model.expectation_and_jacobian(&self.x);
        let (dx, p) = linear_correction(model, &self.p, y, &expected, &h)?;
        let x = self.x.rplus(&dx);
        ensure_finite(&x, &p, Stage::Update)?;
        self.x = x;
        self.p = p;
        Ok(())
    }
}
