use odomcal_core::{weighted_norm, LieGroup, MatN, MeasurementModel, Real, SystemModel, VecN};

use crate::FilterError;

/// Predict/update contract shared by every estimator variant.
///
/// Covariances passed in and read out are expressed in the right tangent of the
/// current estimate.
pub trait KalmanFilter<S, const N: usize>
where
    S: LieGroup<N>,
{
    fn state(&self) -> &S;

    /// State covariance in the right tangent of [`KalmanFilter::state`].
    fn covariance(&self) -> MatN<N, N>;

    /// Replace the mean, keeping the covariance.
    fn set_state(&mut self, x: S);

    /// Replace the covariance. `P` must be symmetric positive semi-definite.
    fn set_covariance(&mut self, p: MatN<N, N>) -> Result<(), FilterError>;

    /// Advance by one control step. `u` is the control integrated over `dt`.
    fn predict<F, const U: usize>(
        &mut self,
        model: &F,
        u: &VecN<U>,
        dt: Real,
    ) -> Result<(), FilterError>
    where
        F: SystemModel<N, U, State = S>;

    /// Absorb the observation `y` of `model`.
    fn update<H, const M: usize>(&mut self, model: &H, y: &VecN<M>) -> Result<(), FilterError>
    where
        H: MeasurementModel<N, M, State = S>;

    /// `‖truth ⊟ estimate‖_W`.
    fn error_norm(&self, truth: &S, weights: &MatN<N, N>) -> Real {
        weighted_norm(truth, self.state(), weights)
    }
}
