use odomcal_core::{
    validate_covariance, Mat2, MatN, MeasurementModel, ModelError, Se2, Vec2,
};

/// Absolute 2-D position fix, `h(P) = t(P)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionMeasurementModel {
    covariance: Mat2,
}

impl PositionMeasurementModel {
    pub fn new(covariance: Mat2) -> Self {
        Self { covariance }
    }

    pub fn try_new(covariance: Mat2) -> Result<Self, ModelError> {
        validate_covariance(&covariance, "position measurement covariance")?;
        Ok(Self::new(covariance))
    }
}

impl MeasurementModel<3, 2> for PositionMeasurementModel {
    type State = Se2;

    fn expectation(&self, x: &Se2) -> Vec2 {
        x.translation()
    }

    /// `[R(P) | 0]`.
    fn jacobian(&self, x: &Se2) -> MatN<2, 3> {
        let mut j = MatN::<2, 3>::zeros();
        j.fixed_view_mut::<2, 2>(0, 0).copy_from(&x.rotation());
        j
    }

    fn covariance(&self) -> Mat2 {
        self.covariance
    }
}
