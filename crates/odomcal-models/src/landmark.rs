use odomcal_core::{
    validate_covariance, LieGroup, Mat2, MatN, MeasurementModel, ModelError, Se2, Vec2,
};

/// Observation of a known world point expressed in the robot frame, `h(P) = P⁻¹ · b`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandmarkMeasurementModel {
    landmark: Vec2,
    covariance: Mat2,
}

impl LandmarkMeasurementModel {
    /// Build without checking `covariance`; a bad `R` is reported by the update.
    pub fn new(landmark: Vec2, covariance: Mat2) -> Self {
        Self {
            landmark,
            covariance,
        }
    }

    pub fn try_new(landmark: Vec2, covariance: Mat2) -> Result<Self, ModelError> {
        validate_covariance(&covariance, "landmark measurement covariance")?;
        Ok(Self::new(landmark, covariance))
    }

    pub fn landmark(&self) -> &Vec2 {
        &self.landmark
    }
}

impl MeasurementModel<3, 2> for LandmarkMeasurementModel {
    type State = Se2;

    fn expectation(&self, x: &Se2) -> Vec2 {
        x.inverse().act(&self.landmark)
    }

    fn jacobian(&self, x: &Se2) -> MatN<2, 3> {
        self.expectation_and_jacobian(x).1
    }

    /// `∂(P⁻¹ b)/∂P = [-I₂ | (h_y, -h_x)ᵀ]` in the right tangent.
    fn expectation_and_jacobian(&self, x: &Se2) -> (Vec2, MatN<2, 3>) {
        let h = self.expectation(x);
        let j = MatN::<2, 3>::new(-1.0, 0.0, h.y, 0.0, -1.0, -h.x);
        (h, j)
    }

    fn covariance(&self) -> Mat2 {
        self.covariance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odomcal_core::Vec3;

    #[test]
    fn expectation_is_landmark_in_robot_frame() {
        let m = LandmarkMeasurementModel::new(Vec2::new(2.0, 1.0), Mat2::identity() * 1e-4);
        let x = Se2::new(1.0, 1.0, std::f64::consts::FRAC_PI_2);
        let y = m.expectation(&x);
        assert!((y - Vec2::new(0.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let m = LandmarkMeasurementModel::new(Vec2::new(2.0, -1.0), Mat2::identity() * 1e-4);
        let x = Se2::new(0.4, 0.3, -0.6);
        let (y, j) = m.expectation_and_jacobian(&x);
        let h = 1e-6;
        for k in 0..3 {
            let mut d = Vec3::zeros();
            d[k] = h;
            let col = (m.expectation(&x.rplus(&d)) - m.expectation(&x.rplus(&(-d)))) / (2.0 * h);
            assert!((col - j.column(k)).norm() < 1e-8, "column {k}");
        }
        assert_eq!(y, m.expectation(&x));
    }

    #[test]
    fn try_new_rejects_indefinite_covariance() {
        let bad = Mat2::new(1e-4, 0.0, 0.0, -1e-4);
        assert!(LandmarkMeasurementModel::try_new(Vec2::zeros(), bad).is_err());
    }
}
