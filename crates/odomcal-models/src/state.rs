use odomcal_core::{Bundle, MatN, Rn, Se2, Vec2, VecN};

use crate::Kinematics;

pub const POSE_DIM: usize = 3;
pub const CALIB_DIM: usize = 3;
pub const STATE_DIM: usize = POSE_DIM + CALIB_DIM;

/// Calibration sub-state `(r_l, r_r, d_w)`.
pub type Calibration = Rn<CALIB_DIM>;

/// Vehicle pose and kinematic calibration, `SE(2) × ℝ³`.
pub type PoseCalibState = Bundle<Se2, Calibration, POSE_DIM, CALIB_DIM, STATE_DIM>;

/// Tangent of [`PoseCalibState`]: pose tangent then calibration delta.
pub type StateTangent = VecN<STATE_DIM>;
pub type StateCovariance = MatN<STATE_DIM, STATE_DIM>;

/// Integrated wheel angles `(φ_l, φ_r)` over one step.
pub type WheelIncrements = Vec2;

pub fn pose_calib_state(pose: Se2, kinematics: &Kinematics) -> PoseCalibState {
    PoseCalibState::new(pose, Rn::new(kinematics.to_vector()))
}

/// Named access to the blocks of a [`PoseCalibState`].
pub trait PoseCalib {
    fn pose(&self) -> &Se2;

    /// Calibration block read as kinematics, without validation.
    fn kinematics(&self) -> Kinematics;
}

impl PoseCalib for PoseCalibState {
    fn pose(&self) -> &Se2 {
        self.first()
    }

    fn kinematics(&self) -> Kinematics {
        Kinematics::from_vector(self.second().coeffs())
    }
}
