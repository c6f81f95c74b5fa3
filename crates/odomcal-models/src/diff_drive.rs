use odomcal_core::{
    ensure_non_negative, validate_covariance, LieGroup, Mat2, Mat3, MatN, ModelError, Real, Se2,
    SystemModel, Vec2, Vec3,
};
use serde::{Deserialize, Serialize};

use crate::{
    Kinematics, PoseCalib, PoseCalibState, StateCovariance, WheelIncrements, CALIB_DIM, POSE_DIM,
    STATE_DIM,
};

/// How the process model treats the calibration sub-state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    /// Motion uses the calibration carried in the state, which is allowed to drift.
    #[default]
    Estimated,
    /// Motion uses the model's own kinematics; the calibration sub-state is left
    /// untouched and uncorrelated with the motion.
    Fixed,
}

/// Differential drive moving on SE(2), with its kinematic calibration as part of
/// the state.
///
/// The control is the pair of wheel angle increments `(φ_l, φ_r)` integrated over the
/// step. One step produces the body-frame increment `ξ = (dℓ, 0, dθ)` with
///
/// ```text
/// dℓ = ½ (r_l φ_l + r_r φ_r)      dθ = (r_r φ_r − r_l φ_l) / d_w
/// ```
///
/// and the next state is `(P ∘ Exp(ξ), c)`.
///
/// Noise model, per step of length `dt`:
/// - wheel noise with covariance `U·dt`, `U` being the rate installed with
///   [`DiffDriveSystemModel::set_covariance`] (rad²/s),
/// - lateral slip with variance `lateral_slip · |dℓ|` on the lateral body component,
/// - calibration drift with variances `calibration_drift · dt` (estimated mode only).
#[derive(Clone, Debug, PartialEq)]
pub struct DiffDriveSystemModel {
    kinematics: Kinematics,
    wheel_noise_rate: Mat2,
    calibration_drift: Vec3,
    lateral_slip: Real,
    mode: CalibrationMode,
}

impl DiffDriveSystemModel {
    pub const DEFAULT_CALIBRATION_DRIFT: [Real; 3] = [1e-5, 1e-5, 0.0];
    pub const DEFAULT_LATERAL_SLIP: Real = 1e-6;

    pub fn new(kinematics: Kinematics) -> Result<Self, ModelError> {
        kinematics.validate()?;
        Ok(Self {
            kinematics,
            wheel_noise_rate: Mat2::zeros(),
            calibration_drift: Vec3::from(Self::DEFAULT_CALIBRATION_DRIFT),
            lateral_slip: Self::DEFAULT_LATERAL_SLIP,
            mode: CalibrationMode::default(),
        })
    }

    pub fn with_mode(mut self, mode: CalibrationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Install the wheel noise rate `U` (rad²/s). Each step uses `U·dt`.
    pub fn set_covariance(&mut self, u: Mat2) -> Result<(), ModelError> {
        validate_covariance(&u, "wheel noise covariance")?;
        self.wheel_noise_rate = u;
        Ok(())
    }

    /// Per-second variances of the random walk on `(r_l, r_r, d_w)`.
    pub fn set_calibration_drift(&mut self, drift: Vec3) -> Result<(), ModelError> {
        ensure_non_negative("left_radius_drift", drift[0])?;
        ensure_non_negative("right_radius_drift", drift[1])?;
        ensure_non_negative("separation_drift", drift[2])?;
        self.calibration_drift = drift;
        Ok(())
    }

    /// Lateral slip variance per metre travelled.
    pub fn set_lateral_slip(&mut self, variance_per_metre: Real) -> Result<(), ModelError> {
        ensure_non_negative("lateral_slip", variance_per_metre)?;
        self.lateral_slip = variance_per_metre;
        Ok(())
    }

    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    pub fn covariance(&self) -> &Mat2 {
        &self.wheel_noise_rate
    }

    pub fn calibration_drift(&self) -> &Vec3 {
        &self.calibration_drift
    }

    pub fn lateral_slip(&self) -> Real {
        self.lateral_slip
    }

    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    /// State at `pose` with the calibration seeded from the model's kinematics.
    pub fn initial_state(&self, pose: Se2) -> PoseCalibState {
        crate::pose_calib_state(pose, &self.kinematics)
    }

    fn active_kinematics(&self, x: &PoseCalibState) -> Kinematics {
        match self.mode {
            CalibrationMode::Estimated => x.kinematics(),
            CalibrationMode::Fixed => self.kinematics,
        }
    }

    /// Body-frame increment `(dℓ, 0, dθ)` for integrated wheel angles `u`.
    pub fn increment(kinematics: &Kinematics, u: &WheelIncrements) -> Vec3 {
        let (dl, dth) = kinematics.arc(u[0], u[1]);
        Vec3::new(dl, 0.0, dth)
    }

    /// `∂ξ/∂(r_l, r_r, d_w)`.
    fn increment_wrt_calibration(k: &Kinematics, u: &WheelIncrements) -> Mat3 {
        let (phi_l, phi_r) = (u[0], u[1]);
        let dw = k.separation;
        let turn = k.right_radius * phi_r - k.left_radius * phi_l;
        Mat3::new(
            0.5 * phi_l,
            0.5 * phi_r,
            0.0,
            0.0,
            0.0,
            0.0,
            -phi_l / dw,
            phi_r / dw,
            -turn / (dw * dw),
        )
    }

    /// `∂ξ/∂(φ_l, φ_r)`.
    fn increment_wrt_control(k: &Kinematics) -> MatN<3, 2> {
        let dw = k.separation;
        MatN::<3, 2>::new(
            0.5 * k.left_radius,
            0.5 * k.right_radius,
            0.0,
            0.0,
            -k.left_radius / dw,
            k.right_radius / dw,
        )
    }
}

impl SystemModel<STATE_DIM, 2> for DiffDriveSystemModel {
    type State = PoseCalibState;

    fn propagate(&self, x: &PoseCalibState, u: &Vec2, _dt: Real) -> PoseCalibState {
        let xi = Self::increment(&self.active_kinematics(x), u);
        let mut next = x.clone();
        *next.first_mut() = x.pose().rplus(&xi);
        next
    }

    fn jacobians(
        &self,
        x: &PoseCalibState,
        u: &Vec2,
        _dt: Real,
    ) -> (StateCovariance, MatN<STATE_DIM, 2>) {
        let k = self.active_kinematics(x);
        let xi = Self::increment(&k, u);
        let jr = Se2::right_jacobian(&xi);

        let mut f = StateCovariance::identity();
        f.fixed_view_mut::<POSE_DIM, POSE_DIM>(0, 0)
            .copy_from(&Se2::exp(&(-xi)).adjoint());
        if self.mode == CalibrationMode::Estimated {
            f.fixed_view_mut::<POSE_DIM, CALIB_DIM>(0, POSE_DIM)
                .copy_from(&(jr * Self::increment_wrt_calibration(&k, u)));
        }

        let mut w = MatN::<STATE_DIM, 2>::zeros();
        w.fixed_view_mut::<POSE_DIM, 2>(0, 0)
            .copy_from(&(jr * Self::increment_wrt_control(&k)));
        (f, w)
    }

    fn control_covariance(&self, dt: Real) -> Mat2 {
        self.wheel_noise_rate * dt
    }

    fn additive_covariance(&self, x: &PoseCalibState, u: &Vec2, dt: Real) -> StateCovariance {
        let k = self.active_kinematics(x);
        let xi = Self::increment(&k, u);
        let mut q = StateCovariance::zeros();

        let lateral = Se2::right_jacobian(&xi).column(1).into_owned();
        let slip = self.lateral_slip * xi[0].abs();
        q.fixed_view_mut::<POSE_DIM, POSE_DIM>(0, 0)
            .copy_from(&(lateral * lateral.transpose() * slip));

        if self.mode == CalibrationMode::Estimated {
            for i in 0..CALIB_DIM {
                q[(POSE_DIM + i, POSE_DIM + i)] = self.calibration_drift[i] * dt;
            }
        }
        q
    }

    fn validate(&self, x: &PoseCalibState) -> Result<(), ModelError> {
        match self.mode {
            CalibrationMode::Estimated => x.kinematics().validate(),
            CalibrationMode::Fixed => Ok(()),
        }
    }
}
