//! Models of a differential-drive vehicle for `odomcal`.
//!
//! The estimator state is the product `SE(2) × ℝ³` of the vehicle pose and the
//! kinematic calibration `(r_l, r_r, d_w)` ([`PoseCalibState`]). This crate provides:
//! - [`Kinematics`], the wheel radii and separation,
//! - [`DiffDriveSystemModel`], the process model driven by integrated wheel angles,
//! - [`LandmarkMeasurementModel`] and [`PositionMeasurementModel`], defined on the pose
//!   alone and lifted to the full state with [`BundleWrapper`].

mod bundle_wrapper;
mod diff_drive;
mod kinematics;
mod landmark;
mod position;
mod state;

pub use bundle_wrapper::{on_pose, BundleWrapper, OnPose};
pub use diff_drive::{CalibrationMode, DiffDriveSystemModel};
pub use kinematics::Kinematics;
pub use landmark::LandmarkMeasurementModel;
pub use position::PositionMeasurementModel;
pub use state::*;
