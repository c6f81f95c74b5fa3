//! High-level entry crate for `odomcal`.
//!
//! `odomcal` estimates the pose of a differential-drive vehicle together with its
//! kinematic calibration (wheel radii and separation) from wheel odometry, landmark
//! observations and position fixes. The state lives on `SE(2) × ℝ³` and four
//! estimators share one predict/update contract:
//!
//! - [`filters::Ekf`]: extended Kalman filter in the right tangent,
//! - [`filters::Sekf`]: square-root form of the same filter,
//! - [`filters::Iekf`]: invariant EKF with its covariance in the left tangent,
//! - [`filters::Ukfm`]: unscented Kalman filter on manifolds.
//!
//! ```no_run
//! use odomcal::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let kinematics = Kinematics::new(0.15, 0.15, 0.4)?;
//! let mut model = DiffDriveSystemModel::new(kinematics)?;
//! model.set_covariance(Mat2::identity() * 9e-5)?;
//!
//! let x0 = model.initial_state(Se2::identity());
//! let p0 = StateCovariance::identity() * 1e-3;
//! let mut filter = Estimator::new(FilterKind::Iekf, x0, p0)?;
//!
//! let dt = 0.01;
//! filter.predict(&model, &(Vec2::new(0.5, 0.35) * dt), dt)?;
//!
//! let landmark = on_pose(LandmarkMeasurementModel::try_new(
//!     Vec2::new(2.0, 0.0),
//!     Mat2::identity() * 1e-4,
//! )?);
//! filter.update(&landmark, &Vec2::new(1.99, 0.0))?;
//! println!("{}", filter.state().pose());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - **[`core`]**: math aliases, Lie groups, model traits
//! - **[`models`]**: differential-drive process model and measurement models
//! - **[`filters`]**: the estimators
//! - **[`sim`]**: scripted scenarios and their reports
//! - **[`prelude`]**: convenient re-exports for common use cases

/// Math aliases, Lie groups and model contracts.
pub mod core {
    pub use odomcal_core::*;
}

/// Differential-drive process model and measurement models.
pub mod models {
    pub use odomcal_models::*;
}

/// Estimators sharing the [`KalmanFilter`](odomcal_filters::KalmanFilter) contract.
pub mod filters {
    pub use odomcal_filters::*;
}

/// Scenario simulation and scoring.
pub mod sim {
    pub use odomcal_sim::*;
}

/// Import with `use odomcal::prelude::*;` to get started quickly.
pub mod prelude {
    pub use crate::core::{
        LieGroup, Mat2, MeasurementModel, Real, Se2, SystemModel, Vec2, Vec3, VecN,
    };
    pub use crate::filters::{Estimator, FilterError, FilterKind, KalmanFilter};
    pub use crate::models::{
        on_pose, CalibrationMode, DiffDriveSystemModel, Kinematics, LandmarkMeasurementModel,
        PoseCalib, PoseCalibState, PositionMeasurementModel, StateCovariance,
    };
    pub use crate::sim::{run_scenario, ScenarioConfig, ScenarioReport};
}
