//! Scenario configuration.

use anyhow::{ensure, Context, Result};
use odomcal_core::{is_psd, Real, Vec2, Vec3, VecN};
use odomcal_filters::{FilterKind, KarcherOptions, UnscentedParams};
use odomcal_models::{CalibrationMode, Kinematics, StateCovariance, STATE_DIM};
use serde::{Deserialize, Serialize};

use crate::ParameterJump;

/// Landmarks observed in the body frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSensor {
    /// World positions (m).
    pub positions: Vec<[Real; 2]>,
    /// Standard deviation of each coordinate (m).
    pub std: Real,
    /// Update rate (Hz). Must divide the control rate.
    pub rate: Real,
}

impl Default for LandmarkSensor {
    fn default() -> Self {
        Self {
            positions: vec![[2.0, 0.0], [2.0, 1.0], [2.0, -1.0]],
            std: 0.01,
            rate: 50.0,
        }
    }
}

/// Absolute position fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSensor {
    /// Variance of each coordinate (m²).
    pub variance: Real,
    /// Update rate (Hz). Must divide the control rate.
    pub rate: Real,
}

impl Default for PositionSensor {
    fn default() -> Self {
        Self {
            variance: 6e-3,
            rate: 10.0,
        }
    }
}

/// Full description of one simulated run.
///
/// Defaults reproduce the reference demo: a 240 s constant-curvature drive with
/// landmark updates at 50 Hz, position fixes at 10 Hz and a 15% tyre squeeze at 120 s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Control period (s).
    pub dt: Real,
    /// Simulated time (s).
    pub duration: Real,
    pub seed: u64,
    /// Nominal wheel rates `(ω_l, ω_r)` (rad/s).
    pub wheel_rates: [Real; 2],
    /// Wheel noise rate `U` on each wheel (rad²/s).
    pub wheel_noise: Real,
    /// Corrupt the odometry handed to the estimators with wheel noise.
    pub control_noise: bool,
    /// Corrupt the measurements with their sensor noise.
    pub measurement_noise: bool,
    /// True kinematics at `t = 0`, also used to seed the estimators.
    pub kinematics: Kinematics,
    /// Per-second variances of the calibration random walk.
    pub calibration_drift: [Real; 3],
    /// Lateral slip variance per metre.
    pub lateral_slip: Real,
    pub calibration_mode: CalibrationMode,
    /// Diagonal of the initial covariance `(x, y, θ, r_l, r_r, d_w)`.
    pub initial_covariance: [Real; STATE_DIM],
    /// Start the estimators from a draw of the initial covariance around the truth.
    pub perturb_initial_state: bool,
    pub landmarks: Option<LandmarkSensor>,
    pub position_fix: Option<PositionSensor>,
    /// Scripted changes of the true kinematics.
    pub jumps: Vec<ParameterJump>,
    pub filters: Vec<FilterKind>,
    pub unscented: UnscentedParams,
    pub karcher: KarcherOptions,
    /// Radius error accepted when scoring calibration tracking (m).
    pub radius_tolerance: Real,
    /// Time after the last jump before calibration tracking is scored (s).
    pub settle_time: Real,
    /// Record every step in the report.
    pub trace: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            duration: 240.0,
            seed: 0,
            wheel_rates: [0.5, 0.35],
            wheel_noise: 9e-5,
            control_noise: true,
            measurement_noise: true,
            kinematics: Kinematics {
                left_radius: 0.15,
                right_radius: 0.15,
                separation: 0.4,
            },
            calibration_drift: [1e-5, 1e-5, 0.0],
            lateral_slip: 1e-6,
            calibration_mode: CalibrationMode::Estimated,
            initial_covariance: [0.1, 0.1, 0.17, 1e-5, 1e-5, 1e-5],
            perturb_initial_state: true,
            landmarks: Some(LandmarkSensor::default()),
            position_fix: Some(PositionSensor::default()),
            jumps: vec![ParameterJump {
                time: 120.0,
                kinematics: Kinematics {
                    left_radius: 0.1275,
                    right_radius: 0.1275,
                    separation: 0.4,
                },
            }],
            filters: FilterKind::ALL.to_vec(),
            unscented: UnscentedParams::default(),
            karcher: KarcherOptions::default(),
            radius_tolerance: 0.01,
            settle_time: 30.0,
            trace: false,
        }
    }
}

fn ensure_non_negative(name: &str, value: Real) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be finite and non-negative, got {value}"
    );
    Ok(())
}

fn ensure_positive(name: &str, value: Real) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{name} must be finite and positive, got {value}"
    );
    Ok(())
}

impl ScenarioConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("dt", self.dt)?;
        ensure_positive("duration", self.duration)?;
        ensure!(
            self.wheel_rates.iter().all(|w| w.is_finite()),
            "wheel rates must be finite"
        );
        ensure_non_negative("wheel_noise", self.wheel_noise)?;
        self.kinematics
            .validate()
            .context("invalid initial kinematics")?;
        for (name, v) in ["left_radius", "right_radius", "separation"]
            .iter()
            .zip(self.calibration_drift)
        {
            ensure_non_negative(&format!("{name} drift"), v)?;
        }
        ensure_non_negative("lateral_slip", self.lateral_slip)?;
        ensure!(
            is_psd(&self.initial_state_covariance()),
            "initial covariance must be non-negative"
        );

        if let Some(lm) = &self.landmarks {
            ensure_non_negative("landmark std", lm.std)?;
            ensure_positive("landmark rate", lm.rate)?;
            ensure!(
                lm.positions.iter().flatten().all(|v| v.is_finite()),
                "landmark positions must be finite"
            );
        }
        if let Some(fix) = &self.position_fix {
            ensure_non_negative("position variance", fix.variance)?;
            ensure_positive("position rate", fix.rate)?;
        }
        for jump in &self.jumps {
            ensure!(
                jump.time.is_finite() && jump.time >= 0.0,
                "jump time must be non-negative, got {}",
                jump.time
            );
            jump.kinematics
                .validate()
                .with_context(|| format!("invalid kinematics for jump at {} s", jump.time))?;
        }
        ensure!(!self.filters.is_empty(), "at least one filter must be selected");
        self.unscented
            .validate(STATE_DIM)
            .context("invalid unscented parameters")?;
        ensure_positive("karcher tolerance", self.karcher.tolerance)?;
        ensure_positive("radius_tolerance", self.radius_tolerance)?;
        ensure_non_negative("settle_time", self.settle_time)?;
        Ok(())
    }

    pub fn step_count(&self) -> usize {
        (self.duration / self.dt).round() as usize
    }

    pub fn nominal_rates(&self) -> Vec2 {
        Vec2::from(self.wheel_rates)
    }

    pub fn drift(&self) -> Vec3 {
        Vec3::from(self.calibration_drift)
    }

    pub fn initial_state_covariance(&self) -> StateCovariance {
        StateCovariance::from_diagonal(&VecN::<STATE_DIM>::from(self.initial_covariance))
    }

    /// Start of the calibration scoring window (s).
    pub fn scoring_start(&self) -> Real {
        let last_jump = self.jumps.iter().map(|j| j.time).fold(0.0, Real::max);
        last_jump + self.settle_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_demo() {
        let cfg = ScenarioConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.step_count(), 24_000);
        assert_eq!(cfg.scoring_start(), 150.0);
        assert_eq!(cfg.filters.len(), 4);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = ScenarioConfig::default();
        cfg.dt = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = ScenarioConfig::default();
        cfg.initial_covariance[2] = -0.1;
        assert!(cfg.validate().is_err());

        let mut cfg = ScenarioConfig::default();
        cfg.jumps[0].kinematics.left_radius = 0.0;
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("jump at 120"), "{err:#}");

        let mut cfg = ScenarioConfig::default();
        cfg.filters.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: ScenarioConfig =
            serde_json::from_str(r#"{ "duration": 10.0, "filters": ["ekf", "iekf"] }"#).unwrap();
        assert_eq!(cfg.duration, 10.0);
        assert_eq!(cfg.filters, vec![FilterKind::Ekf, FilterKind::Iekf]);
        assert_eq!(cfg.dt, 0.01);
        assert!(cfg.landmarks.is_some());
    }
}
