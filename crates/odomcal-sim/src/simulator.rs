use odomcal_core::{LieGroup, Real, Se2, Vec2};
use odomcal_models::{pose_calib_state, DiffDriveSystemModel, Kinematics, PoseCalibState};
use serde::{Deserialize, Serialize};

/// Scripted change of the true kinematics at `time`.
///
/// Applied to the simulated vehicle only; the estimators have to notice it
/// from the measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterJump {
    /// Simulation time at which the change takes effect (s).
    pub time: Real,
    pub kinematics: Kinematics,
}

/// Ground truth and the unfiltered dead-reckoning baseline.
///
/// The truth moves with the nominal wheel increments and the current true
/// kinematics. The baseline integrates the noisy odometry with the kinematics the
/// estimators were seeded with, which is what a vehicle without a filter would report.
#[derive(Debug, Clone)]
pub struct Simulator {
    truth: Se2,
    kinematics: Kinematics,
    baseline: Se2,
    baseline_kinematics: Kinematics,
    jumps: Vec<ParameterJump>,
    next_jump: usize,
}

impl Simulator {
    pub fn new(
        truth: Se2,
        kinematics: Kinematics,
        baseline: Se2,
        baseline_kinematics: Kinematics,
        mut jumps: Vec<ParameterJump>,
    ) -> Self {
        jumps.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            truth,
            kinematics,
            baseline,
            baseline_kinematics,
            jumps,
            next_jump: 0,
        }
    }

    /// Apply every pending jump scheduled at or before `time`. Returns the jumps
    /// that fired.
    pub fn apply_jumps(&mut self, time: Real) -> &[ParameterJump] {
        let start = self.next_jump;
        while let Some(jump) = self.jumps.get(self.next_jump) {
            if jump.time > time {
                break;
            }
            self.kinematics = jump.kinematics;
            self.next_jump += 1;
        }
        &self.jumps[start..self.next_jump]
    }

    /// Advance the truth by `nominal` and the baseline by `odometry`, both integrated
    /// wheel angles over one step.
    pub fn step(&mut self, nominal: &Vec2, odometry: &Vec2) {
        self.truth = self
            .truth
            .rplus(&DiffDriveSystemModel::increment(&self.kinematics, nominal));
        self.baseline = self.baseline.rplus(&DiffDriveSystemModel::increment(
            &self.baseline_kinematics,
            odometry,
        ));
    }

    pub fn truth(&self) -> &Se2 {
        &self.truth
    }

    pub fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    /// Truth as a full estimator state, calibration included.
    pub fn truth_state(&self) -> PoseCalibState {
        pose_calib_state(self.truth, &self.kinematics)
    }

    pub fn baseline(&self) -> &Se2 {
        &self.baseline
    }
}
