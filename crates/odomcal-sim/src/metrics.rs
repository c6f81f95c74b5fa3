//! Error statistics accumulated along a run.

use odomcal_core::{wrap_angle, Real, Se2};
use odomcal_filters::FilterKind;
use odomcal_models::Kinematics;
use serde::{Deserialize, Serialize};

/// Pose error summary of one trajectory against the truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    /// Root mean square position error (m).
    pub position_rmse: Real,
    /// Root mean square heading error (rad).
    pub heading_rmse: Real,
    /// Largest position error seen (m).
    pub max_position_error: Real,
    /// Final `(x, y, θ)`, heading unwrapped.
    pub final_pose: [Real; 3],
}

/// Everything reported for one estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub kind: FilterKind,
    pub track: TrackSummary,
    /// Mean of `‖truth ⊟ estimate‖` over the full state.
    pub mean_error_norm: Real,
    pub final_kinematics: Kinematics,
    /// Estimated minus true `(r_l, r_r, d_w)` at the end of the run.
    pub final_calibration_error: [Real; 3],
    /// Fraction of scored samples with both radius errors within tolerance; `None`
    /// when the run ends before scoring starts.
    pub calibration_within_tolerance: Option<Real>,
    pub final_covariance: [[Real; 6]; 6],
    /// Numeric failures, each followed by a reset.
    pub failures: usize,
}

/// Running pose error statistics.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    samples: usize,
    sum_sq_position: Real,
    sum_sq_heading: Real,
    max_position: Real,
    sum_error_norm: Real,
    last_pose: [Real; 3],
    scored: usize,
    within: usize,
}

pub(crate) fn pose_row(pose: &Se2) -> [Real; 3] {
    [pose.x(), pose.y(), pose.angle_unwrapped()]
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pose(&mut self, truth: &Se2, estimate: &Se2) {
        let dp = (estimate.translation() - truth.translation()).norm();
        let dth = wrap_angle(estimate.angle() - truth.angle());
        self.samples += 1;
        self.sum_sq_position += dp * dp;
        self.sum_sq_heading += dth * dth;
        self.max_position = self.max_position.max(dp);
        self.last_pose = pose_row(estimate);
    }

    pub fn record_error_norm(&mut self, norm: Real) {
        self.sum_error_norm += norm;
    }

    /// Score the radii of `estimate` against `truth` with `tolerance` (m).
    pub fn record_calibration(&mut self, truth: &Kinematics, estimate: &Kinematics, tolerance: Real) {
        let left = (estimate.left_radius - truth.left_radius).abs();
        let right = (estimate.right_radius - truth.right_radius).abs();
        self.scored += 1;
        if left <= tolerance && right <= tolerance {
            self.within += 1;
        }
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn track(&self) -> TrackSummary {
        if self.samples == 0 {
            return TrackSummary::default();
        }
        let n = self.samples as Real;
        TrackSummary {
            position_rmse: (self.sum_sq_position / n).sqrt(),
            heading_rmse: (self.sum_sq_heading / n).sqrt(),
            max_position_error: self.max_position,
            final_pose: self.last_pose,
        }
    }

    pub fn mean_error_norm(&self) -> Real {
        if self.samples == 0 {
            0.0
        } else {
            self.sum_error_norm / self.samples as Real
        }
    }

    pub fn calibration_within_tolerance(&self) -> Option<Real> {
        (self.scored > 0).then(|| self.within as Real / self.scored as Real)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rmse_of_constant_offset() {
        let mut m = MetricsCollector::new();
        for k in 0..10 {
            let truth = Se2::new(k as Real, 0.0, 0.1);
            let est = Se2::new(k as Real + 0.3, 0.4, 0.1 + 0.02);
            m.record_pose(&truth, &est);
        }
        let t = m.track();
        assert!((t.position_rmse - 0.5).abs() < 1e-12);
        assert!((t.heading_rmse - 0.02).abs() < 1e-12);
        assert!((t.max_position_error - 0.5).abs() < 1e-12);
        assert_eq!(m.samples(), 10);
    }

    #[test]
    fn heading_error_wraps() {
        let mut m = MetricsCollector::new();
        m.record_pose(&Se2::new(0.0, 0.0, 3.1), &Se2::new(0.0, 0.0, -3.1));
        assert!((m.track().heading_rmse - (2.0 * std::f64::consts::PI - 6.2)).abs() < 1e-12);
    }

    #[test]
    fn calibration_score() {
        let mut m = MetricsCollector::new();
        assert_eq!(m.calibration_within_tolerance(), None);
        let truth = Kinematics::new(0.1275, 0.1275, 0.4).unwrap();
        let close = Kinematics::new(0.13, 0.125, 0.41).unwrap();
        let far = Kinematics::new(0.15, 0.1275, 0.4).unwrap();
        m.record_calibration(&truth, &close, 0.01);
        m.record_calibration(&truth, &close, 0.01);
        m.record_calibration(&truth, &close, 0.01);
        m.record_calibration(&truth, &far, 0.01);
        assert_eq!(m.calibration_within_tolerance(), Some(0.75));
    }
}
