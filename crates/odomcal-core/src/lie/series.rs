//! Trigonometric coefficients shared by the SE(2) exponential, logarithm and Jacobians.
//!
//! Every coefficient switches to its Taylor expansion (truncated after the fourth-order
//! term) when `|theta| < SMALL_ANGLE_THRESHOLD`. Group implementations must go through
//! these helpers instead of evaluating the closed forms themselves, so all estimators
//! share the exact same branch points.

use crate::Real;

/// Below this rotation magnitude the closed forms are replaced by series.
pub const SMALL_ANGLE_THRESHOLD: Real = 1e-4;

/// Whether `theta` falls in the series branch.
#[inline]
pub fn is_small_angle(theta: Real) -> bool {
    theta.abs() < SMALL_ANGLE_THRESHOLD
}

/// `sin(theta) / theta`.
pub fn sinc(theta: Real) -> Real {
    if is_small_angle(theta) {
        let t2 = theta * theta;
        1.0 - t2 / 6.0 + t2 * t2 / 120.0
    } else {
        theta.sin() / theta
    }
}

/// `(1 - cos(theta)) / theta`.
pub fn cosc(theta: Real) -> Real {
    if is_small_angle(theta) {
        let t2 = theta * theta;
        theta * (0.5 - t2 / 24.0)
    } else {
        let h = (0.5 * theta).sin();
        2.0 * h * h / theta
    }
}

/// `(1 - cos(theta)) / theta^2`.
pub fn cosc2(theta: Real) -> Real {
    if is_small_angle(theta) {
        let t2 = theta * theta;
        0.5 - t2 / 24.0 + t2 * t2 / 720.0
    } else {
        let h = (0.5 * theta).sin();
        2.0 * h * h / (theta * theta)
    }
}

/// `(theta - sin(theta)) / theta^2`.
pub fn sinc2(theta: Real) -> Real {
    if is_small_angle(theta) {
        let t2 = theta * theta;
        theta * (1.0 / 6.0 - t2 / 120.0)
    } else {
        (theta - theta.sin()) / (theta * theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Real, b: Real, tol: Real) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn branches_are_continuous_at_threshold() {
        let below = SMALL_ANGLE_THRESHOLD * (1.0 - 1e-9);
        let above = SMALL_ANGLE_THRESHOLD * (1.0 + 1e-9);
        for f in [sinc, cosc, cosc2, sinc2] {
            let a = f(below);
            let b = f(above);
            assert!(approx_eq(a, b, 1e-11), "discontinuity: {a} vs {b}");
        }
    }

    #[test]
    fn series_match_closed_forms_just_below_threshold() {
        let t: Real = 0.9e-4;
        assert!(approx_eq(sinc(t), t.sin() / t, 1e-15));
        assert!(approx_eq(cosc(t), (1.0 - t.cos()) / t, 1e-12));
        assert!(approx_eq(cosc2(t), 0.5, 1e-9));
        assert!(approx_eq(sinc2(t), t / 6.0, 1e-12));
    }

    #[test]
    fn zero_angle_limits() {
        assert_eq!(sinc(0.0), 1.0);
        assert_eq!(cosc(0.0), 0.0);
        assert_eq!(cosc2(0.0), 0.5);
        assert_eq!(sinc2(0.0), 0.0);
    }

    #[test]
    fn odd_and_even_symmetry() {
        for t in [1e-6, 1e-3, 0.7, 2.5] {
            assert!(approx_eq(sinc(-t), sinc(t), 1e-15));
            assert!(approx_eq(cosc2(-t), cosc2(t), 1e-15));
            assert!(approx_eq(cosc(-t), -cosc(t), 1e-15));
            assert!(approx_eq(sinc2(-t), -sinc2(t), 1e-15));
        }
    }
}
