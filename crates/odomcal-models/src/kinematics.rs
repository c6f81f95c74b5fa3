use odomcal_core::{ensure_positive, ModelError, Real, Vec3};
use serde::{Deserialize, Serialize};

/// Kinematic parameters of a differential drive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    /// Effective left wheel radius (m).
    pub left_radius: Real,
    /// Effective right wheel radius (m).
    pub right_radius: Real,
    /// Distance between the wheel contact points (m).
    pub separation: Real,
}

impl Kinematics {
    pub fn new(left_radius: Real, right_radius: Real, separation: Real) -> Result<Self, ModelError> {
        let k = Self {
            left_radius,
            right_radius,
            separation,
        };
        k.validate()?;
        Ok(k)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        ensure_positive("left_radius", self.left_radius)?;
        ensure_positive("right_radius", self.right_radius)?;
        ensure_positive("separation", self.separation)
    }

    /// `(r_l, r_r, d_w)`, the layout of the calibration sub-state.
    pub fn to_vector(&self) -> Vec3 {
        Vec3::new(self.left_radius, self.right_radius, self.separation)
    }

    /// Reads `(r_l, r_r, d_w)` without validation.
    pub fn from_vector(v: &Vec3) -> Self {
        Self {
            left_radius: v[0],
            right_radius: v[1],
            separation: v[2],
        }
    }

    /// Arc length and heading change produced by the integrated wheel angles
    /// `(φ_l, φ_r)`.
    pub fn arc(&self, phi_left: Real, phi_right: Real) -> (Real, Real) {
        let left = self.left_radius * phi_left;
        let right = self.right_radius * phi_right;
        (0.5 * (left + right), (right - left) / self.separation)
    }
}
