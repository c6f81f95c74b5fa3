use std::fmt;

use nalgebra::{Translation2, UnitComplex};
use serde::{Deserialize, Serialize};

use super::series::{cosc, cosc2, sinc, sinc2};
use super::LieGroup;
use crate::{rot2, wrap_angle, Iso2, Mat2, Mat3, MatN, Real, Vec2, Vec3};

/// Planar rigid transform `(x, y, θ)`.
///
/// The heading is stored unreduced so that it can be unwrapped across the `±π`
/// boundary; [`Se2::angle`] reports it reduced to `(-π, π]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Se2 {
    x: Real,
    y: Real,
    theta: Real,
}

impl Se2 {
    pub fn new(x: Real, y: Real, theta: Real) -> Self {
        Self { x, y, theta }
    }

    pub fn from_translation_angle(t: &Vec2, theta: Real) -> Self {
        Self::new(t.x, t.y, theta)
    }

    pub fn x(&self) -> Real {
        self.x
    }

    pub fn y(&self) -> Real {
        self.y
    }

    /// Heading reduced to `(-π, π]`.
    pub fn angle(&self) -> Real {
        wrap_angle(self.theta)
    }

    /// Heading accumulated over compositions, without reduction.
    pub fn angle_unwrapped(&self) -> Real {
        self.theta
    }

    pub fn translation(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn rotation(&self) -> Mat2 {
        rot2(self.theta)
    }

    pub fn to_isometry(&self) -> Iso2 {
        Iso2::from_parts(
            Translation2::new(self.x, self.y),
            UnitComplex::new(self.theta),
        )
    }

    /// Homogeneous 3x3 matrix of the transform.
    pub fn to_matrix(&self) -> Mat3 {
        let (s, c) = self.theta.sin_cos();
        Mat3::new(c, -s, self.x, s, c, self.y, 0.0, 0.0, 1.0)
    }

    /// Group action on a point, `R p + t`.
    pub fn act(&self, p: &Vec2) -> Vec2 {
        self.rotation() * p + self.translation()
    }

    /// Action together with its Jacobians with respect to the transform (right
    /// tangent) and to the point.
    pub fn act_with_jacobians(&self, p: &Vec2) -> (Vec2, MatN<2, 3>, Mat2) {
        let r = self.rotation();
        let mut j_x = MatN::<2, 3>::zeros();
        j_x.fixed_view_mut::<2, 2>(0, 0).copy_from(&r);
        j_x.set_column(2, &(r * Vec2::new(-p.y, p.x)));
        (r * p + self.translation(), j_x, r)
    }

    /// `V(θ)` such that the translation of `Exp(ρ, θ)` is `V ρ`.
    fn v_matrix(theta: Real) -> Mat2 {
        let a = sinc(theta);
        let b = cosc(theta);
        Mat2::new(a, -b, b, a)
    }
}

impl LieGroup<3> for Se2 {
    fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    fn inverse(&self) -> Self {
        let (s, c) = self.theta.sin_cos();
        Self::new(-c * self.x - s * self.y, s * self.x - c * self.y, -self.theta)
    }

    fn compose(&self, other: &Self) -> Self {
        let (s, c) = self.theta.sin_cos();
        Self::new(
            self.x + c * other.x - s * other.y,
            self.y + s * other.x + c * other.y,
            self.theta + other.theta,
        )
    }

    fn exp(tau: &Vec3) -> Self {
        let theta = tau[2];
        let t = Self::v_matrix(theta) * Vec2::new(tau[0], tau[1]);
        Self::new(t.x, t.y, theta)
    }

    fn log(&self) -> Vec3 {
        let theta = self.angle();
        let a = sinc(theta);
        let b = cosc(theta);
        let den = a * a + b * b;
        let rho_x = (a * self.x + b * self.y) / den;
        let rho_y = (-b * self.x + a * self.y) / den;
        Vec3::new(rho_x, rho_y, theta)
    }

    fn adjoint(&self) -> Mat3 {
        let (s, c) = self.theta.sin_cos();
        Mat3::new(c, -s, self.y, s, c, -self.x, 0.0, 0.0, 1.0)
    }

    fn right_jacobian(tau: &Vec3) -> Mat3 {
        let (rho_x, rho_y, theta) = (tau[0], tau[1], tau[2]);
        let a = sinc(theta);
        let b = cosc(theta);
        let c = sinc2(theta);
        let d = cosc2(theta);
        Mat3::new(
            a,
            b,
            rho_x * c - rho_y * d,
            -b,
            a,
            rho_x * d + rho_y * c,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Block inverse of `[M v; 0 1]`; singular only at `θ = 2kπ, k ≠ 0`.
    fn right_jacobian_inv(tau: &Vec3) -> Mat3 {
        let jr = Self::right_jacobian(tau);
        let a = jr[(0, 0)];
        let b = jr[(0, 1)];
        let den = a * a + b * b;
        let m_inv = Mat2::new(a, -b, b, a) / den;
        let v = m_inv * Vec2::new(jr[(0, 2)], jr[(1, 2)]);
        Mat3::new(
            m_inv[(0, 0)],
            m_inv[(0, 1)],
            -v.x,
            m_inv[(1, 0)],
            m_inv[(1, 1)],
            -v.y,
            0.0,
            0.0,
            1.0,
        )
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.theta.is_finite()
    }
}

impl Default for Se2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for Se2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.6})", self.x, self.y, self.angle())
    }
}
