use nalgebra::{Isometry2, Matrix2, Matrix3, SMatrix, SVector, Vector2, Vector3};

pub type Real = f64;

pub type Vec2 = Vector2<Real>;
pub type Vec3 = Vector3<Real>;
pub type Mat2 = Matrix2<Real>;
pub type Mat3 = Matrix3<Real>;
pub type Iso2 = Isometry2<Real>;

/// Fixed-size column vector, used for tangent vectors, controls and measurements.
pub type VecN<const N: usize> = SVector<Real, N>;
/// Fixed-size `R x C` matrix, used for Jacobians and covariances.
pub type MatN<const R: usize, const C: usize> = SMatrix<Real, R, C>;

/// Skew operator of planar rotation: `[0 -w; w 0]`.
pub fn hat2(w: Real) -> Mat2 {
    Mat2::new(0.0, -w, w, 0.0)
}

/// Rotation matrix of angle `theta`.
pub fn rot2(theta: Real) -> Mat2 {
    let (s, c) = theta.sin_cos();
    Mat2::new(c, -s, s, c)
}

/// Reduce an angle to `(-pi, pi]`.
pub fn wrap_angle(theta: Real) -> Real {
    use std::f64::consts::PI;
    if theta > -PI && theta <= PI {
        return theta;
    }
    let (s, c) = theta.sin_cos();
    let wrapped = s.atan2(c);
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}
