use odomcal_core::{
    all_finite, givens_fold_row, psd_factor, triangularize_rows, BlockTriangular, LieGroup, MatN,
    MeasurementModel, ModelError, Real, SystemModel, VecN,
};

use crate::{FilterError, KalmanFilter, Stage};

/// Square-root extended Kalman filter.
///
/// Carries an upper-triangular `S` with `P = Sᵀ S`, the `R` factor of the array
/// whose Gram matrix is `P`. Predict and update are array algorithms: the rows of the
/// pre-array are rotated into a triangular post-array with Givens rotations, and the
/// posterior factor is read off directly. Neither the innovation covariance nor its
/// inverse is ever formed.
#[derive(Clone, Debug, PartialEq)]
pub struct Sekf<S, const N: usize> {
    x: S,
    s: MatN<N, N>,
}

fn upper_factor<const N: usize>(
    p: &MatN<N, N>,
    what: &'static str,
) -> Result<MatN<N, N>, ModelError> {
    psd_factor(p)
        .map(|l| l.transpose())
        .ok_or(ModelError::InvalidCovariance { what })
}

impl<S, const N: usize> Sekf<S, N>
where
    S: LieGroup<N>,
{
    pub fn new(x0: S, p0: MatN<N, N>) -> Result<Self, FilterError> {
        let s = upper_factor(&p0, "initial state covariance")?;
        Ok(Self { x: x0, s })
    }

    /// Upper-triangular factor `S` with `P = Sᵀ S`.
    pub fn sqrt_covariance(&self) -> &MatN<N, N> {
        &self.s
    }
}

impl<S, const N: usize> KalmanFilter<S, N> for Sekf<S, N>
where
    S: LieGroup<N>,
{
    fn state(&self) -> &S {
        &self.x
    }

    fn covariance(&self) -> MatN<N, N> {
        self.s.transpose() * self.s
    }

    fn set_state(&mut self, x: S) {
        self.x = x;
    }

    fn set_covariance(&mut self, p: MatN<N, N>) -> Result<(), FilterError> {
        self.s = upper_factor(&p, "state covariance")?;
        Ok(())
    }

    /// Triangularizes `[S Fᵀ; (W Lu)ᵀ; Laᵀ]` where `Lu Luᵀ` and `La Laᵀ` are the
    /// control and additive noise covariances.
    fn predict<F, const U: usize>(
        &mut self,
        model: &F,
        u: &VecN<U>,
        dt: Real,
    ) -> Result<(), FilterError>
    where
        F: SystemModel<N, U, State = S>,
    {
        model.validate(&self.x)?;
        let (f, w) = model.jacobians(&self.x, u, dt);
        let lu = psd_factor(&model.control_covariance(dt)).ok_or(ModelError::InvalidCovariance {
            what: "control noise covariance",
        })?;
        let la = psd_factor(&model.additive_covariance(&self.x, u, dt)).ok_or(
            ModelError::InvalidCovariance {
                what: "additive process noise covariance",
            },
        )?;

        let mut s = triangularize_rows(&(self.s * f.transpose()));
        let noise_rows = (w * lu).transpose();
        for i in 0..U {
            let mut row: VecN<N> = noise_rows.row(i).transpose();
            givens_fold_row(&mut s, &mut row);
        }
        for j in 0..N {
            let mut row: VecN<N> = la.column(j).into_owned();
            givens_fold_row(&mut s, &mut row);
        }

        let x = model.propagate(&self.x, u, dt);
        if !x.is_finite() {
            return Err(FilterError::NonFiniteState {
                stage: Stage::Predict,
            });
        }
        if !all_finite(&s) {
            return Err(FilterError::NonFiniteCovariance {
                stage: Stage::Predict,
            });
        }
        self.x = x;
        self.s = s;
        Ok(())
    }

    /// Triangularizes the pre-array
    ///
    /// ```text
    /// [ Sr     0 ]      [ X  Y ]
    /// [ S Hᵀ   S ]  ->  [ 0  Z ]
    /// ```
    ///
    /// with `R = Srᵀ Sr`. Then `Xᵀ X = H P Hᵀ + R`, `Xᵀ Y = H P`, the posterior factor
    /// is `Z`, and the correction is `K r = Yᵀ X⁻ᵀ r`.
    fn update<H, const M: usize>(&mut self, model: &H, y: &VecN<M>) -> Result<(), FilterError>
    where
        H: MeasurementModel<N, M, State = S>,
    {
        let sr = upper_factor(&model.covariance(), "measurement covariance")?;
        let (expected, h) = model.expectation_and_jacobian(&self.x);

        let mut post = BlockTriangular::<M, N>::zeros();
        for i in 0..M {
            let mut a: VecN<M> = sr.row(i).transpose();
            let mut b = VecN::<N>::zeros();
            post.fold_row(&mut a, &mut b);
        }
        let sh = self.s * h.transpose();
        for i in 0..N {
            let mut a: VecN<M> = sh.row(i).transpose();
            let mut b: VecN<N> = self.s.row(i).transpose();
            post.fold_row(&mut a, &mut b);
        }

        let pivot_tol = 1e-12 * post.x.abs().max();
        if (0..M).any(|k| !(post.x[(k, k)] > pivot_tol)) {
            return Err(FilterError::InnovationNotPositiveDefinite);
        }
        let residual = model.residual(y, &expected);
        let z = post
            .x
            .transpose()
            .solve_lower_triangular(&residual)
            .ok_or(FilterError::InnovationNotPositiveDefinite)?;
        let dx = post.y.transpose() * z;

        let x = self.x.rplus(&dx);
        if !x.is_finite() {
            return Err(FilterError::NonFiniteState {
                stage: Stage::Update,
            });
        }
        if !all_finite(&post.z) {
            return Err(FilterError::NonFiniteCovariance {
                stage: Stage::Update,
            });
        }
        self.x = x;
        self.s = post.z;
        Ok(())
    }
}
