//! Pieces shared by the covariance-form filters.

use odomcal_core::{
    all_finite, symmetrize, validate_covariance, LieGroup, MatN, MeasurementModel, VecN,
};

use crate::{FilterError, Stage};

/// Validated measurement covariance of `model`.
pub(crate) fn measurement_covariance<H, const N: usize, const M: usize>(
    model: &H,
) -> Result<MatN<M, M>, FilterError>
where
    H: MeasurementModel<N, M>,
{
    let r = model.covariance();
    validate_covariance(&r, "measurement covariance")?;
    Ok(r)
}

/// `K = P Hᵀ (H P Hᵀ + R)⁻¹`, solved through a Cholesky factor of the innovation
/// covariance.
pub(crate) fn kalman_gain<const N: usize, const M: usize>(
    p: &MatN<N, N>,
    h: &MatN<M, N>,
    r: &MatN<M, M>,
) -> Result<MatN<N, M>, FilterError> {
    let hp = h * p;
    let s = symmetrize(&(hp * h.transpose() + r));
    let chol = s
        .cholesky()
        .ok_or(FilterError::InnovationNotPositiveDefinite)?;
    Ok(chol.solve(&hp).transpose())
}

/// `(I - K H) P (I - K H)ᵀ + K R Kᵀ`, symmetrized.
pub(crate) fn joseph_update<const N: usize, const M: usize>(
    p: &MatN<N, N>,
    k: &MatN<N, M>,
    h: &MatN<M, N>,
    r: &MatN<M, M>,
) -> MatN<N, N> {
    let ikh = MatN::<N, N>::identity() - k * h;
    symmetrize(&(ikh * p * ikh.transpose() + k * r * k.transpose()))
}

/// Gain-weighted correction `K (y ⊖ h(x))` and the Joseph posterior for a
/// measurement linearized as `(ŷ, H)`.
pub(crate) fn linear_correction<H, const N: usize, const M: usize>(
    model: &H,
    p: &MatN<N, N>,
    y: &VecN<M>,
    expected: &VecN<M>,
    h: &MatN<M, N>,
) -> Result<(VecN<N>, MatN<N, N>), FilterError>
where
    H: MeasurementModel<N, M>,
{
    let r = measurement_covariance(model)?;
    let k = kalman_gain(p, h, &r)?;
    let dx = k * model.residual(y, expected);
    Ok((dx, joseph_update(p, &k, h, &r)))
}

pub(crate) fn ensure_finite<S, const N: usize>(
    x: &S,
    p: &MatN<N, N>,
    stage: Stage,
) -> Result<(), FilterError>
where
    S: LieGroup<N>,
{
    if !x.is_finite() {
        return Err(FilterError::NonFiniteState { stage });
    }
    if !all_finite(p) {
        return Err(FilterError::NonFiniteCovariance { stage });
    }
    Ok(())
}
