use odomcal_core::{
    ensure_positive, psd_factor, symmetrize, validate_covariance, LieGroup, MatN,
    MeasurementModel, ModelError, Real, SystemModel, VecN,
};
use serde::{Deserialize, Serialize};

use crate::gain::{ensure_finite, measurement_covariance};
use crate::{FilterError, KalmanFilter, Stage};

/// Scaling of the unscented transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnscentedParams {
    /// Spread of the sigma points around the mean.
    pub alpha: Real,
    /// Prior knowledge of the distribution (2 is optimal for Gaussians).
    pub beta: Real,
    /// Secondary scaling.
    pub kappa: Real,
}

impl Default for UnscentedParams {
    fn default() -> Self {
        Self {
            alpha: 1e-3,
            beta: 2.0,
            kappa: 0.0,
        }
    }
}

impl UnscentedParams {
    pub fn validate(&self, dim: usize) -> Result<(), ModelError> {
        ensure_positive("alpha", self.alpha)?;
        ensure_positive("dim + kappa", dim as Real + self.kappa)
    }

    fn weights(&self, dim: usize) -> SigmaWeights {
        let d = dim as Real;
        let lambda = self.alpha * self.alpha * (d + self.kappa) - d;
        SigmaWeights {
            spread: (d + lambda).sqrt(),
            outer: 0.5 / (d + lambda),
            centre_correction: self.beta - self.alpha * self.alpha,
        }
    }
}

/// Weights of a symmetric `2d + 1` sigma set.
///
/// With small `alpha` the raw centre weights are close to `-1/alpha²` and cancel
/// against the outer points; the covariances below use the folded form
/// `Σ w (δᵢ)(δᵢ)ᵀ + (β - α²) δ̄ δ̄ᵀ` where `δᵢ` are offsets from the centre point and
/// `δ̄` their weighted mean.
#[derive(Clone, Copy, Debug)]
struct SigmaWeights {
    spread: Real,
    outer: Real,
    centre_correction: Real,
}

/// Stopping rule of the on-manifold mean iteration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KarcherOptions {
    /// Stop when the tangent step norm falls below this.
    pub tolerance: Real,
    pub max_iterations: usize,
}

impl Default for KarcherOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 10,
        }
    }
}

/// Unscented Kalman filter on manifolds.
///
/// Sigma points are drawn in the right tangent of the estimate and retracted with
/// `⊞`. The propagated mean is the Karcher mean of the transformed set, and the
/// spread is measured with `⊟` against that mean. Control noise is propagated with
/// its own sigma set through the process model; additive noise is added in the tangent.
#[derive(Clone, Debug, PartialEq)]
pub struct Ukfm<S, const N: usize> {
    x: S,
    p: MatN<N, N>,
    params: UnscentedParams,
    karcher: KarcherOptions,
}

impl<S, const N: usize> Ukfm<S, N>
where
    S: LieGroup<N>,
{
    pub fn new(x0: S, p0: MatN<N, N>) -> Result<Self, FilterError> {
        Self::with_params(x0, p0, UnscentedParams::default(), KarcherOptions::default())
    }

    pub fn with_params(
        x0: S,
        p0: MatN<N, N>,
        params: UnscentedParams,
        karcher: KarcherOptions,
    ) -> Result<Self, FilterError> {
        validate_covariance(&p0, "initial state covariance")?;
        params.validate(N)?;
        Ok(Self {
            x: x0,
            p: p0,
            params,
            karcher,
        })
    }

    pub fn params(&self) -> &UnscentedParams {
        &self.params
    }

    pub fn karcher_options(&self) -> &KarcherOptions {
        &self.karcher
    }

    /// Columns of the scaled square root of `P`.
    fn sigma_offsets(&self, stage: Stage, spread: Real) -> Result<MatN<N, N>, FilterError> {
        psd_factor(&self.p)
            .map(|l| l * spread)
            .ok_or(FilterError::IndefiniteCovariance { stage })
    }

    /// Fixed point `m ← m ⊞ Σ wᵢ (Yᵢ ⊟ m)` starting from the centre point.
    fn karcher_mean(
        &self,
        centre: &S,
        plus: &[S; N],
        minus: &[S; N],
        w: &SigmaWeights,
    ) -> Result<S, FilterError> {
        let mut mean = centre.clone();
        let mut step_norm = Real::INFINITY;
        for _ in 0..self.karcher.max_iterations {
            let d0 = centre.rminus(&mean);
            let mut acc = VecN::<N>::zeros();
            for j in 0..N {
                acc += plus[j].rminus(&mean) - d0;
                acc += minus[j].rminus(&mean) - d0;
            }
            let step = d0 + acc * w.outer;
            mean = mean.rplus(&step);
            step_norm = step.norm();
            if step_norm < self.karcher.tolerance {
                return Ok(mean);
            }
        }
        Err(FilterError::KarcherMeanNotConverged {
            iterations: self.karcher.max_iterations,
            step: step_norm,
        })
    }
}

/// `Σ w δδᵀ + c δ̄δ̄ᵀ` over the pairs of offsets.
fn folded_covariance<const D: usize, const K: usize>(
    plus: &[VecN<D>; K],
    minus: &[VecN<D>; K],
    mean: &VecN<D>,
    w: &SigmaWeights,
) -> MatN<D, D> {
    let mut acc = MatN::<D, D>::zeros();
    for j in 0..K {
        acc += plus[j] * plus[j].transpose();
        acc += minus[j] * minus[j].transpose();
    }
    acc * w.outer + mean * mean.transpose() * w.centre_correction
}

impl<S, const N: usize> KalmanFilter<S, N> for Ukfm<S, N>
where
    S: LieGroup<N>,
{
    fn state(&self) -> &S {
        &self.x
    }

    fn covariance(&self) -> MatN<N, N> {
        self.p
    }

    fn set_state(&mut self, x: S) {
        self.x = x;
    }

    fn set_covariance(&mut self, p: MatN<N, N>) -> Result<(), FilterError> {
        validate_covariance(&p, "state covariance")?;
        self.p = p;
        Ok(())
    }

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
        let w = self.params.weights(N);
        let offsets = self.sigma_offsets(Stage::Predict, w.spread)?;

        let centre = model.propagate(&self.x, u, dt);
        let plus: [S; N] = std::array::from_fn(|j| {
            model.propagate(&self.x.rplus(&offsets.column(j).into_owned()), u, dt)
        });
        let minus: [S; N] = std::array::from_fn(|j| {
            model.propagate(&self.x.rplus(&(-offsets.column(j))), u, dt)
        });
        let mean = self.karcher_mean(&centre, &plus, &minus, &w)?;

        let shift = mean.rminus(&centre);
        let d_plus: [VecN<N>; N] = std::array::from_fn(|j| plus[j].rminus(&centre));
        let d_minus: [VecN<N>; N] = std::array::from_fn(|j| minus[j].rminus(&centre));
        let p_state = folded_covariance(&d_plus, &d_minus, &shift, &w);

        self.params.validate(U)?;
        let wu = self.params.weights(U);
        let lu = psd_factor(&model.control_covariance(dt)).ok_or(ModelError::InvalidCovariance {
            what: "control noise covariance",
        })? * wu.spread;
        let n_plus: [VecN<N>; U] = std::array::from_fn(|j| {
            model
                .propagate(&self.x, &(u + lu.column(j)), dt)
                .rminus(&centre)
        });
        let n_minus: [VecN<N>; U] = std::array::from_fn(|j| {
            model
                .propagate(&self.x, &(u - lu.column(j)), dt)
                .rminus(&centre)
        });
        let mut n_mean = VecN::<N>::zeros();
        for j in 0..U {
            n_mean += n_plus[j] + n_minus[j];
        }
        let p_noise = folded_covariance(&n_plus, &n_minus, &(n_mean * wu.outer), &wu);

        let p = symmetrize(&(p_state + p_noise + model.additive_covariance(&self.x, u, dt)));
        ensure_finite(&mean, &p, Stage::Predict)?;
        self.x = mean;
        self.p = p;
        Ok(())
    }

    fn update<H, const M: usize>(&mut self, model: &H, y: &VecN<M>) -> Result<(), FilterError>
    where
        H: MeasurementModel<N, M, State = S>,
    {
        let r = measurement_covariance(model)?;
        let w = self.params.weights(N);
        let offsets = self.sigma_offsets(Stage::Update, w.spread)?;

        let y0 = model.expectation(&self.x);
        let e_plus: [VecN<M>; N] = std::array::from_fn(|j| {
            model.expectation(&self.x.rplus(&offsets.column(j).into_owned())) - y0
        });
        let e_minus: [VecN<M>; N] = std::array::from_fn(|j| {
            model.expectation(&self.x.rplus(&(-offsets.column(j)))) - y0
        });
        let mut e_mean = VecN::<M>::zeros();
        let mut p_xy = MatN::<N, M>::zeros();
        for j in 0..N {
            e_mean += e_plus[j] + e_minus[j];
            p_xy += offsets.column(j) * (e_plus[j] - e_minus[j]).transpose();
        }
        let e_mean = e_mean * w.outer;
        let p_xy = p_xy * w.outer;
        let p_yy = symmetrize(&(folded_covariance(&e_plus, &e_minus, &e_mean, &w) + r));

        let chol = p_yy
            .cholesky()
            .ok_or(FilterError::InnovationNotPositiveDefinite)?;
        let k = chol.solve(&p_xy.transpose()).transpose();
        let residual = model.residual(y, &(y0 + e_mean));
        let x = self.x.rplus(&(k * residual));
        let p = symmetrize(&(self.p - k * p_yy * k.transpose()));
        ensure_finite(&x, &p, Stage::Update)?;
        self.x = x;
        self.p = p;
        Ok(())
    }
}
