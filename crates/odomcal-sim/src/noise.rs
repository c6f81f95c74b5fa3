use odomcal_core::{psd_factor, MatN, Real, Vec2, VecN};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Seeded Gaussian noise for the simulator.
///
/// All draws of a run come from one generator, so a seed reproduces the run exactly.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: StdRng,
}

impl NoiseSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn standard(&mut self) -> Real {
        self.rng.sample(StandardNormal)
    }

    /// Independent draws with standard deviation `std` on both coordinates.
    pub fn vec2(&mut self, std: Real) -> Vec2 {
        Vec2::new(self.standard(), self.standard()) * std
    }

    /// Integrated wheel angles over one step for the nominal `rates`, with white noise
    /// of rate `variance_rate` (rad²/s) on each wheel.
    ///
    /// The rate is perturbed by `σ / √dt` and then integrated, so the per-step variance
    /// of the increment is `variance_rate · dt`.
    pub fn odometry(&mut self, rates: &Vec2, variance_rate: Real, dt: Real) -> Vec2 {
        let sigma = variance_rate.sqrt() / dt.sqrt();
        (rates + self.vec2(sigma)) * dt
    }

    /// Draw from `N(0, P)`; `None` when `P` is not positive semi-definite.
    pub fn gaussian<const N: usize>(&mut self, p: &MatN<N, N>) -> Option<VecN<N>> {
        let l = psd_factor(p)?;
        let z = VecN::<N>::from_fn(|_, _| self.standard());
        Some(l * z)
    }
}
