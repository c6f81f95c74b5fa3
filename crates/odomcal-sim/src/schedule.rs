use anyhow::{ensure, Result};
use odomcal_core::Real;

use crate::ScenarioConfig;

/// Number of control steps between two firings of a sensor running at `rate_hz`.
///
/// The rate must divide the control rate `1 / dt` exactly.
pub fn divisor(dt: Real, rate_hz: Real) -> Result<usize> {
    let ratio = 1.0 / (dt * rate_hz);
    let every = ratio.round();
    ensure!(
        every >= 1.0 && (ratio - every).abs() <= 1e-9 * ratio,
        "sensor rate {rate_hz} Hz does not divide the control rate {} Hz",
        1.0 / dt
    );
    Ok(every as usize)
}

/// Deterministic step grid of a scenario.
///
/// Step `k` covers `[(k - 1) dt, k dt]`; sensors fire after the predict of every step
/// that is a multiple of their divisor.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduler {
    dt: Real,
    steps: usize,
    landmark_every: Option<usize>,
    position_every: Option<usize>,
}

impl Scheduler {
    pub fn new(config: &ScenarioConfig) -> Result<Self> {
        let landmark_every = config
            .landmarks
            .as_ref()
            .map(|lm| divisor(config.dt, lm.rate))
            .transpose()?;
        let position_every = config
            .position_fix
            .as_ref()
            .map(|fix| divisor(config.dt, fix.rate))
            .transpose()?;
        Ok(Self {
            dt: config.dt,
            steps: config.step_count(),
            landmark_every,
            position_every,
        })
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn dt(&self) -> Real {
        self.dt
    }

    /// Time at the end of step `step`.
    pub fn time(&self, step: usize) -> Real {
        step as Real * self.dt
    }

    pub fn landmarks_due(&self, step: usize) -> bool {
        fires(step, self.landmark_every)
    }

    pub fn position_due(&self, step: usize) -> bool {
        fires(step, self.position_every)
    }
}

fn fires(step: usize, every: Option<usize>) -> bool {
    every.is_some_and(|n| step % n == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divisors_of_control_rate() {
        assert_eq!(divisor(0.01, 50.0).unwrap(), 2);
        assert_eq!(divisor(0.01, 10.0).unwrap(), 10);
        assert_eq!(divisor(0.01, 100.0).unwrap(), 1);
        assert!(divisor(0.01, 30.0).is_err());
        assert!(divisor(0.01, 200.0).is_err());
    }

    #[test]
    fn demo_schedule() {
        let s = Scheduler::new(&ScenarioConfig::default()).unwrap();
        assert_eq!(s.steps(), 24_000);
        let landmark_steps = (1..=100).filter(|&k| s.landmarks_due(k)).count();
        let position_steps = (1..=100).filter(|&k| s.position_due(k)).count();
        assert_eq!(landmark_steps, 50);
        assert_eq!(position_steps, 10);
        assert!((s.time(150) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn disabled_sensors_never_fire() {
        let cfg = ScenarioConfig {
            landmarks: None,
            position_fix: None,
            ..ScenarioConfig::default()
        };
        let s = Scheduler::new(&cfg).unwrap();
        assert!((1..=100).all(|k| !s.landmarks_due(k) && !s.position_due(k)));
    }
}
