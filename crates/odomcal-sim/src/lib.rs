//! Scripted scenarios for the `odomcal` estimators.
//!
//! A scenario drives a simulated differential-drive vehicle along a fixed control
//! profile, optionally changes its true kinematics at scripted times, and feeds every
//! selected estimator with the same noisy odometry, landmark observations and position
//! fixes. The run is deterministic for a given [`ScenarioConfig::seed`].
//!
//! - [`ScenarioConfig`]: serde-configurable description of a run,
//! - [`Scheduler`]: step grid and sensor firing,
//! - [`NoiseSource`]: seeded Gaussian draws,
//! - [`Simulator`]: truth and unfiltered dead reckoning,
//! - [`MetricsCollector`]: error statistics,
//! - [`run_scenario`]: the driver producing a [`ScenarioReport`].

mod config;
mod metrics;
mod noise;
mod runner;
mod schedule;
mod simulator;

pub use config::{LandmarkSensor, PositionSensor, ScenarioConfig};
pub use metrics::{FilterSummary, MetricsCollector, TrackSummary};
pub use noise::NoiseSource;
pub use runner::{run_scenario, ScenarioReport, TraceRow};
pub use schedule::{divisor, Scheduler};
pub use simulator::{ParameterJump, Simulator};
