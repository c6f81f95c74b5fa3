use anyhow::{Context, Result};
use log::{debug, info, warn};
use odomcal_core::{LieGroup, Mat2, MeasurementModel, Real, Se2, Vec2};
use odomcal_filters::{Estimator, FilterError, FilterKind, KalmanFilter, Ukfm};
use odomcal_models::{
    on_pose, pose_calib_state, DiffDriveSystemModel, Kinematics, LandmarkMeasurementModel, OnPose,
    PoseCalib, PoseCalibState, PositionMeasurementModel, StateCovariance, STATE_DIM,
};
use serde::{Deserialize, Serialize};

use crate::metrics::pose_row;
use crate::{
    FilterSummary, MetricsCollector, NoiseSource, ScenarioConfig, Scheduler, Simulator,
    TrackSummary,
};

/// One step of the optional trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    pub time: Real,
    /// `(x, y, θ)` of the truth, heading unwrapped.
    pub truth: [Real; 3],
    /// True `(r_l, r_r, d_w)`.
    pub truth_kinematics: [Real; 3],
    pub unfiltered: [Real; 3],
    /// `(x, y, θ, r_l, r_r, d_w)` per filter, in the order of the report.
    pub estimates: Vec<[Real; 6]>,
}

/// Outcome of [`run_scenario`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub seed: u64,
    pub steps: usize,
    pub duration: Real,
    pub final_truth: [Real; 3],
    pub final_kinematics: Kinematics,
    /// Dead reckoning with the seed kinematics and the noisy odometry.
    pub unfiltered: TrackSummary,
    pub filters: Vec<FilterSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceRow>>,
}

impl ScenarioReport {
    pub fn filter(&self, kind: FilterKind) -> Option<&FilterSummary> {
        self.filters.iter().find(|f| f.kind == kind)
    }
}

type State = PoseCalibState;

struct FilterRun {
    kind: FilterKind,
    estimator: Estimator<State, STATE_DIM>,
    metrics: MetricsCollector,
    failures: usize,
}

impl FilterRun {
    /// Reset after a failed step: numeric failures keep the mean and restore the
    /// initial covariance, domain failures also reseed the calibration.
    fn recover(
        &mut self,
        err: FilterError,
        time: Real,
        p0: &StateCovariance,
        seed: &Kinematics,
    ) -> Result<()> {
        self.failures += 1;
        warn!("{} failed at t = {time:.2} s: {err}; resetting", self.kind);
        if matches!(err, FilterError::Model(_)) {
            let pose = *self.estimator.state().pose();
            self.estimator.set_state(pose_calib_state(pose, seed));
        }
        self.estimator
            .set_covariance(*p0)
            .with_context(|| format!("failed to reset {}", self.kind))
    }

    fn estimate_row(&self) -> [Real; 6] {
        let x = self.estimator.state();
        let [px, py, th] = pose_row(x.pose());
        let k = x.kinematics();
        [px, py, th, k.left_radius, k.right_radius, k.separation]
    }

    fn summary(&self, truth: &Kinematics) -> FilterSummary {
        let k = self.estimator.state().kinematics();
        let p = self.estimator.covariance();
        FilterSummary {
            kind: self.kind,
            track: self.metrics.track(),
            mean_error_norm: self.metrics.mean_error_norm(),
            final_kinematics: k,
            final_calibration_error: [
                k.left_radius - truth.left_radius,
                k.right_radius - truth.right_radius,
                k.separation - truth.separation,
            ],
            calibration_within_tolerance: self.metrics.calibration_within_tolerance(),
            final_covariance: std::array::from_fn(|i| std::array::from_fn(|j| p[(i, j)])),
            failures: self.failures,
        }
    }
}

fn system_model(config: &ScenarioConfig) -> Result<DiffDriveSystemModel> {
    let mut model =
        DiffDriveSystemModel::new(config.kinematics)?.with_mode(config.calibration_mode);
    model.set_covariance(Mat2::identity() * config.wheel_noise)?;
    model.set_calibration_drift(config.drift())?;
    model.set_lateral_slip(config.lateral_slip)?;
    Ok(model)
}

fn build_estimator(
    kind: FilterKind,
    x0: State,
    p0: StateCovariance,
    config: &ScenarioConfig,
) -> Result<Estimator<State, STATE_DIM>, FilterError> {
    match kind {
        FilterKind::Ukfm => Ok(Estimator::Ukfm(Ukfm::with_params(
            x0,
            p0,
            config.unscented,
            config.karcher,
        )?)),
        other => Estimator::new(other, x0, p0),
    }
}

/// Run the scripted scenario and score every configured estimator against the truth.
///
/// All estimators see the same odometry and the same measurements. A failing step is
/// logged, counted and followed by a reset of that estimator; it does not abort the run.
pub fn run_scenario(config: &ScenarioConfig) -> Result<ScenarioReport> {
    config.validate().context("invalid scenario configuration")?;
    let scheduler = Scheduler::new(config)?;
    let model = system_model(config).context("invalid process model")?;
    let dt = scheduler.dt();
    let p0 = config.initial_state_covariance();
    let mut noise = NoiseSource::new(config.seed);

    let truth0 = pose_calib_state(Se2::identity(), &config.kinematics);
    let x0 = if config.perturb_initial_state {
        let delta = noise
            .gaussian(&p0)
            .context("initial covariance cannot be sampled")?;
        truth0.rplus(&delta)
    } else {
        truth0
    };
    let mut sim = Simulator::new(
        Se2::identity(),
        config.kinematics,
        *x0.pose(),
        config.kinematics,
        config.jumps.clone(),
    );

    let mut runs = config
        .filters
        .iter()
        .map(|&kind| {
            let estimator = build_estimator(kind, x0.clone(), p0, config)
                .with_context(|| format!("failed to build {kind}"))?;
            Ok(FilterRun {
                kind,
                estimator,
                metrics: MetricsCollector::new(),
                failures: 0,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let landmarks: Vec<OnPose<LandmarkMeasurementModel>> = config
        .landmarks
        .iter()
        .flat_map(|lm| {
            let r = Mat2::identity() * (lm.std * lm.std);
            lm.positions
                .iter()
                .map(move |&b| on_pose(LandmarkMeasurementModel::new(b.into(), r)))
        })
        .collect();
    let landmark_std = config.landmarks.as_ref().map_or(0.0, |lm| lm.std);
    let position_fix = config
        .position_fix
        .as_ref()
        .map(|fix| on_pose(PositionMeasurementModel::new(Mat2::identity() * fix.variance)));
    let position_std = config
        .position_fix
        .as_ref()
        .map_or(0.0, |fix| fix.variance.sqrt());
    let measurement_scale = if config.measurement_noise { 1.0 } else { 0.0 };

    let nominal_rates = config.nominal_rates();
    let scoring_start = config.scoring_start();
    let progress_every = ((10.0 / dt).round() as usize).max(1);
    let weights = StateCovariance::identity();
    let mut unfiltered = MetricsCollector::new();
    let mut trace = config.trace.then(Vec::new);

    info!(
        "running {} steps ({:.1} s) with {} filter(s), seed {}",
        scheduler.steps(),
        config.duration,
        runs.len(),
        config.seed
    );

    for step in 1..=scheduler.steps() {
        let start = scheduler.time(step - 1);
        let time = scheduler.time(step);
        for jump in sim.apply_jumps(start + 0.5 * dt) {
            debug!(
                "t = {:.2} s: true kinematics now ({}, {}, {})",
                jump.time,
                jump.kinematics.left_radius,
                jump.kinematics.right_radius,
                jump.kinematics.separation
            );
        }

        let nominal = nominal_rates * dt;
        let odometry = if config.control_noise {
            noise.odometry(&nominal_rates, config.wheel_noise, dt)
        } else {
            nominal
        };
        sim.step(&nominal, &odometry);

        for run in runs.iter_mut() {
            if let Err(err) = run.estimator.predict(&model, &odometry, dt) {
                run.recover(err, time, &p0, &config.kinematics)?;
            }
        }

        let truth = sim.truth_state();
        if scheduler.landmarks_due(step) {
            for lm in &landmarks {
                let expected: Vec2 = lm.expectation(&truth);
                let y = expected + noise.vec2(landmark_std * measurement_scale);
                for run in runs.iter_mut() {
                    if let Err(err) = run.estimator.update(lm, &y) {
                        run.recover(err, time, &p0, &config.kinematics)?;
                    }
                }
            }
        }
        if let Some(fix) = position_fix.as_ref().filter(|_| scheduler.position_due(step)) {
            let y = truth.pose().translation() + noise.vec2(position_std * measurement_scale);
            for run in runs.iter_mut() {
                if let Err(err) = run.estimator.update(fix, &y) {
                    run.recover(err, time, &p0, &config.kinematics)?;
                }
            }
        }

        unfiltered.record_pose(sim.truth(), sim.baseline());
        for run in runs.iter_mut() {
            let estimate = run.estimator.state();
            run.metrics.record_pose(sim.truth(), estimate.pose());
            run.metrics
                .record_error_norm(run.estimator.error_norm(&truth, &weights));
            if time >= scoring_start {
                run.metrics.record_calibration(
                    sim.kinematics(),
                    &estimate.kinematics(),
                    config.radius_tolerance,
                );
            }
        }

        if let Some(rows) = trace.as_mut() {
            let k = sim.kinematics();
            rows.push(TraceRow {
                time,
                truth: pose_row(sim.truth()),
                truth_kinematics: [k.left_radius, k.right_radius, k.separation],
                unfiltered: pose_row(sim.baseline()),
                estimates: runs.iter().map(FilterRun::estimate_row).collect(),
            });
        }

        if step % progress_every == 0 {
            debug!(
                "t = {time:.1} s: unfiltered position error {:.3} m",
                (sim.baseline().translation() - sim.truth().translation()).norm()
            );
        }
    }

    let filters: Vec<FilterSummary> = runs
        .iter()
        .map(|run| run.summary(sim.kinematics()))
        .collect();
    let unfiltered = unfiltered.track();
    info!(
        "unfiltered: position RMSE {:.4} m, heading RMSE {:.4} rad",
        unfiltered.position_rmse, unfiltered.heading_rmse
    );
    for f in &filters {
        info!(
            "{}: position RMSE {:.4} m, heading RMSE {:.4} rad, calibration within tolerance {}, failures {}",
            f.kind,
            f.track.position_rmse,
            f.track.heading_rmse,
            f.calibration_within_tolerance
                .map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", 100.0 * r)),
            f.failures
        );
    }

    Ok(ScenarioReport {
        seed: config.seed,
        steps: scheduler.steps(),
        duration: config.duration,
        final_truth: pose_row(sim.truth()),
        final_kinematics: *sim.kinematics(),
        unfiltered,
        filters,
        trace,
    })
}
