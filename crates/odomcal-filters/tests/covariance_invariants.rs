//! Covariance invariants of every estimator variant on the differential-drive problem.
//!
//! Validates that:
//! - the covariance stays symmetric and positive semi-definite after every
//!   predict and update of a noisy run,
//! - a perfect measurement with zero noise annihilates exactly the observed directions,
//! - two landmark updates commute (for the unscented filter once the spread is small
//!   enough for its second-order mean correction to vanish),
//! - an update with an indefinite `R` is rejected and leaves the estimator untouched,
//!   including a zero variance hiding a small negative eigenvalue behind a coupling.

use nalgebra::Matrix6;
use odomcal_core::{
    LieGroup, Mat2, MatN, MeasurementModel, ModelError, Real, Se2, SystemModel, Vec2, Vec3, VecN,
};
use odomcal_filters::{Estimator, FilterError, FilterKind, KalmanFilter};
use odomcal_models::{
    on_pose, pose_calib_state, DiffDriveSystemModel, Kinematics, LandmarkMeasurementModel,
    PoseCalibState, PositionMeasurementModel, StateCovariance, STATE_DIM,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

const DT: Real = 0.01;

fn kinematics() -> Kinematics {
    Kinematics::new(0.15, 0.15, 0.4).unwrap()
}

fn system() -> DiffDriveSystemModel {
    let mut m = DiffDriveSystemModel::new(kinematics()).unwrap();
    m.set_covariance(Mat2::identity() * 9e-5).unwrap();
    m
}

fn prior() -> StateCovariance {
    StateCovariance::from_diagonal(&VecN::<STATE_DIM>::from([0.1, 0.1, 0.17, 1e-5, 1e-5, 1e-5]))
}

/// Spread at which the unscented mean correction `½ tr(∇²h P)` is far below the
/// comparison tolerance for landmarks a couple of metres away.
fn tight_prior() -> StateCovariance {
    StateCovariance::from_diagonal(&VecN::<STATE_DIM>::from([1e-6, 1e-6, 1e-6, 1e-8, 1e-8, 1e-8]))
}

fn landmarks() -> [Vec2; 3] {
    [Vec2::new(2.0, 0.0), Vec2::new(2.0, 1.0), Vec2::new(2.0, -1.0)]
}

fn min_eigenvalue(p: &StateCovariance) -> Real {
    let p: Matrix6<Real> = *p;
    p.symmetric_eigenvalues().min()
}

fn assert_valid_covariance(p: &StateCovariance, kind: FilterKind, step: usize) {
    let asym = (p - p.transpose()).abs().max();
    assert!(asym <= 1e-10, "{kind} step {step}: asymmetry {asym:e}");
    let lambda = min_eigenvalue(p);
    assert!(lambda >= -1e-10, "{kind} step {step}: eigenvalue {lambda:e}");
}

#[test]
fn covariance_stays_symmetric_and_psd() {
    let model = system();
    let normal = Normal::new(0.0, 1.0).unwrap();
    let sigma_u = (9e-5 as Real).sqrt() / DT.sqrt();
    let nominal = Vec2::new(0.5, 0.35);

    for kind in FilterKind::ALL {
        let mut rng = StdRng::seed_from_u64(7);
        let mut truth = model.initial_state(Se2::identity());
        let mut est = Estimator::new(kind, truth.clone(), prior()).unwrap();

        for step in 0..500 {
            let noisy = nominal + Vec2::new(rng.sample(normal), rng.sample(normal)) * sigma_u;
            truth = model.propagate(&truth, &(nominal * DT), DT);
            est.predict(&model, &(noisy * DT), DT).unwrap();
            assert_valid_covariance(&est.covariance(), kind, step);

            if step % 2 == 0 {
                for b in landmarks() {
                    let lm = on_pose(LandmarkMeasurementModel::new(b, Mat2::identity() * 1e-4));
                    let expected: Vec2 = lm.expectation(&truth);
                    let y = expected + Vec2::new(rng.sample(normal), rng.sample(normal)) * 1e-2;
                    est.update(&lm, &y).unwrap();
                    assert_valid_covariance(&est.covariance(), kind, step);
                }
            }
            if step % 10 == 0 {
                let fix = on_pose(PositionMeasurementModel::new(Mat2::identity() * 6e-3));
                let y: Vec2 = fix.expectation(&truth);
                est.update(&fix, &y).unwrap();
                assert_valid_covariance(&est.covariance(), kind, step);
            }
        }
    }
}

#[test]
fn perfect_measurement_annihilates_observed_directions() {
    // Zero noise everywhere, so the covariance-form variants must land on an exact
    // rank deficit of 2.
    let mut model = system();
    model.set_calibration_drift(Vec3::zeros()).unwrap();
    model.set_lateral_slip(0.0).unwrap();
    model.set_covariance(Mat2::zeros()).unwrap();

    let x0 = pose_calib_state(Se2::new(0.4, -0.3, 0.6), &kinematics());
    let lm = on_pose(LandmarkMeasurementModel::new(
        Vec2::new(2.0, 1.0),
        Mat2::zeros(),
    ));

    for kind in [FilterKind::Ekf, FilterKind::Sekf, FilterKind::Iekf] {
        let mut est = Estimator::new(kind, x0.clone(), prior()).unwrap();
        est.predict(&model, &Vec2::new(0.005, 0.0035), DT).unwrap();
        let x = est.state().clone();
        let y: Vec2 = lm.expectation(&x);
        est.update(&lm, &y).unwrap();

        let diff = est.state().rminus(&x).norm();
        assert!(diff < 1e-12, "{kind}: perfect measurement moved the mean by {diff:e}");

        let p = est.covariance();
        let h: MatN<2, STATE_DIM> = lm.jacobian(&x);
        let observed = (h * p).abs().max();
        assert!(observed < 1e-10, "{kind}: observed block not annihilated ({observed:e})");

        let p: Matrix6<Real> = p;
        let mut eig: Vec<Real> = p.symmetric_eigenvalues().iter().copied().collect();
        eig.sort_by(|a, b| a.total_cmp(b));
        assert!(eig[0].abs() < 1e-10 && eig[1].abs() < 1e-10, "{kind}: {eig:?}");
        assert!(eig[2] > 1e-7, "{kind}: unobserved directions lost ({eig:?})");
    }
}

#[test]
fn landmark_updates_commute() {
    let model = system();
    let a = on_pose(LandmarkMeasurementModel::new(
        Vec2::new(2.0, 1.0),
        Mat2::identity() * 1e-4,
    ));
    let b = on_pose(LandmarkMeasurementModel::new(
        Vec2::new(2.0, -1.0),
        Mat2::identity() * 1e-4,
    ));
    let x0 = pose_calib_state(Se2::new(0.1, 0.2, 0.3), &kinematics());

    for kind in FilterKind::ALL {
        let p0 = if kind == FilterKind::Ukfm { tight_prior() } else { prior() };
        let mut est = Estimator::new(kind, x0.clone(), p0).unwrap();
        est.predict(&model, &Vec2::new(0.005, 0.0035), DT).unwrap();

        let truth: PoseCalibState = est.state().rplus(&VecN::<STATE_DIM>::from([
            2e-6, -1e-6, 1e-6, 0.0, 0.0, 0.0,
        ]));
        let ya: Vec2 = a.expectation(&truth);
        let yb: Vec2 = b.expectation(&truth);

        let mut ab = est.clone();
        ab.update(&a, &ya).unwrap();
        ab.update(&b, &yb).unwrap();
        let mut ba = est.clone();
        ba.update(&b, &yb).unwrap();
        ba.update(&a, &ya).unwrap();

        let (mean_tol, cov_tol) = if kind == FilterKind::Ukfm {
            (1e-7, 1e-10)
        } else {
            (1e-8, 1e-8)
        };
        let dmean = ab.state().rminus(ba.state()).abs().max();
        let dcov = (ab.covariance() - ba.covariance()).abs().max();
        assert!(dmean < mean_tol, "{kind}: means differ by {dmean:e}");
        assert!(dcov < cov_tol, "{kind}: covariances differ by {dcov:e}");
    }
}

#[test]
fn indefinite_measurement_covariance_is_rejected_untouched() {
    let model = system();
    let x0 = pose_calib_state(Se2::new(0.1, 0.2, 0.3), &kinematics());
    let covariances = [
        Mat2::new(1e-4, 0.0, 0.0, -1e-4),
        // eigenvalues 1.00002e-4 and -2.5e-9
        Mat2::new(0.0, 5e-7, 5e-7, 1e-4),
    ];

    for r in covariances {
        let bad = on_pose(LandmarkMeasurementModel::new(Vec2::new(2.0, 0.0), r));
        for kind in FilterKind::ALL {
            let mut est = Estimator::new(kind, x0.clone(), prior()).unwrap();
            est.predict(&model, &Vec2::new(0.005, 0.0035), DT).unwrap();
            let snapshot = est.clone();

            let y = Vec2::new(1.8, -0.1);
            let err = est.update(&bad, &y).unwrap_err();
            assert!(
                matches!(err, FilterError::Model(ModelError::InvalidCovariance { .. })),
                "{kind}: unexpected error {err:?} for R = {r}"
            );
            assert_eq!(est, snapshot, "{kind}: estimator changed on rejected update");
            assert_eq!(est.covariance(), snapshot.covariance());
        }
    }
    assert!(LandmarkMeasurementModel::try_new(Vec2::new(2.0, 0.0), covariances[1]).is_err());
}

#[test]
fn invalid_calibration_is_rejected_by_predict() {
    let model = system();
    let x0 = pose_calib_state(
        Se2::identity(),
        &Kinematics::from_vector(&Vec3::new(0.15, 0.0, 0.4)),
    );
    for kind in FilterKind::ALL {
        let mut est = Estimator::new(kind, x0.clone(), prior()).unwrap();
        let err = est.predict(&model, &Vec2::new(0.005, 0.0035), DT).unwrap_err();
        assert!(
            matches!(err, FilterError::Model(ModelError::NonPositiveParameter { .. })),
            "{kind}: unexpected error {err:?}"
        );
    }
}

#[test]
fn indefinite_prior_is_rejected() {
    let mut p0 = prior();
    p0[(0, 0)] = -1.0;
    for kind in FilterKind::ALL {
        let err = Estimator::new(kind, pose_calib_state(Se2::identity(), &kinematics()), p0)
            .unwrap_err();
        assert!(
            matches!(err, FilterError::Model(ModelError::InvalidCovariance { .. })),
            "{kind}: unexpected error {err:?}"
        );
    }
}
