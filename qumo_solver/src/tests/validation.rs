use std::time::Duration;

use nalgebra::dmatrix;

use crate::prelude::*;

#[test]
fn phase_fractions_must_leave_room_for_the_deep_search() {
    let q = dmatrix![0.0, 1.0; 1.0, 0.0];
    let options = SolveOptions {
        phase_1_fraction: 0.6,
        phase_2_fraction: 0.5,
        ..SolveOptions::default()
    };
    let err = solve(&q, None, 2, Duration::from_secs(5), options).unwrap_err();
    assert!(matches!(err, SolverError::InvalidRange { .. }));
}

#[test]
fn zero_fraction_is_rejected() {
    let q = dmatrix![0.0, 1.0; 1.0, 0.0];
    let options = SolveOptions {
        phase_1_fraction: 0.0,
        ..SolveOptions::default()
    };
    let err = solve(&q, None, 2, Duration::from_secs(5), options).unwrap_err();
    assert!(matches!(err, SolverError::InvalidRange { .. }));
}

#[test]
fn momentum_interval_must_stay_below_one() {
    let q = dmatrix![0.0, 1.0; 1.0, 0.0];
    let options = SolveOptions {
        momentum: Interval { lo: 0.5, hi: 1.0 },
        ..SolveOptions::default()
    };
    let err = solve(&q, None, 2, Duration::from_secs(5), options).unwrap_err();
    assert!(matches!(err, SolverError::InvalidRange { .. }));
}

#[test]
fn inverted_deep_search_interval_is_rejected() {
    let q = dmatrix![0.0, 1.0; 1.0, 0.0];
    let options = SolveOptions {
        deep_search_iterations: (2000, 500),
        ..SolveOptions::default()
    };
    let err = solve(&q, None, 2, Duration::from_secs(5), options).unwrap_err();
    assert!(matches!(err, SolverError::InvalidRange { .. }));
}

#[test]
fn asymmetric_interactions_are_rejected_up_front() {
    let q = dmatrix![0.0, 1.0; 2.0, 0.0];
    let err = solve(&q, None, 2, Duration::from_secs(5), SolveOptions::default()).unwrap_err();
    assert!(matches!(err, SolverError::InvalidShape { .. }));
}
