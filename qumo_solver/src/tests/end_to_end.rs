use std::time::Duration;

use nalgebra::{DMatrix, dmatrix};

use crate::prelude::*;

fn five_cycle_adjacency() -> DMatrix<f64> {
    let mut adjacency = DMatrix::zeros(5, 5);
    for i in 0..5 {
        adjacency[(i, (i + 1) % 5)] = 1.0;
        adjacency[((i + 1) % 5, i)] = 1.0;
    }
    adjacency
}

#[test]
fn five_cycle_max_cut_reaches_four() {
    let adjacency = five_cycle_adjacency();
    let (q, offset) = maxcut_ising(&adjacency).unwrap();
    let q32 = q.map(|v| v as f32);
    let snapshot = q32.clone();

    let record = solve(
        &q32,
        None,
        5,
        Duration::from_secs(8),
        SolveOptions {
            seed: 17,
            ..SolveOptions::default()
        },
    )
    .unwrap();

    // the input interactions are read-only for the solver
    assert_eq!(q32, snapshot);

    let best = find_best(&record).unwrap();
    let total = best.objective + offset;
    assert!(total <= -4.0 + 1e-4, "total objective {total}");
    assert_eq!(cut_value(&adjacency, &best.assignment), 4.0);
    assert!((graph_cut_from_hamiltonian(&adjacency, total) - 4.0).abs() < 1e-4);

    // eight seconds leave room for the deep search and its summary
    let summary = get_solver_results_summary(&record).unwrap();
    assert!(summary.num_samples > 0);
    assert!((0.0..=1.0).contains(&summary.success_rate));
    assert!(summary.time_per_sample > 0.0);

    let configuration = search_for_best_configuration(&record).unwrap();
    assert!(configuration.success_rate >= 0.0);
}

#[test]
fn two_disjoint_edges_split_both_pairs() {
    let q = dmatrix![
        0.0f32, -1.0, 0.0, 0.0;
        -1.0, 0.0, 0.0, 0.0;
        0.0, 0.0, 0.0, -1.0;
        0.0, 0.0, -1.0, 0.0
    ];
    let record = solve(
        &q,
        None,
        4,
        Duration::from_secs(3),
        SolveOptions {
            seed: 3,
            ..SolveOptions::default()
        },
    )
    .unwrap();
    let best = find_best(&record).unwrap();
    assert!(best.objective <= -2.0 + 1e-3, "objective {}", best.objective);
    let s = &best.assignment;
    assert_eq!(s[0] * s[1], -1.0);
    assert_eq!(s[2] * s[3], -1.0);
}

#[test]
fn ferromagnetic_pair_in_double_precision() {
    let q = dmatrix![0.0f64, 1.0; 1.0, 0.0];
    let record = solve(
        &q,
        None,
        2,
        Duration::from_secs(3),
        SolveOptions::default(),
    )
    .unwrap();
    let best = find_best(&record).unwrap();
    assert!(best.objective <= -1.0 + 1e-9);
    assert_eq!(best.assignment[0] * best.assignment[1], 1.0);
    // extremes (-1, 1) have mixed signs, so lambda is the largest eigenvalue
    assert!((record.normalization - 1.0).abs() < 1e-9);
}

#[test]
fn positive_dialect_solves_a_binary_pair() {
    // H(x) = -x0 x1 over {0, 1}^2 has its minimum -1 at (1, 1)
    let q = dmatrix![0.0f32, 1.0; 1.0, 0.0];
    let record = solve_positive(
        &q,
        None,
        2,
        Duration::from_secs(3),
        SolveOptions::default(),
    )
    .unwrap();
    let best = find_best(&record).unwrap();
    assert!(best.objective <= -1.0 + 1e-4);
    assert_eq!(best.assignment[0], 1.0);
    assert_eq!(best.assignment[1], 1.0);
}

#[test]
fn qumo_dialect_handles_a_mixed_instance() {
    // binary coordinate coupled to a continuous one; pushing the continuous
    // coordinate to a wall and the binary to 1 minimizes the energy
    let ising = MixedIsing::from_qumo(&dmatrix![0.0, 4.0; 4.0, 5.0], None, 1).unwrap();
    let (q, h) = ising.solver_problem::<f32>();
    let record = solve_qumo(
        &q,
        h.as_ref(),
        1,
        Duration::from_secs(3),
        SolveOptions::default(),
    )
    .unwrap();
    let best = find_best(&record).unwrap();
    assert!(best.objective.is_finite());
    // binary block reported through the step non-linearity
    assert!(best.assignment[0] == 0.0 || best.assignment[0] == 1.0);
    assert!((-1.0..=1.0).contains(&best.assignment[1]));
}

#[test]
fn record_reports_phase_labels_and_durations() {
    let q = dmatrix![0.0f32, 1.0; 1.0, 0.0];
    let record = solve(
        &q,
        None,
        2,
        Duration::from_secs(3),
        SolveOptions::default(),
    )
    .unwrap();
    let [one, two, deep] = record.phases();
    assert_eq!(one.label, "phase 1");
    assert_eq!(two.label, "phase 2");
    assert_eq!(deep.label, "deep search");
    assert!(one.duration() >= Duration::from_millis(200));
    assert!(record.duration() >= one.duration());
    assert!(record.threads >= 1);
}
