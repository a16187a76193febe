// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/// Integration tests for the ADMM QP solver
///
/// Problems with closed-form solutions, solved through the public API only.
use bioneuron_qp::{solve, Problem, QpSetupError, QpStatus, Settings};
use proptest::prelude::*;
use sprs::{CsMat, TriMat};

fn csc(rows: usize, cols: usize, entries: &[(usize, usize, f64)]) -> CsMat<f64> {
    let mut tri = TriMat::new((rows, cols));
    for &(i, j, v) in entries {
        tri.add_triplet(i, j, v);
    }
    tri.to_csc()
}

fn accurate() -> Settings {
    Settings {
        eps_abs: 1e-9,
        eps_rel: 1e-9,
        max_iter: 20_000,
        polish: true,
        ..Settings::default()
    }
}

// ============================================================================
// Least squares with sign constraints
// ============================================================================

#[test]
fn test_nonnegative_least_squares() {
    // min ½‖Mx - b‖² with M = I₂, b = (1, -2), x ≥ 0  ->  x = (1, 0)
    let p = csc(2, 2, &[(0, 0, 1.0), (1, 1, 1.0)]);
    let q = [-1.0, 2.0];
    let a = csc(2, 2, &[(0, 0, 1.0), (1, 1, 1.0)]);
    let l = [0.0, 0.0];
    let u = [f64::INFINITY, f64::INFINITY];
    let problem = Problem::new(p.view(), &q, a.view(), &l, &u);

    let solution = solve(&problem, &accurate()).unwrap();
    assert_eq!(solution.status, QpStatus::Solved);
    assert!((solution.x[0] - 1.0).abs() < 1e-6);
    assert!(solution.x[1].abs() < 1e-6);
    // y₁ carries the multiplier of the active bound x₁ ≥ 0
    assert!((solution.y[1] + 2.0).abs() < 1e-5);
    assert!((solution.obj_val + 0.5).abs() < 1e-6);
}

#[test]
fn test_equality_constrained_problem() {
    // min x₀² + x₁²  s.t.  x₀ + x₁ = 1  ->  x = (½, ½)
    let p = csc(2, 2, &[(0, 0, 2.0), (1, 1, 2.0)]);
    let q = [0.0, 0.0];
    let a = csc(1, 2, &[(0, 0, 1.0), (0, 1, 1.0)]);
    let l = [1.0];
    let u = [1.0];
    let problem = Problem::new(p.view(), &q, a.view(), &l, &u);

    let solution = solve(&problem, &accurate()).unwrap();
    assert!(solution.status.is_solved());
    assert!((solution.x[0] - 0.5).abs() < 1e-6);
    assert!((solution.x[1] - 0.5).abs() < 1e-6);
}

#[test]
fn test_polishing_reaches_high_accuracy() {
    let p = csc(2, 2, &[(0, 0, 4.0), (0, 1, 1.0), (1, 1, 2.0)]);
    let q = [1.0, 1.0];
    let a = csc(
        3,
        2,
        &[(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (2, 1, 1.0)],
    );
    let l = [1.0, 0.0, 0.0];
    let u = [1.0, 0.7, 0.7];
    let problem = Problem::new(p.view(), &q, a.view(), &l, &u);

    let loose = Settings {
        eps_abs: 1e-4,
        eps_rel: 1e-4,
        polish: true,
        ..Settings::default()
    };
    let solution = solve(&problem, &loose).unwrap();
    assert!(solution.status.is_solved());
    // Known optimum of this problem is (0.3, 0.7)
    assert!((solution.x[0] - 0.3).abs() < 1e-3, "x0 = {}", solution.x[0]);
    assert!((solution.x[1] - 0.7).abs() < 1e-3, "x1 = {}", solution.x[1]);
    if solution.polished {
        assert!((solution.x[0] - 0.3).abs() < 1e-8);
        assert!((solution.x[1] - 0.7).abs() < 1e-8);
    }
}

// ============================================================================
// Setup failures
// ============================================================================

#[test]
fn test_invalid_settings_reported_at_setup() {
    let p = csc(1, 1, &[(0, 0, 1.0)]);
    let a = csc(0, 1, &[]);
    let q = [0.0];
    let problem = Problem::new(p.view(), &q, a.view(), &[], &[]);
    let settings = Settings {
        rho: -1.0,
        ..Settings::default()
    };
    let err = solve(&problem, &settings).unwrap_err();
    assert!(matches!(err, QpSetupError::SettingsValidation(_)));
    assert_eq!(err.code(), 2);
}

#[test]
fn test_invalid_data_reported_at_setup() {
    let p = csc(2, 2, &[(0, 0, 1.0), (1, 1, 1.0)]);
    let a = csc(1, 3, &[(0, 0, 1.0)]);
    let q = [0.0, 0.0];
    let problem = Problem::new(p.view(), &q, a.view(), &[0.0], &[1.0]);
    let err = solve(&problem, &Settings::default()).unwrap_err();
    assert!(matches!(err, QpSetupError::DataValidation(_)));
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A separable box-constrained QP is solved by clamping the unconstrained minimiser
    #[test]
    fn prop_separable_box_qp(
        entries in prop::collection::vec((0.5f64..5.0, -5.0f64..5.0, -2.0f64..0.0, 0.0f64..2.0), 1..6)
    ) {
        let n = entries.len();
        let diag: Vec<(usize, usize, f64)> = entries.iter().enumerate().map(|(i, e)| (i, i, e.0)).collect();
        let ident: Vec<(usize, usize, f64)> = (0..n).map(|i| (i, i, 1.0)).collect();
        let p = csc(n, n, &diag);
        let a = csc(n, n, &ident);
        let q: Vec<f64> = entries.iter().map(|e| e.1).collect();
        let l: Vec<f64> = entries.iter().map(|e| e.2).collect();
        let u: Vec<f64> = entries.iter().map(|e| e.3).collect();
        let problem = Problem::new(p.view(), &q, a.view(), &l, &u);

        let solution = solve(&problem, &accurate()).unwrap();
        prop_assert!(solution.status.is_solved());
        for (i, e) in entries.iter().enumerate() {
            let expected = (-e.1 / e.0).max(e.2).min(e.3);
            prop_assert!((solution.x[i] - expected).abs() < 1e-5,
                "x[{}] = {} expected {}", i, solution.x[i], expected);
        }
    }
}
