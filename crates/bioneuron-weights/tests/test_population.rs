// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/// Population-level tests for the weight solver
///
/// Exercise the dispatcher end to end with the ADMM solver.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bioneuron_weights::{
    solve_weights, solve_weights_with, AdmmSolver, BioneuronError, CancellationToken,
    SolveStatus, SolverParameters, WeightOutputs, WeightProblem,
};
use ndarray::{Array1, Array2};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LINEAR_MODEL: [f64; 6] = [0.0, 1.0, -1.0, 1.0, 0.0, 0.0];

struct Population {
    a_pre: Array2<f64>,
    j_post: Array2<f64>,
    model: Array2<f64>,
    exc: Array2<bool>,
    inh: Array2<bool>,
}

impl Population {
    /// Random activities, random masks and targets reachable with positive weights
    fn random(seed: u64, n_samples: usize, n_pre: usize, n_post: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let a_pre = Array2::from_shape_fn((n_samples, n_pre), |_| rng.gen_range(0.0..1.0));
        let exc = Array2::from_shape_fn((n_pre, n_post), |_| rng.gen_bool(0.6));
        let inh = Array2::from_shape_fn((n_pre, n_post), |(i, j)| !exc[[i, j]] && rng.gen_bool(0.5));
        let w = Array2::from_shape_fn((n_pre, n_post), |_| rng.gen_range(0.1..1.0));
        let mut j_post = Array2::zeros((n_samples, n_post));
        for k in 0..n_samples {
            for j in 0..n_post {
                let mut current = 0.0;
                for i in 0..n_pre {
                    if exc[[i, j]] {
                        current += w[[i, j]] * a_pre[[k, i]];
                    }
                    if inh[[i, j]] {
                        current -= w[[i, j]] * a_pre[[k, i]];
                    }
                }
                j_post[[k, j]] = current;
            }
        }
        let model = Array2::from_shape_fn((n_post, 6), |(_, c)| LINEAR_MODEL[c]);
        Self {
            a_pre,
            j_post,
            model,
            exc,
            inh,
        }
    }

    fn problem(&self) -> WeightProblem<'_> {
        WeightProblem::new(
            self.a_pre.view(),
            self.j_post.view(),
            self.model.view(),
            self.exc.view(),
            self.inh.view(),
        )
    }

    fn n_pre(&self) -> usize {
        self.a_pre.ncols()
    }

    fn n_post(&self) -> usize {
        self.j_post.ncols()
    }
}

struct Solved {
    exc: Array2<f64>,
    inh: Array2<f64>,
    objective: Array1<f64>,
    status: Result<SolveStatus, BioneuronError>,
}

fn run(pop: &Population, problem: &WeightProblem<'_>, params: &SolverParameters) -> Solved {
    let mut exc = Array2::from_elem((pop.n_pre(), pop.n_post()), f64::NAN);
    let mut inh = Array2::from_elem((pop.n_pre(), pop.n_post()), f64::NAN);
    let mut objective = Array1::from_elem(pop.n_post(), f64::NAN);
    let outputs = WeightOutputs::new(exc.view_mut(), inh.view_mut())
        .with_objective_vals(objective.view_mut());
    let status = solve_weights(problem, outputs, params);
    Solved {
        exc,
        inh,
        objective,
        status,
    }
}

fn accurate() -> SolverParameters {
    SolverParameters {
        tolerance: 1e-9,
        renormalise: false,
        ..SolverParameters::default()
    }
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

/// 3 pre-neurons (2 excitatory, 1 inhibitory), 20 samples, 1 post-neuron
fn three_neuron_population(model: [f64; 6]) -> Population {
    let mut rng = StdRng::seed_from_u64(7);
    let a_pre = Array2::from_shape_fn((20, 3), |_| rng.gen_range(0.0..1.0));
    let j_post = Array2::from_shape_fn((20, 1), |(k, _)| {
        0.8 * a_pre[[k, 0]] + 0.3 * a_pre[[k, 1]] - 0.5 * a_pre[[k, 2]]
    });
    Population {
        a_pre,
        j_post,
        model: Array2::from_shape_fn((1, 6), |(_, c)| model[c]),
        exc: Array2::from_shape_vec((3, 1), vec![true, true, false]).unwrap(),
        inh: Array2::from_shape_vec((3, 1), vec![false, false, true]).unwrap(),
    }
}

#[test]
fn test_zero_target_model_has_zero_objective() {
    let pop = three_neuron_population([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]);
    let problem = pop.problem().with_regularisation(0.0).with_non_negative(true);
    let solved = run(&pop, &problem, &SolverParameters::default());

    assert_eq!(solved.status, Ok(SolveStatus::Ok));
    assert!(solved.objective[0].abs() < 1e-6, "objective {}", solved.objective[0]);
    assert!(solved.exc.iter().chain(solved.inh.iter()).all(|&w| w >= 0.0));
}

#[test]
fn test_exact_nonnegative_reconstruction() {
    let pop = three_neuron_population(LINEAR_MODEL);
    let problem = pop.problem().with_regularisation(0.0).with_non_negative(true);
    let solved = run(&pop, &problem, &accurate());

    assert_eq!(solved.status, Ok(SolveStatus::Ok));
    assert!((solved.exc[[0, 0]] - 0.8).abs() < 1e-4, "{}", solved.exc[[0, 0]]);
    assert!((solved.exc[[1, 0]] - 0.3).abs() < 1e-4, "{}", solved.exc[[1, 0]]);
    assert!((solved.inh[[2, 0]] - 0.5).abs() < 1e-4, "{}", solved.inh[[2, 0]]);
    assert_eq!(solved.exc[[2, 0]], 0.0);
    assert_eq!(solved.inh[[0, 0]], 0.0);
    // ½‖Aw - b‖² - ½‖b‖² with a zero residual
    let half_norm: f64 = 0.5 * pop.j_post.iter().map(|j| j * j).sum::<f64>();
    assert!((solved.objective[0] + half_norm).abs() < 1e-5);
}

#[test]
fn test_disconnected_pre_neuron_is_exactly_zero() {
    let mut pop = three_neuron_population(LINEAR_MODEL);
    pop.exc[[1, 0]] = false;
    let problem = pop.problem().with_regularisation(0.0).with_non_negative(true);
    let solved = run(&pop, &problem, &accurate());

    assert_eq!(solved.exc[[1, 0]], 0.0);
    assert_eq!(solved.inh[[1, 0]], 0.0);

    let mut exc_col = Array1::zeros(3);
    let mut inh_col = Array1::zeros(3);
    let report = bioneuron_weights::solve_neuron(
        &problem,
        &accurate(),
        &AdmmSolver::default(),
        bioneuron_weights::NeuronSlot {
            index: 0,
            exc: exc_col.view_mut(),
            inh: inh_col.view_mut(),
            objective: None,
        },
    );
    assert_eq!(report.n_vars, 2);
    assert_eq!(report.n_slack, 0);
    assert_eq!(report.n_rows, 20);
}

/// 1 excitatory pre-neuron, 4 samples, 2 post-neurons with `J = 0.5·a`
fn single_synapse_population() -> Population {
    let a_pre = Array2::from_shape_vec((4, 1), vec![0.2, 0.5, 0.9, 1.0]).unwrap();
    let j_post = Array2::from_shape_fn((4, 2), |(k, _)| 0.5 * a_pre[[k, 0]]);
    Population {
        a_pre,
        j_post,
        model: Array2::from_shape_fn((2, 6), |(_, c)| LINEAR_MODEL[c]),
        exc: Array2::from_elem((1, 2), true),
        inh: Array2::from_elem((1, 2), false),
    }
}

fn assert_single_synapse_solved(non_negative: bool) {
    let pop = single_synapse_population();
    let problem = pop
        .problem()
        .with_regularisation(0.0)
        .with_non_negative(non_negative);
    let warnings = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&warnings);
    let params = SolverParameters {
        tolerance: 1e-7,
        ..accurate()
    }
    .with_warn(move |msg, j| sink.lock().unwrap().push((msg.to_string(), j)));

    let solved = run(&pop, &problem, &params);

    assert_eq!(solved.status, Ok(SolveStatus::Ok));
    assert!(warnings.lock().unwrap().is_empty(), "{:?}", warnings.lock().unwrap());
    for j in 0..2 {
        assert!((solved.exc[[0, j]] - 0.5).abs() < 1e-5, "{}", solved.exc[[0, j]]);
        assert_eq!(solved.inh[[0, j]], 0.0);
    }
}

#[test]
fn test_single_synapse_signed_weights() {
    assert_single_synapse_solved(false);
}

#[test]
fn test_single_synapse_nonnegative_weights() {
    assert_single_synapse_solved(true);
}

// ============================================================================
// Numerical properties
// ============================================================================

#[test]
fn test_renormalisation_does_not_change_weights() {
    let mut pop = Population::random(11, 40, 6, 3);
    // Scale the model so renormalisation has something to do
    for mut row in pop.model.rows_mut() {
        row.assign(&Array1::from(vec![0.2, 3.0, -2.0, 1.5, 0.1, 0.05]));
    }
    let problem = pop.problem().with_regularisation(1e-2);

    let plain = run(&pop, &problem, &accurate());
    let renormalised = run(
        &pop,
        &problem,
        &SolverParameters {
            renormalise: true,
            ..accurate()
        },
    );

    let scale = plain
        .exc
        .iter()
        .chain(plain.inh.iter())
        .fold(0.0_f64, |acc, w| acc.max(w.abs()));
    for (a, b) in plain.exc.iter().zip(renormalised.exc.iter()) {
        assert!((a - b).abs() <= 1e-5 * scale.max(1.0), "{} vs {}", a, b);
    }
    for (a, b) in plain.inh.iter().zip(renormalised.inh.iter()) {
        assert!((a - b).abs() <= 1e-5 * scale.max(1.0), "{} vs {}", a, b);
    }
}

#[test]
fn test_repeated_solves_are_identical() {
    let pop = Population::random(3, 30, 8, 5);
    let problem = pop.problem().with_non_negative(true);
    let params = SolverParameters::default();
    let first = run(&pop, &problem, &params);
    let second = run(&pop, &problem, &params);
    assert_eq!(first.exc, second.exc);
    assert_eq!(first.inh, second.inh);
}

#[test]
fn test_thread_count_does_not_change_results() {
    let pop = Population::random(5, 25, 6, 6);
    let problem = pop.problem();
    let serial = run(
        &pop,
        &problem,
        &SolverParameters {
            n_threads: 1,
            ..SolverParameters::default()
        },
    );
    let parallel = run(
        &pop,
        &problem,
        &SolverParameters {
            n_threads: 4,
            ..SolverParameters::default()
        },
    );
    assert_eq!(serial.exc, parallel.exc);
    assert_eq!(serial.inh, parallel.inh);
}

// ============================================================================
// Progress and cancellation
// ============================================================================

#[test]
fn test_progress_reports_every_neuron_once() {
    let pop = Population::random(9, 20, 4, 7);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let params = SolverParameters::default().with_progress(move |done, total| {
        sink.lock().unwrap().push((done, total));
        true
    });
    let solved = run(&pop, &pop.problem(), &params);

    assert_eq!(solved.status, Ok(SolveStatus::Ok));
    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    let expected: Vec<(usize, usize)> = (1..=7).map(|k| (k, 7)).collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_single_neuron_skips_progress() {
    let pop = Population::random(2, 20, 4, 1);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let params = SolverParameters::default().with_progress(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        false
    });
    let solved = run(&pop, &pop.problem(), &params);
    assert_eq!(solved.status, Ok(SolveStatus::Ok));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancellation_stops_scheduling() {
    let pop = Population::random(4, 20, 4, 10);
    let params = SolverParameters {
        n_threads: 1,
        ..SolverParameters::default()
    }
    .with_progress(|done, _| done < 2);
    let solved = run(&pop, &pop.problem(), &params);

    assert_eq!(solved.status, Ok(SolveStatus::Canceled));
    // Unscheduled columns keep the caller's sentinel
    let written = (0..10)
        .filter(|&j| solved.exc.column(j).iter().all(|w| !w.is_nan()))
        .count();
    assert_eq!(written, 2);
}

#[test]
fn test_external_token_cancels_before_start() {
    let pop = Population::random(4, 20, 4, 3);
    let token = CancellationToken::new();
    token.cancel();
    let mut exc = Array2::from_elem((4, 3), f64::NAN);
    let mut inh = Array2::from_elem((4, 3), f64::NAN);
    let status = solve_weights_with(
        &pop.problem(),
        WeightOutputs::new(exc.view_mut(), inh.view_mut()),
        &SolverParameters::default(),
        &AdmmSolver::default(),
        &token,
    );
    assert_eq!(status, Ok(SolveStatus::Canceled));
    assert!(exc.iter().all(|w| w.is_nan()));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_invalid_inputs_abort_before_solving() {
    let pop = Population::random(1, 10, 3, 2);
    let params = SolverParameters {
        tolerance: 0.0,
        ..SolverParameters::default()
    };
    let solved = run(&pop, &pop.problem(), &params);
    assert_eq!(solved.status, Err(BioneuronError::InvalidTolerance));
    assert!(solved.exc.iter().all(|w| w.is_nan()));

    let problem = pop.problem().with_regularisation(-1.0);
    let solved = run(&pop, &problem, &SolverParameters::default());
    assert_eq!(solved.status, Err(BioneuronError::InvalidRegularisation));
}

#[test]
fn test_warnings_carry_neuron_index() {
    let mut pop = Population::random(8, 20, 4, 3);
    // Saturating model whose range [-1, 0.01] is below most targets
    for mut row in pop.model.rows_mut() {
        row.assign(&Array1::from(vec![0.0, 0.01, -1.0, 1.0, 1.0, 1.0]));
    }
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let params = SolverParameters::default().with_warn(move |msg, j| {
        if msg.starts_with("Target currents") {
            sink.lock().unwrap().push(j);
        }
    });
    run(&pop, &pop.problem(), &params);
    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    // Every neuron with a connection and a target above 0.01 is reported
    for j in seen.iter() {
        assert!(*j < 3);
    }
    assert!(!seen.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_non_negative_weights_and_zero_columns(seed in any::<u64>(), n_pre in 1usize..6, n_post in 1usize..5) {
        let mut pop = Population::random(seed, 12, n_pre, n_post);
        // Disconnect the last post-neuron completely
        pop.exc.column_mut(n_post - 1).fill(false);
        pop.inh.column_mut(n_post - 1).fill(false);
        let problem = pop.problem().with_non_negative(true).with_subthreshold_relaxation(0.1);
        let solved = run(&pop, &problem, &SolverParameters::default());

        prop_assert_eq!(solved.status, Ok(SolveStatus::Ok));
        prop_assert!(solved.exc.iter().chain(solved.inh.iter()).all(|&w| w >= 0.0));
        prop_assert!(solved.exc.column(n_post - 1).iter().all(|&w| w == 0.0));
        prop_assert!(solved.inh.column(n_post - 1).iter().all(|&w| w == 0.0));
        for i in 0..n_pre {
            for j in 0..n_post {
                if !pop.exc[[i, j]] {
                    prop_assert_eq!(solved.exc[[i, j]], 0.0);
                }
                if !pop.inh[[i, j]] {
                    prop_assert_eq!(solved.inh[[i, j]], 0.0);
                }
            }
        }
    }
}
