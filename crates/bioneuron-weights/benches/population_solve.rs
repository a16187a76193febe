// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Population solve benchmarks
//!
//! Notes:
//! - Fixed seeds, no I/O.
//! - Scales the number of post-neurons to show the benefit of the worker pool.

use std::time::Duration;

use bioneuron_weights::{solve_weights, SolverParameters, WeightOutputs, WeightProblem};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Inputs {
    a_pre: Array2<f64>,
    j_post: Array2<f64>,
    model: Array2<f64>,
    exc: Array2<bool>,
    inh: Array2<bool>,
}

fn create_inputs(n_samples: usize, n_pre: usize, n_post: usize) -> Inputs {
    let mut rng = StdRng::seed_from_u64(42);
    let a_pre = Array2::from_shape_fn((n_samples, n_pre), |_| rng.gen_range(0.0..100.0));
    let j_post = Array2::from_shape_fn((n_samples, n_post), |_| rng.gen_range(-1.0..2.0));
    let model = Array2::from_shape_fn((n_post, 6), |(_, c)| [0.0, 1.0, -1.0, 1.0, 0.0, 0.0][c]);
    let exc = Array2::from_shape_fn((n_pre, n_post), |(i, _)| i % 4 != 0);
    let inh = Array2::from_shape_fn((n_pre, n_post), |(i, _)| i % 4 == 0);
    Inputs {
        a_pre,
        j_post,
        model,
        exc,
        inh,
    }
}

fn bench_population(c: &mut Criterion) {
    let mut group = c.benchmark_group("population_solve");
    group.sample_size(10);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(3));

    for &n_post in &[1usize, 8, 32] {
        let inputs = create_inputs(100, 40, n_post);
        group.throughput(Throughput::Elements(n_post as u64));

        for &(label, relax) in &[("plain", false), ("relaxed", true)] {
            group.bench_with_input(BenchmarkId::new(label, n_post), &n_post, |b, &n_post| {
                let mut w_exc = Array2::zeros((40, n_post));
                let mut w_inh = Array2::zeros((40, n_post));
                let mut problem = WeightProblem::new(
                    inputs.a_pre.view(),
                    inputs.j_post.view(),
                    inputs.model.view(),
                    inputs.exc.view(),
                    inputs.inh.view(),
                )
                .with_non_negative(true);
                if relax {
                    problem = problem.with_subthreshold_relaxation(0.0);
                }
                let params = SolverParameters {
                    tolerance: 1e-4,
                    ..SolverParameters::default()
                };
                b.iter(|| {
                    let outputs = WeightOutputs::new(w_exc.view_mut(), w_inh.view_mut());
                    black_box(solve_weights(&problem, outputs, &params))
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_population);
criterion_main!(benches);
