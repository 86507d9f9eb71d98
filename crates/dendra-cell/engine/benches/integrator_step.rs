// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Integrator Step Benchmarks
//!
//! Cost of one coupled step for both schemes, on the reference tree and on
//! bushier trees, to confirm the tree solve stays linear in compartment count.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dendra_cell_engine::{IntegrationScheme, Integrator};
use dendra_cell_neural::{
    build_compartments, BranchedTree, CellParameters, CurrentContribution, Tree,
};

fn tree_with_tips(tips_per_medial: usize) -> Tree {
    let pattern = BranchedTree {
        tips_per_medial,
        ..BranchedTree::default()
    };
    Tree::build(&pattern.to_spec()).unwrap()
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("integrator_step");

    for tips in [2usize, 20, 200] {
        let tree = tree_with_tips(tips);
        let cell = build_compartments(&tree, &CellParameters::default()).unwrap();
        group.throughput(Throughput::Elements(tree.len() as u64));

        for (scheme, dt) in [
            (IntegrationScheme::BackwardEuler, 0.1),
            (IntegrationScheme::ForwardEuler, 0.01),
        ] {
            group.bench_with_input(
                BenchmarkId::new(scheme.as_str(), tree.len()),
                &tree,
                |b, tree| {
                    let mut integrator = Integrator::new(tree, scheme, dt);
                    let mut state = cell.clone();
                    state[0].set_voltage(-60.0);
                    b.iter(|| {
                        integrator.step(black_box(&mut state)).unwrap();
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    c.bench_function("reference_run_100ms", |b| {
        b.iter(|| {
            let mut sim = dendra_cell_engine::Simulation::builder()
                .record("soma.v")
                .stimulus("soma", 200.0, 10.0, 90.0)
                .build()
                .unwrap();
            black_box(sim.run_for(100.0).unwrap())
        });
    });
}

criterion_group!(benches, bench_step, bench_full_run);
criterion_main!(benches);
