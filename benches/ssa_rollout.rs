//! Criterion benchmarks for the Monte Carlo rollout engine.
//!
//! Run with: cargo bench
//! Run one group: cargo bench -- rollout

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use nalgebra::{DMatrix, DVector};
use particle_ssa_rs::{
    rollout, select_state, GaussianNoise, LinearModel, NoiseModel, ParticleSet, SimpleRng,
    SsaConfig,
};

fn make_population(particles: usize) -> ParticleSet {
    let prior = GaussianNoise::isotropic(2, 0.5, "prior").unwrap();
    let mut rng = SimpleRng::new(42);
    ParticleSet::from_prior(&mut rng, &prior, particles).unwrap()
}

fn bench_rollout(c: &mut Criterion) {
    let model = LinearModel::planar_random_walk(10.0);
    let process = GaussianNoise::isotropic(2, 0.5, "W").unwrap();

    let mut group = c.benchmark_group("rollout");
    for &(particles, branches) in &[(200usize, 50usize), (500, 50), (500, 100), (2000, 100)] {
        let config = SsaConfig::new(5, branches, particles, 2, 2, 0.15).unwrap();
        let population = make_population(particles);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("L{}_M{}", particles, branches)),
            &(config, population),
            |b, (config, population)| {
                b.iter_batched(
                    || SimpleRng::new(7),
                    |mut rng| rollout(&mut rng, &model, population, &process, config).unwrap(),
                    BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

fn bench_selection_cycle(c: &mut Criterion) {
    // One full selection cycle: rollout plus feasibility and selection.
    let model = LinearModel::planar_random_walk(10.0);
    let process = GaussianNoise::isotropic(2, 0.5, "W").unwrap();
    let config = SsaConfig::new(5, 50, 500, 2, 2, 0.15).unwrap();
    let population = make_population(500);

    c.bench_function("selection_cycle_L500_M50", |b| {
        b.iter_batched(
            || SimpleRng::new(7),
            |mut rng| {
                let summary =
                    rollout(&mut rng, &model, &population, &process, &config).unwrap();
                select_state(&model, &population, &summary, config.alpha)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_filter_propagate(c: &mut Criterion) {
    let model = LinearModel::planar_random_walk(10.0);
    let noise = NoiseModel::from_covariances(
        DMatrix::identity(2, 2) * 0.5,
        DMatrix::identity(2, 2) * 0.5,
    )
    .unwrap();
    let population = make_population(2000);
    let observation = DVector::from_vec(vec![0.3, -0.2]);
    let control = DVector::zeros(2);

    c.bench_function("filter_propagate_L2000", |b| {
        b.iter_batched(
            || (population.clone(), SimpleRng::new(7)),
            |(mut cloud, mut rng)| {
                cloud
                    .propagate(&model, &control, &observation, &noise, &mut rng)
                    .unwrap()
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_rollout,
    bench_selection_cycle,
    bench_filter_propagate
);
criterion_main!(benches);
