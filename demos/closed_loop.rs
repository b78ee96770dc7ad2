//! Closed-loop state selection demo.
//!
//! Runs the bootstrap particle filter with Monte Carlo rollout selection
//! on one of the reference plants and prints per-run statistics.

use clap::Parser;
use nalgebra::{DMatrix, DVector};
use particle_ssa_rs::{
    run_simulation_with_reporter, GaussianNoise, LinearModel, NoiseModel, RecordingReporter,
    SimpleRng, SsaConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Random seed for deterministic runs
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Number of particles L
    #[arg(short = 'l', long, default_value_t = 500)]
    particles: usize,

    /// Monte Carlo branches M per particle
    #[arg(short = 'm', long, default_value_t = 50)]
    branches: usize,

    /// Rollout horizon N
    #[arg(short = 'n', long, default_value_t = 5)]
    horizon: usize,

    /// Violation-rate threshold
    #[arg(short, long, default_value_t = 0.15)]
    alpha: f64,

    /// Number of closed-loop steps
    #[arg(short = 't', long, default_value_t = 20)]
    steps: usize,

    /// Process/measurement noise variance
    #[arg(long, default_value_t = 0.5)]
    noise_variance: f64,

    /// Half-width of the state constraint box
    #[arg(long, default_value_t = 10.0)]
    half_width: f64,

    /// Use the controlled double-integrator plant instead of the
    /// random walk
    #[arg(long)]
    double_integrator: bool,

    /// Dump the full telemetry as JSON instead of the summary
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let (model, x_dim, z_dim, truth0) = if args.double_integrator {
        (
            LinearModel::planar_double_integrator(0.1, args.half_width),
            4,
            2,
            DVector::from_vec(vec![2.0, -2.0, 0.0, 0.0]),
        )
    } else {
        (
            LinearModel::planar_random_walk(args.half_width),
            2,
            2,
            DVector::zeros(2),
        )
    };

    let noise = NoiseModel::from_covariances(
        DMatrix::identity(x_dim, x_dim) * args.noise_variance,
        DMatrix::identity(z_dim, z_dim) * args.noise_variance,
    )
    .unwrap_or_else(|e| {
        eprintln!("Invalid noise model: {}", e);
        std::process::exit(1);
    });

    let config = SsaConfig::builder()
        .horizon(args.horizon)
        .branches(args.branches)
        .particles(args.particles)
        .x_dim(x_dim)
        .z_dim(z_dim)
        .alpha(args.alpha)
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        });

    let prior = GaussianNoise::new(
        truth0.clone(),
        DMatrix::identity(x_dim, x_dim) * args.noise_variance,
        "prior",
    )
    .expect("prior covariance is positive-definite");

    if !args.json {
        println!("Closed-Loop State Selection Demo");
        println!("================================");
        println!("Seed: {}", args.seed);
        println!(
            "Plant: {}",
            if args.double_integrator {
                "double integrator"
            } else {
                "random walk"
            }
        );
        println!(
            "L={} M={} N={} alpha={}",
            args.particles, args.branches, args.horizon, args.alpha
        );
        println!();
    }

    let mut rng = SimpleRng::new(args.seed);
    let mut reporter = RecordingReporter::new();
    let start = std::time::Instant::now();

    let output = run_simulation_with_reporter(
        &mut rng,
        &model,
        &noise,
        &config,
        &prior,
        &truth0,
        args.steps,
        &mut reporter,
    )
    .unwrap_or_else(|e| {
        eprintln!("Simulation aborted: {}", e);
        std::process::exit(1);
    });

    if args.json {
        println!("{}", output.to_json_pretty());
        return;
    }

    let elapsed = start.elapsed();
    println!("Completed {} steps in {:.2}s", output.len(), elapsed.as_secs_f64());
    println!();
    println!("Results:");
    println!("  Fallback steps: {}", output.fallback_count());
    println!("  Degenerate updates: {}", output.degenerate_count());
    println!(
        "  Mean max violation rate: {:.4}",
        output.mean_max_violation_rate()
    );

    let rmse: f64 = {
        let sum: f64 = output
            .records
            .iter()
            .zip(output.truth.iter())
            .map(|(r, t)| {
                r.estimate
                    .iter()
                    .zip(t.iter())
                    .map(|(e, x)| (e - x) * (e - x))
                    .sum::<f64>()
            })
            .sum();
        (sum / output.len() as f64).sqrt()
    };
    println!("  Estimate RMSE vs truth: {:.4}", rmse);

    println!();
    println!("First steps:");
    for record in output.records.iter().take(5) {
        println!(
            "  t={:3}: selected #{:<4} cost={:8.3} max_rate={:.3}{}",
            record.step,
            record.selected_index,
            record.cost,
            record.max_violation_rate,
            if record.fallback { "  [fallback]" } else { "" }
        );
    }
}
