/*!
# Particle SSA - constraint-aware state selection

Rust implementation of a bootstrap particle filter combined with a State
Selection Algorithm (SSA): at every time step, a forward Monte Carlo
rollout over the particle population picks the single representative
state predicted to satisfy operational constraints while minimizing
accumulated cost.

## Features

- Bootstrap particle filter (time update, likelihood weighting,
  inverse-CDF resampling) with degenerate-update detection
- Two-stage rollout: deterministic prime trajectories per particle plus
  stochastic double-prime branches for risk and cost estimation
- Feasibility classification against a violation-rate threshold with a
  least-violation fallback when no particle qualifies
- Deterministic per-particle RNG streams: identical results sequential
  or parallel (`rayon` feature)

## Modules

- [`filter`] - Particle population and the three filter stages
- [`ssa`] - Rollout engine and feasibility-aware selection
- [`sim`] - Closed-loop simulation driver with held-out ground truth
- [`model`] - Plant interface and the linear reference plant
- [`noise`] - Validated Gaussian noise models
- [`common`] - Deterministic RNG and linear-algebra utilities

## Example

```rust,no_run
use nalgebra::{DMatrix, DVector};
use particle_ssa_rs::{
    run_simulation, GaussianNoise, LinearModel, NoiseModel, SimpleRng, SsaConfig,
};

let model = LinearModel::planar_random_walk(10.0);
let noise = NoiseModel::from_covariances(
    DMatrix::identity(2, 2) * 0.5,
    DMatrix::identity(2, 2) * 0.5,
).unwrap();
let config = SsaConfig::builder()
    .horizon(5)
    .branches(100)
    .particles(2000)
    .x_dim(2)
    .z_dim(2)
    .alpha(0.15)
    .build()
    .unwrap();
let prior = GaussianNoise::isotropic(2, 1.0, "prior").unwrap();

let mut rng = SimpleRng::new(42);
let output = run_simulation(
    &mut rng, &model, &noise, &config, &prior, &DVector::zeros(2), 20,
).unwrap();
println!("fallback steps: {}", output.fallback_count());
```
*/

/// Low-level utilities (deterministic RNG, linear algebra)
pub mod common;

/// Configuration types and bound sets
pub mod config;

/// Bootstrap particle filter
pub mod filter;

/// Plant dynamics/measurement interface and reference implementation
pub mod model;

/// Gaussian process/measurement noise models
pub mod noise;

/// Telemetry records for closed-loop runs
pub mod output;

/// Step-level observability callbacks
pub mod reporter;

/// Closed-loop simulation driver
pub mod sim;

/// State Selection Algorithm (rollout + selection)
pub mod ssa;

// Core types
pub use common::SimpleRng;
pub use config::{BoxConstraints, SsaConfig, SsaConfigBuilder};
pub use noise::{GaussianNoise, NoiseModel};

// Errors
pub use filter::errors::FilterError;

// Filter
pub use filter::particle::{ParticleSet, PropagateOutcome};

// Model interface
pub use model::{DynamicsModel, LinearModel};

// SSA
pub use ssa::rollout::{rollout, RolloutSummary};
pub use ssa::selection::{feasibility_mask, select_state, Selection};

// Simulation + telemetry
pub use output::{SimulationOutput, StepRecord};
pub use reporter::{NoOpReporter, RecordingReporter, StepReporter};
pub use sim::{run_simulation, run_simulation_with_reporter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
