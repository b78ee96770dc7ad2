//! Two-stage Monte Carlo rollout.
//!
//! For every particle the engine generates one deterministic prime
//! trajectory under the nominal policy, then estimates the constraint
//! risk and running cost of flying those controls by propagating M
//! stochastic branch trajectories seeded from the current population.
//!
//! The outer loop over particles is data-parallel; every particle draws
//! from its own derived RNG stream, so the sequential fallback and any
//! rayon thread count produce identical summaries.

use nalgebra::DVector;
use rand::{Rng, RngCore};
use smallvec::SmallVec;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::common::SimpleRng;
use crate::config::SsaConfig;
use crate::filter::errors::FilterError;
use crate::filter::particle::ParticleSet;
use crate::model::DynamicsModel;
use crate::noise::GaussianNoise;

/// Per-step violation rates for one particle. Horizons are short, so the
/// buffer lives inline.
pub type StepRates = SmallVec<[f64; 16]>;

/// Result of one rollout pass over the population.
#[derive(Debug, Clone)]
pub struct RolloutSummary {
    /// Per particle: branch-averaged violation rate at each of the
    /// N−1 horizon steps.
    pub violation_rates: Vec<StepRates>,
    /// Per particle: expected total running cost over the horizon.
    pub costs: Vec<f64>,
}

impl RolloutSummary {
    /// Number of particles covered by this summary.
    #[inline]
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    /// True when the summary covers no particles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Summed violation rate across the horizon for particle `i`,
    /// the fallback-selection score.
    pub fn summed_violation(&self, i: usize) -> f64 {
        self.violation_rates[i].iter().sum()
    }
}

/// Run the two-stage rollout for the current population.
///
/// Stage one builds, per particle, the prime trajectory: repeated
/// application of the nominal policy and the noise-free transition,
/// recording the N−1 controls along the way. Stage two seeds M branch
/// states per particle by uniform draws (with replacement) from the full
/// population and pushes them through the horizon under those recorded
/// controls, each branch receiving an independent process-noise draw at
/// every step. Violation indicators and running costs are averaged over
/// branches at each step; costs are then summed over the horizon.
///
/// # Errors
/// Dimension mismatches between the model outputs and the configured
/// dimensions, or a population that disagrees with `config`.
pub fn rollout<M: DynamicsModel, R: Rng>(
    rng: &mut R,
    model: &M,
    particles: &ParticleSet,
    process: &GaussianNoise,
    config: &SsaConfig,
) -> Result<RolloutSummary, FilterError> {
    if particles.len() != config.particles {
        return Err(FilterError::DimensionMismatch {
            expected: config.particles,
            actual: particles.len(),
            context: "rollout population size".to_string(),
        });
    }
    if particles.x_dim() != config.x_dim {
        return Err(FilterError::DimensionMismatch {
            expected: config.x_dim,
            actual: particles.x_dim(),
            context: "rollout state dimension".to_string(),
        });
    }

    let base_seed = rng.next_u64();
    let states = particles.states();

    let roll_one = |(i, x0): (usize, &DVector<f64>)| -> Result<(StepRates, f64), FilterError> {
        let mut stream = SimpleRng::stream(base_seed, i);
        let controls = prime_controls(model, x0, config, process.dim())?;

        // Branch seeds: uniform-with-replacement draws from the population.
        let mut branches: Vec<DVector<f64>> = (0..config.branches)
            .map(|_| states[stream.gen_range(0..states.len())].clone())
            .collect();

        let mut rates = StepRates::new();
        let mut total_cost = 0.0;
        let m = config.branches as f64;
        for u in &controls {
            let mut violations = 0usize;
            let mut step_cost = 0.0;
            for branch in branches.iter_mut() {
                let w = process.sample(&mut stream);
                let next = model.transition(branch, u, &w);
                if next.len() != config.x_dim {
                    return Err(FilterError::DimensionMismatch {
                        expected: config.x_dim,
                        actual: next.len(),
                        context: "branch transition output".to_string(),
                    });
                }
                step_cost += model.running_cost(&next, u);
                if model.violates_constraints(&next) {
                    violations += 1;
                }
                *branch = next;
            }
            rates.push(violations as f64 / m);
            total_cost += step_cost / m;
        }
        Ok((rates, total_cost))
    };

    #[cfg(feature = "rayon")]
    let per_particle: Result<Vec<(StepRates, f64)>, FilterError> =
        states.par_iter().enumerate().map(roll_one).collect();
    #[cfg(not(feature = "rayon"))]
    let per_particle: Result<Vec<(StepRates, f64)>, FilterError> =
        states.iter().enumerate().map(roll_one).collect();

    let (violation_rates, costs) = per_particle?.into_iter().unzip();
    Ok(RolloutSummary {
        violation_rates,
        costs,
    })
}

/// Generate the prime-trajectory controls for one particle: N−1 nominal
/// controls along the noise-free closed-loop rollout from `x0`.
fn prime_controls<M: DynamicsModel>(
    model: &M,
    x0: &DVector<f64>,
    config: &SsaConfig,
    noise_dim: usize,
) -> Result<Vec<DVector<f64>>, FilterError> {
    let zero_w = DVector::zeros(noise_dim);
    let mut x = x0.clone();
    let mut controls = Vec::with_capacity(config.rollout_steps());
    for _ in 0..config.rollout_steps() {
        let u = model.nominal_policy(&x);
        if u.len() != model.u_dim() {
            return Err(FilterError::DimensionMismatch {
                expected: model.u_dim(),
                actual: u.len(),
                context: "nominal policy output".to_string(),
            });
        }
        let next = model.transition(&x, &u, &zero_w);
        if next.len() != config.x_dim {
            return Err(FilterError::DimensionMismatch {
                expected: config.x_dim,
                actual: next.len(),
                context: "prime transition output".to_string(),
            });
        }
        controls.push(u);
        x = next;
    }
    Ok(controls)
}
