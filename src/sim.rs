//! Closed-loop simulation driver.
//!
//! Runs the full interaction for T outer steps: rollout and selection on
//! the current population, control extraction, held-out ground-truth
//! propagation, measurement, and filter propagation. The ground-truth
//! trajectory is a single separately simulated state, never part of the
//! particle population.

use nalgebra::DVector;
use rand::Rng;

use crate::config::SsaConfig;
use crate::filter::errors::FilterError;
use crate::filter::particle::ParticleSet;
use crate::model::DynamicsModel;
use crate::noise::{GaussianNoise, NoiseModel};
use crate::output::{to_plain, SimulationOutput, StepRecord};
use crate::reporter::{NoOpReporter, StepReporter};
use crate::ssa::rollout::rollout;
use crate::ssa::selection::select_state;

/// Run a closed-loop simulation with the default (silent) reporter.
///
/// See [`run_simulation_with_reporter`].
#[allow(clippy::too_many_arguments)]
pub fn run_simulation<M: DynamicsModel, R: Rng>(
    rng: &mut R,
    model: &M,
    noise: &NoiseModel,
    config: &SsaConfig,
    prior: &GaussianNoise,
    truth0: &DVector<f64>,
    steps: usize,
) -> Result<SimulationOutput, FilterError> {
    run_simulation_with_reporter(
        rng,
        model,
        noise,
        config,
        prior,
        truth0,
        steps,
        &mut NoOpReporter,
    )
}

/// Run a closed-loop simulation for `steps` outer steps.
///
/// Per step, in fixed order: rollout over the current population,
/// selection, control validation, true-system transition with fresh
/// process noise, measurement with fresh measurement noise, filter
/// propagation, telemetry emission. Each stage consumes the fully
/// materialized output of the previous one.
///
/// # Errors
/// - Construction-style dimension mismatches between model, noise,
///   prior, and configuration are reported before the first step.
/// - [`FilterError::NonFiniteControl`] aborts the run at the offending
///   step; continuing would push NaNs through the filter.
#[allow(clippy::too_many_arguments)]
pub fn run_simulation_with_reporter<M: DynamicsModel, R: Rng, Rep: StepReporter>(
    rng: &mut R,
    model: &M,
    noise: &NoiseModel,
    config: &SsaConfig,
    prior: &GaussianNoise,
    truth0: &DVector<f64>,
    steps: usize,
    reporter: &mut Rep,
) -> Result<SimulationOutput, FilterError> {
    check_dims(model, noise, config, prior, truth0)?;

    let mut particles = ParticleSet::from_prior(rng, prior, config.particles)?;
    let mut truth = truth0.clone();

    let mut records = Vec::with_capacity(steps);
    let mut truth_trajectory = Vec::with_capacity(steps);

    for step in 0..steps {
        let summary = rollout(rng, model, &particles, &noise.process, config)?;
        let selection = select_state(model, &particles, &summary, config.alpha);
        reporter.on_selection(step, &selection);

        if !selection.control.iter().all(|c| c.is_finite()) {
            return Err(FilterError::NonFiniteControl { step });
        }

        let cloud_snapshot: Vec<Vec<f64>> = particles.states().iter().map(to_plain).collect();

        let w = noise.process.sample(rng);
        truth = model.transition(&truth, &selection.control, &w);
        let v = noise.measurement.sample(rng);
        let observation = model.measure(&truth, &v);
        if observation.len() != config.z_dim {
            return Err(FilterError::DimensionMismatch {
                expected: config.z_dim,
                actual: observation.len(),
                context: "measurement output".to_string(),
            });
        }

        let outcome = particles.propagate(model, &selection.control, &observation, noise, rng)?;
        if outcome.degenerate {
            reporter.on_degenerate_update(step);
        }

        let record = StepRecord {
            step,
            selected_index: selection.index,
            selected_state: to_plain(&selection.state),
            control: to_plain(&selection.control),
            cost: selection.cost,
            max_violation_rate: selection.max_violation_rate,
            feasible: selection.feasible.clone(),
            fallback: selection.fallback,
            degenerate_update: outcome.degenerate,
            effective_sample_size: outcome.effective_sample_size,
            estimate: to_plain(&particles.weighted_mean()),
            particles: cloud_snapshot,
        };
        reporter.on_step_complete(&record);
        records.push(record);
        truth_trajectory.push(to_plain(&truth));
    }

    Ok(SimulationOutput {
        config: config.clone(),
        records,
        truth: truth_trajectory,
    })
}

fn check_dims<M: DynamicsModel>(
    model: &M,
    noise: &NoiseModel,
    config: &SsaConfig,
    prior: &GaussianNoise,
    truth0: &DVector<f64>,
) -> Result<(), FilterError> {
    let checks: [(usize, usize, &str); 4] = [
        (model.x_dim(), config.x_dim, "model state dimension"),
        (model.z_dim(), config.z_dim, "model observation dimension"),
        (prior.dim(), config.x_dim, "prior dimension"),
        (truth0.len(), config.x_dim, "initial truth state"),
    ];
    for (actual, expected, context) in checks {
        if actual != expected {
            return Err(FilterError::DimensionMismatch {
                expected,
                actual,
                context: context.to_string(),
            });
        }
    }
    if noise.measurement.dim() != config.z_dim {
        return Err(FilterError::DimensionMismatch {
            expected: config.z_dim,
            actual: noise.measurement.dim(),
            context: "measurement noise dimension".to_string(),
        });
    }
    Ok(())
}
