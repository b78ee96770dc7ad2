//! Feasibility classification and representative-state selection.
//!
//! A particle is feasible when its branch-averaged violation rate stays
//! at or below the threshold α at every horizon step. Selection prefers
//! the cheapest feasible particle; when the feasible set is empty it
//! falls back to the least-violating particle and flags the outcome.

use nalgebra::DVector;

use crate::filter::particle::ParticleSet;
use crate::model::DynamicsModel;
use crate::ssa::rollout::RolloutSummary;

/// Selected representative state and its diagnostics.
///
/// `index` always refers into the original L-sized population, never
/// into a feasibility-filtered subset.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Index of the selected particle in the population
    pub index: usize,
    /// Selected state vector
    pub state: DVector<f64>,
    /// Nominal control derived from the selected state
    pub control: DVector<f64>,
    /// Expected total cost of the selected particle's rollout
    pub cost: f64,
    /// Largest per-step violation rate of the selected particle
    pub max_violation_rate: f64,
    /// Feasibility mask over the full population
    pub feasible: Vec<bool>,
    /// True when no particle was feasible and the least-violating
    /// particle was substituted
    pub fallback: bool,
}

/// Classify every particle against the violation threshold.
///
/// Feasible means `rate ≤ α` at **every** horizon step.
pub fn feasibility_mask(summary: &RolloutSummary, alpha: f64) -> Vec<bool> {
    summary
        .violation_rates
        .iter()
        .map(|rates| rates.iter().all(|&r| r <= alpha))
        .collect()
}

/// Select the representative state for the current population.
///
/// With at least one feasible particle: the feasible particle of minimum
/// expected cost, ties broken by the lowest population index. With none:
/// the particle minimizing the violation rate summed across the horizon,
/// reported with `fallback = true` so the caller can observe the distinct
/// code path.
pub fn select_state<M: DynamicsModel>(
    model: &M,
    particles: &ParticleSet,
    summary: &RolloutSummary,
    alpha: f64,
) -> Selection {
    let feasible = feasibility_mask(summary, alpha);

    let mut best: Option<usize> = None;
    for (i, ok) in feasible.iter().enumerate() {
        if *ok {
            // Strict comparison keeps the lowest index on ties.
            if best.map_or(true, |b| summary.costs[i] < summary.costs[b]) {
                best = Some(i);
            }
        }
    }

    let (index, fallback) = match best {
        Some(i) => (i, false),
        None => {
            let mut least = 0;
            let mut least_score = summary.summed_violation(0);
            for i in 1..summary.len() {
                let score = summary.summed_violation(i);
                if score < least_score {
                    least = i;
                    least_score = score;
                }
            }
            (least, true)
        }
    };

    let state = particles.states()[index].clone();
    let control = model.nominal_policy(&state);
    let max_violation_rate = summary.violation_rates[index]
        .iter()
        .cloned()
        .fold(0.0, f64::max);

    Selection {
        index,
        state,
        control,
        cost: summary.costs[index],
        max_violation_rate,
        feasible,
        fallback,
    }
}
