//! Telemetry records emitted by the simulation driver.
//!
//! Records are plain serializable data so downstream presentation layers
//! (plotting, logging, comparison against other implementations) can
//! consume them as JSON without depending on nalgebra types.

use nalgebra::DVector;
use serde::Serialize;

use crate::config::SsaConfig;

/// Telemetry for one outer simulation step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Outer step index
    pub step: usize,
    /// Index of the selected particle in the population
    pub selected_index: usize,
    /// Selected state vector
    pub selected_state: Vec<f64>,
    /// Control applied this step
    pub control: Vec<f64>,
    /// Expected rollout cost of the selected particle
    pub cost: f64,
    /// Largest per-step violation rate of the selected particle
    pub max_violation_rate: f64,
    /// Feasibility mask over the population
    pub feasible: Vec<bool>,
    /// True when the step used the no-feasible-state fallback
    pub fallback: bool,
    /// True when the measurement update degenerated this step
    pub degenerate_update: bool,
    /// Effective sample size after the measurement update, before
    /// resampling
    pub effective_sample_size: f64,
    /// Weighted posterior mean after the filter update
    pub estimate: Vec<f64>,
    /// Particle cloud snapshot at selection time
    pub particles: Vec<Vec<f64>>,
}

/// Full closed-loop run output.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutput {
    /// Configuration snapshot the run was produced under
    pub config: SsaConfig,
    /// Per-step telemetry
    pub records: Vec<StepRecord>,
    /// Held-out ground-truth trajectory (one entry per step, post-transition)
    pub truth: Vec<Vec<f64>>,
}

impl SimulationOutput {
    /// Number of completed steps.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no steps completed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Steps that used the no-feasible-state fallback.
    pub fn fallback_count(&self) -> usize {
        self.records.iter().filter(|r| r.fallback).count()
    }

    /// Steps whose measurement update degenerated.
    pub fn degenerate_count(&self) -> usize {
        self.records.iter().filter(|r| r.degenerate_update).count()
    }

    /// Mean over steps of the selected particle's worst violation rate.
    pub fn mean_max_violation_rate(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.records.iter().map(|r| r.max_violation_rate).sum();
        sum / self.records.len() as f64
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Flatten a nalgebra vector for serialization.
pub(crate) fn to_plain(v: &DVector<f64>) -> Vec<f64> {
    v.iter().copied().collect()
}
