//! Observability for simulation execution.
//!
//! [`StepReporter`] receives callbacks at the key points of each outer
//! simulation step without polluting the driver logic. The default
//! [`NoOpReporter`] compiles to nothing; [`RecordingReporter`] captures
//! the anomaly events tests and diagnostics care about.

use crate::output::StepRecord;
use crate::ssa::selection::Selection;

/// Callback interface for per-step simulation events.
///
/// All methods have empty defaults; implement only the events you need.
/// Callbacks receive references; clone inside the callback if you need
/// to keep the data.
pub trait StepReporter {
    /// A representative state was selected for this step. Fired before
    /// the control is validated, so fallback selections are observable
    /// even when the run aborts immediately after.
    fn on_selection(&mut self, _step: usize, _selection: &Selection) {}

    /// The measurement update degenerated (all likelihoods underflowed);
    /// the filter recovered with uniform weights.
    fn on_degenerate_update(&mut self, _step: usize) {}

    /// The step finished and its telemetry record is complete.
    fn on_step_complete(&mut self, _record: &StepRecord) {}
}

/// Reporter that ignores every event.
#[derive(Debug, Clone, Default)]
pub struct NoOpReporter;

impl StepReporter for NoOpReporter {}

/// Reporter that records anomaly events and selection outcomes.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    /// Steps on which no particle was feasible
    pub fallback_steps: Vec<usize>,
    /// Steps on which the measurement update degenerated
    pub degenerate_steps: Vec<usize>,
    /// Selected particle index per step
    pub selected_indices: Vec<usize>,
}

impl RecordingReporter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepReporter for RecordingReporter {
    fn on_selection(&mut self, step: usize, selection: &Selection) {
        self.selected_indices.push(selection.index);
        if selection.fallback {
            self.fallback_steps.push(step);
        }
    }

    fn on_degenerate_update(&mut self, step: usize) {
        self.degenerate_steps.push(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    #[test]
    fn test_recording_reporter_captures_events() {
        let mut reporter = RecordingReporter::new();
        let selection = Selection {
            index: 3,
            state: DVector::zeros(2),
            control: DVector::zeros(2),
            cost: 0.0,
            max_violation_rate: 0.9,
            feasible: vec![false; 4],
            fallback: true,
        };
        reporter.on_selection(0, &selection);
        reporter.on_degenerate_update(5);

        assert_eq!(reporter.selected_indices, vec![3]);
        assert_eq!(reporter.fallback_steps, vec![0]);
        assert_eq!(reporter.degenerate_steps, vec![5]);
    }
}
