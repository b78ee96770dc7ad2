//! Bootstrap particle filter.
//!
//! A [`ParticleSet`] is the weighted population approximating the posterior
//! state density. The filter mutates it in place through the three stage
//! operations (time update, measurement update, resampling) or their
//! composition [`ParticleSet::propagate`].

use nalgebra::DVector;
use rand::Rng;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::common::linalg::gaussian_likelihood;
use crate::filter::errors::FilterError;
use crate::model::DynamicsModel;
use crate::noise::{GaussianNoise, NoiseModel};

/// Likelihood sums below this are treated as a degenerate measurement
/// update (all particles effectively incompatible with the observation).
pub const DEGENERATE_LIKELIHOOD_EPS: f64 = 1e-300;

/// Weighted particle population.
///
/// Invariants: `states.len() == weights.len()`, all states share one
/// dimension, weights are non-negative and sum to 1.
#[derive(Debug, Clone)]
pub struct ParticleSet {
    states: Vec<DVector<f64>>,
    weights: Vec<f64>,
}

/// Outcome of one full [`ParticleSet::propagate`] step.
#[derive(Debug, Clone, Copy)]
pub struct PropagateOutcome {
    /// The measurement update was degenerate; weights were reset to
    /// uniform and resampling was skipped for this step.
    pub degenerate: bool,
    /// Effective sample size after the measurement update, before
    /// resampling flattened the weights back to uniform. Equals L on a
    /// degenerate step (uniform recovery carries no information).
    pub effective_sample_size: f64,
}

impl ParticleSet {
    /// Build a population from explicit states with uniform weights.
    pub fn new(states: Vec<DVector<f64>>) -> Result<Self, FilterError> {
        if states.is_empty() {
            return Err(FilterError::Configuration {
                description: "particle population must be non-empty".to_string(),
            });
        }
        let dim = states[0].len();
        for s in &states {
            if s.len() != dim {
                return Err(FilterError::DimensionMismatch {
                    expected: dim,
                    actual: s.len(),
                    context: "particle state".to_string(),
                });
            }
        }
        let uniform = 1.0 / states.len() as f64;
        let weights = vec![uniform; states.len()];
        Ok(Self { states, weights })
    }

    /// Draw an initial population of `count` particles from a Gaussian
    /// prior.
    pub fn from_prior<R: Rng>(
        rng: &mut R,
        prior: &GaussianNoise,
        count: usize,
    ) -> Result<Self, FilterError> {
        if count == 0 {
            return Err(FilterError::Configuration {
                description: "particle count must be positive".to_string(),
            });
        }
        let states = (0..count).map(|_| prior.sample(rng)).collect();
        Self::new(states)
    }

    /// Number of particles L.
    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True when the population is empty (never holds for a constructed set).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State dimension n.
    #[inline]
    pub fn x_dim(&self) -> usize {
        self.states[0].len()
    }

    /// Particle states, read-only.
    #[inline]
    pub fn states(&self) -> &[DVector<f64>] {
        &self.states
    }

    /// Particle weights, read-only.
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Effective sample size `1 / Σ wᵢ²`, a weight-degeneracy diagnostic.
    pub fn effective_sample_size(&self) -> f64 {
        let sum_sq: f64 = self.weights.iter().map(|w| w * w).sum();
        if sum_sq > 0.0 {
            1.0 / sum_sq
        } else {
            0.0
        }
    }

    /// Weighted posterior mean estimate.
    pub fn weighted_mean(&self) -> DVector<f64> {
        let mut mean = DVector::zeros(self.x_dim());
        for (x, w) in self.states.iter().zip(self.weights.iter()) {
            mean += x * *w;
        }
        mean
    }

    /// Apply the transition to every particle with one explicit process
    /// noise draw per particle.
    ///
    /// Particle `i` of the output depends only on particle `i` and draw
    /// `i` of the input, so the update is order-independent and the outer
    /// loop runs in parallel under the `rayon` feature.
    pub fn time_update_with_draws<M: DynamicsModel>(
        &mut self,
        model: &M,
        control: &DVector<f64>,
        draws: &[DVector<f64>],
    ) -> Result<(), FilterError> {
        if draws.len() != self.len() {
            return Err(FilterError::DimensionMismatch {
                expected: self.len(),
                actual: draws.len(),
                context: "process noise draw count".to_string(),
            });
        }
        let dim = self.x_dim();
        let step = |(x, w): (&DVector<f64>, &DVector<f64>)| -> Result<DVector<f64>, FilterError> {
            let next = model.transition(x, control, w);
            if next.len() != dim {
                return Err(FilterError::DimensionMismatch {
                    expected: dim,
                    actual: next.len(),
                    context: "transition output".to_string(),
                });
            }
            Ok(next)
        };

        #[cfg(feature = "rayon")]
        let next: Result<Vec<_>, FilterError> =
            self.states.par_iter().zip(draws.par_iter()).map(step).collect();
        #[cfg(not(feature = "rayon"))]
        let next: Result<Vec<_>, FilterError> =
            self.states.iter().zip(draws.iter()).map(step).collect();

        self.states = next?;
        Ok(())
    }

    /// Time update: sample one independent process-noise draw per
    /// particle, then apply the transition to every particle.
    pub fn time_update<M: DynamicsModel, R: Rng>(
        &mut self,
        model: &M,
        control: &DVector<f64>,
        process: &GaussianNoise,
        rng: &mut R,
    ) -> Result<(), FilterError> {
        let draws: Vec<DVector<f64>> = (0..self.len()).map(|_| process.sample(rng)).collect();
        self.time_update_with_draws(model, control, &draws)
    }

    /// Measurement update: weight every particle by the Gaussian
    /// likelihood of the observation and renormalize.
    ///
    /// # Errors
    /// [`FilterError::DegenerateLikelihood`] when the likelihood sum
    /// falls below [`DEGENERATE_LIKELIHOOD_EPS`]; the weights are left
    /// unchanged so the caller can apply its recovery policy.
    pub fn measurement_update<M: DynamicsModel>(
        &mut self,
        model: &M,
        observation: &DVector<f64>,
        measurement: &GaussianNoise,
    ) -> Result<(), FilterError> {
        if observation.len() != measurement.dim() {
            return Err(FilterError::DimensionMismatch {
                expected: measurement.dim(),
                actual: observation.len(),
                context: "observation".to_string(),
            });
        }
        let zero_v = DVector::zeros(measurement.dim());
        let chol = measurement.cholesky();

        let mut updated = Vec::with_capacity(self.len());
        let mut sum = 0.0;
        for (x, w) in self.states.iter().zip(self.weights.iter()) {
            let predicted = model.measure(x, &zero_v);
            if predicted.len() != observation.len() {
                return Err(FilterError::DimensionMismatch {
                    expected: observation.len(),
                    actual: predicted.len(),
                    context: "measurement output".to_string(),
                });
            }
            let likelihood = gaussian_likelihood(&(observation - predicted), chol);
            let new_w = w * likelihood;
            sum += new_w;
            updated.push(new_w);
        }

        if !(sum > DEGENERATE_LIKELIHOOD_EPS) || !sum.is_finite() {
            return Err(FilterError::DegenerateLikelihood { sum });
        }
        for (w, new_w) in self.weights.iter_mut().zip(updated) {
            *w = new_w / sum;
        }
        Ok(())
    }

    /// Multinomial resampling via inverse-CDF lookup.
    ///
    /// One uniform draw per output slot selects the first particle whose
    /// cumulative weight reaches the draw. Draws are scaled by the actual
    /// cumulative total, so weight vectors that miss 1.0 by floating-point
    /// drift resample correctly. Output weights are uniform.
    pub fn resample<R: Rng>(&mut self, rng: &mut R) {
        let n = self.len();
        let mut cdf = Vec::with_capacity(n);
        let mut cumulative = 0.0;
        for w in &self.weights {
            cumulative += w;
            cdf.push(cumulative);
        }

        let total = cumulative;
        let new_states: Vec<DVector<f64>> = if total > 0.0 && total.is_finite() {
            (0..n)
                .map(|_| {
                    let u: f64 = rng.gen::<f64>() * total;
                    let idx = cdf.partition_point(|&c| c < u).min(n - 1);
                    self.states[idx].clone()
                })
                .collect()
        } else {
            // Unusable weight vector: keep the population as-is.
            self.states.clone()
        };

        self.states = new_states;
        let uniform = 1.0 / n as f64;
        for w in &mut self.weights {
            *w = uniform;
        }
    }

    /// Reset all weights to uniform 1/L.
    pub fn reset_weights(&mut self) {
        let uniform = 1.0 / self.len() as f64;
        for w in &mut self.weights {
            *w = uniform;
        }
    }

    /// One full filter step: time update, measurement update, resampling.
    ///
    /// A degenerate measurement update is recovered by resetting weights
    /// to uniform and skipping resampling for the step; the outcome flags
    /// it so callers and telemetry can see the anomaly. All other errors
    /// propagate.
    pub fn propagate<M: DynamicsModel, R: Rng>(
        &mut self,
        model: &M,
        control: &DVector<f64>,
        observation: &DVector<f64>,
        noise: &NoiseModel,
        rng: &mut R,
    ) -> Result<PropagateOutcome, FilterError> {
        self.time_update(model, control, &noise.process, rng)?;
        match self.measurement_update(model, observation, &noise.measurement) {
            Ok(()) => {
                let effective_sample_size = self.effective_sample_size();
                self.resample(rng);
                Ok(PropagateOutcome {
                    degenerate: false,
                    effective_sample_size,
                })
            }
            Err(FilterError::DegenerateLikelihood { .. }) => {
                self.reset_weights();
                Ok(PropagateOutcome {
                    degenerate: true,
                    effective_sample_size: self.len() as f64,
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SimpleRng;
    use crate::model::LinearModel;
    use nalgebra::DMatrix;

    fn small_cloud() -> ParticleSet {
        ParticleSet::new(vec![
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![1.0, -1.0]),
            DVector::from_vec(vec![2.0, 0.5]),
            DVector::from_vec(vec![-1.5, 3.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_uniform_weights() {
        let cloud = small_cloud();
        assert_eq!(cloud.len(), 4);
        assert!(cloud.weights().iter().all(|&w| (w - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_new_rejects_mixed_dimensions() {
        let err = ParticleSet::new(vec![DVector::zeros(2), DVector::zeros(3)]).unwrap_err();
        assert!(matches!(err, FilterError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_time_update_permutation_equivariance() {
        let model = LinearModel::planar_random_walk(100.0);
        let control = DVector::zeros(2);
        let draws = vec![
            DVector::from_vec(vec![0.1, 0.0]),
            DVector::from_vec(vec![-0.2, 0.3]),
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![0.5, -0.5]),
        ];

        let mut forward = small_cloud();
        forward
            .time_update_with_draws(&model, &control, &draws)
            .unwrap();

        // Reverse particles and their draws together: the outputs must be
        // the forward outputs under the same reversal.
        let mut reversed_states: Vec<_> = small_cloud().states().to_vec();
        reversed_states.reverse();
        let mut reversed = ParticleSet::new(reversed_states).unwrap();
        let mut reversed_draws = draws.clone();
        reversed_draws.reverse();
        reversed
            .time_update_with_draws(&model, &control, &reversed_draws)
            .unwrap();

        for i in 0..4 {
            assert_eq!(forward.states()[i], reversed.states()[3 - i]);
        }
    }

    #[test]
    fn test_time_update_rejects_wrong_draw_count() {
        let model = LinearModel::planar_random_walk(10.0);
        let mut cloud = small_cloud();
        let err = cloud
            .time_update_with_draws(&model, &DVector::zeros(2), &[DVector::zeros(2)])
            .unwrap_err();
        assert!(matches!(err, FilterError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_measurement_update_normalizes() {
        let model = LinearModel::planar_random_walk(10.0);
        let noise = GaussianNoise::isotropic(2, 0.5, "V").unwrap();
        let mut cloud = small_cloud();
        cloud
            .measurement_update(&model, &DVector::from_vec(vec![1.0, -1.0]), &noise)
            .unwrap();

        let sum: f64 = cloud.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        // The particle at the observation carries the largest weight.
        let best = cloud
            .weights()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(best, 1);
    }

    #[test]
    fn test_measurement_update_degenerate_leaves_weights() {
        let model = LinearModel::planar_random_walk(10.0);
        let noise = GaussianNoise::isotropic(2, 0.5, "V").unwrap();
        let mut cloud = small_cloud();
        let before = cloud.weights().to_vec();

        // 100 standard deviations away from every particle.
        let far = DVector::from_vec(vec![1000.0, 1000.0]);
        let err = cloud.measurement_update(&model, &far, &noise).unwrap_err();
        assert!(matches!(err, FilterError::DegenerateLikelihood { .. }));
        assert_eq!(cloud.weights(), before.as_slice());
        assert!(cloud.weights().iter().all(|w| w.is_finite()));
    }

    #[test]
    fn test_resample_copies_existing_states() {
        let mut cloud = small_cloud();
        let originals: Vec<_> = cloud.states().to_vec();
        let mut rng = SimpleRng::new(42);
        cloud.resample(&mut rng);

        assert_eq!(cloud.len(), 4);
        for s in cloud.states() {
            assert!(
                originals.iter().any(|o| o == s),
                "resampled state {:?} not in input population",
                s
            );
        }
        assert!(cloud.weights().iter().all(|&w| (w - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_resample_tolerates_unnormalized_weights() {
        let mut cloud = small_cloud();
        // Skew towards the last particle, deliberately not summing to 1.
        cloud.weights = vec![0.001, 0.001, 0.001, 2.0];
        let mut rng = SimpleRng::new(42);
        cloud.resample(&mut rng);

        let last = DVector::from_vec(vec![-1.5, 3.0]);
        let hits = cloud.states().iter().filter(|s| **s == last).count();
        assert!(hits >= 3, "dominant particle drawn only {} times", hits);
    }

    #[test]
    fn test_propagate_recovers_from_degenerate_update() {
        let model = LinearModel::planar_random_walk(10.0);
        let noise = NoiseModel::from_covariances(
            DMatrix::identity(2, 2) * 0.5,
            DMatrix::identity(2, 2) * 0.5,
        )
        .unwrap();
        let mut cloud = small_cloud();
        let mut rng = SimpleRng::new(42);

        let far = DVector::from_vec(vec![1000.0, 1000.0]);
        let outcome = cloud
            .propagate(&model, &DVector::zeros(2), &far, &noise, &mut rng)
            .unwrap();
        assert!(outcome.degenerate);
        assert!(cloud.weights().iter().all(|&w| (w - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_effective_sample_size() {
        let mut cloud = small_cloud();
        assert!((cloud.effective_sample_size() - 4.0).abs() < 1e-9);
        cloud.weights = vec![1.0, 0.0, 0.0, 0.0];
        assert!((cloud.effective_sample_size() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_mean() {
        let mut cloud = ParticleSet::new(vec![
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![2.0, 4.0]),
        ])
        .unwrap();
        cloud.weights = vec![0.75, 0.25];
        let mean = cloud.weighted_mean();
        assert!((mean[0] - 0.5).abs() < 1e-12);
        assert!((mean[1] - 1.0).abs() < 1e-12);
    }
}
