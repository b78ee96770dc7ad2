//! Gaussian noise models for process and measurement disturbances.
//!
//! A [`GaussianNoise`] validates its covariance at construction and caches
//! the Cholesky factor, so sampling is `mean + L·z` with `z` standard
//! normal and likelihood evaluation never forms an explicit inverse.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::common::linalg::is_positive_definite;
use crate::filter::errors::FilterError;

/// A multivariate Gaussian disturbance source.
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    mean: DVector<f64>,
    covariance: DMatrix<f64>,
    chol: Cholesky<f64, Dyn>,
}

impl GaussianNoise {
    /// Create a noise model from a mean and covariance.
    ///
    /// # Arguments
    /// * `mean` - Mean vector
    /// * `covariance` - Covariance matrix, must be symmetric positive-definite
    /// * `context` - Name used in error messages (e.g. "process noise W")
    ///
    /// # Errors
    /// Returns [`FilterError::CovarianceNotPositiveDefinite`] when the
    /// covariance is not SPD, or a dimension mismatch when mean and
    /// covariance disagree.
    pub fn new(
        mean: DVector<f64>,
        covariance: DMatrix<f64>,
        context: &str,
    ) -> Result<Self, FilterError> {
        if covariance.nrows() != mean.len() || covariance.ncols() != mean.len() {
            return Err(FilterError::DimensionMismatch {
                expected: mean.len(),
                actual: covariance.nrows(),
                context: format!("{} covariance", context),
            });
        }
        if !is_positive_definite(&covariance) {
            return Err(FilterError::CovarianceNotPositiveDefinite {
                context: context.to_string(),
            });
        }
        let chol = covariance
            .clone()
            .cholesky()
            .expect("checked positive-definite above");
        Ok(Self {
            mean,
            covariance,
            chol,
        })
    }

    /// Zero-mean convenience constructor.
    pub fn zero_mean(covariance: DMatrix<f64>, context: &str) -> Result<Self, FilterError> {
        let dim = covariance.nrows();
        Self::new(DVector::zeros(dim), covariance, context)
    }

    /// Isotropic zero-mean noise `variance · I`.
    pub fn isotropic(dim: usize, variance: f64, context: &str) -> Result<Self, FilterError> {
        Self::zero_mean(DMatrix::identity(dim, dim) * variance, context)
    }

    /// Dimension of the noise vector.
    #[inline]
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Mean vector.
    #[inline]
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Covariance matrix.
    #[inline]
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Cached Cholesky factorization of the covariance.
    #[inline]
    pub fn cholesky(&self) -> &Cholesky<f64, Dyn> {
        &self.chol
    }

    /// Draw one sample: `mean + L·z` with `z ~ N(0, I)`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> DVector<f64> {
        let z = DVector::from_fn(self.dim(), |_, _| rng.sample(StandardNormal));
        &self.mean + self.chol.l() * z
    }
}

/// Process and measurement noise paired for one plant.
#[derive(Debug, Clone)]
pub struct NoiseModel {
    /// Process noise (dimension n)
    pub process: GaussianNoise,
    /// Measurement noise (dimension m)
    pub measurement: GaussianNoise,
}

impl NoiseModel {
    /// Zero-mean noise from the two covariances W and V.
    pub fn from_covariances(w: DMatrix<f64>, v: DMatrix<f64>) -> Result<Self, FilterError> {
        Ok(Self {
            process: GaussianNoise::zero_mean(w, "process noise W")?,
            measurement: GaussianNoise::zero_mean(v, "measurement noise V")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SimpleRng;

    #[test]
    fn test_rejects_non_spd_covariance() {
        let bad = DMatrix::identity(2, 2) * -1.0;
        let err = GaussianNoise::zero_mean(bad, "process noise W").unwrap_err();
        assert!(matches!(
            err,
            FilterError::CovarianceNotPositiveDefinite { .. }
        ));
    }

    #[test]
    fn test_rejects_asymmetric_covariance() {
        let mut cov = DMatrix::identity(2, 2);
        cov[(0, 1)] = 0.9;
        assert!(GaussianNoise::zero_mean(cov, "V").is_err());
    }

    #[test]
    fn test_rejects_mismatched_mean() {
        let err = GaussianNoise::new(DVector::zeros(3), DMatrix::identity(2, 2), "W").unwrap_err();
        assert!(matches!(err, FilterError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_accessors() {
        let mean = DVector::from_vec(vec![1.0, -1.0]);
        let cov = DMatrix::identity(2, 2) * 0.25;
        let noise = GaussianNoise::new(mean.clone(), cov.clone(), "W").unwrap();
        assert_eq!(noise.dim(), 2);
        assert_eq!(noise.mean(), &mean);
        assert_eq!(noise.covariance(), &cov);
    }

    #[test]
    fn test_sample_statistics() {
        let noise = GaussianNoise::isotropic(2, 0.25, "W").unwrap();
        let mut rng = SimpleRng::new(42);
        let n = 20_000;
        let mut sum = DVector::zeros(2);
        let mut sum_sq = DVector::zeros(2);
        for _ in 0..n {
            let s = noise.sample(&mut rng);
            sum_sq += s.component_mul(&s);
            sum += s;
        }
        let mean = sum / n as f64;
        let var = sum_sq / n as f64;
        assert!(mean[0].abs() < 0.02 && mean[1].abs() < 0.02);
        assert!((var[0] - 0.25).abs() < 0.02 && (var[1] - 0.25).abs() < 0.02);
    }

    #[test]
    fn test_sample_deterministic_per_seed() {
        let noise = GaussianNoise::isotropic(3, 1.0, "W").unwrap();
        let a = noise.sample(&mut SimpleRng::new(9));
        let b = noise.sample(&mut SimpleRng::new(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_correlated_sampling_uses_full_covariance() {
        // Strongly correlated 2D noise: samples should show the correlation.
        let mut cov = DMatrix::identity(2, 2);
        cov[(0, 1)] = 0.95;
        cov[(1, 0)] = 0.95;
        let noise = GaussianNoise::zero_mean(cov, "W").unwrap();
        let mut rng = SimpleRng::new(7);
        let n = 10_000;
        let mut cross = 0.0;
        for _ in 0..n {
            let s = noise.sample(&mut rng);
            cross += s[0] * s[1];
        }
        assert!((cross / n as f64 - 0.95).abs() < 0.05);
    }
}
