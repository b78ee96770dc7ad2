//! Configuration types for the state selection pipeline.
//!
//! [`SsaConfig`] carries the sampling dimensions (particle count, rollout
//! horizon, branch count) and the violation threshold. It is validated at
//! construction and immutable afterwards.

use nalgebra::DVector;
use serde::Serialize;

use crate::filter::errors::FilterError;

/// Axis-aligned bound set used for constraint checks.
///
/// A vector violates the bounds when any component falls outside its
/// `[lower, upper]` interval.
#[derive(Debug, Clone)]
pub struct BoxConstraints {
    lower: DVector<f64>,
    upper: DVector<f64>,
}

impl BoxConstraints {
    /// Create a bound set from lower/upper corner vectors.
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> Result<Self, FilterError> {
        if lower.len() != upper.len() {
            return Err(FilterError::DimensionMismatch {
                expected: lower.len(),
                actual: upper.len(),
                context: "box constraint bounds".to_string(),
            });
        }
        if lower.iter().zip(upper.iter()).any(|(l, u)| l > u) {
            return Err(FilterError::Configuration {
                description: "box constraint lower bound exceeds upper bound".to_string(),
            });
        }
        Ok(Self { lower, upper })
    }

    /// Symmetric hypercube `[-half_width, half_width]^dim`.
    pub fn centered(dim: usize, half_width: f64) -> Result<Self, FilterError> {
        Self::new(
            DVector::from_element(dim, -half_width),
            DVector::from_element(dim, half_width),
        )
    }

    /// Dimension of the bounded vectors.
    #[inline]
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// True when any component of `x` is outside its interval.
    pub fn violates(&self, x: &DVector<f64>) -> bool {
        x.iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .any(|(xi, (l, u))| xi < l || xi > u)
    }
}

/// Immutable parameters of the state selection algorithm.
#[derive(Debug, Clone, Serialize)]
pub struct SsaConfig {
    /// Rollout horizon length N (states per prime trajectory)
    pub horizon: usize,
    /// Monte Carlo branch count M per particle
    pub branches: usize,
    /// Particle count L
    pub particles: usize,
    /// State dimension n
    pub x_dim: usize,
    /// Observation dimension m
    pub z_dim: usize,
    /// Violation-rate threshold α
    pub alpha: f64,
}

impl SsaConfig {
    /// Validate and build a configuration.
    ///
    /// # Errors
    /// [`FilterError::Configuration`] for non-positive counts or
    /// dimensions, a horizon shorter than 2, or α outside [0, 1].
    pub fn new(
        horizon: usize,
        branches: usize,
        particles: usize,
        x_dim: usize,
        z_dim: usize,
        alpha: f64,
    ) -> Result<Self, FilterError> {
        if horizon < 2 {
            return Err(FilterError::Configuration {
                description: format!("horizon must be at least 2, got {}", horizon),
            });
        }
        if branches == 0 || particles == 0 {
            return Err(FilterError::Configuration {
                description: "branch and particle counts must be positive".to_string(),
            });
        }
        if x_dim == 0 || z_dim == 0 {
            return Err(FilterError::Configuration {
                description: "state and observation dimensions must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&alpha) || alpha.is_nan() {
            return Err(FilterError::Configuration {
                description: format!("violation threshold must lie in [0, 1], got {}", alpha),
            });
        }
        Ok(Self {
            horizon,
            branches,
            particles,
            x_dim,
            z_dim,
            alpha,
        })
    }

    /// Create a builder.
    pub fn builder() -> SsaConfigBuilder {
        SsaConfigBuilder::default()
    }

    /// Number of propagation steps per rollout (N − 1).
    #[inline]
    pub fn rollout_steps(&self) -> usize {
        self.horizon - 1
    }
}

/// Builder for [`SsaConfig`].
#[derive(Debug, Default)]
pub struct SsaConfigBuilder {
    horizon: Option<usize>,
    branches: Option<usize>,
    particles: Option<usize>,
    x_dim: Option<usize>,
    z_dim: Option<usize>,
    alpha: Option<f64>,
}

impl SsaConfigBuilder {
    /// Set the rollout horizon N.
    pub fn horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Set the Monte Carlo branch count M.
    pub fn branches(mut self, branches: usize) -> Self {
        self.branches = Some(branches);
        self
    }

    /// Set the particle count L.
    pub fn particles(mut self, particles: usize) -> Self {
        self.particles = Some(particles);
        self
    }

    /// Set the state dimension n.
    pub fn x_dim(mut self, x_dim: usize) -> Self {
        self.x_dim = Some(x_dim);
        self
    }

    /// Set the observation dimension m.
    pub fn z_dim(mut self, z_dim: usize) -> Self {
        self.z_dim = Some(z_dim);
        self
    }

    /// Set the violation-rate threshold α.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<SsaConfig, FilterError> {
        let missing = |field: &str| FilterError::Configuration {
            description: format!("{} is required", field),
        };
        SsaConfig::new(
            self.horizon.ok_or_else(|| missing("horizon"))?,
            self.branches.ok_or_else(|| missing("branches"))?,
            self.particles.ok_or_else(|| missing("particles"))?,
            self.x_dim.ok_or_else(|| missing("x_dim"))?,
            self.z_dim.ok_or_else(|| missing("z_dim"))?,
            self.alpha.unwrap_or(0.0),
        )
    }
}
