//! Error types for the filter and selection pipeline
//!
//! This module provides proper error handling instead of panics.

use std::fmt;

/// Errors that can occur during construction or filtering
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Invalid configuration parameter (non-positive counts, threshold
    /// out of range, inconsistent dimensions)
    Configuration {
        /// Description of the configuration issue
        description: String,
    },

    /// A covariance matrix is not symmetric positive-definite
    CovarianceNotPositiveDefinite {
        /// Description of which covariance failed
        context: String,
    },

    /// Dimension mismatch between declared and actual vector sizes
    DimensionMismatch {
        /// What was expected
        expected: usize,
        /// What was received
        actual: usize,
        /// Context (e.g., "transition output", "observation")
        context: String,
    },

    /// All measurement likelihoods underflowed to zero
    DegenerateLikelihood {
        /// Sum of the raw likelihoods before normalization
        sum: f64,
    },

    /// The control derived from the selected state is NaN or infinite
    NonFiniteControl {
        /// Simulation step at which the control became non-finite
        step: usize,
    },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::Configuration { description } => {
                write!(f, "Configuration error: {}", description)
            }
            FilterError::CovarianceNotPositiveDefinite { context } => {
                write!(f, "Covariance not symmetric positive-definite: {}", context)
            }
            FilterError::DimensionMismatch {
                expected,
                actual,
                context,
            } => {
                write!(
                    f,
                    "Dimension mismatch for {}: expected {}, got {}",
                    context, expected, actual
                )
            }
            FilterError::DegenerateLikelihood { sum } => {
                write!(
                    f,
                    "Degenerate measurement update: likelihood sum {:.3e} below threshold",
                    sum
                )
            }
            FilterError::NonFiniteControl { step } => {
                write!(f, "Non-finite control at simulation step {}", step)
            }
        }
    }
}

impl std::error::Error for FilterError {}
