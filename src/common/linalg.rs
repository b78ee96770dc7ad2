//! Linear algebra utilities
//!
//! Gaussian likelihood evaluation and covariance checks shared by the
//! particle filter and the noise models.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

/// Compute the unnormalized Gaussian likelihood `exp(-1/2 rᵀ Σ⁻¹ r)`
/// of a residual under a zero-mean Gaussian with covariance factor `chol`.
///
/// The normalizing constant is deliberately omitted: particle weights are
/// renormalized across the population, so the constant cancels. Working
/// from the cached Cholesky factor avoids forming an explicit inverse.
///
/// # Arguments
/// * `residual` - Residual vector r
/// * `chol` - Cholesky decomposition of the covariance Σ
///
/// # Returns
/// Likelihood value in [0, 1]
pub fn gaussian_likelihood(residual: &DVector<f64>, chol: &Cholesky<f64, Dyn>) -> f64 {
    let solved = chol.solve(residual);
    let mahalanobis = residual.dot(&solved);
    (-0.5 * mahalanobis).exp()
}

/// Check if a matrix is symmetric positive-definite.
///
/// Symmetry is checked entrywise against a small tolerance, then
/// positive-definiteness via Cholesky.
///
/// # Arguments
/// * `matrix` - Matrix to check
///
/// # Returns
/// true if symmetric positive-definite
pub fn is_positive_definite(matrix: &DMatrix<f64>) -> bool {
    if !matrix.is_square() {
        return false;
    }
    let n = matrix.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            if (matrix[(i, j)] - matrix[(j, i)]).abs() > 1e-9 {
                return false;
            }
        }
    }
    matrix.clone().cholesky().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_likelihood_at_zero() {
        let sigma = DMatrix::identity(2, 2);
        let chol = sigma.cholesky().unwrap();
        let r = DVector::zeros(2);
        assert!((gaussian_likelihood(&r, &chol) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gaussian_likelihood_decreases_with_distance() {
        let sigma = DMatrix::identity(2, 2) * 0.5;
        let chol = sigma.cholesky().unwrap();
        let near = gaussian_likelihood(&DVector::from_vec(vec![0.1, 0.0]), &chol);
        let far = gaussian_likelihood(&DVector::from_vec(vec![2.0, 0.0]), &chol);
        assert!(near > far);
        assert!(far > 0.0);
    }

    #[test]
    fn test_gaussian_likelihood_underflows_far_out() {
        // ~100 standard deviations away: the exponent is far past f64's
        // subnormal range, so the likelihood collapses to exactly zero.
        let sigma = DMatrix::identity(1, 1) * 0.5;
        let chol = sigma.cholesky().unwrap();
        let r = DVector::from_vec(vec![100.0 * 0.5f64.sqrt()]);
        assert_eq!(gaussian_likelihood(&r, &chol), 0.0);
    }

    #[test]
    fn test_is_positive_definite() {
        assert!(is_positive_definite(&DMatrix::identity(3, 3)));
        assert!(!is_positive_definite(&(DMatrix::identity(3, 3) * -1.0)));

        // Asymmetric matrix with positive eigenvalues is still rejected
        let mut m = DMatrix::identity(2, 2);
        m[(0, 1)] = 0.5;
        assert!(!is_positive_definite(&m));
    }
}
