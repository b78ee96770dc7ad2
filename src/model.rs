//! Plant dynamics, measurement, and nominal-policy interface.
//!
//! The filter and rollout engine treat the plant as a set of opaque pure
//! functions behind the [`DynamicsModel`] trait. A linear reference
//! implementation ships with the crate for demos and tests.

use nalgebra::{DMatrix, DVector};

use crate::config::BoxConstraints;
use crate::filter::errors::FilterError;

/// Plant interface consumed by the filter, rollout engine, and simulator.
///
/// All methods are pure with respect to the model: implementations hold
/// parameters only, never mutable state.
pub trait DynamicsModel: Sync {
    /// State dimension n.
    fn x_dim(&self) -> usize;

    /// Observation dimension m.
    fn z_dim(&self) -> usize;

    /// Control dimension.
    fn u_dim(&self) -> usize;

    /// State transition `f(x, u, w)` with an explicit process-noise sample.
    /// Pass a zero vector for a deterministic step.
    fn transition(&self, x: &DVector<f64>, u: &DVector<f64>, w: &DVector<f64>) -> DVector<f64>;

    /// Measurement `h(x, v)` with an explicit measurement-noise sample.
    fn measure(&self, x: &DVector<f64>, v: &DVector<f64>) -> DVector<f64>;

    /// Nominal feedback policy `K0(x)`.
    fn nominal_policy(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Incremental running cost of being at `x` under control `u`.
    fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64;

    /// Operational constraint check on a state.
    fn violates_constraints(&self, x: &DVector<f64>) -> bool;
}

/// Linear-Gaussian reference plant.
///
/// Dynamics `x' = A·x + B·u + w`, measurement `z = C·x + v`, nominal
/// policy `u = −K·x`, quadratic running cost `xᵀ diag(q) x`, and box
/// state constraints.
#[derive(Debug, Clone)]
pub struct LinearModel {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    c: DMatrix<f64>,
    gain: DMatrix<f64>,
    cost_weights: DVector<f64>,
    bounds: BoxConstraints,
}

impl LinearModel {
    /// Assemble a linear plant, checking matrix dimensions for agreement.
    pub fn new(
        a: DMatrix<f64>,
        b: DMatrix<f64>,
        c: DMatrix<f64>,
        gain: DMatrix<f64>,
        cost_weights: DVector<f64>,
        bounds: BoxConstraints,
    ) -> Result<Self, FilterError> {
        let n = a.nrows();
        let checks: [(usize, usize, &str); 6] = [
            (a.ncols(), n, "transition matrix A columns"),
            (b.nrows(), n, "input matrix B rows"),
            (c.ncols(), n, "observation matrix C columns"),
            (gain.ncols(), n, "feedback gain K columns"),
            (gain.nrows(), b.ncols(), "feedback gain K rows"),
            (cost_weights.len(), n, "cost weight length"),
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
        if bounds.dim() != n {
            return Err(FilterError::DimensionMismatch {
                expected: n,
                actual: bounds.dim(),
                context: "state bound dimension".to_string(),
            });
        }
        Ok(Self {
            a,
            b,
            c,
            gain,
            cost_weights,
            bounds,
        })
    }

    /// Planar random walk with identity measurement and zero nominal
    /// control: `x' = x + w`, `z = x + v`, cost `‖x‖²`, states bounded
    /// to `[-half_width, half_width]²`.
    pub fn planar_random_walk(half_width: f64) -> Self {
        Self::new(
            DMatrix::identity(2, 2),
            DMatrix::identity(2, 2),
            DMatrix::identity(2, 2),
            DMatrix::zeros(2, 2),
            DVector::from_element(2, 1.0),
            BoxConstraints::centered(2, half_width).expect("symmetric bounds"),
        )
        .expect("fixed dimensions agree")
    }

    /// Planar double integrator with position measurement and a fixed
    /// stabilizing feedback gain. State `[x, y, vx, vy]`, control is a
    /// 2D acceleration.
    pub fn planar_double_integrator(dt: f64, position_half_width: f64) -> Self {
        #[rustfmt::skip]
        let a = DMatrix::from_row_slice(4, 4, &[
            1.0, 0.0, dt,  0.0,
            0.0, 1.0, 0.0, dt,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]);
        #[rustfmt::skip]
        let b = DMatrix::from_row_slice(4, 2, &[
            0.5 * dt * dt, 0.0,
            0.0,           0.5 * dt * dt,
            dt,            0.0,
            0.0,           dt,
        ]);
        #[rustfmt::skip]
        let c = DMatrix::from_row_slice(2, 4, &[
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        ]);
        // Position + velocity feedback, comfortably inside the stability
        // region for the dt values used in the demos.
        #[rustfmt::skip]
        let gain = DMatrix::from_row_slice(2, 4, &[
            0.4, 0.0, 0.8, 0.0,
            0.0, 0.4, 0.0, 0.8,
        ]);
        let cost_weights = DVector::from_vec(vec![1.0, 1.0, 0.1, 0.1]);
        let bounds = BoxConstraints::new(
            DVector::from_vec(vec![
                -position_half_width,
                -position_half_width,
                f64::NEG_INFINITY,
                f64::NEG_INFINITY,
            ]),
            DVector::from_vec(vec![
                position_half_width,
                position_half_width,
                f64::INFINITY,
                f64::INFINITY,
            ]),
        )
        .expect("ordered bounds");
        Self::new(a, b, c, gain, cost_weights, bounds).expect("fixed dimensions agree")
    }

    /// State bounds of this plant.
    pub fn bounds(&self) -> &BoxConstraints {
        &self.bounds
    }
}

impl DynamicsModel for LinearModel {
    fn x_dim(&self) -> usize {
        self.a.nrows()
    }

    fn z_dim(&self) -> usize {
        self.c.nrows()
    }

    fn u_dim(&self) -> usize {
        self.b.ncols()
    }

    fn transition(&self, x: &DVector<f64>, u: &DVector<f64>, w: &DVector<f64>) -> DVector<f64> {
        &self.a * x + &self.b * u + w
    }

    fn measure(&self, x: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        &self.c * x + v
    }

    fn nominal_policy(&self, x: &DVector<f64>) -> DVector<f64> {
        -&self.gain * x
    }

    fn running_cost(&self, x: &DVector<f64>, _u: &DVector<f64>) -> f64 {
        x.iter()
            .zip(self.cost_weights.iter())
            .map(|(xi, qi)| qi * xi * xi)
            .sum()
    }

    fn violates_constraints(&self, x: &DVector<f64>) -> bool {
        self.bounds.violates(x)
    }
}
