//! Weighted normal equations of the calibration problem.
//!
//! For `P` parameters and `n` realisations, with residual
//! `e_i = target_i - f_i`, weight `w_i = 1 / uncertainty_i²` and Jacobian
//! columns `J_k` (the gradient with respect to parameter `k`):
//!
//! ```text
//! A_kl = (1/n) Σ_i w_i J_k,i J_l,i
//! g_k  = (1/n) Σ_i w_i J_k,i e_i
//! ```
//!
//! The big dimension `n` is collapsed by one pass over the realisations,
//! split across the rayon pool with a fold/reduce when the `parallel`
//! feature is enabled.

use aad_core::math::linalg::solve_cholesky_scaled;
use aad_core::types::{AadError, VectorValue};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "parallel")]
use aad_core::types::PARALLEL_THRESHOLD;

use crate::error::SolverError;

/// Reduced `P × P` system `A Δ = g`, symmetric.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalEquations {
    matrix: Vec<Vec<f64>>,
    rhs: Vec<f64>,
}

/// Per-thread partial sums over realisations.
#[derive(Debug, Clone)]
struct Accumulator {
    dimension: usize,
    matrix: Vec<f64>,
    rhs: Vec<f64>,
}

impl Accumulator {
    fn new(dimension: usize) -> Self {
        Self {
            dimension,
            matrix: vec![0.0; dimension * dimension],
            rhs: vec![0.0; dimension],
        }
    }

    /// Add realisation `i`; only the lower triangle is accumulated.
    #[inline]
    fn add(
        &mut self,
        columns: &[VectorValue],
        weights: &VectorValue,
        residual: &VectorValue,
        i: usize,
    ) {
        let w = weights.get(i);
        let e = residual.get(i);
        for k in 0..self.dimension {
            let wk = w * columns[k].get(i);
            self.rhs[k] += wk * e;
            for l in 0..=k {
                self.matrix[k * self.dimension + l] += wk * columns[l].get(i);
            }
        }
    }

    fn merge(mut self, other: &Accumulator) -> Self {
        for (a, b) in self.matrix.iter_mut().zip(&other.matrix) {
            *a += b;
        }
        for (a, b) in self.rhs.iter_mut().zip(&other.rhs) {
            *a += b;
        }
        self
    }
}

impl NormalEquations {
    /// Reduce Jacobian columns, weights and residuals over `size` realisations.
    ///
    /// Scalars broadcast; every vector operand must have `size` realisations.
    ///
    /// # Errors
    ///
    /// `AadError::ShapeMismatch` if an operand has another realisation count.
    pub fn assemble(
        columns: &[VectorValue],
        weights: &VectorValue,
        residual: &VectorValue,
        size: usize,
    ) -> Result<Self, AadError> {
        for value in columns.iter().chain([weights, residual]) {
            if !value.is_deterministic() && value.size() != size {
                return Err(AadError::shape_mismatch(value.size(), size));
            }
        }

        let dimension = columns.len();
        let total = reduce(columns, weights, residual, size);

        let scale = 1.0 / size.max(1) as f64;
        let mut matrix = vec![vec![0.0; dimension]; dimension];
        for k in 0..dimension {
            for l in 0..=k {
                let value = total.matrix[k * dimension + l] * scale;
                matrix[k][l] = value;
                matrix[l][k] = value;
            }
        }
        let rhs = total.rhs.iter().map(|g| g * scale).collect();

        Ok(Self { matrix, rhs })
    }

    /// Number of parameters.
    pub fn dimension(&self) -> usize {
        self.rhs.len()
    }

    /// `JᵗWJ`, normalised by the realisation count.
    pub fn matrix(&self) -> &[Vec<f64>] {
        &self.matrix
    }

    /// `JᵗW e`, normalised by the realisation count.
    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    /// True if every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.rhs.iter().all(|g| g.is_finite())
            && self.matrix.iter().flatten().all(|a| a.is_finite())
    }

    /// Solve `(A + λ·diag(A)) Δ = g`.
    ///
    /// # Errors
    ///
    /// `SolverError::SingularSystem` if the damped matrix is not positive
    /// definite, which includes any parameter with an all-zero column.
    pub fn solve_damped(&self, lambda: f64) -> Result<Vec<f64>, SolverError> {
        let damped: Vec<Vec<f64>> = self
            .matrix
            .iter()
            .enumerate()
            .map(|(k, row)| {
                let mut row = row.clone();
                row[k] *= 1.0 + lambda;
                row
            })
            .collect();

        solve_cholesky_scaled(&damped, &self.rhs).ok_or(SolverError::SingularSystem {
            dimension: self.dimension(),
        })
    }
}

#[cfg(feature = "parallel")]
fn reduce(
    columns: &[VectorValue],
    weights: &VectorValue,
    residual: &VectorValue,
    size: usize,
) -> Accumulator {
    let dimension = columns.len();
    if size < PARALLEL_THRESHOLD {
        return reduce_sequential(columns, weights, residual, size);
    }
    (0..size)
        .into_par_iter()
        .fold(
            || Accumulator::new(dimension),
            |mut acc, i| {
                acc.add(columns, weights, residual, i);
                acc
            },
        )
        .reduce(|| Accumulator::new(dimension), |a, b| a.merge(&b))
}

#[cfg(not(feature = "parallel"))]
fn reduce(
    columns: &[VectorValue],
    weights: &VectorValue,
    residual: &VectorValue,
    size: usize,
) -> Accumulator {
    reduce_sequential(columns, weights, residual, size)
}

fn reduce_sequential(
    columns: &[VectorValue],
    weights: &VectorValue,
    residual: &VectorValue,
    size: usize,
) -> Accumulator {
    let mut acc = Accumulator::new(columns.len());
    for i in 0..size {
        acc.add(columns, weights, residual, i);
    }
    acc
}
