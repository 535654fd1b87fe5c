//! Dense symmetric positive-definite linear systems.
//!
//! Calibration problems produce normal equations of dimension equal to the
//! parameter count, typically below a hundred. Row-major `Vec<Vec<T>>`
//! storage and an O(P³) Cholesky factorisation are sufficient.
//!
//! All routines are generic over [`Float`] and return `None` instead of
//! panicking when the matrix is not positive definite.

use num_traits::Float;

/// Solve `A x = b` for symmetric positive-definite `A` by Cholesky.
///
/// Returns `None` if `A` is not square of dimension `b.len()`, if it is not
/// positive definite, or if a pivot underflows.
///
/// # Examples
/// ```
/// use aad_core::math::linalg::solve_cholesky;
///
/// let a: Vec<Vec<f64>> = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
/// let x = solve_cholesky(&a, &[2.0, 1.0]).unwrap();
/// assert!((x[0] - 0.5).abs() < 1e-12);
/// assert!(x[1].abs() < 1e-12);
/// ```
pub fn solve_cholesky<T: Float>(a: &[Vec<T>], b: &[T]) -> Option<Vec<T>> {
    let n = b.len();
    if n == 0 || a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }
    let tiny = T::min_positive_value();

    // A = L Lᵀ
    let mut l = vec![vec![T::zero(); n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum = sum - l[i][k] * l[j][k];
            }

            if i == j {
                if sum.is_nan() || sum <= T::zero() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                if l[j][j].abs() < tiny {
                    return None;
                }
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L y = b
    let mut y = vec![T::zero(); n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum = sum - l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Lᵀ x = y
    let mut x = vec![T::zero(); n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum = sum - l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Solve `A x = b` after symmetric Jacobi scaling.
///
/// With `D = diag(A)^{-1/2}` the system `(D A D) y = D b` has a unit
/// diagonal; `x = D y`. This keeps the factorisation well conditioned when
/// parameters live on very different scales, as with polynomial
/// coefficients. Zero diagonal entries are left unscaled.
pub fn solve_cholesky_scaled<T: Float>(a: &[Vec<T>], b: &[T]) -> Option<Vec<T>> {
    let n = b.len();
    if n == 0 || a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    let scale: Vec<T> = (0..n)
        .map(|i| {
            let d = a[i][i];
            if d > T::zero() && d.is_finite() {
                d.sqrt().recip()
            } else {
                T::one()
            }
        })
        .collect();

    let scaled: Vec<Vec<T>> = (0..n)
        .map(|i| (0..n).map(|j| scale[i] * a[i][j] * scale[j]).collect())
        .collect();
    let rhs: Vec<T> = (0..n).map(|i| scale[i] * b[i]).collect();

    let y = solve_cholesky(&scaled, &rhs)?;
    Some(y.iter().zip(&scale).map(|(&yi, &si)| yi * si).collect())
}

/// Matrix-vector product `A x`.
pub fn mat_vec<T: Float>(a: &[Vec<T>], x: &[T]) -> Vec<T> {
    a.iter()
        .map(|row| {
            row.iter()
                .zip(x)
                .fold(T::zero(), |acc, (&aij, &xj)| acc + aij * xj)
        })
        .collect()
}
