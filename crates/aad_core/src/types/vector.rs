//! Vectorised random variable values.
//!
//! A [`VectorValue`] holds the Monte-Carlo realisations of one random
//! variable together with its filtration time. A value is either a single
//! deterministic scalar broadcast over every realisation or an immutable
//! vector of `n` realisations.
//!
//! ## Broadcasting
//!
//! Binary and ternary operations accept any mix of scalar and vector
//! operands. Two vector operands must have the same realisation count,
//! otherwise the operation fails with [`AadError::ShapeMismatch`].
//!
//! ## Parallelism
//!
//! With the `parallel` feature, kernels over vectors longer than
//! [`PARALLEL_THRESHOLD`] are split across the rayon thread pool.
//!
//! ## Example
//!
//! ```
//! use aad_core::types::VectorValue;
//!
//! let x = VectorValue::new(0.0, vec![1.0, 2.0, 3.0]);
//! let y = VectorValue::scalar(2.0);
//!
//! let z = x.add_product(&x, &y).unwrap(); // x + x * 2
//! assert_eq!(z.to_vec(), vec![3.0, 6.0, 9.0]);
//! assert!((z.average() - 6.0).abs() < 1e-12);
//! ```

use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::error::AadError;

/// Realisation count above which kernels run on the rayon pool.
pub const PARALLEL_THRESHOLD: usize = 16_384;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum Realizations {
    Scalar(f64),
    Vector(Arc<[f64]>),
}

/// Immutable vector of Monte-Carlo realisations with a time tag.
///
/// Cloning is O(1): the realisations are shared behind an [`Arc`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VectorValue {
    time: f64,
    realizations: Realizations,
}

#[allow(clippy::should_implement_trait)]
impl VectorValue {
    /// Create a value from realisations observed at `time`.
    pub fn new(time: f64, realizations: Vec<f64>) -> Self {
        Self {
            time,
            realizations: Realizations::Vector(realizations.into()),
        }
    }

    /// Create a deterministic value at `time`.
    pub fn from_scalar(time: f64, value: f64) -> Self {
        Self {
            time,
            realizations: Realizations::Scalar(value),
        }
    }

    /// Create a deterministic value at time zero.
    pub fn scalar(value: f64) -> Self {
        Self::from_scalar(0.0, value)
    }

    /// Vector of `n` copies of `value`. Falls back to a scalar for `n <= 1`.
    pub fn filled(n: usize, value: f64) -> Self {
        if n <= 1 {
            Self::scalar(value)
        } else {
            Self::new(0.0, vec![value; n])
        }
    }

    /// Filtration time of this value.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of realisations (1 for a deterministic value).
    #[inline]
    pub fn size(&self) -> usize {
        match &self.realizations {
            Realizations::Scalar(_) => 1,
            Realizations::Vector(values) => values.len(),
        }
    }

    /// True if the value is a broadcast scalar.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        matches!(self.realizations, Realizations::Scalar(_))
    }

    /// Realisation `index`; a scalar returns its value for every index.
    ///
    /// # Panics
    ///
    /// Panics if the value is a vector and `index` is out of range.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        match &self.realizations {
            Realizations::Scalar(value) => *value,
            Realizations::Vector(values) => values[index],
        }
    }

    /// Borrow the realisations, `None` for a scalar.
    pub fn as_slice(&self) -> Option<&[f64]> {
        match &self.realizations {
            Realizations::Scalar(_) => None,
            Realizations::Vector(values) => Some(values),
        }
    }

    /// Copy the realisations into a new vector.
    pub fn to_vec(&self) -> Vec<f64> {
        match &self.realizations {
            Realizations::Scalar(value) => vec![*value],
            Realizations::Vector(values) => values.to_vec(),
        }
    }

    /// Realisation count shared by `self` and `other` under broadcasting.
    ///
    /// Returns `None` when both are scalars.
    pub fn common_size(&self, other: &VectorValue) -> Result<Option<usize>, AadError> {
        match (&self.realizations, &other.realizations) {
            (Realizations::Scalar(_), Realizations::Scalar(_)) => Ok(None),
            (Realizations::Vector(a), Realizations::Scalar(_)) => Ok(Some(a.len())),
            (Realizations::Scalar(_), Realizations::Vector(b)) => Ok(Some(b.len())),
            (Realizations::Vector(a), Realizations::Vector(b)) => {
                if a.len() == b.len() {
                    Ok(Some(a.len()))
                } else {
                    Err(AadError::shape_mismatch(a.len(), b.len()))
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Unary operations
    // ---------------------------------------------------------------------

    /// Apply `f` to every realisation.
    pub fn apply<F>(&self, f: F) -> VectorValue
    where
        F: Fn(f64) -> f64 + Sync + Send,
    {
        let realizations = match &self.realizations {
            Realizations::Scalar(value) => Realizations::Scalar(f(*value)),
            Realizations::Vector(values) => Realizations::Vector(map_unary(values, f).into()),
        };
        Self {
            time: self.time,
            realizations,
        }
    }

    /// `self + value`.
    pub fn add_scalar(&self, value: f64) -> VectorValue {
        self.apply(|x| x + value)
    }

    /// `self * value`.
    pub fn mul_scalar(&self, value: f64) -> VectorValue {
        self.apply(|x| x * value)
    }

    /// `-self`.
    pub fn neg(&self) -> VectorValue {
        self.apply(|x| -x)
    }

    /// `self ^ exponent`.
    pub fn pow(&self, exponent: f64) -> VectorValue {
        self.apply(|x| x.powf(exponent))
    }

    /// `self * self`.
    pub fn squared(&self) -> VectorValue {
        self.apply(|x| x * x)
    }

    /// Square root.
    pub fn sqrt(&self) -> VectorValue {
        self.apply(f64::sqrt)
    }

    /// Exponential.
    pub fn exp(&self) -> VectorValue {
        self.apply(f64::exp)
    }

    /// Natural logarithm.
    pub fn log(&self) -> VectorValue {
        self.apply(f64::ln)
    }

    /// `1 / self`.
    pub fn invert(&self) -> VectorValue {
        self.apply(|x| 1.0 / x)
    }

    // ---------------------------------------------------------------------
    // Binary operations
    // ---------------------------------------------------------------------

    /// Combine `self` and `other` realisation by realisation.
    pub fn zip_with<F>(&self, other: &VectorValue, f: F) -> Result<VectorValue, AadError>
    where
        F: Fn(f64, f64) -> f64 + Sync + Send,
    {
        let time = self.time.max(other.time);
        let realizations = match (&self.realizations, &other.realizations) {
            (Realizations::Scalar(a), Realizations::Scalar(b)) => Realizations::Scalar(f(*a, *b)),
            (Realizations::Vector(a), Realizations::Scalar(b)) => {
                let b = *b;
                Realizations::Vector(map_unary(a, |x| f(x, b)).into())
            }
            (Realizations::Scalar(a), Realizations::Vector(b)) => {
                let a = *a;
                Realizations::Vector(map_unary(b, |y| f(a, y)).into())
            }
            (Realizations::Vector(a), Realizations::Vector(b)) => {
                if a.len() != b.len() {
                    return Err(AadError::shape_mismatch(a.len(), b.len()));
                }
                Realizations::Vector(map_binary(a, b, f).into())
            }
        };
        Ok(Self { time, realizations })
    }

    /// `self + other`.
    pub fn add(&self, other: &VectorValue) -> Result<VectorValue, AadError> {
        self.zip_with(other, |a, b| a + b)
    }

    /// `self - other`.
    pub fn sub(&self, other: &VectorValue) -> Result<VectorValue, AadError> {
        self.zip_with(other, |a, b| a - b)
    }

    /// `self * other`.
    pub fn mul(&self, other: &VectorValue) -> Result<VectorValue, AadError> {
        self.zip_with(other, |a, b| a * b)
    }

    /// `self / other`.
    pub fn div(&self, other: &VectorValue) -> Result<VectorValue, AadError> {
        self.zip_with(other, |a, b| a / b)
    }

    // ---------------------------------------------------------------------
    // Ternary operations
    // ---------------------------------------------------------------------

    fn zip3_with<F>(&self, a: &VectorValue, b: &VectorValue, f: F) -> Result<VectorValue, AadError>
    where
        F: Fn(f64, f64, f64) -> f64 + Sync + Send,
    {
        let time = self.time.max(a.time).max(b.time);
        let size_sa = self.common_size(a)?;
        let size_ab = a.common_size(b)?;
        let size_sb = self.common_size(b)?;
        let size = size_sa.or(size_ab).or(size_sb);

        let realizations = match size {
            None => Realizations::Scalar(f(self.get(0), a.get(0), b.get(0))),
            Some(n) => {
                let values = map_indexed(n, |i| f(self.get(i), a.get(i), b.get(i)));
                Realizations::Vector(values.into())
            }
        };
        Ok(Self { time, realizations })
    }

    /// `self + a * b` in one pass.
    pub fn add_product(&self, a: &VectorValue, b: &VectorValue) -> Result<VectorValue, AadError> {
        self.zip3_with(a, b, |s, x, y| s + x * y)
    }

    /// `self + a / b` in one pass.
    pub fn add_ratio(&self, a: &VectorValue, b: &VectorValue) -> Result<VectorValue, AadError> {
        self.zip3_with(a, b, |s, x, y| s + x / y)
    }

    // ---------------------------------------------------------------------
    // Reductions
    // ---------------------------------------------------------------------

    /// Sum over all realisations.
    pub fn sum(&self) -> f64 {
        match &self.realizations {
            Realizations::Scalar(value) => *value,
            Realizations::Vector(values) => sum_slice(values),
        }
    }

    /// Expectation estimate (mean over realisations).
    pub fn average(&self) -> f64 {
        match &self.realizations {
            Realizations::Scalar(value) => *value,
            Realizations::Vector(values) if values.is_empty() => 0.0,
            Realizations::Vector(values) => sum_slice(values) / values.len() as f64,
        }
    }

    /// Population variance over realisations; zero for a scalar.
    pub fn variance(&self) -> f64 {
        match &self.realizations {
            Realizations::Scalar(_) => 0.0,
            Realizations::Vector(values) if values.is_empty() => 0.0,
            Realizations::Vector(values) => {
                let mean = self.average();
                let squares = map_unary(values, |x| (x - mean) * (x - mean));
                sum_slice(&squares) / values.len() as f64
            }
        }
    }

    /// Monte-Carlo standard error of the average.
    pub fn standard_error(&self) -> f64 {
        (self.variance() / self.size() as f64).sqrt()
    }

    /// Smallest realisation.
    pub fn min(&self) -> f64 {
        match &self.realizations {
            Realizations::Scalar(value) => *value,
            Realizations::Vector(values) => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    /// Largest realisation.
    pub fn max(&self) -> f64 {
        match &self.realizations {
            Realizations::Scalar(value) => *value,
            Realizations::Vector(values) => {
                values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            }
        }
    }

    /// True if no realisation is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        match &self.realizations {
            Realizations::Scalar(value) => value.is_finite(),
            Realizations::Vector(values) => values.iter().all(|x| x.is_finite()),
        }
    }
}

impl From<f64> for VectorValue {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

// -------------------------------------------------------------------------
// Kernels
// -------------------------------------------------------------------------

#[cfg(feature = "parallel")]
fn map_unary<F>(values: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    if values.len() >= PARALLEL_THRESHOLD {
        values.par_iter().map(|&x| f(x)).collect()
    } else {
        values.iter().map(|&x| f(x)).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn map_unary<F>(values: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    values.iter().map(|&x| f(x)).collect()
}

#[cfg(feature = "parallel")]
fn map_binary<F>(a: &[f64], b: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    if a.len() >= PARALLEL_THRESHOLD {
        a.par_iter().zip(b.par_iter()).map(|(&x, &y)| f(x, y)).collect()
    } else {
        a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn map_binary<F>(a: &[f64], b: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

#[cfg(feature = "parallel")]
fn map_indexed<F>(n: usize, f: F) -> Vec<f64>
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    if n >= PARALLEL_THRESHOLD {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn map_indexed<F>(n: usize, f: F) -> Vec<f64>
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    (0..n).map(f).collect()
}

#[cfg(feature = "parallel")]
fn sum_slice(values: &[f64]) -> f64 {
    if values.len() >= PARALLEL_THRESHOLD {
        values.par_iter().sum()
    } else {
        values.iter().sum()
    }
}

#[cfg(not(feature = "parallel"))]
fn sum_slice(values: &[f64]) -> f64 {
    values.iter().sum()
}
