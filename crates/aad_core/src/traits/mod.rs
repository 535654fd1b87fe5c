//! Core traits for random variable construction.
//!
//! This module defines fundamental abstractions for:
//! - Generic floating-point operations (`Float` trait)
//! - Leaf construction (`RandomVariableFactory` trait)

/// Generic floating-point trait for numeric computations.
///
/// Re-exported so downstream crates can write dense numerics generic over
/// `f32` and `f64` without a direct num-traits dependency.
///
/// # Examples
/// ```
/// use aad_core::traits::Float;
///
/// fn weighted_square<T: Float>(residual: T, uncertainty: T) -> T {
///     (residual / uncertainty).powi(2)
/// }
///
/// assert_eq!(weighted_square(3.0_f64, 1.5), 4.0);
/// ```
pub use num_traits::Float;

pub mod factory;

pub use factory::RandomVariableFactory;
