//! Core numeric and error types.
//!
//! This module provides:
//! - `vector`: [`VectorValue`], the immutable vector of Monte-Carlo realisations
//! - `factory`: [`VectorValueFactory`], leaves without recording
//! - `error`: Structured error types for arithmetic and graph operations
//!
//! # Re-exports
//!
//! For convenience, commonly used types are re-exported at this module level:
//! - [`VectorValue`] from `vector`
//! - [`VectorValueFactory`] from `factory`
//! - [`AadError`] from `error`

pub mod error;
pub mod factory;
pub mod vector;

pub use error::AadError;
pub use factory::VectorValueFactory;
pub use vector::{VectorValue, PARALLEL_THRESHOLD};
