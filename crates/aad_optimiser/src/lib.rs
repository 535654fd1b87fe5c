//! # aad_optimiser
//!
//! Nonlinear least-squares calibration for models written against
//! [`aad_core`] random variables.
//!
//! ## Architecture Position
//!
//! Layer 2 of the workspace. Depends on `aad_core` (L1) for the
//! differentiable graph, gradient maps and the dense Cholesky solve.
//!
//! ## Modules
//!
//! - `solvers`: Levenberg-Marquardt state machine and its configuration
//! - `error`: Solver and configuration errors
//!
//! ## Example
//!
//! ```rust
//! use aad_core::ad::{AadFactory, RetentionPolicy};
//! use aad_core::traits::RandomVariableFactory;
//! use aad_core::types::VectorValue;
//! use aad_optimiser::solvers::{LMConfig, LevenbergMarquardtSolver, SolverState};
//!
//! let factory = AadFactory::new(RetentionPolicy::Tape);
//! let x = VectorValue::new(0.0, vec![0.0, 0.5, 1.0, 1.5]);
//! let target = VectorValue::new(0.0, vec![1.0, 2.0, 3.0, 4.0]);
//!
//! let params = vec![
//!     factory.create_scalar_leaf(0.0, 0.0),
//!     factory.create_scalar_leaf(0.0, 0.0),
//! ];
//! let mut solver =
//!     LevenbergMarquardtSolver::new(params, target, LMConfig::default()).unwrap();
//!
//! // f(x) = p0 + p1 * x
//! let report = solver.solve(|p| p[0].add_product(&p[1], &x)).unwrap();
//!
//! assert_eq!(report.state, SolverState::Converged);
//! let fitted: Vec<f64> = report.best_point.values().map(|v| v.get(0)).collect();
//! assert!((fitted[0] - 1.0).abs() < 1e-3);
//! assert!((fitted[1] - 2.0).abs() < 1e-3);
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod solvers;

pub use error::SolverError;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::solvers::*;
    pub use crate::SolverError;
}
