//! Calibration solvers.
//!
//! ## Available Solvers
//!
//! - [`LevenbergMarquardtSolver`]: damped Gauss-Newton least squares over
//!   AAD parameters, driven step by step or through
//!   [`LevenbergMarquardtSolver::solve`]
//!
//! ## Configuration
//!
//! [`LMConfig`] controls:
//! - `max_iterations`: Iteration budget (default: 100)
//! - `target_accuracy`: Convergence threshold (default: 1e-6)
//! - `initial_lambda`, `lambda_growth_factor`, `lambda_shrink_factor`,
//!   `min_lambda`: Damping schedule
//!
//! Configurations can be loaded from TOML with [`LMConfig::from_toml_str`].

mod config;
mod levenberg_marquardt;
mod normal_equations;
mod state;

pub use config::LMConfig;
pub use levenberg_marquardt::{LMReport, LevenbergMarquardtSolver};
pub use normal_equations::NormalEquations;
pub use state::SolverState;
