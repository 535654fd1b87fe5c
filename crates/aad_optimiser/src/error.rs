//! Solver-specific error types.
//!
//! Failures of the Levenberg-Marquardt iteration and of configuration
//! loading, with the diagnostic values needed to act on them.

use aad_core::types::AadError;
use thiserror::Error;

use crate::solvers::SolverState;

/// Errors that can occur while configuring or iterating the solver.
///
/// # Variants
///
/// - `SingularSystem`: Damped normal equations are not positive definite
/// - `NumericOverflow`: Non-finite residual, gradient, step or damping factor
/// - `Terminated`: Parameters requested after the solver stopped
/// - `EmptyParameters`: No parameters to calibrate
/// - `InvalidConfig`: Configuration value out of range
/// - `ConfigParse`: Configuration text could not be read or parsed
/// - `Aad`: Wrapped shape or graph error from the AD engine
///
/// # Examples
///
/// ```
/// use aad_optimiser::SolverError;
///
/// let err = SolverError::SingularSystem { dimension: 10 };
/// assert!(err.to_string().contains("10"));
/// assert!(err.is_divergence());
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The damped normal equations could not be factorised.
    #[error("Singular normal equations of dimension {dimension}")]
    SingularSystem {
        /// Number of parameters
        dimension: usize,
    },

    /// A residual, gradient, step or the damping factor is not finite.
    #[error("Numeric overflow: {0}")]
    NumericOverflow(String),

    /// `next_parameters` was called in a terminal state.
    #[error("Solver already terminated in state {state}")]
    Terminated {
        /// Terminal state the solver is in
        state: SolverState,
    },

    /// The solver was constructed without parameters.
    #[error("At least one parameter is required")]
    EmptyParameters,

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be loaded.
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    /// Error raised by the AD engine.
    #[error(transparent)]
    Aad(#[from] AadError),
}

impl SolverError {
    /// Create a numeric overflow error for a named quantity.
    pub fn non_finite(quantity: &str) -> Self {
        SolverError::NumericOverflow(format!("{} is not finite", quantity))
    }

    /// Check if this error moved the solver to `Diverged`.
    pub fn is_divergence(&self) -> bool {
        matches!(
            self,
            SolverError::SingularSystem { .. } | SolverError::NumericOverflow(_)
        )
    }

    /// Check if this is a configuration error.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SolverError::InvalidConfig(_) | SolverError::ConfigParse(_)
        )
    }
}
