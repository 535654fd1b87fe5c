//! Lifecycle of a calibration run.

use std::fmt;

/// State of a [`LevenbergMarquardtSolver`](super::LevenbergMarquardtSolver).
///
/// `Running` is the only non-terminal state. Once terminal, the solver
/// refuses to propose further parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SolverState {
    /// Iterating; parameters may be requested.
    #[default]
    Running,
    /// Accuracy reached the configured target.
    Converged,
    /// Iteration budget exhausted before convergence.
    MaxIterationsReached,
    /// Damping overflowed, the system was singular or values went non-finite.
    Diverged,
}

impl SolverState {
    /// True for every state except `Running`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != SolverState::Running
    }
}

impl fmt::Display for SolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolverState::Running => "Running",
            SolverState::Converged => "Converged",
            SolverState::MaxIterationsReached => "MaxIterationsReached",
            SolverState::Diverged => "Diverged",
        };
        f.write_str(name)
    }
}
