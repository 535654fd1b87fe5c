//! Levenberg-Marquardt calibration driven by AAD gradients.
//!
//! The solver minimises the mean weighted squared residual
//!
//! ```text
//! accuracy(θ) = (1/n) Σ_i ((target_i - f(θ)_i) / uncertainty_i)²
//! ```
//!
//! over a set of parameter leaves. It does not evaluate the model itself.
//! Each iteration the caller evaluates `f` at the proposed parameters,
//! differentiates the result and hands value and gradient back:
//!
//! ```text
//! while !solver.is_done() {
//!     θ  = solver.next_parameters()
//!     y  = f(θ)
//!     solver.set_value_and_derivative(y.value(), y.gradient())
//! }
//! ```
//!
//! # Algorithm
//!
//! From the best point found so far the step `Δ` solves
//!
//! ```text
//! (JᵗWJ + λ·diag(JᵗWJ)) Δ = JᵗW (target - f)
//! ```
//!
//! with `W = diag(1/uncertainty²)`. An evaluation that improves the accuracy
//! is accepted: it becomes the best point and `λ` shrinks. Otherwise it is
//! rejected, `λ` grows and the next step restarts from the best point with
//! the stored normal equations. The first evaluation sets the baseline and
//! leaves `λ` unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use aad_core::ad::{ComputationGraph, DifferentiableVariable, GradientMap, NodeId};
use aad_core::types::{AadError, VectorValue};
use tracing::{debug, warn};

use super::config::LMConfig;
use super::normal_equations::NormalEquations;
use super::state::SolverState;
use crate::error::SolverError;

/// Summary of a finished calibration run.
#[derive(Debug, Clone, PartialEq)]
pub struct LMReport {
    /// Terminal state.
    pub state: SolverState,
    /// Best accuracy reached.
    pub accuracy: f64,
    /// Number of evaluations consumed.
    pub iterations: usize,
    /// Final damping factor.
    pub lambda: f64,
    /// Parameter values at the best accuracy, keyed by initial leaf id.
    pub best_point: BTreeMap<NodeId, VectorValue>,
}

impl LMReport {
    /// Whether the target accuracy was reached.
    pub fn converged(&self) -> bool {
        self.state == SolverState::Converged
    }

    /// Root mean square of the weighted residuals at the best point.
    pub fn rmse(&self) -> f64 {
        self.accuracy.sqrt()
    }
}

/// Levenberg-Marquardt nonlinear least-squares solver over AAD parameters.
///
/// Parameters are identified by the ids of the leaves passed to
/// [`new`](Self::new); those keys stay fixed for the whole run even though
/// every proposal is recorded as a fresh leaf in the same graph.
///
/// # Example
///
/// ```
/// use aad_core::ad::{AadFactory, RetentionPolicy};
/// use aad_core::traits::RandomVariableFactory;
/// use aad_core::types::VectorValue;
/// use aad_optimiser::solvers::{LMConfig, LevenbergMarquardtSolver};
///
/// let factory = AadFactory::new(RetentionPolicy::Tape);
/// let x = VectorValue::new(0.0, vec![0.5, 1.0, 2.0]);
/// let target = VectorValue::new(0.0, vec![0.25, 1.0, 4.0]);
///
/// let scale = factory.create_scalar_leaf(0.0, 0.5);
/// let mut solver =
///     LevenbergMarquardtSolver::new(vec![scale.clone()], target, LMConfig::default()).unwrap();
///
/// // f(x) = scale * x²
/// while !solver.is_done() {
///     let params = solver.next_parameters().unwrap();
///     let y = params[&scale.id()].mul(&x.squared()).unwrap();
///     let gradient = y.gradient().unwrap();
///     solver.set_value_and_derivative(y.value(), &gradient).unwrap();
/// }
///
/// assert!(solver.accuracy() <= 1e-6);
/// assert!((solver.best_point()[&scale.id()].get(0) - 1.0).abs() < 1e-3);
/// ```
#[derive(Debug)]
pub struct LevenbergMarquardtSolver {
    config: LMConfig,
    graph: Arc<ComputationGraph>,
    keys: Vec<NodeId>,
    current: Vec<DifferentiableVariable>,
    best_point: Vec<VectorValue>,
    best_system: Option<NormalEquations>,
    target: VectorValue,
    weights: VectorValue,
    lambda: f64,
    accuracy: f64,
    last_accuracy: f64,
    iteration_count: usize,
    state: SolverState,
}

impl LevenbergMarquardtSolver {
    /// Create a solver with unit uncertainties.
    ///
    /// # Errors
    ///
    /// - `SolverError::InvalidConfig` if `config` fails validation, a
    ///   parameter is not a leaf, or a parameter is passed twice.
    /// - `SolverError::EmptyParameters` if no parameter is given.
    /// - `SolverError::Aad` if the parameters live in different graphs.
    pub fn new(
        parameters: impl IntoIterator<Item = DifferentiableVariable>,
        target: VectorValue,
        config: LMConfig,
    ) -> Result<Self, SolverError> {
        config.validate()?;

        let current: Vec<DifferentiableVariable> = parameters.into_iter().collect();
        let graph = match current.first() {
            Some(first) => Arc::clone(first.graph()),
            None => return Err(SolverError::EmptyParameters),
        };

        let mut keys = Vec::with_capacity(current.len());
        for parameter in &current {
            if !Arc::ptr_eq(&graph, parameter.graph()) {
                return Err(AadError::GraphCorruption(format!(
                    "parameter {} belongs to another graph",
                    parameter.id()
                ))
                .into());
            }
            if !parameter.is_leaf() {
                return Err(SolverError::InvalidConfig(format!(
                    "parameter {} is not a leaf",
                    parameter.id()
                )));
            }
            if keys.contains(&parameter.id()) {
                return Err(SolverError::InvalidConfig(format!(
                    "parameter {} passed twice",
                    parameter.id()
                )));
            }
            keys.push(parameter.id());
        }

        let best_point = current.iter().map(|p| p.value().clone()).collect();

        Ok(Self {
            lambda: config.initial_lambda,
            config,
            graph,
            keys,
            current,
            best_point,
            best_system: None,
            target,
            weights: VectorValue::scalar(1.0),
            accuracy: f64::INFINITY,
            last_accuracy: f64::INFINITY,
            iteration_count: 0,
            state: SolverState::Running,
        })
    }

    /// Replace the unit uncertainties.
    ///
    /// # Errors
    ///
    /// - `SolverError::InvalidConfig` if an uncertainty is zero or not finite.
    /// - `SolverError::Aad` if the realisation count disagrees with the target.
    pub fn with_uncertainties(mut self, uncertainties: VectorValue) -> Result<Self, SolverError> {
        self.target.common_size(&uncertainties)?;
        let weights = uncertainties.squared().invert();
        if !uncertainties.is_finite() || !weights.is_finite() {
            return Err(SolverError::InvalidConfig(
                "uncertainties must be finite and non-zero".to_string(),
            ));
        }
        self.weights = weights;
        Ok(self)
    }

    /// Solver configuration.
    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    /// Lifecycle state.
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// True once the solver reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.state.is_terminal()
    }

    /// Best accuracy seen so far; infinite before the first evaluation.
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Accuracy of the most recent evaluation, accepted or not.
    pub fn last_accuracy(&self) -> f64 {
        self.last_accuracy
    }

    /// Current damping factor.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Number of evaluations processed.
    pub fn number_of_iterations(&self) -> usize {
        self.iteration_count
    }

    /// Parameter values with the lowest accuracy, keyed by initial leaf id.
    ///
    /// Before the first evaluation this is the initial point.
    pub fn best_point(&self) -> BTreeMap<NodeId, VectorValue> {
        self.keys
            .iter()
            .copied()
            .zip(self.best_point.iter().cloned())
            .collect()
    }

    /// Parameters to evaluate next, keyed by initial leaf id.
    ///
    /// # Errors
    ///
    /// `SolverError::Terminated` once the solver is in a terminal state.
    pub fn next_parameters(
        &self,
    ) -> Result<BTreeMap<NodeId, DifferentiableVariable>, SolverError> {
        if self.state.is_terminal() {
            return Err(SolverError::Terminated { state: self.state });
        }
        Ok(self
            .keys
            .iter()
            .copied()
            .zip(self.current.iter().cloned())
            .collect())
    }

    /// Feed back the model value and its gradient at the proposed parameters.
    ///
    /// The gradient is looked up with the ids of the leaves returned by the
    /// last [`next_parameters`](Self::next_parameters) call.
    ///
    /// # Errors
    ///
    /// - `SolverError::Terminated` in a terminal state.
    /// - `SolverError::Aad` on a realisation count mismatch; nothing changes.
    /// - `SolverError::NumericOverflow` for a non-finite residual, gradient
    ///   or damping factor; the state becomes `Diverged`.
    /// - `SolverError::SingularSystem` if the damped normal equations cannot
    ///   be factorised; the state becomes `Diverged`.
    pub fn set_value_and_derivative(
        &mut self,
        value: &VectorValue,
        gradient: &GradientMap,
    ) -> Result<(), SolverError> {
        if self.state.is_terminal() {
            return Err(SolverError::Terminated { state: self.state });
        }

        let error = self.target.sub(value)?;
        let weighted = error.squared().mul(&self.weights)?;
        let accuracy = weighted.average();
        if !error.is_finite() || !accuracy.is_finite() {
            return self.diverge(SolverError::non_finite("residual"));
        }

        let first = self.best_system.is_none();
        let accepted = first || accuracy < self.accuracy;
        let lambda = if first {
            self.lambda
        } else if accepted {
            (self.lambda / self.config.lambda_shrink_factor).max(self.config.min_lambda)
        } else {
            self.lambda * self.config.lambda_growth_factor
        };

        let converged = accepted && accuracy <= self.config.target_accuracy;
        let exhausted = self.iteration_count + 1 >= self.config.max_iterations;

        let system = if accepted && !converged {
            let columns = self.jacobian(value, gradient);
            let system =
                NormalEquations::assemble(&columns, &self.weights, &error, weighted.size())?;
            if !system.is_finite() {
                return self.diverge(SolverError::non_finite("gradient"));
            }
            Some(system)
        } else {
            None
        };

        if !lambda.is_finite() {
            self.commit(accuracy, accepted, lambda, system);
            return self.diverge(SolverError::non_finite("lambda"));
        }

        if converged || exhausted {
            self.commit(accuracy, accepted, lambda, system);
            return Ok(());
        }

        let delta = {
            let equations = system
                .as_ref()
                .or(self.best_system.as_ref())
                .ok_or(SolverError::SingularSystem {
                    dimension: self.keys.len(),
                })?;
            match equations.solve_damped(lambda) {
                Ok(delta) => delta,
                Err(err) => return self.diverge(err),
            }
        };

        let base: Vec<VectorValue> = if accepted {
            self.current.iter().map(|p| p.value().clone()).collect()
        } else {
            self.best_point.clone()
        };
        let proposal: Vec<DifferentiableVariable> = base
            .iter()
            .zip(&delta)
            .map(|(value, step)| {
                DifferentiableVariable::leaf(&self.graph, value.add_scalar(*step))
            })
            .collect();

        self.commit(accuracy, accepted, lambda, system);
        self.current = proposal;
        Ok(())
    }

    /// Run the evaluate/differentiate loop until a terminal state.
    ///
    /// `model` receives the proposed parameters in key order. Divergence is
    /// reported through [`LMReport::state`]; model and shape errors are
    /// returned.
    pub fn solve<F>(&mut self, mut model: F) -> Result<LMReport, SolverError>
    where
        F: FnMut(&[DifferentiableVariable]) -> Result<DifferentiableVariable, AadError>,
    {
        while !self.is_done() {
            let root = model(&self.current)?;
            let gradient = root.gradient()?;
            if let Err(err) = self.set_value_and_derivative(root.value(), &gradient) {
                if !err.is_divergence() {
                    return Err(err);
                }
            }
        }
        Ok(self.report())
    }

    /// Snapshot of the run so far.
    pub fn report(&self) -> LMReport {
        LMReport {
            state: self.state,
            accuracy: self.accuracy,
            iterations: self.iteration_count,
            lambda: self.lambda,
            best_point: self.best_point(),
        }
    }

    /// Jacobian columns, one per parameter.
    ///
    /// For a deterministic value the per-realisation contributions reaching
    /// a leaf add up to the derivative.
    fn jacobian(&self, value: &VectorValue, gradient: &GradientMap) -> Vec<VectorValue> {
        self.current
            .iter()
            .map(|parameter| {
                let column = gradient.wrt(parameter.id());
                if value.is_deterministic() && !column.is_deterministic() {
                    VectorValue::scalar(column.sum())
                } else {
                    column
                }
            })
            .collect()
    }

    fn commit(
        &mut self,
        accuracy: f64,
        accepted: bool,
        lambda: f64,
        system: Option<NormalEquations>,
    ) {
        self.iteration_count += 1;
        self.lambda = lambda;
        self.last_accuracy = accuracy;
        if accepted {
            self.accuracy = accuracy;
            self.best_point = self.current.iter().map(|p| p.value().clone()).collect();
        }
        if system.is_some() {
            self.best_system = system;
        }

        if self.accuracy <= self.config.target_accuracy {
            self.state = SolverState::Converged;
        } else if self.iteration_count >= self.config.max_iterations {
            self.state = SolverState::MaxIterationsReached;
        }

        debug!(
            iteration = self.iteration_count,
            accuracy,
            best = self.accuracy,
            lambda,
            accepted,
            state = %self.state,
            "levenberg-marquardt step"
        );
    }

    fn diverge(&mut self, error: SolverError) -> Result<(), SolverError> {
        warn!(
            iteration = self.iteration_count,
            lambda = self.lambda,
            error = %error,
            "levenberg-marquardt diverged"
        );
        self.state = SolverState::Diverged;
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aad_core::ad::{AadFactory, RetentionPolicy};
    use aad_core::traits::RandomVariableFactory;
    use approx::assert_relative_eq;

    fn xs() -> VectorValue {
        VectorValue::new(0.0, vec![0.0, 0.25, 0.5, 0.75, 1.0])
    }

    /// Solver fitting `p0 + p1 x` to `1 + 2x`.
    fn linear_setup(config: LMConfig) -> (LevenbergMarquardtSolver, Vec<NodeId>) {
        let factory = AadFactory::new(RetentionPolicy::Tape);
        let params = vec![
            factory.create_scalar_leaf(0.0, 0.0),
            factory.create_scalar_leaf(0.0, 0.0),
        ];
        let ids = params.iter().map(|p| p.id()).collect();
        let target = xs().mul_scalar(2.0).add_scalar(1.0);
        let solver = LevenbergMarquardtSolver::new(params, target, config).unwrap();
        (solver, ids)
    }

    fn linear_step(solver: &mut LevenbergMarquardtSolver) -> Result<(), SolverError> {
        let params = solver.next_parameters()?;
        let p: Vec<_> = params.values().cloned().collect();
        let y = p[0].add_product(&p[1], &xs())?;
        let gradient = y.gradient()?;
        solver.set_value_and_derivative(y.value(), &gradient)
    }

    // ========================================
    // Construction Tests
    // ========================================

    #[test]
    fn test_initial_state() {
        let (solver, ids) = linear_setup(LMConfig::default());
        assert_eq!(solver.state(), SolverState::Running);
        assert!(!solver.is_done());
        assert_eq!(solver.number_of_iterations(), 0);
        assert!(solver.accuracy().is_infinite());
        assert_eq!(solver.lambda(), 1e-3);

        let params = solver.next_parameters().unwrap();
        assert_eq!(params.keys().copied().collect::<Vec<_>>(), ids);
        assert_eq!(solver.best_point()[&ids[0]].get(0), 0.0);
    }

    #[test]
    fn test_empty_parameters() {
        let err = LevenbergMarquardtSolver::new(
            Vec::new(),
            VectorValue::scalar(1.0),
            LMConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, SolverError::EmptyParameters);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let factory = AadFactory::default();
        let p = factory.create_scalar_leaf(0.0, 1.0);
        let config = LMConfig::default().with_max_iterations(0);
        let err = LevenbergMarquardtSolver::new(vec![p], VectorValue::scalar(1.0), config)
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let factory = AadFactory::default();
        let p = factory.create_scalar_leaf(0.0, 1.0);
        let err = LevenbergMarquardtSolver::new(
            vec![p.clone(), p],
            VectorValue::scalar(1.0),
            LMConfig::default(),
        )
        .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_derived_parameter_rejected() {
        let factory = AadFactory::default();
        let a = factory.create_scalar_leaf(0.0, 1.0);
        let derived = a.mul(2.0).unwrap();
        let err = LevenbergMarquardtSolver::new(
            vec![derived],
            VectorValue::scalar(1.0),
            LMConfig::default(),
        )
        .unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("not a leaf"));
    }

    #[test]
    fn test_parameters_from_different_graphs() {
        let a = AadFactory::default().create_scalar_leaf(0.0, 1.0);
        let b = AadFactory::default().create_scalar_leaf(0.0, 1.0);
        let err =
            LevenbergMarquardtSolver::new(vec![a, b], VectorValue::scalar(1.0), LMConfig::default())
                .unwrap_err();
        assert!(matches!(err, SolverError::Aad(ref inner) if inner.is_graph_corruption()));
    }

    #[test]
    fn test_invalid_uncertainties() {
        let (solver, _) = linear_setup(LMConfig::default());
        let zeros = VectorValue::new(0.0, vec![1.0, 0.0, 1.0, 1.0, 1.0]);
        assert!(solver.with_uncertainties(zeros).unwrap_err().is_config_error());

        let (solver, _) = linear_setup(LMConfig::default());
        let short = VectorValue::new(0.0, vec![1.0, 1.0]);
        assert!(matches!(
            solver.with_uncertainties(short).unwrap_err(),
            SolverError::Aad(_)
        ));
    }

    // ========================================
    // Iteration Tests
    // ========================================

    #[test]
    fn test_first_evaluation_sets_baseline() {
        let (mut solver, _) = linear_setup(LMConfig::default());
        linear_step(&mut solver).unwrap();

        // residual 1 + 2x at x = 0, 0.25, .., 1
        let expected = [1.0_f64, 1.5, 2.0, 2.5, 3.0].iter().map(|r| r * r).sum::<f64>() / 5.0;
        assert_relative_eq!(solver.accuracy(), expected, epsilon = 1e-12);
        assert_eq!(solver.lambda(), 1e-3);
        assert_eq!(solver.number_of_iterations(), 1);
        assert_eq!(solver.state(), SolverState::Running);
    }

    #[test]
    fn test_linear_fit_converges() {
        let (mut solver, ids) = linear_setup(LMConfig::default());
        while !solver.is_done() {
            linear_step(&mut solver).unwrap();
        }

        assert_eq!(solver.state(), SolverState::Converged);
        assert!(solver.accuracy() <= 1e-6);
        assert!(solver.number_of_iterations() < 10);
        let best = solver.best_point();
        assert_relative_eq!(best[&ids[0]].get(0), 1.0, epsilon = 1e-3);
        assert_relative_eq!(best[&ids[1]].get(0), 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_accepted_step_shrinks_lambda() {
        let (mut solver, _) = linear_setup(LMConfig::default().with_target_accuracy(0.0));
        linear_step(&mut solver).unwrap();
        linear_step(&mut solver).unwrap();
        assert!(solver.last_accuracy() <= solver.accuracy());
        assert_relative_eq!(solver.lambda(), 1e-4);
    }

    #[test]
    fn test_rejected_step_grows_lambda_and_keeps_best() {
        let (mut solver, ids) = linear_setup(LMConfig::default());
        linear_step(&mut solver).unwrap();
        let best_before = solver.best_point();
        let accuracy_before = solver.accuracy();

        // Feed a worse value than the baseline
        let params = solver.next_parameters().unwrap();
        let worse = VectorValue::filled(5, -10.0);
        let p: Vec<_> = params.values().cloned().collect();
        let gradient = p[0].add_product(&p[1], &xs()).unwrap().gradient().unwrap();
        solver.set_value_and_derivative(&worse, &gradient).unwrap();

        assert_relative_eq!(solver.lambda(), 1e-2);
        assert_eq!(solver.accuracy(), accuracy_before);
        assert!(solver.last_accuracy() > accuracy_before);
        assert_eq!(solver.best_point(), best_before);

        // The retry restarts from the best point with a heavier damping
        let retry = solver.next_parameters().unwrap();
        assert_ne!(retry[&ids[0]].id(), p[0].id());
    }

    #[test]
    fn test_max_iterations_reached() {
        let config = LMConfig::default()
            .with_max_iterations(2)
            .with_target_accuracy(0.0);
        let (mut solver, _) = linear_setup(config);
        linear_step(&mut solver).unwrap();
        linear_step(&mut solver).unwrap();

        assert_eq!(solver.state(), SolverState::MaxIterationsReached);
        assert_eq!(
            solver.next_parameters().unwrap_err(),
            SolverError::Terminated {
                state: SolverState::MaxIterationsReached
            }
        );
        assert!(linear_step(&mut solver).is_err());
        assert_eq!(solver.number_of_iterations(), 2);
    }

    #[test]
    fn test_shape_mismatch_leaves_state_untouched() {
        let (mut solver, _) = linear_setup(LMConfig::default());
        let params = solver.next_parameters().unwrap();
        let p: Vec<_> = params.values().cloned().collect();
        let gradient = p[0].add(&p[1]).unwrap().gradient().unwrap();

        let wrong = VectorValue::new(0.0, vec![1.0, 2.0]);
        let err = solver.set_value_and_derivative(&wrong, &gradient).unwrap_err();
        assert!(matches!(err, SolverError::Aad(ref inner) if inner.is_shape_mismatch()));
        assert_eq!(solver.state(), SolverState::Running);
        assert_eq!(solver.number_of_iterations(), 0);
        assert!(solver.accuracy().is_infinite());
    }

    #[test]
    fn test_non_finite_value_diverges() {
        let (mut solver, _) = linear_setup(LMConfig::default());
        let params = solver.next_parameters().unwrap();
        let p: Vec<_> = params.values().cloned().collect();
        let gradient = p[0].add(&p[1]).unwrap().gradient().unwrap();

        let nan = VectorValue::filled(5, f64::NAN);
        let err = solver.set_value_and_derivative(&nan, &gradient).unwrap_err();
        assert!(matches!(err, SolverError::NumericOverflow(_)));
        assert_eq!(solver.state(), SolverState::Diverged);
    }

    /// Feed a value far worse than any fit of `1 + 2x`.
    fn worse_step(solver: &mut LevenbergMarquardtSolver) -> Result<(), SolverError> {
        let params = solver.next_parameters()?;
        let p: Vec<_> = params.values().cloned().collect();
        let gradient = p[0].add_product(&p[1], &xs())?.gradient()?;
        solver.set_value_and_derivative(&VectorValue::filled(5, -10.0), &gradient)
    }

    #[test]
    fn test_lambda_overflow_diverges() {
        let config = LMConfig::default().with_lambda_factors(1e200, 10.0);
        let (mut solver, _) = linear_setup(config);
        linear_step(&mut solver).unwrap();

        worse_step(&mut solver).unwrap();
        assert_relative_eq!(solver.lambda(), 1e197, max_relative = 1e-12);
        assert_eq!(solver.state(), SolverState::Running);

        let err = worse_step(&mut solver).unwrap_err();
        assert!(matches!(err, SolverError::NumericOverflow(_)));
        assert!(err.is_divergence());
        assert_eq!(solver.state(), SolverState::Diverged);
        assert!(solver.lambda().is_infinite());
        assert_eq!(solver.number_of_iterations(), 3);

        assert_eq!(
            solver.next_parameters().unwrap_err(),
            SolverError::Terminated {
                state: SolverState::Diverged
            }
        );
    }

    #[test]
    fn test_vector_parameter_under_average() {
        // mean((v + s) * x) = 2.5 with mean(v * x) = 1.5 and mean(x) = 0.5
        let factory = AadFactory::new(RetentionPolicy::Tape);
        let initial = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let shift = factory.create_leaf(0.0, initial.clone());
        let mut solver = LevenbergMarquardtSolver::new(
            vec![shift.clone()],
            VectorValue::scalar(2.5),
            LMConfig::default(),
        )
        .unwrap();

        let report = solver.solve(|p| p[0].mul(&xs())?.average()).unwrap();
        assert!(report.converged());

        let best = &report.best_point[&shift.id()];
        assert_eq!(best.size(), 5);
        for (i, v) in initial.iter().enumerate() {
            assert_relative_eq!(best.get(i), v + 2.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_unused_parameter_is_singular() {
        let factory = AadFactory::new(RetentionPolicy::Tape);
        let used = factory.create_scalar_leaf(0.0, 0.0);
        let unused = factory.create_scalar_leaf(0.0, 0.0);
        let mut solver = LevenbergMarquardtSolver::new(
            vec![used, unused],
            xs(),
            LMConfig::default(),
        )
        .unwrap();

        let report = solver
            .solve(|p| p[0].mul(&xs()))
            .unwrap();
        assert_eq!(report.state, SolverState::Diverged);
        assert_eq!(report.iterations, 0);
    }

    #[test]
    fn test_deterministic_model_value() {
        // mean(scale * x) = 1.5 with mean(x) = 0.5
        let factory = AadFactory::new(RetentionPolicy::Tape);
        let scale = factory.create_scalar_leaf(0.0, 1.0);
        let mut solver = LevenbergMarquardtSolver::new(
            vec![scale.clone()],
            VectorValue::scalar(1.5),
            LMConfig::default(),
        )
        .unwrap();

        let report = solver.solve(|p| p[0].mul(&xs())?.average()).unwrap();
        assert!(report.converged());
        assert_relative_eq!(report.best_point[&scale.id()].get(0), 3.0, epsilon = 1e-2);
    }

    #[test]
    fn test_uncertainties_weight_residuals() {
        let (solver, _) = linear_setup(LMConfig::default().with_target_accuracy(0.0));
        let mut solver = solver
            .with_uncertainties(VectorValue::scalar(2.0))
            .unwrap();
        linear_step(&mut solver).unwrap();

        let unweighted = [1.0_f64, 1.5, 2.0, 2.5, 3.0].iter().map(|r| r * r).sum::<f64>() / 5.0;
        assert_relative_eq!(solver.accuracy(), unweighted / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_report_snapshot() {
        let (mut solver, _) = linear_setup(LMConfig::default());
        let report = solver
            .solve(|p| p[0].add_product(&p[1], &xs()))
            .unwrap();
        assert_eq!(report, solver.report());
        assert!(report.converged());
        assert_relative_eq!(report.rmse(), report.accuracy.sqrt());
        assert_eq!(report.best_point.len(), 2);
    }
}
