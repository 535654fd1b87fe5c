//! Levenberg-Marquardt configuration.
//!
//! Configurations are plain values with presets and a fluent builder. They
//! can also be loaded from TOML; missing keys take their default values.
//!
//! ```toml
//! max_iterations = 200
//! target_accuracy = 1e-8
//! initial_lambda = 1e-3
//! lambda_growth_factor = 10.0
//! lambda_shrink_factor = 10.0
//! min_lambda = 1e-10
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SolverError;

/// Configuration for the Levenberg-Marquardt solver.
///
/// # Fields
///
/// * `max_iterations` - Maximum number of `set_value_and_derivative` calls
/// * `target_accuracy` - Mean weighted squared residual at which the run converges
/// * `initial_lambda` - Damping factor before the first step
/// * `lambda_growth_factor` - Multiplier applied to lambda on a rejected step
/// * `lambda_shrink_factor` - Divisor applied to lambda on an accepted step
/// * `min_lambda` - Floor for lambda after shrinking
///
/// # Examples
///
/// ```
/// use aad_optimiser::solvers::LMConfig;
///
/// let config = LMConfig::default()
///     .with_max_iterations(50)
///     .with_target_accuracy(1e-8);
/// assert!(config.validate().is_ok());
///
/// let loaded = LMConfig::from_toml_str("max_iterations = 25").unwrap();
/// assert_eq!(loaded.max_iterations, 25);
/// assert_eq!(loaded.initial_lambda, LMConfig::default().initial_lambda);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LMConfig {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Convergence threshold for the accuracy.
    pub target_accuracy: f64,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Factor to increase lambda on rejected step.
    pub lambda_growth_factor: f64,
    /// Factor to decrease lambda on accepted step.
    pub lambda_shrink_factor: f64,
    /// Minimum damping factor.
    pub min_lambda: f64,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            target_accuracy: 1e-6,
            initial_lambda: 1e-3,
            lambda_growth_factor: 10.0,
            lambda_shrink_factor: 10.0,
            min_lambda: 1e-10,
        }
    }
}

impl LMConfig {
    /// Create a new LM configuration.
    pub fn new(target_accuracy: f64, max_iterations: usize) -> Self {
        Self {
            target_accuracy,
            max_iterations,
            ..Default::default()
        }
    }

    /// Create a fast configuration with relaxed tolerances.
    pub fn fast() -> Self {
        Self {
            target_accuracy: 1e-4,
            max_iterations: 30,
            ..Default::default()
        }
    }

    /// Create a high precision configuration.
    pub fn high_precision() -> Self {
        Self {
            target_accuracy: 1e-12,
            max_iterations: 500,
            min_lambda: 1e-12,
            ..Default::default()
        }
    }

    /// Set the maximum iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the target accuracy.
    pub fn with_target_accuracy(mut self, target_accuracy: f64) -> Self {
        self.target_accuracy = target_accuracy;
        self
    }

    /// Set the initial damping factor.
    pub fn with_initial_lambda(mut self, initial_lambda: f64) -> Self {
        self.initial_lambda = initial_lambda;
        self
    }

    /// Set the damping growth and shrink factors.
    pub fn with_lambda_factors(mut self, growth: f64, shrink: f64) -> Self {
        self.lambda_growth_factor = growth;
        self.lambda_shrink_factor = shrink;
        self
    }

    /// Set the damping floor.
    pub fn with_min_lambda(mut self, min_lambda: f64) -> Self {
        self.min_lambda = min_lambda;
        self
    }

    /// Check that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns `SolverError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), SolverError> {
        let invalid = |message: &str| Err(SolverError::InvalidConfig(message.to_string()));

        if self.max_iterations == 0 {
            return invalid("max_iterations must be positive");
        }
        if !self.target_accuracy.is_finite() || self.target_accuracy < 0.0 {
            return invalid("target_accuracy must be finite and non-negative");
        }
        if !self.initial_lambda.is_finite() || self.initial_lambda <= 0.0 {
            return invalid("initial_lambda must be finite and positive");
        }
        if !self.lambda_growth_factor.is_finite() || self.lambda_growth_factor <= 1.0 {
            return invalid("lambda_growth_factor must be greater than 1");
        }
        if !self.lambda_shrink_factor.is_finite() || self.lambda_shrink_factor <= 1.0 {
            return invalid("lambda_shrink_factor must be greater than 1");
        }
        if !self.min_lambda.is_finite() || self.min_lambda <= 0.0 {
            return invalid("min_lambda must be finite and positive");
        }
        if self.min_lambda > self.initial_lambda {
            return invalid("min_lambda must not exceed initial_lambda");
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// - `SolverError::ConfigParse` if the text is not valid TOML for this type.
    /// - `SolverError::InvalidConfig` if a value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, SolverError> {
        let config: LMConfig =
            toml::from_str(text).map_err(|e| SolverError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SolverError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SolverError::ConfigParse(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Serialise to a TOML document.
    pub fn to_toml_string(&self) -> Result<String, SolverError> {
        toml::to_string(self).map_err(|e| SolverError::ConfigParse(e.to_string()))
    }
}
