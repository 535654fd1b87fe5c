//! Factory for plain, non-recorded random variables.

use super::vector::VectorValue;
use crate::traits::RandomVariableFactory;

/// Produces [`VectorValue`]s. Nothing is recorded for differentiation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VectorValueFactory;

impl RandomVariableFactory for VectorValueFactory {
    type Output = VectorValue;

    fn create_leaf(&self, time: f64, values: Vec<f64>) -> VectorValue {
        VectorValue::new(time, values)
    }

    fn create_scalar_leaf(&self, time: f64, value: f64) -> VectorValue {
        VectorValue::from_scalar(time, value)
    }
}
