//! Handles to recorded nodes.

use std::fmt;
use std::sync::Arc;

use super::engine::{GradientEngine, GradientMap};
use super::graph::ComputationGraph;
use super::node::{DifferentiableNode, NodeId, Operand};
use super::operator::OperatorKind;
use crate::types::{AadError, VectorValue};

/// Second or third input of a recorded operation.
///
/// Variables are recorded by id and receive adjoints; plain values are
/// captured as constants.
#[derive(Debug, Clone)]
pub enum Argument {
    /// Differentiable input
    Variable(DifferentiableVariable),
    /// Non-differentiable input
    Value(VectorValue),
}

impl From<&DifferentiableVariable> for Argument {
    fn from(variable: &DifferentiableVariable) -> Self {
        Argument::Variable(variable.clone())
    }
}

impl From<DifferentiableVariable> for Argument {
    fn from(variable: DifferentiableVariable) -> Self {
        Argument::Variable(variable)
    }
}

impl From<&VectorValue> for Argument {
    fn from(value: &VectorValue) -> Self {
        Argument::Value(value.clone())
    }
}

impl From<VectorValue> for Argument {
    fn from(value: VectorValue) -> Self {
        Argument::Value(value)
    }
}

impl From<f64> for Argument {
    fn from(value: f64) -> Self {
        Argument::Value(VectorValue::scalar(value))
    }
}

/// A random variable that records every operation applied to it.
///
/// Cloning is O(1) and keeps the node alive under
/// [`RetentionPolicy::Tape`](super::RetentionPolicy::Tape).
///
/// # Example
///
/// ```
/// use aad_core::ad::{ComputationGraph, DifferentiableVariable, RetentionPolicy};
/// use aad_core::types::VectorValue;
///
/// let graph = ComputationGraph::shared(RetentionPolicy::Tape);
/// let a = DifferentiableVariable::leaf(&graph, VectorValue::new(0.0, vec![1.0, 2.0]));
/// let x = VectorValue::new(0.0, vec![3.0, 4.0]);
///
/// let y = a.mul(&x).unwrap().add(1.0).unwrap();
/// assert_eq!(y.value().to_vec(), vec![4.0, 9.0]);
///
/// let gradient = y.gradient().unwrap();
/// assert_eq!(gradient.wrt(a.id()).to_vec(), vec![3.0, 4.0]);
/// ```
#[derive(Clone)]
pub struct DifferentiableVariable {
    node: Arc<DifferentiableNode>,
    graph: Arc<ComputationGraph>,
}

#[allow(clippy::should_implement_trait)]
impl DifferentiableVariable {
    /// Record a new leaf holding `value`.
    pub fn leaf(graph: &Arc<ComputationGraph>, value: VectorValue) -> Self {
        Self {
            node: graph.record_leaf(value),
            graph: Arc::clone(graph),
        }
    }

    /// Node identifier.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Forward value.
    #[inline]
    pub fn value(&self) -> &VectorValue {
        self.node.value()
    }

    /// Recorded node.
    #[inline]
    pub fn node(&self) -> &DifferentiableNode {
        &self.node
    }

    /// Graph this variable is recorded in.
    #[inline]
    pub fn graph(&self) -> &Arc<ComputationGraph> {
        &self.graph
    }

    /// True if the variable is a free leaf.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }

    fn as_operand(&self) -> Operand {
        Operand::Node {
            id: self.id(),
            value: self.value().clone(),
        }
    }

    fn operand_for(&self, argument: Argument) -> Result<Operand, AadError> {
        match argument {
            Argument::Variable(variable) => {
                if !Arc::ptr_eq(&self.graph, &variable.graph) {
                    return Err(AadError::GraphCorruption(format!(
                        "node {} belongs to another graph",
                        variable.id()
                    )));
                }
                Ok(variable.as_operand())
            }
            Argument::Value(value) => Ok(Operand::Constant(value)),
        }
    }

    /// Record `operator` applied to `self` followed by `arguments`.
    pub fn apply(
        &self,
        operator: OperatorKind,
        arguments: Vec<Argument>,
    ) -> Result<DifferentiableVariable, AadError> {
        let mut operands = Vec::with_capacity(arguments.len() + 1);
        operands.push(self.as_operand());
        for argument in arguments {
            operands.push(self.operand_for(argument)?);
        }

        let value = {
            let values: Vec<&VectorValue> = operands.iter().map(Operand::value).collect();
            operator.forward(&values)?
        };
        let node = self.graph.record(operator, operands, value)?;
        Ok(Self {
            node,
            graph: Arc::clone(&self.graph),
        })
    }

    /// `self + other`.
    pub fn add(&self, other: impl Into<Argument>) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::Add, vec![other.into()])
    }

    /// `self - other`.
    pub fn sub(&self, other: impl Into<Argument>) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::Sub, vec![other.into()])
    }

    /// `self * other`.
    pub fn mul(&self, other: impl Into<Argument>) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::Mul, vec![other.into()])
    }

    /// `self / other`.
    pub fn div(&self, other: impl Into<Argument>) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::Div, vec![other.into()])
    }

    /// `self ^ exponent`.
    pub fn pow(&self, exponent: f64) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::Pow { exponent }, Vec::new())
    }

    /// `self * self`.
    pub fn squared(&self) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::Square, Vec::new())
    }

    /// Square root.
    pub fn sqrt(&self) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::Sqrt, Vec::new())
    }

    /// Exponential.
    pub fn exp(&self) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::Exp, Vec::new())
    }

    /// Natural logarithm.
    pub fn log(&self) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::Log, Vec::new())
    }

    /// `self + a * b`.
    pub fn add_product(
        &self,
        a: impl Into<Argument>,
        b: impl Into<Argument>,
    ) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::AddProduct, vec![a.into(), b.into()])
    }

    /// `self + a / b`.
    pub fn add_ratio(
        &self,
        a: impl Into<Argument>,
        b: impl Into<Argument>,
    ) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::AddRatio, vec![a.into(), b.into()])
    }

    /// Mean over realisations, as a deterministic variable.
    pub fn average(&self) -> Result<DifferentiableVariable, AadError> {
        self.apply(OperatorKind::Average, Vec::new())
    }

    /// Partial derivatives of `self` with respect to every ancestor leaf.
    pub fn gradient(&self) -> Result<GradientMap, AadError> {
        GradientEngine::new(Arc::clone(&self.graph)).gradient(self)
    }
}

impl fmt::Debug for DifferentiableVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DifferentiableVariable")
            .field("id", &self.id())
            .field("operator", &self.node.operator())
            .field("size", &self.value().size())
            .finish()
    }
}
