//! Factory for recorded leaves.

use std::sync::Arc;

use super::graph::ComputationGraph;
use super::variable::DifferentiableVariable;
use crate::traits::RandomVariableFactory;
use crate::types::VectorValue;

/// Produces [`DifferentiableVariable`] leaves recorded in one graph.
///
/// Every factory owns a handle to its graph; expressions built from the
/// leaves of one factory can be differentiated together.
///
/// ```
/// use aad_core::ad::{AadFactory, RetentionPolicy};
/// use aad_core::traits::RandomVariableFactory;
///
/// let factory = AadFactory::new(RetentionPolicy::Materialised);
/// let x = factory.create_leaf(0.0, vec![1.0, 2.0]);
/// let y = x.exp().unwrap();
///
/// let gradient = y.gradient().unwrap();
/// assert_eq!(gradient.wrt(x.id()).to_vec(), y.value().to_vec());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AadFactory {
    graph: Arc<ComputationGraph>,
}

impl AadFactory {
    /// Factory over a fresh graph with the given policy.
    pub fn new(policy: super::RetentionPolicy) -> Self {
        Self {
            graph: ComputationGraph::shared(policy),
        }
    }

    /// Factory over an existing graph.
    pub fn with_graph(graph: Arc<ComputationGraph>) -> Self {
        Self { graph }
    }

    /// Graph the leaves are recorded in.
    pub fn graph(&self) -> &Arc<ComputationGraph> {
        &self.graph
    }

    /// Record a leaf from an existing value.
    pub fn leaf(&self, value: VectorValue) -> DifferentiableVariable {
        DifferentiableVariable::leaf(&self.graph, value)
    }
}

impl RandomVariableFactory for AadFactory {
    type Output = DifferentiableVariable;

    fn create_leaf(&self, time: f64, values: Vec<f64>) -> DifferentiableVariable {
        self.leaf(VectorValue::new(time, values))
    }

    fn create_scalar_leaf(&self, time: f64, value: f64) -> DifferentiableVariable {
        self.leaf(VectorValue::from_scalar(time, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ad::RetentionPolicy;

    #[test]
    fn test_leaves_share_graph() {
        let factory = AadFactory::new(RetentionPolicy::Materialised);
        let a = factory.create_scalar_leaf(0.0, 2.0);
        let b = factory.create_leaf(1.0, vec![1.0, 3.0]);

        assert!(Arc::ptr_eq(a.graph(), b.graph()));
        assert_eq!(factory.graph().len(), 2);
        assert_eq!(b.value().time(), 1.0);

        let c = a.mul(&b).unwrap();
        let gradient = c.gradient().unwrap();
        assert_eq!(gradient.wrt(a.id()).to_vec(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_default_uses_tape() {
        let factory = AadFactory::default();
        assert_eq!(factory.graph().policy(), RetentionPolicy::Tape);
    }

    #[test]
    fn test_with_graph() {
        let graph = ComputationGraph::shared(RetentionPolicy::Materialised);
        let factory = AadFactory::with_graph(Arc::clone(&graph));
        let _leaf = factory.create_scalar_leaf(0.0, 1.0);
        assert_eq!(graph.len(), 1);
    }
}
