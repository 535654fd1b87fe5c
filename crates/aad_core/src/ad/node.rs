//! Recorded nodes of the differentiable graph.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::operator::OperatorKind;
use crate::types::VectorValue;

/// Process-wide node id counter. Zero is never handed out.
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique, monotonically assigned node identifier.
///
/// Ids are allocated from one atomic counter shared by every graph in the
/// process, so an operand always carries a smaller id than its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value.
    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input of a recorded operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Another node of the same graph; receives an adjoint.
    Node {
        /// Id of the operand node
        id: NodeId,
        /// Forward value of the operand node
        value: VectorValue,
    },
    /// Non-differentiable input captured by value.
    Constant(VectorValue),
}

impl Operand {
    /// Forward value of the operand.
    pub fn value(&self) -> &VectorValue {
        match self {
            Operand::Node { value, .. } => value,
            Operand::Constant(value) => value,
        }
    }

    /// Node id, `None` for a constant.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Operand::Node { id, .. } => Some(*id),
            Operand::Constant(_) => None,
        }
    }
}

/// Immutable record of one operation in the graph.
///
/// The node keeps its operands' forward values, which is all the backward
/// sweep needs to evaluate local partial derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentiableNode {
    id: NodeId,
    value: VectorValue,
    operator: OperatorKind,
    operands: Vec<Operand>,
}

impl DifferentiableNode {
    pub(crate) fn new(
        id: NodeId,
        value: VectorValue,
        operator: OperatorKind,
        operands: Vec<Operand>,
    ) -> Self {
        Self {
            id,
            value,
            operator,
            operands,
        }
    }

    /// Node identifier.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Forward value.
    #[inline]
    pub fn value(&self) -> &VectorValue {
        &self.value
    }

    /// Operator that produced this node.
    #[inline]
    pub fn operator(&self) -> OperatorKind {
        self.operator
    }

    /// Ordered operands (empty for a leaf).
    #[inline]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// True for a free variable.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.operator == OperatorKind::Leaf
    }

    /// Ids of operands that are graph nodes.
    pub fn operand_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.operands.iter().filter_map(Operand::node_id)
    }
}
