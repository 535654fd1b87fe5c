//! Arena of recorded nodes.
//!
//! The [`ComputationGraph`] owns every node recorded through its handles,
//! keyed by [`NodeId`]. Operand links always point to smaller ids, so
//! descending id order is a valid reverse topological order.
//!
//! ## Retention
//!
//! - [`RetentionPolicy::Materialised`]: nodes live as long as the graph.
//!   Any number of backward sweeps from any root remain possible.
//! - [`RetentionPolicy::Tape`]: after each backward sweep the graph drops
//!   every node that no live [`DifferentiableVariable`] can reach.
//!
//! A node counts as live while a handle outside the table holds it.
//!
//! [`DifferentiableVariable`]: super::DifferentiableVariable

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use super::node::{DifferentiableNode, NodeId, Operand};
use super::operator::OperatorKind;
use crate::types::{AadError, VectorValue};

/// Memory strategy for recorded nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RetentionPolicy {
    /// Keep every node for the lifetime of the graph.
    Materialised,
    /// Prune unreachable nodes after each backward sweep.
    #[default]
    Tape,
}

type NodeTable = BTreeMap<NodeId, Arc<DifferentiableNode>>;

/// Shared node table of one family of differentiable expressions.
#[derive(Debug, Default)]
pub struct ComputationGraph {
    policy: RetentionPolicy,
    nodes: RwLock<NodeTable>,
}

impl ComputationGraph {
    /// Create an empty graph.
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            nodes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create an empty graph behind an [`Arc`], ready to hand to a factory.
    pub fn shared(policy: RetentionPolicy) -> Arc<Self> {
        Arc::new(Self::new(policy))
    }

    /// Retention policy of this graph.
    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Number of nodes currently held.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if no node is held.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// True if `id` is held by this graph.
    pub fn contains(&self, id: NodeId) -> bool {
        self.read().contains_key(&id)
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<Arc<DifferentiableNode>> {
        self.read().get(&id).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, NodeTable> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, NodeTable> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a leaf holding `value`.
    pub(crate) fn record_leaf(&self, value: VectorValue) -> Arc<DifferentiableNode> {
        let mut nodes = self.write();
        let id = NodeId::next();
        let node = Arc::new(DifferentiableNode::new(
            id,
            value,
            OperatorKind::Leaf,
            Vec::new(),
        ));
        nodes.insert(id, Arc::clone(&node));
        node
    }

    /// Record an operation whose forward value is already computed.
    ///
    /// Every node operand must already be held by this graph.
    pub(crate) fn record(
        &self,
        operator: OperatorKind,
        operands: Vec<Operand>,
        value: VectorValue,
    ) -> Result<Arc<DifferentiableNode>, AadError> {
        let mut nodes = self.write();
        let id = NodeId::next();
        for operand in operands.iter().filter_map(Operand::node_id) {
            if operand >= id {
                return Err(AadError::non_monotonic_operand(id, operand));
            }
            if !nodes.contains_key(&operand) {
                return Err(AadError::missing_node(operand));
            }
        }
        let node = Arc::new(DifferentiableNode::new(id, value, operator, operands));
        nodes.insert(id, Arc::clone(&node));
        Ok(node)
    }

    /// Every node reachable from `root` (root included), in descending id order.
    pub fn ancestors(&self, root: NodeId) -> Result<Vec<Arc<DifferentiableNode>>, AadError> {
        let nodes = self.read();
        let mut visited: BTreeMap<NodeId, Arc<DifferentiableNode>> = BTreeMap::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if visited.contains_key(&id) {
                continue;
            }
            let node = nodes.get(&id).ok_or_else(|| AadError::missing_node(id))?;
            for operand in node.operand_ids() {
                if operand >= id {
                    return Err(AadError::non_monotonic_operand(id, operand));
                }
                if !visited.contains_key(&operand) {
                    stack.push(operand);
                }
            }
            visited.insert(id, Arc::clone(node));
        }

        Ok(visited.into_values().rev().collect())
    }

    /// Drop every node that no live handle can reach.
    ///
    /// Returns the number of nodes removed.
    pub fn prune(&self) -> usize {
        let mut nodes = self.write();

        let mut live: HashSet<NodeId> = HashSet::with_capacity(nodes.len());
        let mut stack: Vec<NodeId> = nodes
            .iter()
            .filter(|(_, node)| Arc::strong_count(node) > 1)
            .map(|(id, _)| *id)
            .collect();

        while let Some(id) = stack.pop() {
            if !live.insert(id) {
                continue;
            }
            if let Some(node) = nodes.get(&id) {
                stack.extend(node.operand_ids().filter(|operand| !live.contains(operand)));
            }
        }

        let before = nodes.len();
        nodes.retain(|id, _| live.contains(id));
        let removed = before - nodes.len();
        trace!(removed, remaining = nodes.len(), "pruned computation graph");
        removed
    }
}
