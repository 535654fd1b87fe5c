//! Reverse-mode gradient engine.
//!
//! The backward sweep seeds the root with an all-ones adjoint, walks the
//! root's ancestors in descending id order and pushes `adjoint × partial`
//! into every operand. Contributions from several dependents are summed.
//! Adjoints reaching leaves form the [`GradientMap`].
//!
//! ```text
//! adj(root) = 1
//! adj(x)   += adj(y) · ∂y/∂x        for every y consuming x
//! ```

use std::collections::btree_map::Entry as BTreeEntry;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::trace;

use super::graph::{ComputationGraph, RetentionPolicy};
use super::node::NodeId;
use super::variable::DifferentiableVariable;
use crate::types::{AadError, VectorValue};

/// Partial derivatives of one root with respect to its ancestor leaves.
///
/// Gradients are per realisation. When a deterministic leaf is broadcast
/// into vector expressions below a deterministic root (e.g. an
/// [`average`](super::DifferentiableVariable::average)), its total
/// derivative is the [`sum`](VectorValue::sum) of the returned vector.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientMap {
    root: NodeId,
    size: usize,
    gradients: BTreeMap<NodeId, VectorValue>,
}

impl GradientMap {
    /// Build a map directly, e.g. from an external gradient source.
    pub fn new(root: NodeId, size: usize, gradients: BTreeMap<NodeId, VectorValue>) -> Self {
        Self {
            root,
            size,
            gradients,
        }
    }

    /// Root the sweep started from.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Realisation count of the root.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Gradient for `leaf`, if the leaf is an ancestor of the root.
    pub fn get(&self, leaf: NodeId) -> Option<&VectorValue> {
        self.gradients.get(&leaf)
    }

    /// Gradient for `leaf`; all zeros when the leaf does not influence the root.
    pub fn wrt(&self, leaf: NodeId) -> VectorValue {
        self.gradients
            .get(&leaf)
            .cloned()
            .unwrap_or_else(|| VectorValue::filled(self.size, 0.0))
    }

    /// True if `leaf` is an ancestor of the root.
    pub fn contains(&self, leaf: NodeId) -> bool {
        self.gradients.contains_key(&leaf)
    }

    /// Number of leaves with a recorded gradient.
    pub fn len(&self) -> usize {
        self.gradients.len()
    }

    /// True if the root has no leaf ancestors.
    pub fn is_empty(&self) -> bool {
        self.gradients.is_empty()
    }

    /// Iterate over `(leaf, gradient)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &VectorValue)> {
        self.gradients.iter()
    }
}

/// Runs backward sweeps over one [`ComputationGraph`].
#[derive(Debug, Clone)]
pub struct GradientEngine {
    graph: Arc<ComputationGraph>,
}

impl GradientEngine {
    /// Create an engine for `graph`.
    pub fn new(graph: Arc<ComputationGraph>) -> Self {
        Self { graph }
    }

    /// Graph this engine sweeps.
    pub fn graph(&self) -> &Arc<ComputationGraph> {
        &self.graph
    }

    /// Gradient of `root` with respect to every leaf it depends on.
    ///
    /// Under [`RetentionPolicy::Tape`] the graph is pruned afterwards.
    ///
    /// # Errors
    ///
    /// - `AadError::GraphCorruption` if `root` belongs to another graph or
    ///   an operand link is missing or not ordered.
    /// - `AadError::ShapeMismatch` if adjoint accumulation meets
    ///   incompatible realisation counts.
    pub fn gradient(&self, root: &DifferentiableVariable) -> Result<GradientMap, AadError> {
        if !Arc::ptr_eq(&self.graph, root.graph()) {
            return Err(AadError::GraphCorruption(format!(
                "root {} belongs to another graph",
                root.id()
            )));
        }

        let gradient = self.sweep(root.id(), root.value().size())?;

        if self.graph.policy() == RetentionPolicy::Tape {
            self.graph.prune();
        }
        Ok(gradient)
    }

    fn sweep(&self, root: NodeId, size: usize) -> Result<GradientMap, AadError> {
        let nodes = self.graph.ancestors(root)?;
        trace!(root = %root, nodes = nodes.len(), "backward sweep");

        let mut adjoints: HashMap<NodeId, VectorValue> = HashMap::with_capacity(nodes.len());
        adjoints.insert(root, VectorValue::filled(size, 1.0));
        let mut gradients = BTreeMap::new();

        for node in &nodes {
            let Some(adjoint) = adjoints.remove(&node.id()) else {
                continue;
            };
            if node.is_leaf() {
                gradients.insert(node.id(), adjoint);
                continue;
            }

            let values: Vec<&VectorValue> = node.operands().iter().map(|o| o.value()).collect();
            for (index, operand) in node.operands().iter().enumerate() {
                let Some(id) = operand.node_id() else {
                    continue;
                };
                let contribution =
                    node.operator()
                        .contribution(index, &adjoint, &values, node.value())?;
                match adjoints.entry(id) {
                    Entry::Occupied(mut entry) => {
                        let sum = entry.get().add(&contribution)?;
                        entry.insert(sum);
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(contribution);
                    }
                }
            }
        }

        Ok(GradientMap::new(root, size, gradients))
    }
}

/// Sum gradients of several roots leaf by leaf.
///
/// Useful when the objective is a sum of independently recorded terms.
pub fn accumulate(maps: &[GradientMap]) -> Result<BTreeMap<NodeId, VectorValue>, AadError> {
    let mut total: BTreeMap<NodeId, VectorValue> = BTreeMap::new();
    for map in maps {
        for (leaf, gradient) in map.iter() {
            match total.entry(*leaf) {
                BTreeEntry::Occupied(mut entry) => {
                    let sum = entry.get().add(gradient)?;
                    entry.insert(sum);
                }
                BTreeEntry::Vacant(entry) => {
                    entry.insert(gradient.clone());
                }
            }
        }
    }
    Ok(total)
}
