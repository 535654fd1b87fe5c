//! Error types for structured error handling.
//!
//! This module provides:
//! - `AadError`: Errors from vector arithmetic and computation graph operations

use thiserror::Error;

use crate::ad::NodeId;

/// Errors raised by the vectorised arithmetic and the AD engine.
///
/// # Variants
/// - `ShapeMismatch`: Operand realisation counts disagree
/// - `GraphCorruption`: Operand references violate the construction protocol
///
/// # Examples
/// ```
/// use aad_core::types::AadError;
///
/// let err = AadError::ShapeMismatch { left: 10, right: 20 };
/// assert_eq!(format!("{}", err), "Shape mismatch: 10 realisations vs 20");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AadError {
    /// Two non-scalar operands with different realisation counts.
    #[error("Shape mismatch: {left} realisations vs {right}")]
    ShapeMismatch {
        /// Realisation count of the left operand
        left: usize,
        /// Realisation count of the right operand
        right: usize,
    },

    /// Cyclic, missing or foreign operand reference.
    #[error("Graph corruption: {0}")]
    GraphCorruption(String),
}

impl AadError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(left: usize, right: usize) -> Self {
        Self::ShapeMismatch { left, right }
    }

    /// Operand id is not smaller than the node that consumes it.
    pub fn non_monotonic_operand(node: NodeId, operand: NodeId) -> Self {
        Self::GraphCorruption(format!(
            "operand {} of node {} does not precede it",
            operand, node
        ))
    }

    /// Operand id is absent from the node table.
    pub fn missing_node(id: NodeId) -> Self {
        Self::GraphCorruption(format!("node {} is not in the graph", id))
    }

    /// Check if this is a shape mismatch.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch { .. })
    }

    /// Check if this is a graph corruption.
    pub fn is_graph_corruption(&self) -> bool {
        matches!(self, Self::GraphCorruption(_))
    }
}
