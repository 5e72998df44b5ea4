//! Error types for graph-rewrite
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

use crate::graph::{NodeId, TensorId};

/// Main error type for graph queries, edits and passes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node handle does not belong to the graph
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Tensor handle does not belong to the graph
    #[error("Tensor not found: {0}")]
    TensorNotFound(TensorId),

    /// A tensor would end up with two producers
    #[error("Tensor {tensor} already produced by node {existing}")]
    DuplicateProducer {
        /// Tensor that would gain a second producer
        tensor: TensorId,
        /// Current producer
        existing: NodeId,
    },

    /// Adding the node would close a cycle
    #[error("Adding node '{0}' would create a cycle")]
    CycleDetected(String),

    /// Operand lookup by identity failed
    #[error("Tensor {tensor} is not an operand of node {node}")]
    OperandNotFound {
        /// Node whose operands were searched
        node: NodeId,
        /// Tensor that was expected
        tensor: TensorId,
    },

    /// Node failed its kind validation
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    /// Pattern graph does not have exactly one root node
    #[error("Pattern graph must have exactly one root node, found {roots}")]
    InvalidPattern {
        /// Number of roots found
        roots: usize,
    },

    /// Pattern graph does not have exactly one output node
    #[error("Pattern graph must have exactly one output node, found {leaves}")]
    InvalidPatternLeaves {
        /// Number of output nodes found
        leaves: usize,
    },

    /// Removed node and new producer disagree on output layout
    #[error("Output structure mismatch: node has {expected} outputs, new producer has {actual}")]
    OutputStructureMismatch {
        /// Outputs of the removed node
        expected: usize,
        /// Outputs of the new producer
        actual: usize,
    },

    /// Structural precondition of a rewrite did not hold
    #[error("Precondition failed for node '{node}': {reason}")]
    Precondition {
        /// Offending node name
        node: String,
        /// Human readable reason
        reason: String,
    },

    /// Pass does not support the configured device class
    #[error("Pass '{pass}' does not support device class {device}")]
    UnsupportedDevice {
        /// Pass name
        pass: &'static str,
        /// Configured device class
        device: String,
    },

    /// Pass aborted
    #[error("Pass '{pass}' failed: {reason}")]
    PassFailed {
        /// Pass name
        pass: &'static str,
        /// Reason
        reason: String,
    },

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::Precondition {
            node: "identity_0".to_string(),
            reason: "chained".to_string(),
        };
        assert!(err.to_string().contains("identity_0"));
        assert!(err.to_string().contains("chained"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = GraphError::InvalidPattern { roots: 2 };
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_duplicate_producer_mentions_handles() {
        let err = GraphError::DuplicateProducer {
            tensor: TensorId(3),
            existing: NodeId(7),
        };
        let msg = err.to_string();
        assert!(msg.contains("t3"));
        assert!(msg.contains("n7"));
    }
}
