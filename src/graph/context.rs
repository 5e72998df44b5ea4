//! Graph arena
//!
//! `Graph` owns every node and tensor and maintains the producer/consumer
//! maps for O(1) lookups. Structural edits go through
//! the [`editor`](crate::transform::editor) functions.

use crate::error::{GraphError, GraphResult};

use super::maps::{ConsumerMap, NodeId, NodeMap, ProducerMap, TensorId};
use super::node::{Node, NumericRange};
use super::tensor::Tensor;

/// DAG of operator nodes connected by tensors
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Node handle → node (insertion order preserved)
    pub(crate) nodes: NodeMap,

    /// Tensor arena, indexed by `TensorId`
    pub(crate) tensors: Vec<Tensor>,

    /// Tensor → producer node
    pub(crate) producer_map: ProducerMap,

    /// Tensor → consumer nodes
    pub(crate) consumer_map: ConsumerMap,

    /// Next node handle to hand out
    pub(crate) next_node: u32,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Tensors
    // ========================================================================

    /// Register a tensor and return its handle
    pub fn add_tensor(&mut self, tensor: Tensor) -> TensorId {
        let id = TensorId(self.tensors.len() as u32);
        self.tensors.push(tensor);
        id
    }

    /// Get a tensor
    pub fn tensor(&self, id: TensorId) -> Option<&Tensor> {
        self.tensors.get(id.0 as usize)
    }

    /// Get a tensor, failing on an unknown handle
    pub fn try_tensor(&self, id: TensorId) -> GraphResult<&Tensor> {
        self.tensor(id).ok_or(GraphError::TensorNotFound(id))
    }

    /// Get a mutable tensor
    ///
    /// Only tensor attributes are reachable here; links live in the graph maps.
    pub fn tensor_mut(&mut self, id: TensorId) -> Option<&mut Tensor> {
        self.tensors.get_mut(id.0 as usize)
    }

    /// Check a tensor handle
    pub fn has_tensor(&self, id: TensorId) -> bool {
        (id.0 as usize) < self.tensors.len()
    }

    /// Number of registered tensors, including detached ones
    pub fn tensor_count(&self) -> usize {
        self.tensors.len()
    }

    /// Iterate tensors with their handles
    pub fn tensors(&self) -> impl Iterator<Item = (TensorId, &Tensor)> {
        self.tensors
            .iter()
            .enumerate()
            .map(|(i, t)| (TensorId(i as u32), t))
    }

    /// Find a tensor by name
    pub fn tensor_by_name(&self, name: &str) -> Option<TensorId> {
        self.tensors()
            .find(|(_, t)| t.name == name)
            .map(|(id, _)| id)
    }

    /// Whether the tensor is flagged persistent
    pub fn is_persistent(&self, id: TensorId) -> bool {
        self.tensor(id).map(|t| t.persistent).unwrap_or(false)
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Get a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a node, failing on an unknown handle
    pub fn try_node(&self, id: NodeId) -> GraphResult<&Node> {
        self.node(id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Check if a node is part of the graph
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, n)| (*id, n))
    }

    /// Iterate over node handles in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Find a node by name
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes()
            .find(|(_, n)| n.name == name)
            .map(|(id, _)| id)
    }

    /// Replace a node's range annotation
    pub fn set_node_range(&mut self, id: NodeId, range: Option<NumericRange>) -> GraphResult<()> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.range = range;
        Ok(())
    }

    // ========================================================================
    // Graph traversal
    // ========================================================================

    /// Get the producer node of a tensor
    pub fn get_producer(&self, tensor: TensorId) -> Option<NodeId> {
        self.producer_map.get(&tensor).copied()
    }

    /// Get consumer nodes of a tensor, in insertion order
    pub fn get_consumers(&self, tensor: TensorId) -> &[NodeId] {
        self.consumer_map
            .get(&tensor)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Number of consumer nodes of a tensor
    pub fn consumer_count(&self, tensor: TensorId) -> usize {
        self.get_consumers(tensor).len()
    }

    /// Nodes with no in-graph producer feeding their inputs
    pub fn root_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, n)| n.inputs.iter().all(|t| self.get_producer(*t).is_none()))
            .map(|(id, _)| id)
            .collect()
    }

    /// Nodes none of whose outputs are consumed
    pub fn final_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, n)| n.outputs.iter().all(|t| self.consumer_count(*t) == 0))
            .map(|(id, _)| id)
            .collect()
    }
}
