//! Advanced graph accessor methods
//!
//! High-level methods for pattern matching and graph analysis.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use super::context::Graph;
use super::maps::{NodeId, TensorId};
use super::node::NodeKind;

impl Graph {
    // ========================================================================
    // Pattern matching helpers
    // ========================================================================

    /// Find nodes by kind, in iteration order
    pub fn find_nodes_by_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, n)| n.kind == kind)
            .map(|(id, _)| id)
            .collect()
    }

    /// Check if a node has the given kind
    pub fn node_matches_kind(&self, id: NodeId, kind: NodeKind) -> bool {
        self.node(id).map(|n| n.kind == kind).unwrap_or(false)
    }

    /// Consumers of every output, concatenated in output order
    ///
    /// A node reading two outputs of `id` appears once per output.
    pub fn output_consumers(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| {
                n.outputs
                    .iter()
                    .flat_map(|t| self.get_consumers(*t).iter().copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct producers of a node's inputs, in input order
    pub fn node_producers(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = FxHashSet::default();
        self.node(id)
            .map(|n| {
                n.inputs
                    .iter()
                    .filter_map(|t| self.get_producer(*t))
                    .filter(|p| seen.insert(*p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct consumers of a node's outputs, in output order
    pub fn node_consumers(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = FxHashSet::default();
        self.output_consumers(id)
            .into_iter()
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Check if a tensor has exactly one consumer and is not persistent
    pub fn is_single_use(&self, tensor: TensorId) -> bool {
        self.consumer_count(tensor) == 1 && !self.is_persistent(tensor)
    }

    /// Persistent tensors nothing in the graph produces
    pub fn graph_inputs(&self) -> Vec<TensorId> {
        self.tensors()
            .filter(|(id, t)| t.persistent && self.get_producer(*id).is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Persistent tensors produced inside the graph
    pub fn graph_outputs(&self) -> Vec<TensorId> {
        self.tensors()
            .filter(|(id, t)| t.persistent && self.get_producer(*id).is_some())
            .map(|(id, _)| id)
            .collect()
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    /// Nodes in topological order (Kahn), ties broken by iteration order
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut pending: FxHashMap<NodeId, usize> = self
            .node_ids()
            .map(|id| (id, self.node_producers(id).len()))
            .collect();

        let mut ready: VecDeque<NodeId> = self
            .node_ids()
            .filter(|id| pending.get(id) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(self.node_count());

        while let Some(id) = ready.pop_front() {
            order.push(id);
            for consumer in self.node_consumers(id) {
                if let Some(count) = pending.get_mut(&consumer) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(consumer);
                    }
                }
            }
        }

        order
    }

    /// Check the acyclicity invariant
    pub fn is_acyclic(&self) -> bool {
        self.topological_order().len() == self.node_count()
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::GraphBuilder;
    use crate::graph::{Graph, NodeKind};

    fn make_diamond() -> Graph {
        let mut b = GraphBuilder::new();
        b.persistent("X");
        b.persistent("Y");
        b.node(NodeKind::Split, "split_0", &["X"], &["l", "r"]);
        b.node(NodeKind::Relu, "relu_0", &["l"], &["l2"]);
        b.node(NodeKind::Relu, "relu_1", &["r"], &["r2"]);
        b.node(NodeKind::Add, "add_0", &["l2", "r2"], &["Y"]);
        b.build().unwrap()
    }

    #[test]
    fn test_find_nodes_by_kind() {
        let g = make_diamond();
        assert_eq!(g.find_nodes_by_kind(NodeKind::Relu).len(), 2);
        assert!(g.find_nodes_by_kind(NodeKind::Conv).is_empty());
    }

    #[test]
    fn test_node_producers_consumers() {
        let g = make_diamond();
        let split = g.node_by_name("split_0").unwrap();
        let add = g.node_by_name("add_0").unwrap();
        let relu0 = g.node_by_name("relu_0").unwrap();
        let relu1 = g.node_by_name("relu_1").unwrap();

        assert_eq!(g.node_consumers(split), vec![relu0, relu1]);
        assert_eq!(g.node_producers(add), vec![relu0, relu1]);
        assert!(g.node_producers(split).is_empty());
    }

    #[test]
    fn test_output_consumers_keep_duplicates() {
        let mut b = GraphBuilder::new();
        b.node(NodeKind::Split, "split_0", &["X"], &["a", "b"]);
        b.node(NodeKind::Add, "add_0", &["a", "b"], &["Y"]);
        let g = b.build().unwrap();
        let split = g.node_by_name("split_0").unwrap();
        let add = g.node_by_name("add_0").unwrap();

        assert_eq!(g.output_consumers(split), vec![add, add]);
        assert_eq!(g.node_consumers(split), vec![add]);
    }

    #[test]
    fn test_graph_inputs_outputs() {
        let g = make_diamond();
        assert_eq!(g.graph_inputs(), vec![g.tensor_by_name("X").unwrap()]);
        assert_eq!(g.graph_outputs(), vec![g.tensor_by_name("Y").unwrap()]);
    }

    #[test]
    fn test_is_single_use() {
        let g = make_diamond();
        assert!(g.is_single_use(g.tensor_by_name("l").unwrap()));
        assert!(!g.is_single_use(g.tensor_by_name("Y").unwrap()));
    }

    #[test]
    fn test_topological_order() {
        let g = make_diamond();
        let order: Vec<_> = g
            .topological_order()
            .into_iter()
            .map(|id| g.node(id).unwrap().name.clone())
            .collect();
        assert_eq!(order, vec!["split_0", "relu_0", "relu_1", "add_0"]);
        assert!(g.is_acyclic());
    }
}
