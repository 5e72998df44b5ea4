//! Graph index maintenance
//!
//! Low-level operations that keep the producer/consumer maps in sync with the
//! node arena. Invariant checks (single producer, acyclicity, kind rules) live
//! here so every editor primitive inherits them.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::error::{GraphError, GraphResult};

use super::context::Graph;
use super::maps::{link_inputs, link_outputs, unlink_node, NodeId, TensorId};
use super::node::Node;

impl Graph {
    // ========================================================================
    // Node insertion / removal
    // ========================================================================

    /// Insert a node, assigning a fresh handle
    ///
    /// Nothing is modified when a check fails.
    pub(crate) fn insert_node(&mut self, node: Node) -> GraphResult<NodeId> {
        let id = NodeId(self.next_node);
        self.check_links(id, &node)?;

        link_outputs(&mut self.producer_map, id, &node.outputs)
            .map_err(|(tensor, existing)| GraphError::DuplicateProducer { tensor, existing })?;
        link_inputs(&mut self.consumer_map, id, &node.inputs);
        self.next_node += 1;

        tracing::trace!(node.id = %id, node.name = %node.name, node.kind = %node.kind, "node added");
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node and all of its links
    pub(crate) fn erase_node(&mut self, id: NodeId) -> GraphResult<Node> {
        let node = self
            .nodes
            .shift_remove(&id)
            .ok_or(GraphError::NodeNotFound(id))?;
        unlink_node(&mut self.producer_map, &mut self.consumer_map, id, &node);
        tracing::trace!(node.id = %id, node.name = %node.name, "node removed");
        Ok(node)
    }

    /// Edit a node in place, re-validating and re-linking afterwards
    ///
    /// The node keeps its handle and its position in iteration order. If the
    /// edited node breaks an invariant the previous node is restored.
    pub(crate) fn rewrite_node<F>(&mut self, id: NodeId, edit: F) -> GraphResult<()>
    where
        F: FnOnce(&mut Node),
    {
        let original = self.try_node(id)?.clone();
        let mut edited = original.clone();
        edit(&mut edited);

        // Free the old outputs so the producer check only sees other nodes.
        for t in &original.outputs {
            if self.producer_map.get(t) == Some(&id) {
                self.producer_map.remove(t);
            }
        }
        if let Err(err) = self.check_links(id, &edited) {
            for t in &original.outputs {
                self.producer_map.insert(*t, id);
            }
            return Err(err);
        }
        for t in &edited.outputs {
            self.producer_map.insert(*t, id);
        }

        // Inputs that stay keep their slot in the consumer lists.
        for t in original.inputs.iter().filter(|t| !edited.inputs.contains(t)) {
            if let Some(list) = self.consumer_map.get_mut(t) {
                list.retain(|n| *n != id);
                if list.is_empty() {
                    self.consumer_map.remove(t);
                }
            }
        }
        link_inputs(&mut self.consumer_map, id, &edited.inputs);

        if let Some(slot) = self.nodes.get_mut(&id) {
            *slot = edited;
        }
        Ok(())
    }

    /// Run a multi-step edit as one unit
    ///
    /// If `edit` fails the graph is restored to its state before the call,
    /// node order and consumer-list order included.
    pub(crate) fn atomically<T, F>(&mut self, edit: F) -> GraphResult<T>
    where
        F: FnOnce(&mut Graph) -> GraphResult<T>,
    {
        let snapshot = self.clone();
        let result = edit(self);
        if let Err(err) = &result {
            tracing::trace!(error = %err, "edit rolled back");
            *self = snapshot;
        }
        result
    }

    // ========================================================================
    // Invariant checks
    // ========================================================================

    /// Validate a node that is about to be linked under `id`
    ///
    /// Expects `id` itself to be unlinked from the maps.
    fn check_links(&self, id: NodeId, node: &Node) -> GraphResult<()> {
        node.validate()?;

        for t in node.inputs.iter().chain(node.outputs.iter()) {
            if !self.has_tensor(*t) {
                return Err(GraphError::TensorNotFound(*t));
            }
        }

        let mut seen = FxHashSet::default();
        for t in &node.outputs {
            if !seen.insert(*t) {
                return Err(GraphError::InvalidNode(format!(
                    "'{}' lists output {} twice",
                    node.name, t
                )));
            }
            if let Some(existing) = self.get_producer(*t).filter(|p| *p != id) {
                return Err(GraphError::DuplicateProducer {
                    tensor: *t,
                    existing,
                });
            }
        }

        if self.closes_cycle(id, &node.inputs, &node.outputs) {
            return Err(GraphError::CycleDetected(node.name.clone()));
        }
        Ok(())
    }

    /// Whether linking `inputs → id → outputs` would make the graph cyclic
    fn closes_cycle(&self, id: NodeId, inputs: &[TensorId], outputs: &[TensorId]) -> bool {
        if inputs.iter().any(|t| outputs.contains(t)) {
            return true;
        }

        let upstream: FxHashSet<NodeId> = inputs
            .iter()
            .filter_map(|t| self.get_producer(*t))
            .filter(|p| *p != id)
            .collect();
        if upstream.is_empty() {
            return false;
        }

        let mut visited = FxHashSet::default();
        let mut queue: VecDeque<NodeId> = outputs
            .iter()
            .flat_map(|t| self.get_consumers(*t).iter().copied())
            .filter(|c| *c != id)
            .collect();

        while let Some(current) = queue.pop_front() {
            if upstream.contains(&current) {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.node(current) {
                for t in &node.outputs {
                    queue.extend(self.get_consumers(*t).iter().filter(|c| **c != id));
                }
            }
        }
        false
    }
}
