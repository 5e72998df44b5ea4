//! Graph editing primitives
//!
//! The functions in this module are the only sanctioned way to mutate a
//! [`Graph`] once built. Each of them keeps the producer/consumer maps in sync
//! and refuses edits that would give a tensor two producers or close a cycle.
//!
//! # Example
//!
//! ```ignore
//! use graph_rewrite::transform::editor;
//!
//! // Re-root every consumer of `id_out` onto `conv_out`, then drop the node
//! editor::remove_node_with_producer(&mut graph, identity, conv)?;
//! ```

use crate::builder::fields::{unique_node_name, unique_tensor_name};
use crate::error::{GraphError, GraphResult};
use crate::graph::{Graph, Node, NodeId, NodeKind, Tensor, TensorId};

/// Operand slot of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    /// Input at the given index
    Input(usize),
    /// Output at the given index
    Output(usize),
}

// ============================================================================
// Insertion
// ============================================================================

/// Add a node and wire its operands into the graph maps
///
/// Fails without modifying the graph if the node is invalid for its kind,
/// references an unknown tensor, would give a tensor a second producer, or
/// would close a cycle.
pub fn add_node(graph: &mut Graph, node: Node) -> GraphResult<NodeId> {
    graph.insert_node(node)
}

/// Add several nodes in order
///
/// All or nothing: if one node is rejected, the nodes already added by this
/// call are removed again and the error is returned.
pub fn add_nodes<I>(graph: &mut Graph, nodes: I) -> GraphResult<Vec<NodeId>>
where
    I: IntoIterator<Item = Node>,
{
    let mut added = Vec::new();
    for node in nodes {
        let name = node.name.clone();
        match graph.insert_node(node) {
            Ok(id) => added.push(id),
            Err(err) => {
                tracing::debug!(node.name = %name, error = %err, "adding node failed, rolling back batch");
                for id in added.into_iter().rev() {
                    graph.erase_node(id)?;
                }
                return Err(err);
            }
        }
    }
    Ok(added)
}

/// Add a detached copy of a node under a fresh name
///
/// The copy consumes the same inputs and produces `outputs`, which must be
/// producer-free.
pub fn clone_node(graph: &mut Graph, id: NodeId, outputs: &[TensorId]) -> GraphResult<NodeId> {
    let node = graph.try_node(id)?;
    let name = unique_node_name(graph, &node.name);
    let mut copy = node.clone_as(name);
    copy.outputs = outputs.iter().copied().collect();
    graph.insert_node(copy)
}

// ============================================================================
// Removal
// ============================================================================

/// Detach a node from every tensor it touches
///
/// Tensors it produced become producer-less. For a persistent output the
/// caller must reconnect a producer before the graph is handed on.
pub fn remove_node(graph: &mut Graph, id: NodeId) -> GraphResult<Node> {
    graph.erase_node(id)
}

/// Remove a node and re-root its outputs on another node
///
/// Every consumer of output `i` of the removed node reads output `i` of
/// `new_producer` afterwards. Both nodes must have the same number of
/// outputs. If a consumer cannot be rewired the graph is left as it was.
pub fn remove_node_with_producer(
    graph: &mut Graph,
    id: NodeId,
    new_producer: NodeId,
) -> GraphResult<Node> {
    graph.atomically(|g| reroot(g, id, new_producer))
}

fn reroot(graph: &mut Graph, id: NodeId, new_producer: NodeId) -> GraphResult<Node> {
    let expected = graph.try_node(id)?.outputs.len();
    let actual = graph.try_node(new_producer)?.outputs.len();
    if id == new_producer || expected != actual {
        return Err(GraphError::OutputStructureMismatch { expected, actual });
    }

    let removed = graph.erase_node(id)?;
    let replacements = graph.try_node(new_producer)?.outputs.clone();
    for (old, new) in removed.outputs.iter().zip(replacements.iter()) {
        let consumers = graph.get_consumers(*old).to_vec();
        for consumer in consumers {
            replace_tensor(graph, consumer, *old, *new)?;
        }
    }

    tracing::trace!(
        node.name = %removed.name,
        new_producer = %new_producer,
        "node removed, outputs re-rooted"
    );
    Ok(removed)
}

/// Remove several nodes
///
/// All or nothing: a missing or repeated handle leaves the graph as it was.
pub fn remove_nodes(graph: &mut Graph, ids: &[NodeId]) -> GraphResult<Vec<Node>> {
    if let Some(missing) = ids.iter().find(|id| !graph.contains_node(**id)) {
        return Err(GraphError::NodeNotFound(*missing));
    }
    graph.atomically(|g| ids.iter().map(|id| g.erase_node(*id)).collect())
}

/// Remove several nodes, re-rooting each on the producer at the same position
///
/// All or nothing, like [`remove_node_with_producer`].
pub fn remove_nodes_with_producers(
    graph: &mut Graph,
    ids: &[NodeId],
    producers: &[NodeId],
) -> GraphResult<Vec<Node>> {
    if ids.len() != producers.len() {
        return Err(GraphError::Internal(format!(
            "{} nodes to remove but {} new producers",
            ids.len(),
            producers.len()
        )));
    }
    graph.atomically(|g| {
        ids.iter()
            .zip(producers)
            .map(|(id, producer)| reroot(g, *id, *producer))
            .collect()
    })
}

// ============================================================================
// Operand rewiring
// ============================================================================

/// Swap one operand of a node, keeping its slot
///
/// `old` is matched by identity among both inputs and outputs; every slot
/// holding it is rewritten. Fails with [`GraphError::OperandNotFound`] when
/// `old` is not an operand of the node.
pub fn replace_tensor(
    graph: &mut Graph,
    node: NodeId,
    old: TensorId,
    new: TensorId,
) -> GraphResult<()> {
    if !graph.try_node(node)?.has_operand(old) {
        return Err(GraphError::OperandNotFound { node, tensor: old });
    }
    graph.rewrite_node(node, |n| {
        n.replace_operand(old, new);
    })?;
    tracing::trace!(node.id = %node, old = %old, new = %new, "operand replaced");
    Ok(())
}

/// Swap a tensor on its producer and on every consumer
///
/// Returns the number of nodes rewritten. If one node rejects the swap, none
/// of them is rewritten.
pub fn replace_tensor_everywhere(
    graph: &mut Graph,
    old: TensorId,
    new: TensorId,
) -> GraphResult<usize> {
    let mut touched: Vec<NodeId> = graph.get_producer(old).into_iter().collect();
    touched.extend(graph.get_consumers(old).iter().copied());
    graph.atomically(|g| {
        for node in &touched {
            replace_tensor(g, *node, old, new)?;
        }
        Ok(touched.len())
    })
}

/// Point input `index` of a node at another tensor
pub fn replace_input(
    graph: &mut Graph,
    node: NodeId,
    index: usize,
    tensor: TensorId,
) -> GraphResult<()> {
    replace_port(graph, node, Port::Input(index), tensor)
}

/// Point output `index` of a node at another tensor
pub fn replace_output(
    graph: &mut Graph,
    node: NodeId,
    index: usize,
    tensor: TensorId,
) -> GraphResult<()> {
    replace_port(graph, node, Port::Output(index), tensor)
}

fn replace_port(graph: &mut Graph, node: NodeId, port: Port, tensor: TensorId) -> GraphResult<()> {
    let n = graph.try_node(node)?;
    let in_range = match port {
        Port::Input(i) => i < n.inputs.len(),
        Port::Output(i) => i < n.outputs.len(),
    };
    if !in_range {
        return Err(GraphError::InvalidNode(format!(
            "'{}' has no {:?} slot",
            n.name, port
        )));
    }
    graph.rewrite_node(node, |n| match port {
        Port::Input(i) => n.inputs[i] = tensor,
        Port::Output(i) => n.outputs[i] = tensor,
    })
}

/// Edit a node in place and re-attach it
///
/// The node keeps its handle. If the edited node is rejected the graph is
/// left as it was.
pub fn edit_node<F>(graph: &mut Graph, node: NodeId, edit: F) -> GraphResult<()>
where
    F: FnOnce(&mut Node),
{
    graph.rewrite_node(node, edit)
}

/// Put a memcpy in front of (or behind) one operand slot
///
/// For an input slot the memcpy reads the original tensor and the node reads
/// the copy. For an output slot the node writes the copy and the memcpy
/// writes the original tensor, so persistent outputs keep their identity.
pub fn insert_memcpy(graph: &mut Graph, node: NodeId, port: Port) -> GraphResult<NodeId> {
    let n = graph.try_node(node)?;
    let original = match port {
        Port::Input(i) => n.inputs.get(i),
        Port::Output(i) => n.outputs.get(i),
    }
    .copied()
    .ok_or_else(|| GraphError::InvalidNode(format!("'{}' has no {:?} slot", n.name, port)))?;

    let source = graph.try_tensor(original)?;
    let copy_name = unique_tensor_name(graph, &format!("{}_copy", source.name));
    let mut copy = Tensor::new(copy_name);
    copy.range = source.range;
    let copy = graph.add_tensor(copy);
    let memcpy_name = unique_node_name(graph, "memcpy");

    match port {
        Port::Input(i) => {
            let memcpy = graph.insert_node(
                Node::new(NodeKind::Memcpy, memcpy_name)
                    .with_inputs([original].into_iter().collect())
                    .with_outputs([copy].into_iter().collect()),
            )?;
            if let Err(err) = replace_input(graph, node, i, copy) {
                graph.erase_node(memcpy)?;
                return Err(err);
            }
            Ok(memcpy)
        }
        Port::Output(i) => {
            replace_output(graph, node, i, copy)?;
            let added = graph.insert_node(
                Node::new(NodeKind::Memcpy, memcpy_name)
                    .with_inputs([copy].into_iter().collect())
                    .with_outputs([original].into_iter().collect()),
            );
            match added {
                Ok(memcpy) => Ok(memcpy),
                Err(err) => {
                    replace_output(graph, node, i, original)?;
                    Err(err)
                }
            }
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Whether a tensor may be dropped by a rewrite
///
/// False when it is persistent or read by more than `max_consumers` nodes.
pub fn can_eliminate_tensor(graph: &Graph, tensor: TensorId, max_consumers: usize) -> bool {
    graph.has_tensor(tensor)
        && !graph.is_persistent(tensor)
        && graph.consumer_count(tensor) <= max_consumers
}
