//! Graph handle and map types
//!
//! Defines the core data structures for efficient graph traversal.

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::node::Node;

/// Stable handle of a node inside one [`Graph`](super::Graph)
///
/// Handles are never reused, so a handle to a removed node stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Stable handle of a tensor inside one [`Graph`](super::Graph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for TensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Operand list of a node; most nodes have at most four
pub type TensorList = SmallVec<[TensorId; 4]>;

/// Consumer list of a tensor
pub type NodeList = SmallVec<[NodeId; 4]>;

/// Type alias for producer map: tensor → producer node
pub type ProducerMap = FxHashMap<TensorId, NodeId>;

/// Type alias for consumer map: tensor → consumer nodes (insertion order)
pub type ConsumerMap = FxHashMap<TensorId, NodeList>;

/// Type alias for node map: node handle → node (insertion order preserved)
pub type NodeMap = IndexMap<NodeId, Node>;

/// Record `node` as producer of every output in the producer map
///
/// Returns the first output that already has a different producer.
pub(crate) fn link_outputs(
    producers: &mut ProducerMap,
    id: NodeId,
    outputs: &[TensorId],
) -> Result<(), (TensorId, NodeId)> {
    if let Some((t, existing)) = outputs
        .iter()
        .find_map(|t| producers.get(t).filter(|p| **p != id).map(|p| (*t, *p)))
    {
        return Err((t, existing));
    }
    for t in outputs {
        producers.insert(*t, id);
    }
    Ok(())
}

/// Record `node` as consumer of every input, once per distinct tensor
pub(crate) fn link_inputs(consumers: &mut ConsumerMap, id: NodeId, inputs: &[TensorId]) {
    for t in inputs {
        let list = consumers.entry(*t).or_default();
        if !list.contains(&id) {
            list.push(id);
        }
    }
}

/// Drop `node` from the producer and consumer maps
pub(crate) fn unlink_node(
    producers: &mut ProducerMap,
    consumers: &mut ConsumerMap,
    id: NodeId,
    node: &Node,
) {
    for t in &node.outputs {
        if producers.get(t) == Some(&id) {
            producers.remove(t);
        }
    }
    for t in &node.inputs {
        if let Some(list) = consumers.get_mut(t) {
            list.retain(|n| *n != id);
            if list.is_empty() {
                consumers.remove(t);
            }
        }
    }
}
