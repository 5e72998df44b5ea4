//! Node elimination transformations
//!
//! Handles the elimination of nodes from the graph while maintaining connectivity.

use crate::error::{GraphError, GraphResult};
use crate::graph::{Graph, NodeId};

use super::editor::{remove_node, replace_tensor};

/// Result of an elimination operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EliminationResult {
    /// Name of the eliminated node
    pub node_name: String,
    /// Number of operand slots rewired
    pub bridged_connections: usize,
}

/// Remove a single-input, single-output node and bridge around it
///
/// When the output is persistent it survives: the input's producer is made to
/// write the output directly and the input's other readers follow it. This
/// needs an input that is neither persistent nor producer-less. Otherwise the
/// output disappears and its readers are moved onto the input.
pub fn remove_one_to_one_node(graph: &mut Graph, id: NodeId) -> GraphResult<EliminationResult> {
    let node = graph.try_node(id)?;
    if node.inputs.len() != 1 || node.outputs.len() != 1 {
        return Err(GraphError::Precondition {
            node: node.name.clone(),
            reason: "expected exactly one input and one output".to_string(),
        });
    }
    let name = node.name.clone();
    let input = node.inputs[0];
    let output = node.outputs[0];
    let mut bridged = 0;

    if graph.is_persistent(output) {
        let producer = match graph.get_producer(input) {
            Some(p) if !graph.is_persistent(input) => p,
            _ => {
                return Err(GraphError::Precondition {
                    node: name,
                    reason: "persistent output needs a produced, non-persistent input".to_string(),
                })
            }
        };
        remove_node(graph, id)?;
        replace_tensor(graph, producer, input, output)?;
        bridged += 1;
        for consumer in graph.get_consumers(input).to_vec() {
            replace_tensor(graph, consumer, input, output)?;
            bridged += 1;
        }
    } else {
        for consumer in graph.get_consumers(output).to_vec() {
            replace_tensor(graph, consumer, output, input)?;
            bridged += 1;
        }
        remove_node(graph, id)?;
    }

    tracing::debug!(node.name = %name, bridged, "one-to-one node removed");
    Ok(EliminationResult {
        node_name: name,
        bridged_connections: bridged,
    })
}

/// Eliminate dead nodes (no persistent output and no consumers)
///
/// Runs until no more nodes die, so whole dead chains are removed.
pub fn eliminate_dead_nodes(graph: &mut Graph) -> GraphResult<Vec<EliminationResult>> {
    let mut results = Vec::new();
    let mut changed = true;

    while changed {
        changed = false;

        let dead_nodes: Vec<NodeId> = graph
            .nodes()
            .filter(|(_, n)| {
                n.outputs
                    .iter()
                    .all(|out| !graph.is_persistent(*out) && graph.consumer_count(*out) == 0)
            })
            .map(|(id, _)| id)
            .collect();

        for id in dead_nodes {
            let removed = remove_node(graph, id)?;
            results.push(EliminationResult {
                node_name: removed.name,
                bridged_connections: 0,
            });
            changed = true;
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::graph::NodeKind;

    fn make_test_graph() -> Graph {
        let mut b = GraphBuilder::new();
        b.persistent("X");
        b.persistent("Y");
        b.node(NodeKind::Conv, "conv_0", &["X", "W"], &["conv_out"]);
        b.node(NodeKind::Identity, "identity_0", &["conv_out"], &["id_out"]);
        b.node(NodeKind::Relu, "relu_0", &["id_out"], &["Y"]);
        b.build().unwrap()
    }

    #[test]
    fn test_remove_one_to_one_node() {
        let mut g = make_test_graph();
        let identity = g.node_by_name("identity_0").unwrap();

        let r = remove_one_to_one_node(&mut g, identity).unwrap();
        assert_eq!(r.node_name, "identity_0");
        assert_eq!(r.bridged_connections, 1);

        // relu now takes conv_out as input
        let relu = g.node(g.node_by_name("relu_0").unwrap()).unwrap();
        assert_eq!(relu.inputs[0], g.tensor_by_name("conv_out").unwrap());
    }

    #[test]
    fn test_remove_one_to_one_node_persistent_output() {
        let mut b = GraphBuilder::new();
        b.persistent("Y");
        b.node(NodeKind::Conv, "conv_0", &["X", "W"], &["conv_out"]);
        b.node(NodeKind::Relu, "relu_0", &["conv_out"], &["side"]);
        b.node(NodeKind::Identity, "identity_0", &["conv_out"], &["Y"]);
        let mut g = b.build().unwrap();
        let identity = g.node_by_name("identity_0").unwrap();
        let conv = g.node_by_name("conv_0").unwrap();
        let relu = g.node_by_name("relu_0").unwrap();
        let y = g.tensor_by_name("Y").unwrap();

        let r = remove_one_to_one_node(&mut g, identity).unwrap();
        assert_eq!(r.bridged_connections, 2);
        assert_eq!(g.get_producer(y), Some(conv));
        assert_eq!(g.get_consumers(y), &[relu]);
    }

    #[test]
    fn test_remove_one_to_one_node_rejects_graph_input() {
        let mut b = GraphBuilder::new();
        b.persistent("X");
        b.persistent("Y");
        b.node(NodeKind::Identity, "identity_0", &["X"], &["Y"]);
        let mut g = b.build().unwrap();
        let identity = g.node_by_name("identity_0").unwrap();

        assert!(matches!(
            remove_one_to_one_node(&mut g, identity),
            Err(GraphError::Precondition { .. })
        ));
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_eliminate_dead_nodes() {
        let mut b = GraphBuilder::new();
        b.persistent("Y");
        b.node(NodeKind::Relu, "relu_0", &["X"], &["Y"]);
        b.node(NodeKind::Cast, "cast_0", &["X"], &["a"]);
        b.node(NodeKind::Identity, "identity_0", &["a"], &["b"]);
        let mut g = b.build().unwrap();

        let results = eliminate_dead_nodes(&mut g).unwrap();
        let names: Vec<_> = results.iter().map(|r| r.node_name.as_str()).collect();
        assert_eq!(names, vec!["identity_0", "cast_0"]);
        assert_eq!(g.node_count(), 1);
    }
}
