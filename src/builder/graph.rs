//! Name-based graph construction
//!
//! Builds program and pattern graphs from tensor names instead of handles.

use rustc_hash::FxHashMap;

use crate::error::GraphResult;
use crate::graph::{Graph, Node, NodeKind, NodeParams, NumericRange, Tensor, TensorId};
use crate::transform::editor;

/// Builder for program and pattern graphs
///
/// Tensors are created on first mention. Nodes are added in declaration
/// order when [`build`](Self::build) runs, so iteration order follows the
/// declarations.
///
/// # Example
///
/// ```ignore
/// let mut b = GraphBuilder::new();
/// b.persistent("Y");
/// b.node(NodeKind::Conv, "conv_0", &["X", "W"], &["conv_out"]);
/// b.node(NodeKind::Relu, "relu_0", &["conv_out"], &["Y"]);
/// let graph = b.build()?;
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
    names: FxHashMap<String, TensorId>,
    pending: Vec<Node>,
}

impl GraphBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create an intermediate tensor
    pub fn tensor(&mut self, name: &str) -> TensorId {
        if let Some(id) = self.names.get(name) {
            return *id;
        }
        let id = self.graph.add_tensor(Tensor::new(name));
        self.names.insert(name.to_string(), id);
        id
    }

    /// Get or create a tensor and flag it persistent
    pub fn persistent(&mut self, name: &str) -> TensorId {
        let id = self.tensor(name);
        if let Some(t) = self.graph.tensor_mut(id) {
            t.persistent = true;
        }
        id
    }

    /// Get or create a tensor and attach a range
    pub fn range(&mut self, name: &str, range: NumericRange) -> TensorId {
        let id = self.tensor(name);
        if let Some(t) = self.graph.tensor_mut(id) {
            t.range = Some(range);
        }
        id
    }

    /// Declare a node without parameters
    pub fn node(
        &mut self,
        kind: NodeKind,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
    ) -> &mut Self {
        self.node_with(kind, name, inputs, outputs, NodeParams::None)
    }

    /// Declare a node with a parameter payload
    pub fn node_with(
        &mut self,
        kind: NodeKind,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
        params: NodeParams,
    ) -> &mut Self {
        let inputs = inputs.iter().map(|t| self.tensor(t)).collect();
        let outputs = outputs.iter().map(|t| self.tensor(t)).collect();
        self.pending.push(
            Node::new(kind, name)
                .with_inputs(inputs)
                .with_outputs(outputs)
                .with_params(params),
        );
        self
    }

    /// Attach a range annotation to the last declared node
    pub fn annotate(&mut self, range: NumericRange) -> &mut Self {
        if let Some(node) = self.pending.last_mut() {
            node.range = Some(range);
        }
        self
    }

    /// Add all declared nodes and return the graph
    pub fn build(self) -> GraphResult<Graph> {
        let Self {
            mut graph, pending, ..
        } = self;
        editor::add_nodes(&mut graph, pending)?;
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn test_build_simple_chain() {
        let mut b = GraphBuilder::new();
        b.persistent("Y");
        b.node(NodeKind::Conv, "conv_0", &["X", "W"], &["conv_out"])
            .node(NodeKind::Relu, "relu_0", &["conv_out"], &["Y"]);
        let g = b.build().unwrap();

        assert_eq!(g.node_count(), 2);
        let y = g.tensor_by_name("Y").unwrap();
        assert!(g.is_persistent(y));
        assert_eq!(g.get_producer(y), g.node_by_name("relu_0"));
    }

    #[test]
    fn test_tensor_reuse_by_name() {
        let mut b = GraphBuilder::new();
        let a = b.tensor("a");
        assert_eq!(b.tensor("a"), a);
        assert_eq!(b.persistent("a"), a);
    }

    #[test]
    fn test_build_rejects_invalid_node() {
        let mut b = GraphBuilder::new();
        b.node(NodeKind::Add, "add_0", &["a"], &["b"]);
        assert!(matches!(b.build(), Err(GraphError::InvalidNode(_))));
    }

    #[test]
    fn test_annotate_and_params() {
        let mut b = GraphBuilder::new();
        b.node_with(NodeKind::Concat, "concat_0", &["a", "b"], &["c"], NodeParams::Axis(1))
            .annotate(NumericRange::new(-4.0, 4.0));
        b.range("a", NumericRange::new(0.0, 1.0));
        let g = b.build().unwrap();
        let concat = g.node(g.node_by_name("concat_0").unwrap()).unwrap();

        assert_eq!(concat.params, NodeParams::Axis(1));
        assert_eq!(concat.range, Some(NumericRange::new(-4.0, 4.0)));
        let a = g.tensor(g.tensor_by_name("a").unwrap()).unwrap();
        assert_eq!(a.range, Some(NumericRange::new(0.0, 1.0)));
    }
}
