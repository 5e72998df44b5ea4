//! Elimination passes
//!
//! Passes that remove unnecessary nodes from the graph.

#![allow(missing_docs)]

use crate::error::{GraphError, GraphResult};
use crate::graph::{Graph, NodeId, NodeKind, NumericRange, TensorId};
use crate::transform::editor::{remove_node, remove_node_with_producer, replace_tensor};
use crate::transform::eliminate::eliminate_dead_nodes;
use crate::transform::{CommitMode, DeviceClass, PassConfig};

use super::common::{GraphPass, PassResult};

/// Which operand survives a pass-through elimination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Survivor {
    /// Output is persistent: the input's producer writes it directly
    Output { producer: NodeId },
    /// Output goes away: its readers move to the input
    Input,
}

/// Validated elimination of one target node
#[derive(Debug, Clone)]
struct Plan {
    node: NodeId,
    name: String,
    input: TensorId,
    output: TensorId,
    range: Option<NumericRange>,
    survivor: Survivor,
}

/// Eliminate single-input, single-output pass-through nodes
///
/// Targets are found by a type scan. Every target must have exactly one input
/// and one output, must not have both of them persistent, and must not be
/// directly chained to another target. A persistent output additionally needs
/// an input with a producer. Any violation fails the whole pass.
///
/// With [`CommitMode::Eager`] targets are validated and rewritten one at a
/// time in graph order, so a failure leaves earlier targets rewritten. With
/// [`CommitMode::Staged`] all targets are validated first and the rewrite is
/// applied to a copy that replaces the graph only if every rewrite succeeds.
#[derive(Debug, Clone)]
pub struct EliminatePassThrough {
    target: NodeKind,
    devices: &'static [DeviceClass],
}

impl Default for EliminatePassThrough {
    fn default() -> Self {
        Self::new()
    }
}

impl EliminatePassThrough {
    /// Eliminate `Identity` nodes
    pub fn new() -> Self {
        Self::for_kind(NodeKind::Identity)
    }

    /// Eliminate nodes of `target`
    ///
    /// The pass fails when run for a kind that does not forward its input
    /// unchanged.
    pub fn for_kind(target: NodeKind) -> Self {
        Self {
            target,
            devices: &DeviceClass::ALL,
        }
    }

    /// Restrict the device classes the pass runs for
    pub fn with_devices(mut self, devices: &'static [DeviceClass]) -> Self {
        self.devices = devices;
        self
    }

    pub fn target(&self) -> NodeKind {
        self.target
    }

    fn precondition(name: &str, reason: impl Into<String>) -> GraphError {
        GraphError::Precondition {
            node: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Check the structural preconditions of one target against `graph`
    fn plan(&self, graph: &Graph, id: NodeId) -> GraphResult<Plan> {
        let node = graph.try_node(id)?;
        let name = node.name.as_str();
        let (input, output) = match (node.inputs.as_slice(), node.outputs.as_slice()) {
            ([input], [output]) => (*input, *output),
            _ => return Err(Self::precondition(name, "expected one input and one output")),
        };

        if graph.is_persistent(input) && graph.is_persistent(output) {
            return Err(Self::precondition(name, "input and output are both persistent"));
        }

        let producer = graph.get_producer(input);
        let chained = producer
            .into_iter()
            .chain(graph.get_consumers(output).iter().copied())
            .any(|n| graph.node_matches_kind(n, self.target));
        if chained {
            return Err(Self::precondition(
                name,
                format!("chained to another {} node", self.target),
            ));
        }

        let survivor = if graph.is_persistent(output) {
            match producer {
                Some(producer) => Survivor::Output { producer },
                None => {
                    return Err(Self::precondition(
                        name,
                        "persistent output but the input has no producer",
                    ))
                }
            }
        } else {
            Survivor::Input
        };

        Ok(Plan {
            node: id,
            name: node.name.clone(),
            input,
            output,
            range: node.range,
            survivor,
        })
    }

    /// Rewrite the graph around one validated target
    fn commit(graph: &mut Graph, plan: &Plan) -> GraphResult<()> {
        let Plan {
            node,
            input,
            output,
            ..
        } = *plan;

        match plan.survivor {
            Survivor::Output { producer } => {
                migrate_range(graph, plan.range, input, output);
                remove_node(graph, node)?;
                replace_tensor(graph, producer, input, output)?;
                for consumer in graph.get_consumers(input).to_vec() {
                    replace_tensor(graph, consumer, input, output)?;
                }
            }
            Survivor::Input => {
                migrate_range(graph, plan.range, output, input);
                let producer = graph
                    .get_producer(input)
                    .filter(|p| graph.node(*p).map(|n| n.outputs.len()) == Some(1));
                match producer {
                    Some(producer) => {
                        remove_node_with_producer(graph, node, producer)?;
                    }
                    None => {
                        for consumer in graph.get_consumers(output).to_vec() {
                            replace_tensor(graph, consumer, output, input)?;
                        }
                        remove_node(graph, node)?;
                    }
                }
            }
        }

        tracing::debug!(node.name = %plan.name, survivor = ?plan.survivor, "node eliminated");
        Ok(())
    }

    fn run_eager(&self, graph: &mut Graph, targets: &[NodeId]) -> GraphResult<PassResult> {
        let mut result = PassResult::new();
        result.patterns_matched = targets.len();

        for id in targets {
            let plan = self.plan(graph, *id)?;
            Self::commit(graph, &plan)?;
            result.record_elimination(&plan.name);
        }
        Ok(result)
    }

    fn run_staged(&self, graph: &mut Graph, targets: &[NodeId]) -> GraphResult<PassResult> {
        let mut result = PassResult::new();
        result.patterns_matched = targets.len();

        for id in targets {
            self.plan(graph, *id)?;
        }

        // Operands are re-read at commit time since earlier rewrites may have
        // moved them.
        let mut staged = graph.clone();
        for id in targets {
            let plan = self.plan(&staged, *id)?;
            Self::commit(&mut staged, &plan)?;
            result.record_elimination(&plan.name);
        }

        *graph = staged;
        Ok(result)
    }
}

/// Move a range annotation onto the surviving tensor
///
/// The node's own range wins; otherwise the surviving tensor keeps its range
/// or inherits the dropped tensor's.
fn migrate_range(
    graph: &mut Graph,
    node_range: Option<NumericRange>,
    dropped: TensorId,
    survivor: TensorId,
) {
    let dropped_range = graph.tensor(dropped).and_then(|t| t.range);
    if let Some(t) = graph.tensor_mut(survivor) {
        t.range = node_range.or(t.range).or(dropped_range);
    }
}

impl GraphPass for EliminatePassThrough {
    fn name(&self) -> &'static str {
        "EliminatePassThrough"
    }

    fn supported_devices(&self) -> &'static [DeviceClass] {
        self.devices
    }

    #[tracing::instrument(skip_all, fields(pass = self.name(), target = %self.target))]
    fn run(&self, graph: &mut Graph, config: &PassConfig) -> GraphResult<PassResult> {
        if !self.target.is_pass_through() {
            return Err(GraphError::PassFailed {
                pass: self.name(),
                reason: format!("{} nodes do not forward their input", self.target),
            });
        }
        let targets = graph.find_nodes_by_kind(self.target);

        let outcome = match config.commit {
            CommitMode::Eager => self.run_eager(graph, &targets),
            CommitMode::Staged => self.run_staged(graph, &targets),
        };
        if let Err(err) = &outcome {
            tracing::warn!(error = %err, commit = ?config.commit, "pass aborted");
        }
        outcome
    }

    fn is_applicable(&self, graph: &Graph) -> bool {
        graph.nodes().any(|(_, n)| n.kind == self.target)
    }
}

/// Remove nodes whose outputs are neither persistent nor consumed
#[derive(Debug, Default)]
pub struct EliminateDeadNodes;

impl EliminateDeadNodes {
    pub fn new() -> Self {
        Self
    }
}

impl GraphPass for EliminateDeadNodes {
    fn name(&self) -> &'static str {
        "EliminateDeadNodes"
    }

    fn run(&self, graph: &mut Graph, _config: &PassConfig) -> GraphResult<PassResult> {
        let mut result = PassResult::new();
        for eliminated in eliminate_dead_nodes(graph)? {
            result.record_elimination(&eliminated.node_name);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::transformers::common::{execute_pass, run_pass};
    use test_case::test_case;

    fn make_test_graph() -> Graph {
        let mut b = GraphBuilder::new();
        b.persistent("X");
        b.persistent("Y");
        b.node(NodeKind::Conv, "conv_0", &["X", "W"], &["conv_out"]);
        b.node(NodeKind::Identity, "identity_0", &["conv_out"], &["id_out"])
            .annotate(NumericRange::new(-1.0, 1.0));
        b.node(NodeKind::Relu, "relu_0", &["id_out"], &["Y"]);
        b.build().unwrap()
    }

    /// producer -> target (persistent output) -> consumer
    fn make_persistent_output_graph() -> Graph {
        let mut b = GraphBuilder::new();
        b.persistent("X");
        b.persistent("Y");
        b.node(NodeKind::Relu, "producer", &["X"], &["a"]);
        b.node(NodeKind::Identity, "target", &["a"], &["Y"])
            .annotate(NumericRange::new(0.0, 6.0));
        b.node(NodeKind::Relu, "consumer", &["Y"], &["Z"]);
        b.build().unwrap()
    }

    #[test_case(CommitMode::Eager; "eager")]
    #[test_case(CommitMode::Staged; "staged")]
    fn test_eliminate_identity(commit: CommitMode) {
        let mut g = make_test_graph();
        let config = PassConfig::default().with_commit(commit);

        let result = execute_pass(&mut g, &EliminatePassThrough::new(), &config).unwrap();
        assert_eq!(result.nodes_eliminated, 1);
        assert_eq!(result.transformed_nodes, vec!["identity_0".to_string()]);

        let conv_out = g.tensor_by_name("conv_out").unwrap();
        let relu = g.node(g.node_by_name("relu_0").unwrap()).unwrap();
        assert_eq!(relu.inputs[0], conv_out);
        assert_eq!(g.tensor(conv_out).unwrap().range, Some(NumericRange::new(-1.0, 1.0)));
        assert_eq!(g.node_count(), 2);
    }

    #[test_case(CommitMode::Eager; "eager")]
    #[test_case(CommitMode::Staged; "staged")]
    fn test_persistent_output_elimination(commit: CommitMode) {
        let mut g = make_persistent_output_graph();
        let before = g.node_count();
        let producer = g.node_by_name("producer").unwrap();
        let consumer = g.node_by_name("consumer").unwrap();
        let y = g.tensor_by_name("Y").unwrap();

        let config = PassConfig::default().with_commit(commit);
        assert!(run_pass(&mut g, &EliminatePassThrough::new(), &config));

        assert!(g.node_by_name("target").is_none());
        assert_eq!(g.node_count(), before - 1);
        assert_eq!(g.get_producer(y), Some(producer));
        assert_eq!(g.node(consumer).unwrap().inputs[0], y);
        assert_eq!(g.tensor(y).unwrap().range, Some(NumericRange::new(0.0, 6.0)));
        assert!(g.is_acyclic());
    }

    #[test]
    fn test_persistent_output_redirects_siblings() {
        let mut b = GraphBuilder::new();
        b.persistent("Y");
        b.node(NodeKind::Relu, "producer", &["X"], &["a"]);
        b.node(NodeKind::Identity, "target", &["a"], &["Y"]);
        b.node(NodeKind::Cast, "sibling", &["a"], &["s"]);
        let mut g = b.build().unwrap();
        let y = g.tensor_by_name("Y").unwrap();
        let sibling = g.node_by_name("sibling").unwrap();

        assert!(run_pass(&mut g, &EliminatePassThrough::new(), &PassConfig::default()));
        assert_eq!(g.get_consumers(y), &[sibling]);
        assert!(g.get_consumers(g.tensor_by_name("a").unwrap()).is_empty());
    }

    #[test]
    fn test_input_without_producer() {
        let mut b = GraphBuilder::new();
        b.persistent("X");
        b.node(NodeKind::Identity, "identity_0", &["X"], &["a"]);
        b.node(NodeKind::Relu, "relu_0", &["a"], &["Y"]);
        let mut g = b.build().unwrap();
        let x = g.tensor_by_name("X").unwrap();

        assert!(run_pass(&mut g, &EliminatePassThrough::new(), &PassConfig::default()));
        assert_eq!(g.get_consumers(x), &[g.node_by_name("relu_0").unwrap()]);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_persistent_output_needs_producer() {
        let mut b = GraphBuilder::new();
        b.persistent("Y");
        b.node(NodeKind::Identity, "identity_0", &["dangling"], &["Y"]);
        let mut g = b.build().unwrap();

        let err = execute_pass(&mut g, &EliminatePassThrough::new(), &PassConfig::default())
            .unwrap_err();
        assert!(matches!(err, GraphError::Precondition { .. }));
        assert_eq!(g.node_count(), 1);
    }

    #[test_case(CommitMode::Eager; "eager")]
    #[test_case(CommitMode::Staged; "staged")]
    fn test_consecutive_targets_rejected(commit: CommitMode) {
        let mut b = GraphBuilder::new();
        b.node(NodeKind::Relu, "relu_0", &["X"], &["a"]);
        b.node(NodeKind::Identity, "target1", &["a"], &["b"]);
        b.node(NodeKind::Identity, "target2", &["b"], &["c"]);
        b.node(NodeKind::Relu, "relu_1", &["c"], &["Y"]);
        let mut g = b.build().unwrap();
        let before = g.node_count();

        let config = PassConfig::default().with_commit(commit);
        assert!(!run_pass(&mut g, &EliminatePassThrough::new(), &config));
        assert_eq!(g.node_count(), before);
        assert!(g.node_by_name("target1").is_some());
        assert!(g.node_by_name("target2").is_some());
    }

    /// A valid target followed by one whose operands are both persistent
    fn make_late_failure_graph() -> Graph {
        let mut b = GraphBuilder::new();
        b.persistent("X");
        b.persistent("Y");
        b.node(NodeKind::Relu, "relu_0", &["X"], &["a"]);
        b.node(NodeKind::Identity, "good", &["a"], &["b"]);
        b.node(NodeKind::Relu, "relu_1", &["b"], &["c"]);
        b.node(NodeKind::Identity, "bad", &["X"], &["Y"]);
        b.build().unwrap()
    }

    #[test]
    fn test_eager_commit_keeps_earlier_rewrites() {
        let mut g = make_late_failure_graph();
        let config = PassConfig::default().with_commit(CommitMode::Eager);

        assert!(!run_pass(&mut g, &EliminatePassThrough::new(), &config));
        assert!(g.node_by_name("good").is_none());
        assert!(g.node_by_name("bad").is_some());
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_staged_commit_is_atomic() {
        let mut g = make_late_failure_graph();
        let config = PassConfig::default().with_commit(CommitMode::Staged);

        assert!(!run_pass(&mut g, &EliminatePassThrough::new(), &config));
        assert!(g.node_by_name("good").is_some());
        assert!(g.node_by_name("bad").is_some());
        assert_eq!(g.node_count(), 4);
    }

    #[test]
    fn test_staged_commit_failure_after_validation_is_atomic() {
        // Both targets validate, but once the first has run the second reads
        // a persistent tensor and writes one.
        let mut b = GraphBuilder::new();
        b.persistent("Y");
        b.persistent("Z");
        b.node(NodeKind::Relu, "producer", &["X"], &["t"]);
        b.node(NodeKind::Identity, "first", &["t"], &["Y"]);
        b.node(NodeKind::Identity, "second", &["t"], &["Z"]);
        let mut g = b.build().unwrap();

        let config = PassConfig::default().with_commit(CommitMode::Staged);
        assert!(!run_pass(&mut g, &EliminatePassThrough::new(), &config));
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.get_producer(g.tensor_by_name("Y").unwrap()), g.node_by_name("first"));
    }

    #[test]
    fn test_unsupported_device() {
        let mut g = make_test_graph();
        let pass = EliminatePassThrough::new().with_devices(&[DeviceClass::Gen2]);
        let config = PassConfig::default().with_device(DeviceClass::Gen3);

        assert!(!run_pass(&mut g, &pass, &config));
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_disabled_config() {
        let mut g = make_test_graph();
        let config = PassConfig::default().with_enabled(false);

        assert!(run_pass(&mut g, &EliminatePassThrough::new(), &config));
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_memcpy_target() {
        let mut b = GraphBuilder::new();
        b.persistent("Y");
        b.node(NodeKind::Relu, "relu_0", &["X"], &["a"]);
        b.node(NodeKind::Memcpy, "memcpy_0", &["a"], &["b"]);
        b.node(NodeKind::Identity, "identity_0", &["b"], &["Y"]);
        let mut g = b.build().unwrap();

        let pass = EliminatePassThrough::for_kind(NodeKind::Memcpy);
        assert!(run_pass(&mut g, &pass, &PassConfig::default()));
        assert!(g.node_by_name("memcpy_0").is_none());
        assert!(g.node_by_name("identity_0").is_some());
    }

    #[test]
    fn test_rejects_transforming_kind() {
        let mut g = make_test_graph();
        let pass = EliminatePassThrough::for_kind(NodeKind::Relu);

        let err = execute_pass(&mut g, &pass, &PassConfig::default()).unwrap_err();
        assert_eq!(
            err,
            GraphError::PassFailed {
                pass: "EliminatePassThrough",
                reason: "relu nodes do not forward their input".to_string(),
            }
        );
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_eliminate_dead_nodes_pass() {
        let mut b = GraphBuilder::new();
        b.persistent("Y");
        b.node(NodeKind::Relu, "relu_0", &["X"], &["Y"]);
        b.node(NodeKind::Relu, "relu_1", &["X"], &["unused"]);
        let mut g = b.build().unwrap();

        let result = execute_pass(&mut g, &EliminateDeadNodes::new(), &PassConfig::default())
            .unwrap();
        assert_eq!(result.transformed_nodes, vec!["relu_1".to_string()]);
        assert_eq!(g.node_count(), 1);
    }
}
