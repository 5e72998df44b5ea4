//! Common utilities for passes
//!
//! The pass trait, pass statistics and the drivers that gate a pass on the
//! run configuration.

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::transform::{DeviceClass, PassConfig};

/// Pass result for statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassResult {
    /// Number of patterns matched
    pub patterns_matched: usize,
    /// Number of transformations applied
    pub transforms_applied: usize,
    /// Number of nodes eliminated
    pub nodes_eliminated: usize,
    /// Names of transformed nodes
    pub transformed_nodes: Vec<String>,
}

impl PassResult {
    /// Create empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful transformation
    pub fn record(&mut self, node_name: &str) {
        self.transforms_applied += 1;
        self.transformed_nodes.push(node_name.to_string());
    }

    /// Record elimination
    pub fn record_elimination(&mut self, node_name: &str) {
        self.nodes_eliminated += 1;
        self.transformed_nodes.push(node_name.to_string());
    }

    /// Merge with another result
    pub fn merge(&mut self, other: PassResult) {
        self.patterns_matched += other.patterns_matched;
        self.transforms_applied += other.transforms_applied;
        self.nodes_eliminated += other.nodes_eliminated;
        self.transformed_nodes.extend(other.transformed_nodes);
    }

    /// Whether the pass changed the graph
    pub fn changed(&self) -> bool {
        self.transforms_applied + self.nodes_eliminated > 0
    }
}

/// Trait for individual graph passes
pub trait GraphPass {
    /// Name of the pass
    fn name(&self) -> &'static str;

    /// Device classes the pass may run for
    fn supported_devices(&self) -> &'static [DeviceClass] {
        &DeviceClass::ALL
    }

    /// Apply the pass
    ///
    /// Callers go through [`execute_pass`], which checks the configuration
    /// first.
    fn run(&self, graph: &mut Graph, config: &PassConfig) -> GraphResult<PassResult>;

    /// Check if this pass is applicable to the graph
    fn is_applicable(&self, _graph: &Graph) -> bool {
        true
    }
}

/// Run a pass after checking the configuration
///
/// A disabled configuration or an inapplicable graph yields an empty result.
/// An unsupported device class fails before the graph is touched.
pub fn execute_pass(
    graph: &mut Graph,
    pass: &dyn GraphPass,
    config: &PassConfig,
) -> GraphResult<PassResult> {
    if !config.enabled {
        tracing::debug!(pass = pass.name(), "pass disabled");
        return Ok(PassResult::new());
    }
    if !pass.supported_devices().contains(&config.device) {
        return Err(GraphError::UnsupportedDevice {
            pass: pass.name(),
            device: config.device.to_string(),
        });
    }
    if !pass.is_applicable(graph) {
        return Ok(PassResult::new());
    }
    pass.run(graph, config)
}

/// Run a pass and report success as a flag
///
/// The error, if any, is logged.
pub fn run_pass(graph: &mut Graph, pass: &dyn GraphPass, config: &PassConfig) -> bool {
    match execute_pass(graph, pass, config) {
        Ok(result) => {
            tracing::debug!(
                pass = pass.name(),
                applied = result.transforms_applied,
                eliminated = result.nodes_eliminated,
                "pass finished"
            );
            true
        }
        Err(err) => {
            tracing::warn!(pass = pass.name(), error = %err, "pass failed");
            false
        }
    }
}

/// Run multiple passes in sequence
pub fn run_passes(
    graph: &mut Graph,
    passes: &[&dyn GraphPass],
    config: &PassConfig,
) -> GraphResult<PassResult> {
    let mut total = PassResult::new();

    for pass in passes {
        total.merge(execute_pass(graph, *pass, config)?);
    }

    Ok(total)
}
