//! Core transformation loop
//!
//! Pass configuration plus the match-then-rewrite loop that passes built on
//! pattern graphs use.

use std::fmt;

use crate::error::GraphResult;
use crate::graph::Graph;
use crate::pattern::{CandidateMatch, MatchConfig, PatternMatcher};

/// Accelerator generation a pass is compiled for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// Device independent
    #[default]
    Generic,
    /// Second generation
    Gen2,
    /// Third generation
    Gen3,
}

impl DeviceClass {
    /// All device classes
    pub const ALL: [DeviceClass; 3] = [DeviceClass::Generic, DeviceClass::Gen2, DeviceClass::Gen3];
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceClass::Generic => "generic",
            DeviceClass::Gen2 => "gen2",
            DeviceClass::Gen3 => "gen3",
        })
    }
}

/// When a rewrite pass mutates the graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitMode {
    /// Validate and rewrite one target at a time; a late failure keeps
    /// earlier rewrites
    Eager,
    /// Validate every target first, rewrite only if all pass
    #[default]
    Staged,
}

/// Pass configuration
///
/// Scoped to one compilation run and passed into every pass invocation.
#[derive(Debug, Clone)]
pub struct PassConfig {
    /// Run passes at all; a disabled pass succeeds without touching the graph
    pub enabled: bool,
    /// Target device class
    pub device: DeviceClass,
    /// Commit strategy for rewrite passes
    pub commit: CommitMode,
    /// Maximum iterations to prevent infinite loops
    pub max_iterations: usize,
    /// Whether to continue on individual transform errors
    pub continue_on_error: bool,
    /// Pattern matching options
    pub matching: MatchConfig,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device: DeviceClass::Generic,
            commit: CommitMode::Staged,
            max_iterations: 100,
            continue_on_error: false,
            matching: MatchConfig::default(),
        }
    }
}

impl PassConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable passes
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the target device class
    pub fn with_device(mut self, device: DeviceClass) -> Self {
        self.device = device;
        self
    }

    /// Set the commit strategy
    pub fn with_commit(mut self, commit: CommitMode) -> Self {
        self.commit = commit;
        self
    }

    /// Set the iteration bound
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Keep going when a single rewrite fails
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Set pattern matching options
    pub fn with_matching(mut self, matching: MatchConfig) -> Self {
        self.matching = matching;
        self
    }
}

/// Statistics from a transform run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransformStats {
    /// Number of iterations performed
    pub iterations: usize,
    /// Number of patterns matched
    pub patterns_matched: usize,
    /// Number of transformations applied
    pub transforms_applied: usize,
    /// Number of nodes eliminated
    pub nodes_eliminated: usize,
}

/// Main transformation engine
///
/// Repeatedly matches a pattern graph and hands each candidate to a rewrite
/// callback until nothing applies or the iteration bound is hit.
pub struct TransformEngine<'g> {
    graph: &'g mut Graph,
    config: PassConfig,
    stats: TransformStats,
}

impl<'g> TransformEngine<'g> {
    /// Create a new transform engine over a graph
    pub fn new(graph: &'g mut Graph) -> Self {
        Self {
            graph,
            config: PassConfig::default(),
            stats: TransformStats::default(),
        }
    }

    /// Configure the engine
    pub fn with_config(mut self, config: PassConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the current graph
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Get statistics
    pub fn stats(&self) -> &TransformStats {
        &self.stats
    }

    /// Apply a rewrite to every occurrence of `pattern`
    ///
    /// Candidates that reference a node removed earlier in the same round
    /// are skipped. The callback returns whether it changed the graph.
    ///
    /// # Returns
    /// * Number of transformations applied
    pub fn apply_pattern<F>(&mut self, pattern: &Graph, mut transform_fn: F) -> GraphResult<usize>
    where
        F: FnMut(&mut Graph, &CandidateMatch) -> GraphResult<bool>,
    {
        let mut applied = 0;
        let mut iteration = 0;

        loop {
            if iteration >= self.config.max_iterations {
                break;
            }
            iteration += 1;

            let matches = PatternMatcher::new(self.graph, pattern)?
                .with_config(self.config.matching.clone())
                .find_all()?;
            if matches.is_empty() {
                break;
            }
            self.stats.patterns_matched += matches.len();

            let mut any_applied = false;
            for matched in &matches {
                if matched.nodes().iter().any(|n| !self.graph.contains_node(*n)) {
                    continue;
                }

                let before = self.graph.node_count();
                match transform_fn(&mut *self.graph, matched) {
                    Ok(true) => {
                        applied += 1;
                        any_applied = true;
                        self.stats.transforms_applied += 1;
                        self.stats.nodes_eliminated +=
                            before.saturating_sub(self.graph.node_count());
                    }
                    Ok(false) => {}
                    Err(e) => {
                        if !self.config.continue_on_error {
                            return Err(e);
                        }
                        tracing::warn!(error = %e, "rewrite failed, continuing");
                    }
                }
            }

            if !any_applied {
                break;
            }
        }

        self.stats.iterations += iteration;
        Ok(applied)
    }

    /// Apply transformation with condition
    pub fn apply_pattern_if<F, C>(
        &mut self,
        pattern: &Graph,
        condition: C,
        mut transform_fn: F,
    ) -> GraphResult<usize>
    where
        F: FnMut(&mut Graph, &CandidateMatch) -> GraphResult<bool>,
        C: Fn(&CandidateMatch, &Graph) -> bool,
    {
        self.apply_pattern(pattern, |graph, m| {
            if condition(m, &*graph) {
                transform_fn(graph, m)
            } else {
                Ok(false)
            }
        })
    }
}

/// Single-shot transform: apply pattern once to all matching locations
pub fn transform_once<F>(graph: &mut Graph, pattern: &Graph, mut transform_fn: F) -> GraphResult<usize>
where
    F: FnMut(&mut Graph, &CandidateMatch) -> GraphResult<bool>,
{
    let matches = PatternMatcher::new(graph, pattern)?.find_all()?;

    let mut applied = 0;
    for matched in &matches {
        if matched.nodes().iter().any(|n| !graph.contains_node(*n)) {
            continue;
        }
        if transform_fn(graph, matched)? {
            applied += 1;
        }
    }

    Ok(applied)
}

/// Transform all matching patterns until no more matches
pub fn transform_until_fixed_point<F>(
    graph: &mut Graph,
    pattern: &Graph,
    mut transform_fn: F,
    max_iterations: usize,
) -> GraphResult<usize>
where
    F: FnMut(&mut Graph, &CandidateMatch) -> GraphResult<bool>,
{
    let mut total = 0;

    for _ in 0..max_iterations {
        let applied = transform_once(graph, pattern, &mut transform_fn)?;
        if applied == 0 {
            break;
        }
        total += applied;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::graph::NodeKind;
    use crate::transform::eliminate::remove_one_to_one_node;

    fn make_test_graph() -> Graph {
        let mut b = GraphBuilder::new();
        b.persistent("X");
        b.persistent("Y");
        b.node(NodeKind::Conv, "conv_0", &["X", "W"], &["conv_out"]);
        b.node(NodeKind::Identity, "identity_0", &["conv_out"], &["id_out"]);
        b.node(NodeKind::Relu, "relu_0", &["id_out"], &["relu_out"]);
        b.node(NodeKind::Identity, "identity_1", &["relu_out"], &["Y"]);
        b.build().unwrap()
    }

    fn identity_pattern() -> Graph {
        let mut p = GraphBuilder::new();
        p.node(NodeKind::Identity, "identity", &["in"], &["out"]);
        p.build().unwrap()
    }

    #[test]
    fn test_apply_pattern() {
        let mut graph = make_test_graph();
        let pattern = identity_pattern();
        let mut engine = TransformEngine::new(&mut graph);

        let applied = engine
            .apply_pattern(&pattern, |g, m| {
                remove_one_to_one_node(g, m.nodes()[0])?;
                Ok(true)
            })
            .unwrap();

        assert_eq!(applied, 2); // Two Identity nodes
        assert_eq!(engine.stats().transforms_applied, 2);
        assert_eq!(engine.stats().nodes_eliminated, 2);
        assert_eq!(engine.graph().node_count(), 2);
    }

    #[test]
    fn test_apply_pattern_error_stops() {
        let mut graph = make_test_graph();
        let pattern = identity_pattern();
        let mut engine = TransformEngine::new(&mut graph);

        let result = engine.apply_pattern(&pattern, |_, m| {
            Err(crate::error::GraphError::Internal(format!("{:?}", m.anchor())))
        });
        assert!(result.is_err());
        assert_eq!(engine.graph().node_count(), 4);
    }

    #[test]
    fn test_apply_pattern_continue_on_error() {
        let mut graph = make_test_graph();
        let pattern = identity_pattern();
        let mut engine = TransformEngine::new(&mut graph)
            .with_config(PassConfig::default().with_continue_on_error(true));

        let applied = engine
            .apply_pattern(&pattern, |g, m| {
                let id = m.nodes()[0];
                if g.node(id).map(|n| n.name == "identity_0").unwrap_or(false) {
                    return Err(crate::error::GraphError::Internal("skip".to_string()));
                }
                remove_one_to_one_node(g, id)?;
                Ok(true)
            })
            .unwrap();
        assert_eq!(applied, 1);
        assert!(engine.graph().node_by_name("identity_0").is_some());
    }

    #[test]
    fn test_apply_pattern_if() {
        let mut graph = make_test_graph();
        let pattern = identity_pattern();
        let mut engine = TransformEngine::new(&mut graph);

        let applied = engine
            .apply_pattern_if(
                &pattern,
                |m, g| {
                    g.node(m.nodes()[0])
                        .map(|n| n.name == "identity_1")
                        .unwrap_or(false)
                },
                |g, m| {
                    remove_one_to_one_node(g, m.nodes()[0])?;
                    Ok(true)
                },
            )
            .unwrap();
        assert_eq!(applied, 1);
        assert!(engine.graph().node_by_name("identity_0").is_some());
    }

    #[test]
    fn test_transform_once() {
        let mut graph = make_test_graph();
        let applied = transform_once(&mut graph, &identity_pattern(), |g, m| {
            remove_one_to_one_node(g, m.nodes()[0])?;
            Ok(true)
        });

        assert_eq!(applied.unwrap(), 2);
    }

    #[test]
    fn test_transform_until_fixed_point() {
        let mut graph = make_test_graph();
        let total = transform_until_fixed_point(
            &mut graph,
            &identity_pattern(),
            |g, m| {
                remove_one_to_one_node(g, m.nodes()[0])?;
                Ok(true)
            },
            10,
        )
        .unwrap();
        assert_eq!(total, 2);
        assert!(graph.find_nodes_by_kind(NodeKind::Identity).is_empty());
    }

    #[test]
    fn test_pass_config_builders() {
        let config = PassConfig::new()
            .with_device(DeviceClass::Gen3)
            .with_commit(CommitMode::Eager)
            .with_max_iterations(3)
            .with_matching(MatchConfig::default().with_parallel(true));
        assert!(config.enabled);
        assert_eq!(config.device, DeviceClass::Gen3);
        assert_eq!(config.commit, CommitMode::Eager);
        assert_eq!(config.max_iterations, 3);
        assert!(config.matching.parallel);
        assert_eq!(DeviceClass::Gen2.to_string(), "gen2");
    }
}
