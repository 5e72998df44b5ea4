//! Graph rewrite passes
//!
//! This module provides ready-to-use passes over a [`Graph`]:
//!
//! - **Elimination**: Remove pass-through nodes (Identity, Memcpy, etc.)
//! - **Cleanup**: Remove nodes whose results nobody reads
//!
//! # Overview
//!
//! Each pass implements the [`GraphPass`] trait and can be applied
//! individually through [`run_pass`] or combined.
//!
//! # Example
//!
//! ```ignore
//! use graph_rewrite::transform::PassConfig;
//! use graph_rewrite::transformers::{run_pass, EliminateDeadNodes, EliminatePassThrough};
//!
//! let config = PassConfig::default();
//!
//! // Apply individual passes
//! let ok = run_pass(&mut graph, &EliminatePassThrough::new(), &config);
//! let ok = ok && run_pass(&mut graph, &EliminateDeadNodes::new(), &config);
//! ```
//!
//! # Using PassPipeline
//!
//! For convenience, use [`PassPipeline`] to run multiple passes until the
//! graph stops changing:
//!
//! ```ignore
//! use graph_rewrite::transformers::PassPipeline;
//!
//! let pipeline = PassPipeline::default();
//! let result = pipeline.run(&mut graph, &config)?;
//! ```

/// Pass trait and drivers
pub mod common;
/// Elimination passes
pub mod eliminate;

// Re-export common types
pub use common::{execute_pass, run_pass, run_passes, GraphPass, PassResult};

// Re-export elimination passes
pub use eliminate::{EliminateDeadNodes, EliminatePassThrough};

use crate::error::GraphResult;
use crate::graph::{Graph, NodeKind};
use crate::transform::PassConfig;

/// Pipeline that runs passes in sequence until a fixed point
pub struct PassPipeline {
    passes: Vec<Box<dyn GraphPass + Send + Sync>>,
    /// Maximum number of rounds over the pass list
    pub iterations: usize,
}

impl std::fmt::Debug for PassPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassPipeline")
            .field("passes", &self.pass_names())
            .field("iterations", &self.iterations)
            .finish()
    }
}

impl Default for PassPipeline {
    fn default() -> Self {
        Self::empty()
            .with_pass(EliminatePassThrough::new())
            .with_pass(EliminatePassThrough::for_kind(NodeKind::Memcpy))
            .with_pass(EliminateDeadNodes::new())
            .with_iterations(3)
    }
}

impl PassPipeline {
    /// Create a new pipeline with the default passes
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline with no passes
    pub fn empty() -> Self {
        Self {
            passes: Vec::new(),
            iterations: 1,
        }
    }

    /// Only remove dead nodes
    pub fn cleanup_only() -> Self {
        Self::empty().with_pass(EliminateDeadNodes::new())
    }

    /// Append a pass
    pub fn with_pass(mut self, pass: impl GraphPass + Send + Sync + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Set the maximum number of rounds
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Names of the passes in run order
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run the pipeline
    ///
    /// Stops early once a full round changes nothing. The first failing pass
    /// aborts the run.
    #[tracing::instrument(skip_all, fields(passes = self.passes.len()))]
    pub fn run(&self, graph: &mut Graph, config: &PassConfig) -> GraphResult<PassResult> {
        let mut total = PassResult::new();

        for round in 0..self.iterations {
            let mut changed = false;

            for pass in &self.passes {
                let result = execute_pass(graph, pass.as_ref(), config)?;
                changed |= result.changed();
                total.merge(result);
            }

            // Stop if no progress
            if !changed {
                tracing::debug!(round, "pipeline reached fixed point");
                break;
            }
        }

        Ok(total)
    }
}
