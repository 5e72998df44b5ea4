//! # Graph Rewrite
//!
//! DAG pattern matching and graph-edit primitives for a tensor-program
//! compiler middle-end.
//!
//! This crate provides the pieces a rewrite pass is built from: a graph IR
//! with producer/consumer indices, a pattern finder over template graphs, and
//! an editor that keeps the indices consistent across every mutation.
//!
//! ## Features
//!
//! - **Pattern Matching**: Find every occurrence of a single-root pattern graph
//! - **Graph Editing**: Add, remove and rewire nodes without breaking links
//! - **Passes**: Pass-through and dead-node elimination, gated per device class
//!
//! ## Example
//!
//! ```ignore
//! use graph_rewrite::prelude::*;
//!
//! let mut graph = build_program()?;
//! let ok = run_pass(&mut graph, &EliminatePassThrough::new(), &PassConfig::default());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod builder;
pub mod error;
pub mod graph;
pub mod pattern;
pub mod transform;
pub mod transformers;

/// Prelude module - import commonly used types with `use graph_rewrite::prelude::*`
pub mod prelude {
    pub use crate::builder::GraphBuilder;
    pub use crate::error::{GraphError, GraphResult};
    pub use crate::graph::{Graph, Node, NodeId, NodeKind, NodeParams, Tensor, TensorId};
    pub use crate::pattern::{match_pattern, CandidateMatch, MatchConfig, PatternMatcher};
    pub use crate::transform::{CommitMode, DeviceClass, PassConfig, TransformEngine};
    pub use crate::transformers::{
        run_pass, EliminateDeadNodes, EliminatePassThrough, GraphPass, PassPipeline, PassResult,
    };
}

pub use error::{GraphError, GraphResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
