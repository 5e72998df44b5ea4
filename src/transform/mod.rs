//! Graph transformation module
//!
//! This module provides the core transformation infrastructure:
//!
//! - [`editor`]: The sanctioned mutation primitives
//! - [`eliminate`]: Node elimination operations
//! - [`TransformEngine`]: Match-then-rewrite loop over a pattern graph
//! - [`PassConfig`]: Per-run configuration threaded into every pass
//!
//! # Overview
//!
//! Transformations modify a [`Graph`](crate::graph::Graph) in place. The
//! typical workflow is:
//!
//! 1. Create a `TransformEngine` over a graph
//! 2. Apply pattern graphs using `apply_pattern`
//! 3. Rewrite each candidate through the editor functions
//!
//! # Example
//!
//! ```ignore
//! use graph_rewrite::transform::{eliminate::remove_one_to_one_node, TransformEngine};
//!
//! let mut engine = TransformEngine::new(&mut graph);
//!
//! // Eliminate Identity nodes
//! engine.apply_pattern(&identity_pattern, |g, m| {
//!     remove_one_to_one_node(g, m.nodes()[0])?;
//!     Ok(true)
//! })?;
//! ```

pub mod core;
pub mod editor;
pub mod eliminate;

// Re-export main types and functions
pub use core::{
    transform_once, transform_until_fixed_point, CommitMode, DeviceClass, PassConfig,
    TransformEngine, TransformStats,
};

pub use editor::{
    add_node, add_nodes, can_eliminate_tensor, clone_node, edit_node, insert_memcpy, remove_node,
    remove_node_with_producer, remove_nodes, remove_nodes_with_producers, replace_input,
    replace_output, replace_tensor, replace_tensor_everywhere, Port,
};

pub use eliminate::{eliminate_dead_nodes, remove_one_to_one_node, EliminationResult};
