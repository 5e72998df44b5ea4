//! Graph builder module
//!
//! This module provides utilities for assembling graphs:
//!
//! - [`GraphBuilder`]: Name-based builder for program and pattern graphs
//! - [`fields`]: Unique name generation
//!
//! # Example
//!
//! ```ignore
//! use graph_rewrite::builder::GraphBuilder;
//! use graph_rewrite::graph::NodeKind;
//!
//! // Pattern: expand feeding a concat
//! let mut p = GraphBuilder::new();
//! p.node(NodeKind::Expand, "expand", &["in"], &["out"]);
//! p.node(NodeKind::Concat, "concat", &["out"], &["res"]);
//! let pattern = p.build()?;
//! ```

pub mod fields;
pub mod graph;

// Re-export main types and functions
pub use fields::{unique_node_name, unique_tensor_name};
pub use graph::GraphBuilder;
