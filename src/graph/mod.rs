//! Graph IR for tensor programs
//!
//! This module provides the core infrastructure for working with program graphs:
//!
//! - [`Graph`]: Arena of nodes and tensors with O(1) producer/consumer lookups
//! - [`Node`] / [`NodeKind`] / [`NodeParams`]: Tagged operator nodes
//! - [`Tensor`]: Edges, optionally persistent and range-annotated
//! - [`maps`]: Handle types and index maps
//!
//! # Overview
//!
//! Nodes and tensors are addressed by [`NodeId`] / [`TensorId`] handles that
//! are never reused. Links are stored as handle-to-handle maps, so no node
//! owns another node.
//!
//! # Example
//!
//! ```ignore
//! use graph_rewrite::builder::GraphBuilder;
//! use graph_rewrite::graph::NodeKind;
//!
//! let mut b = GraphBuilder::new();
//! b.node(NodeKind::Conv, "conv_0", &["X", "W"], &["conv_out"]);
//! b.node(NodeKind::Relu, "relu_0", &["conv_out"], &["Y"]);
//! let graph = b.build()?;
//!
//! let conv_out = graph.tensor_by_name("conv_out").unwrap();
//! let producer = graph.get_producer(conv_out);
//! let consumers = graph.get_consumers(conv_out);
//! ```
//!
//! # Maps
//!
//! | Map | Description |
//! |-----|-------------|
//! | `producer_map` | tensor → producer node |
//! | `consumer_map` | tensor → consumer nodes |
//! | `nodes` | node handle → node (order preserved) |

pub mod accessors;
pub mod context;
pub mod maps;
pub mod mutators;
pub mod node;
pub mod tensor;

// Re-export main types
pub use context::Graph;
pub use maps::{ConsumerMap, NodeId, NodeList, NodeMap, ProducerMap, TensorId, TensorList};
pub use node::{Arity, DataType, KindRules, Node, NodeKind, NodeParams, NumericRange};
pub use tensor::Tensor;
