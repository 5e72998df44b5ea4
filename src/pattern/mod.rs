//! Pattern matching module
//!
//! This module finds occurrences of small template graphs ("patterns") in a
//! program graph:
//!
//! - [`matcher`]: Anchored multi-branch matching from a single-root pattern
//! - [`search`]: Backward search from a single-output pattern
//! - [`traversal`]: BFS/DFS iterators and reachability queries
//!
//! # Overview
//!
//! The anchored matcher works by:
//! 1. Trying every program node against the pattern root
//! 2. Following output consumers branch by branch
//! 3. Combining branch candidates as a cartesian product
//! 4. Keeping only candidates as long as the pattern
//!
//! # Example
//!
//! ```ignore
//! use graph_rewrite::builder::GraphBuilder;
//! use graph_rewrite::graph::NodeKind;
//! use graph_rewrite::pattern::match_pattern;
//!
//! // expand feeding a concat
//! let mut p = GraphBuilder::new();
//! p.node(NodeKind::Expand, "expand", &["in"], &["out"]);
//! p.node(NodeKind::Concat, "concat", &["out"], &["res"]);
//! let pattern = p.build()?;
//!
//! for m in match_pattern(&program, &pattern)? {
//!     println!("expand {} feeds concat {}", m.nodes()[0], m.nodes()[1]);
//! }
//! ```
//!
//! # Traversal
//!
//! ```ignore
//! use graph_rewrite::pattern::traversal::{self, BfsIterator};
//!
//! for id in BfsIterator::forward(&graph, conv) {
//!     println!("Visiting: {}", graph.node(id).unwrap().name);
//! }
//!
//! let preds = traversal::predecessors(&graph, output_node);
//! ```

pub mod matcher;
pub mod search;
pub mod traversal;

// Re-export main types
pub use matcher::{
    match_pattern, match_pattern_with, same_kind, CandidateMatch, MatchConfig, PatternMatcher,
};
pub use search::{find_matches, match_pattern_with_single_output_node, pattern_leaf, PatternMatch};
pub use traversal::{
    find_path, has_path, predecessors, successors, BfsIterator, DfsIterator, Direction,
};
