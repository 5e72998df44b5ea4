//! Naming utilities
//!
//! Helpers for generating collision-free names when passes create nodes and
//! tensors.

use crate::graph::Graph;

/// Generate unique tensor name
pub fn unique_tensor_name(graph: &Graph, prefix: &str) -> String {
    let mut counter = 0;
    loop {
        let name = format!("{}_{}", prefix, counter);
        if graph.tensor_by_name(&name).is_none() {
            return name;
        }
        counter += 1;
    }
}

/// Generate unique node name
pub fn unique_node_name(graph: &Graph, prefix: &str) -> String {
    let mut counter = 0;
    loop {
        let name = format!("{}_{}", prefix, counter);
        if graph.node_by_name(&name).is_none() {
            return name;
        }
        counter += 1;
    }
}
