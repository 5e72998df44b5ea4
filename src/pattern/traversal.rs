//! Graph traversal utilities
//!
//! Provides BFS and DFS traversal over node handles.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::{Graph, NodeId};

/// Direction of traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Forward: follow consumer edges (input → output)
    Forward,
    /// Backward: follow producer edges (output → input)
    Backward,
}

fn neighbors(graph: &Graph, id: NodeId, direction: Direction) -> Vec<NodeId> {
    match direction {
        Direction::Forward => graph.node_consumers(id),
        Direction::Backward => graph.node_producers(id),
    }
}

/// BFS traversal iterator
pub struct BfsIterator<'a> {
    graph: &'a Graph,
    queue: VecDeque<NodeId>,
    visited: FxHashSet<NodeId>,
    direction: Direction,
}

impl<'a> BfsIterator<'a> {
    /// Create a new BFS iterator starting from the given node
    pub fn new(graph: &'a Graph, start: NodeId, direction: Direction) -> Self {
        let mut queue = VecDeque::new();
        let mut visited = FxHashSet::default();

        if graph.contains_node(start) {
            queue.push_back(start);
            visited.insert(start);
        }

        Self {
            graph,
            queue,
            visited,
            direction,
        }
    }

    /// Create forward BFS (follows consumers)
    pub fn forward(graph: &'a Graph, start: NodeId) -> Self {
        Self::new(graph, start, Direction::Forward)
    }

    /// Create backward BFS (follows producers)
    pub fn backward(graph: &'a Graph, start: NodeId) -> Self {
        Self::new(graph, start, Direction::Backward)
    }
}

impl Iterator for BfsIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.queue.pop_front()?;
        for next in neighbors(self.graph, id, self.direction) {
            if self.visited.insert(next) {
                self.queue.push_back(next);
            }
        }
        Some(id)
    }
}

/// DFS traversal iterator
pub struct DfsIterator<'a> {
    graph: &'a Graph,
    stack: Vec<NodeId>,
    visited: FxHashSet<NodeId>,
    direction: Direction,
}

impl<'a> DfsIterator<'a> {
    /// Create a new DFS iterator starting from the given node
    pub fn new(graph: &'a Graph, start: NodeId, direction: Direction) -> Self {
        let mut stack = Vec::new();
        let mut visited = FxHashSet::default();

        if graph.contains_node(start) {
            stack.push(start);
            visited.insert(start);
        }

        Self {
            graph,
            stack,
            visited,
            direction,
        }
    }

    /// Create forward DFS
    pub fn forward(graph: &'a Graph, start: NodeId) -> Self {
        Self::new(graph, start, Direction::Forward)
    }

    /// Create backward DFS
    pub fn backward(graph: &'a Graph, start: NodeId) -> Self {
        Self::new(graph, start, Direction::Backward)
    }
}

impl Iterator for DfsIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        for next in neighbors(self.graph, id, self.direction) {
            if self.visited.insert(next) {
                self.stack.push(next);
            }
        }
        Some(id)
    }
}

/// Collect all predecessor nodes (backward reachable)
pub fn predecessors(graph: &Graph, start: NodeId) -> Vec<NodeId> {
    BfsIterator::backward(graph, start).skip(1).collect()
}

/// Collect all successor nodes (forward reachable)
pub fn successors(graph: &Graph, start: NodeId) -> Vec<NodeId> {
    BfsIterator::forward(graph, start).skip(1).collect()
}

/// Find a forward path between two nodes, both ends included
pub fn find_path(graph: &Graph, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
    if !graph.contains_node(from) {
        return None;
    }
    if from == to {
        return Some(vec![from]);
    }

    let mut queue = VecDeque::from([from]);
    let mut parent: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    parent.insert(from, from);

    while let Some(current) = queue.pop_front() {
        for consumer in graph.node_consumers(current) {
            if parent.contains_key(&consumer) {
                continue;
            }
            parent.insert(consumer, current);
            if consumer == to {
                let mut path = vec![to];
                let mut curr = to;
                while curr != from {
                    curr = *parent.get(&curr)?;
                    path.push(curr);
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(consumer);
        }
    }

    None
}

/// Check if there's a forward path between two nodes
pub fn has_path(graph: &Graph, from: NodeId, to: NodeId) -> bool {
    from == to || BfsIterator::forward(graph, from).any(|id| id == to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::graph::NodeKind;

    fn make_chain_graph() -> (Graph, Vec<NodeId>) {
        let mut b = GraphBuilder::new();
        b.persistent("X");
        b.persistent("Y");
        b.node(NodeKind::Conv, "node_0", &["X", "W"], &["a"]);
        b.node(NodeKind::Relu, "node_1", &["a"], &["b"]);
        b.node(NodeKind::Conv, "node_2", &["b", "W"], &["c"]);
        b.node(NodeKind::Relu, "node_3", &["c"], &["Y"]);
        let g = b.build().unwrap();
        let ids = (0..4)
            .map(|i| g.node_by_name(&format!("node_{i}")).unwrap())
            .collect();
        (g, ids)
    }

    #[test]
    fn test_bfs_forward() {
        let (g, n) = make_chain_graph();
        let nodes: Vec<_> = BfsIterator::forward(&g, n[0]).collect();
        assert_eq!(nodes, n);
    }

    #[test]
    fn test_bfs_backward() {
        let (g, n) = make_chain_graph();
        let nodes: Vec<_> = BfsIterator::backward(&g, n[3]).collect();
        assert_eq!(nodes, vec![n[3], n[2], n[1], n[0]]);
    }

    #[test]
    fn test_dfs_forward() {
        let (g, n) = make_chain_graph();
        let nodes: Vec<_> = DfsIterator::forward(&g, n[0]).collect();

        // DFS on a chain is same as BFS
        assert_eq!(nodes, n);
    }

    #[test]
    fn test_predecessors_and_successors() {
        let (g, n) = make_chain_graph();
        assert_eq!(predecessors(&g, n[3]), vec![n[2], n[1], n[0]]);
        assert_eq!(successors(&g, n[0]), vec![n[1], n[2], n[3]]);
    }

    #[test]
    fn test_find_path() {
        let (g, n) = make_chain_graph();
        assert_eq!(find_path(&g, n[0], n[3]), Some(n.clone()));
        assert_eq!(find_path(&g, n[1], n[1]), Some(vec![n[1]]));
        // Backward path doesn't exist in forward search
        assert_eq!(find_path(&g, n[3], n[0]), None);
    }

    #[test]
    fn test_has_path() {
        let (g, n) = make_chain_graph();
        assert!(has_path(&g, n[0], n[3]));
        assert!(has_path(&g, n[1], n[1]));
        assert!(!has_path(&g, n[3], n[0]));
    }
}
