//! Anchored multi-branch pattern matching
//!
//! Finds every occurrence of a single-root pattern graph inside a program
//! graph. Matching starts at a program node that agrees with the pattern root
//! and walks forward through output consumers, one pattern branch at a time.
//! Branches are combined as a cartesian product, so an anchor with `k1` and
//! `k2` continuations on two branches yields `k1 * k2` candidates.

use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{GraphError, GraphResult};
use crate::graph::{Graph, Node, NodeId};

/// Program nodes matched against a pattern, one per pattern node
///
/// Nodes appear in anchor-then-breadth order: the anchor first, then each
/// pattern branch left to right.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateMatch(Vec<NodeId>);

impl CandidateMatch {
    /// Get the anchor node (matched against the pattern root)
    pub fn anchor(&self) -> Option<NodeId> {
        self.0.first().copied()
    }

    /// Get node at index
    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.0.get(index).copied()
    }

    /// Number of matched nodes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the match uses `node`
    pub fn contains(&self, node: NodeId) -> bool {
        self.0.contains(&node)
    }

    /// Matched nodes in order
    pub fn nodes(&self) -> &[NodeId] {
        &self.0
    }

    /// Take the node sequence
    pub fn into_nodes(self) -> Vec<NodeId> {
        self.0
    }
}

impl From<Vec<NodeId>> for CandidateMatch {
    fn from(nodes: Vec<NodeId>) -> Self {
        Self(nodes)
    }
}

/// Matching options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchConfig {
    /// Fan anchors out over a worker pool
    pub parallel: bool,
    /// Pool size; the global pool is used when `None`
    pub worker_threads: Option<usize>,
}

impl MatchConfig {
    /// Enable or disable anchor fan-out
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Bound the worker pool
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }
}

/// Default node comparator: kinds must agree
pub fn same_kind(program: &Node, pattern: &Node) -> bool {
    program.kind == pattern.kind
}

type Sequences = Vec<Vec<NodeId>>;

/// Pattern matcher over a program graph
///
/// Read-only with respect to both graphs.
pub struct PatternMatcher<'a, F = fn(&Node, &Node) -> bool> {
    program: &'a Graph,
    pattern: &'a Graph,
    root: NodeId,
    same: F,
    config: MatchConfig,
}

impl<'a> PatternMatcher<'a> {
    /// Create a matcher that compares nodes by kind
    ///
    /// Fails with [`GraphError::InvalidPattern`] unless the pattern has
    /// exactly one root node.
    pub fn new(program: &'a Graph, pattern: &'a Graph) -> GraphResult<Self> {
        Self::with_comparator(program, pattern, same_kind as fn(&Node, &Node) -> bool)
    }
}

impl<'a, F> PatternMatcher<'a, F>
where
    F: Fn(&Node, &Node) -> bool + Sync,
{
    /// Create a matcher with a custom node comparator
    ///
    /// The comparator receives the program node first, then the pattern node.
    pub fn with_comparator(program: &'a Graph, pattern: &'a Graph, same: F) -> GraphResult<Self> {
        let roots = pattern.root_nodes();
        let root = match roots.as_slice() {
            [root] => *root,
            _ => return Err(GraphError::InvalidPattern { roots: roots.len() }),
        };
        Ok(Self {
            program,
            pattern,
            root,
            same,
            config: MatchConfig::default(),
        })
    }

    /// Configure anchor fan-out
    pub fn with_config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    /// The pattern's root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Find all full-length matches, in anchor order
    #[tracing::instrument(
        skip_all,
        fields(
            program_nodes = self.program.node_count(),
            pattern_nodes = self.pattern.node_count()
        )
    )]
    pub fn find_all(&self) -> GraphResult<Vec<CandidateMatch>> {
        let anchors: Vec<NodeId> = self.program.node_ids().collect();
        let per_anchor = self.match_anchors(&anchors)?;

        let size = self.pattern.node_count();
        let matches: Vec<CandidateMatch> = per_anchor
            .into_iter()
            .flatten()
            .filter(|seq| seq.len() == size)
            .map(CandidateMatch)
            .collect();

        tracing::debug!(anchors = anchors.len(), matches = matches.len(), "pattern matched");
        Ok(matches)
    }

    /// Match a program node against a pattern node, following consumers
    ///
    /// Returns every candidate sequence rooted at `orig`, including partial
    /// ones; callers filter by pattern size.
    pub fn match_at(&self, orig: NodeId, pat: NodeId) -> Sequences {
        let (Some(orig_node), Some(pat_node)) = (self.program.node(orig), self.pattern.node(pat))
        else {
            return Vec::new();
        };
        if !(self.same)(orig_node, pat_node) {
            return Vec::new();
        }

        let mut result = vec![vec![orig]];
        let pat_consumers = self.pattern.output_consumers(pat);
        if pat_consumers.is_empty() {
            return result;
        }

        let orig_consumers = self.program.output_consumers(orig);
        let branches = self.match_many_to_many(&orig_consumers, &pat_consumers);
        combine(&mut result, branches);
        result
    }

    fn match_many_to_many(&self, orig: &[NodeId], pat: &[NodeId]) -> Sequences {
        let mut acc = Vec::new();
        for p in pat {
            let candidates: Sequences = orig.iter().flat_map(|o| self.match_at(*o, *p)).collect();
            combine(&mut acc, candidates);
        }
        acc
    }

    #[cfg(feature = "parallel")]
    fn match_anchors(&self, anchors: &[NodeId]) -> GraphResult<Vec<Sequences>> {
        if !self.config.parallel {
            return Ok(self.match_anchors_serial(anchors));
        }
        let run = || -> Vec<Sequences> {
            anchors
                .par_iter()
                .map(|a| self.match_at(*a, self.root))
                .collect()
        };
        match self.config.worker_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| GraphError::ThreadPool(e.to_string()))?;
                Ok(pool.install(run))
            }
            None => Ok(run()),
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn match_anchors(&self, anchors: &[NodeId]) -> GraphResult<Vec<Sequences>> {
        Ok(self.match_anchors_serial(anchors))
    }

    fn match_anchors_serial(&self, anchors: &[NodeId]) -> Vec<Sequences> {
        anchors.iter().map(|a| self.match_at(*a, self.root)).collect()
    }
}

impl<F> fmt::Debug for PatternMatcher<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("root", &self.root)
            .field("pattern_nodes", &self.pattern.node_count())
            .field("config", &self.config)
            .finish()
    }
}

/// Cartesian product of `acc` with `new`, in place
///
/// An empty accumulator is replaced by `new`. Otherwise each sequence of
/// `new` is appended to a copy of every accumulated sequence.
fn combine(acc: &mut Sequences, new: Sequences) {
    if acc.is_empty() {
        *acc = new;
        return;
    }
    let mut product = Vec::with_capacity(acc.len() * new.len());
    for b in &new {
        for a in acc.iter() {
            let mut seq = Vec::with_capacity(a.len() + b.len());
            seq.extend_from_slice(a);
            seq.extend_from_slice(b);
            product.push(seq);
        }
    }
    *acc = product;
}

/// Find every occurrence of `pattern` in `program`, comparing node kinds
pub fn match_pattern(program: &Graph, pattern: &Graph) -> GraphResult<Vec<CandidateMatch>> {
    PatternMatcher::new(program, pattern)?.find_all()
}

/// Find every occurrence of `pattern` in `program` with a custom comparator
pub fn match_pattern_with<F>(
    program: &Graph,
    pattern: &Graph,
    same: F,
) -> GraphResult<Vec<CandidateMatch>>
where
    F: Fn(&Node, &Node) -> bool + Sync,
{
    PatternMatcher::with_comparator(program, pattern, same)?.find_all()
}
