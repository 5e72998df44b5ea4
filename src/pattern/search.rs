//! Backward leaf search
//!
//! Alternative to the anchored matcher for patterns with a single output
//! node. Matching starts at a program node that agrees with the pattern leaf
//! and walks producers backwards input by input, requiring every matched
//! producer to feed the same output slot as in the pattern.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::error::{GraphError, GraphResult};
use crate::graph::{Graph, Node, NodeId};

/// Pattern node → program node
pub type PatternMatch = IndexMap<NodeId, NodeId>;

/// The pattern's single output node
///
/// Output nodes are the producers of pattern tensors nothing consumes.
pub fn pattern_leaf(pattern: &Graph) -> GraphResult<NodeId> {
    let leaves: Vec<NodeId> = pattern
        .nodes()
        .filter(|(_, n)| n.outputs.iter().any(|t| pattern.consumer_count(*t) == 0))
        .map(|(id, _)| id)
        .collect();
    match leaves.as_slice() {
        [leaf] => Ok(*leaf),
        _ => Err(GraphError::InvalidPatternLeaves {
            leaves: leaves.len(),
        }),
    }
}

/// Match the pattern backwards from a program leaf
///
/// Pattern inputs without a producer match anything. A pattern node shared by
/// several paths keeps its first mapping and is walked once.
fn search_from<F>(
    program: &Graph,
    program_leaf: NodeId,
    pattern: &Graph,
    leaf: NodeId,
    same: &F,
) -> Option<PatternMatch>
where
    F: Fn(&Node, &Node) -> bool,
{
    let mut found = PatternMatch::default();
    found.insert(leaf, program_leaf);
    let mut stack = vec![(leaf, program_leaf)];

    while let Some((pat_id, prog_id)) = stack.pop() {
        let pat_node = pattern.node(pat_id)?;
        let prog_node = program.node(prog_id)?;

        for (index, pat_tensor) in pat_node.inputs.iter().enumerate() {
            let Some(pat_producer) = pattern.get_producer(*pat_tensor) else {
                continue;
            };
            let prog_tensor = *prog_node.inputs.get(index)?;
            let prog_producer = program.get_producer(prog_tensor)?;

            let pat_producer_node = pattern.node(pat_producer)?;
            let prog_producer_node = program.node(prog_producer)?;
            if pat_producer_node.output_index(*pat_tensor)
                != prog_producer_node.output_index(prog_tensor)
                || !same(prog_producer_node, pat_producer_node)
            {
                return None;
            }

            // A pattern node reached along two paths must map to one program node.
            match found.entry(pat_producer) {
                Entry::Occupied(seen) if *seen.get() != prog_producer => return None,
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(prog_producer);
                    stack.push((pat_producer, prog_producer));
                }
            }
        }
    }
    Some(found)
}

/// Find every occurrence of a single-output pattern, one map per program leaf
pub fn find_matches<F>(program: &Graph, pattern: &Graph, same: F) -> GraphResult<Vec<PatternMatch>>
where
    F: Fn(&Node, &Node) -> bool,
{
    let leaf = pattern_leaf(pattern)?;
    let leaf_node = pattern.try_node(leaf)?;

    let matches: Vec<PatternMatch> = program
        .nodes()
        .filter(|(_, n)| same(*n, leaf_node))
        .filter_map(|(id, _)| search_from(program, id, pattern, leaf, &same))
        .collect();

    tracing::debug!(matches = matches.len(), "backward search finished");
    Ok(matches)
}

/// Program nodes at which a single-output pattern ends
pub fn match_pattern_with_single_output_node<F>(
    program: &Graph,
    pattern: &Graph,
    same: F,
) -> GraphResult<Vec<NodeId>>
where
    F: Fn(&Node, &Node) -> bool,
{
    let leaf = pattern_leaf(pattern)?;
    Ok(find_matches(program, pattern, same)?
        .into_iter()
        .filter_map(|m| m.get(&leaf).copied())
        .collect())
}
