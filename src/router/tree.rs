//! Segment tree for routes with expression constraints.
//!
//! Each node holds one [`SegmentMatcher`]. Routes sharing a prefix whose
//! matchers have the same rule share the node; the node's matcher then
//! carries the merged parameter keys of every route passing through it.
//! Routes are stored at terminal nodes.
//!
//! Search is depth-first with backtracking. Because sibling order reflects
//! the first insertion of a rule rather than each route's registration, the
//! search keeps the candidate with the lowest registration index and prunes
//! subtrees that cannot beat it.

use std::sync::Arc;

use super::core::ParamVec;
use crate::error::RoutingError;
use crate::generator::RouteDescriptor;
use crate::matchers::SegmentMatcher;

/// A route stored at a terminal node.
#[derive(Debug, Clone)]
pub(crate) struct TreeLeaf {
    pub(crate) descriptor: Arc<RouteDescriptor>,
    pub(crate) parameter_names: Vec<Arc<str>>,
}

#[derive(Debug, Clone)]
struct TreeNode {
    matcher: SegmentMatcher,
    /// Lowest registration index of any route at or below this node
    min_index: usize,
    leaves: Vec<TreeLeaf>,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn new(matcher: SegmentMatcher, min_index: usize) -> Self {
        Self {
            matcher,
            min_index,
            leaves: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Per-method segment tree.
#[derive(Debug, Clone, Default)]
pub(crate) struct SegmentTree {
    children: Vec<TreeNode>,
    len: usize,
}

impl SegmentTree {
    pub(crate) fn insert(&mut self, matchers: &[SegmentMatcher], leaf: TreeLeaf) -> Result<(), RoutingError> {
        let Some((first, rest)) = matchers.split_first() else {
            return Err(RoutingError::malformed(format!(
                "constrained route '{}' has no segments",
                leaf.descriptor.path
            )));
        };
        insert_into(&mut self.children, first, rest, leaf)?;
        self.len += 1;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Find the lowest-index route matching `segments`.
    pub(crate) fn search(&self, segments: &[&str]) -> Option<(&TreeLeaf, ParamVec)> {
        let mut stack = Vec::new();
        let mut best = None;
        for child in &self.children {
            search_node(child, segments, &mut stack, &mut best);
        }
        best
    }
}

fn insert_into(
    nodes: &mut Vec<TreeNode>,
    matcher: &SegmentMatcher,
    rest: &[SegmentMatcher],
    leaf: TreeLeaf,
) -> Result<(), RoutingError> {
    let index = leaf.descriptor.index;
    let position = match nodes.iter().position(|n| n.matcher.same_rule(matcher)) {
        Some(position) => {
            nodes[position].matcher.merge_parameter_keys(matcher)?;
            position
        }
        None => {
            nodes.push(TreeNode::new(matcher.clone(), index));
            nodes.len() - 1
        }
    };
    let node = &mut nodes[position];
    node.min_index = node.min_index.min(index);
    match rest.split_first() {
        None => {
            node.leaves.push(leaf);
            Ok(())
        }
        Some((next, rest)) => insert_into(&mut node.children, next, rest, leaf),
    }
}

fn search_node<'a>(
    node: &'a TreeNode,
    segments: &[&str],
    stack: &mut Vec<(usize, String)>,
    best: &mut Option<(&'a TreeLeaf, ParamVec)>,
) {
    if matches!(best, Some((leaf, _)) if leaf.descriptor.index <= node.min_index) {
        return;
    }
    let Some((segment, remaining)) = segments.split_first() else {
        return;
    };
    let Some(values) = node.matcher.extract(segment) else {
        return;
    };

    let depth = stack.len();
    stack.extend(values);

    if remaining.is_empty() {
        if let Some(leaf) = node.leaves.iter().min_by_key(|l| l.descriptor.index) {
            let better = match best {
                Some((current, _)) => leaf.descriptor.index < current.descriptor.index,
                None => true,
            };
            if better {
                let params = collect_params(leaf, stack);
                *best = Some((leaf, params));
            }
        }
    } else {
        for child in &node.children {
            search_node(child, remaining, stack, best);
        }
    }

    // Backtrack
    stack.truncate(depth);
}

fn collect_params(leaf: &TreeLeaf, stack: &[(usize, String)]) -> ParamVec {
    leaf.parameter_names
        .iter()
        .enumerate()
        .filter_map(|(key, name)| {
            stack
                .iter()
                .rfind(|(k, _)| *k == key)
                .map(|(_, value)| (Arc::clone(name), value.clone()))
        })
        .collect()
}
