//! Forest reconciliation for parent-referencing nodes
//!
//! Nodes arrive as a flat collection where each node names its parent by id.
//! [`build_forest`] resolves those references inside the collection only: a
//! node whose parent is absent, null or lives in another collection becomes a
//! root. A container whose real parent was enumerated through a different
//! source therefore shows up as a (spurious) root here. This is accepted
//! behavior; the builder never guesses at parents it cannot see.

use crate::model::ContentNode;
use std::collections::HashMap;

/// A node that names its parent by identity and owns its attached children
pub trait Hierarchical: Sized {
    fn id(&self) -> &str;
    fn parent_id(&self) -> Option<&str>;
    fn children_mut(&mut self) -> &mut Vec<Self>;
}

impl Hierarchical for ContentNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }
}

/// Builds a forest from a flat collection of nodes
///
/// Every input identity appears exactly once in the result. A repeated id is
/// merged: the last occurrence replaces the first one, in the first one's
/// position. Children keep their encounter order, and so do the roots. A parent
/// cycle is broken by promoting the first unreachable node (in encounter order)
/// to root.
///
/// # Examples
///
/// ```
/// use sumi_archive::model::{ContentNode, NodeKind};
/// use sumi_archive::tree::build_forest;
///
/// let forest = build_forest(vec![
///     ContentNode::new("b", "Child", NodeKind::Document).with_parent("a"),
///     ContentNode::new("a", "Parent", NodeKind::Document),
///     ContentNode::new("c", "Elsewhere", NodeKind::Document).with_parent("space-9"),
/// ]);
///
/// assert_eq!(forest.len(), 2);
/// assert_eq!(forest[0].id, "a");
/// assert_eq!(forest[0].children[0].id, "b");
/// assert_eq!(forest[1].id, "c");
/// ```
pub fn build_forest<N: Hierarchical>(nodes: Vec<N>) -> Vec<N> {
    let nodes = merge_repeats(nodes);
    let len = nodes.len();

    let index: HashMap<String, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id().to_string(), i))
        .collect();

    let mut parent: Vec<Option<usize>> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            node.parent_id()
                .and_then(|p| index.get(p).copied())
                .filter(|&p| p != i)
        })
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); len];
    for (i, p) in parent.iter().enumerate() {
        if let Some(p) = p {
            children[*p].push(i);
        }
    }

    let mut roots: Vec<usize> = (0..len).filter(|&i| parent[i].is_none()).collect();
    let mut reached = vec![false; len];
    for &root in &roots {
        mark_reached(root, &children, &mut reached);
    }

    // Whatever is still unreached hangs off a parent cycle
    for i in 0..len {
        if reached[i] {
            continue;
        }
        if let Some(p) = parent[i].take() {
            children[p].retain(|&c| c != i);
        }
        tracing::debug!("Breaking parent cycle at node {}", nodes[i].id());
        roots.push(i);
        mark_reached(i, &children, &mut reached);
    }
    roots.sort_unstable();

    let mut arena: Vec<Option<N>> = nodes.into_iter().map(Some).collect();
    roots
        .into_iter()
        .filter_map(|root| assemble(root, &mut arena, &mut children))
        .collect()
}

/// Collapses repeated ids; the last version wins and keeps the first position
fn merge_repeats<N: Hierarchical>(nodes: Vec<N>) -> Vec<N> {
    let mut position: HashMap<String, usize> = HashMap::with_capacity(nodes.len());
    let mut merged: Vec<N> = Vec::with_capacity(nodes.len());

    for node in nodes {
        let existing = position.get(node.id()).copied();
        match existing {
            Some(i) => {
                tracing::debug!("Node {} listed more than once, keeping the last version", node.id());
                merged[i] = node;
            }
            None => {
                position.insert(node.id().to_string(), merged.len());
                merged.push(node);
            }
        }
    }
    merged
}

fn mark_reached(start: usize, children: &[Vec<usize>], reached: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(i) = stack.pop() {
        if reached[i] {
            continue;
        }
        reached[i] = true;
        stack.extend(children[i].iter().copied());
    }
}

fn assemble<N: Hierarchical>(
    i: usize,
    arena: &mut [Option<N>],
    children: &mut [Vec<usize>],
) -> Option<N> {
    let mut node = arena[i].take()?;
    for child in std::mem::take(&mut children[i]) {
        if let Some(child) = assemble(child, arena, children) {
            node.children_mut().push(child);
        }
    }
    Some(node)
}
