// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Position serialization.
//!
//! Two encodings are provided:
//!
//! - A full nested-set dump ([`to_array`]) where each node gets a `(left,
//!   right)` interval that strictly contains the intervals of its descendants.
//!   [`from_records`] validates such a dump and rebuilds the tree from it.
//! - A per-move relative encoding ([`Tree::relative_position`]): the node's
//!   new place expressed against one neighbour with a [`PositionToken`].
//!
//! Numbering always reserves `left = 1` for a synthetic root, so the
//! intervals of real nodes do not depend on whether the root record is
//! emitted.

use alloc::vec::Vec;
use core::fmt;

use crate::error::TreeError;
use crate::tree::Tree;
use crate::types::{ItemId, NodeFlags, NodeId, NodeSpec};

/// One node of a nested-set dump.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionRecord {
    /// The node's id.
    pub item_id: ItemId,
    /// The immediate parent, the root sentinel for top-level nodes, or `None`.
    pub parent_id: Option<ItemId>,
    /// Recursion depth: 0 for the synthetic root, 1 for top-level nodes.
    pub depth: usize,
    /// Interval start, assigned on entry.
    pub left: usize,
    /// Interval end, assigned on exit.
    pub right: usize,
}

impl PositionRecord {
    /// Returns `true` if the interval encloses no other interval.
    pub fn is_leaf(&self) -> bool {
        self.right == self.left + 1
    }

    /// Returns `true` if `other` lies strictly inside this interval.
    pub fn contains(&self, other: &Self) -> bool {
        self.left < other.left && other.right < self.right
    }
}

/// Options for [`to_array`] and [`from_records`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Id used for the synthetic root record.
    pub root_id: ItemId,
    /// Leave the root record out and give top-level nodes no parent.
    pub exclude_root: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            root_id: ItemId::from("root"),
            exclude_root: false,
        }
    }
}

impl SerializeOptions {
    fn top_parent(&self) -> Option<ItemId> {
        (!self.exclude_root).then(|| self.root_id.clone())
    }
}

enum Visit {
    Enter(NodeId, usize),
    Exit(usize),
}

/// Dump the tree as nested-set records, ordered by `left`.
///
/// For `N` nodes with the root included, the root record spans `1..2*(N+1)`.
pub fn to_array(tree: &Tree, options: &SerializeOptions) -> Vec<PositionRecord> {
    let mut records = Vec::with_capacity(tree.len() + 1);
    if !options.exclude_root {
        records.push(PositionRecord {
            item_id: options.root_id.clone(),
            parent_id: None,
            depth: 0,
            left: 1,
            right: 0,
        });
    }
    let top_parent = options.top_parent();
    let mut counter = 2;
    let mut stack: Vec<Visit> = tree.roots().iter().rev().map(|&r| Visit::Enter(r, 1)).collect();
    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(id, depth) => {
                let parent_id = match tree.parent_of(id) {
                    Some(p) => tree.item_id(p).cloned(),
                    None => top_parent.clone(),
                };
                records.push(PositionRecord {
                    item_id: tree.node(id).item.clone(),
                    parent_id,
                    depth,
                    left: counter,
                    right: 0,
                });
                counter += 1;
                stack.push(Visit::Exit(records.len() - 1));
                stack.extend(
                    tree.children_of(id)
                        .iter()
                        .rev()
                        .map(|&c| Visit::Enter(c, depth + 1)),
                );
            }
            Visit::Exit(index) => {
                records[index].right = counter;
                counter += 1;
            }
        }
    }
    if !options.exclude_root {
        records[0].right = counter;
    }
    records
}

/// Rebuild a tree from nested-set records.
///
/// Records may come in any order. Intervals must be well formed and properly
/// nested, depths must match the nesting, and every `parent_id` must name the
/// enclosing interval (the root sentinel, or `None` when the root is
/// excluded, for top-level records). A root record, if present, is skipped.
pub fn from_records(
    records: &[PositionRecord],
    options: &SerializeOptions,
) -> Result<Tree, TreeError> {
    let mut sorted: Vec<&PositionRecord> = records
        .iter()
        .filter(|r| !(r.depth == 0 && r.item_id == options.root_id))
        .collect();
    sorted.sort_by_key(|r| r.left);

    let top_parent = options.top_parent();
    let mut tree = Tree::new();
    // (node, its record)
    let mut open: Vec<(NodeId, &PositionRecord)> = Vec::new();
    for record in sorted {
        if record.right <= record.left {
            return Err(TreeError::InvalidInterval(record.item_id.clone()));
        }
        while open.last().is_some_and(|(_, r)| r.right < record.left) {
            open.pop();
        }
        let parent = open.last().copied();
        if let Some((_, enclosing)) = parent
            && !enclosing.contains(record)
        {
            return Err(TreeError::InvalidInterval(record.item_id.clone()));
        }
        if record.depth != open.len() + 1 {
            return Err(TreeError::InvalidInterval(record.item_id.clone()));
        }
        let expected = match parent {
            Some((_, enclosing)) => Some(&enclosing.item_id),
            None => top_parent.as_ref(),
        };
        if record.parent_id.as_ref() != expected {
            return Err(TreeError::ParentMismatch(record.item_id.clone()));
        }
        let id = tree.insert(parent.map(|(p, _)| p), record.item_id.clone())?;
        open.push((id, record));
    }
    Ok(tree)
}

/// Nested form of the tree, suitable for serializing or for rebuilding with
/// [`Tree::from_specs`].
pub fn to_hierarchy(tree: &Tree) -> Vec<NodeSpec> {
    tree.roots().iter().map(|&r| spec_of(tree, r)).collect()
}

fn spec_of(tree: &Tree, id: NodeId) -> NodeSpec {
    let node = tree.node(id);
    NodeSpec {
        id: node.item.clone(),
        children: node.children.iter().map(|&c| spec_of(tree, c)).collect(),
        has_unloaded_children: !node.state.children_loaded,
        expanded: node.state.expanded,
        nestable: node.flags.contains(NodeFlags::NESTABLE),
        draggable: node.flags.contains(NodeFlags::DRAGGABLE),
    }
}

/// Where a node sits relative to its [`RelativePosition::target`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum PositionToken {
    /// Immediately before the target.
    Left,
    /// Immediately after the target.
    Right,
    /// Last child of the target.
    LastChild,
}

impl PositionToken {
    /// Wire form: `left`, `right`, or `last-child`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::LastChild => "last-child",
        }
    }
}

impl fmt::Display for PositionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node's place expressed against one neighbour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelativePosition {
    /// The neighbour or parent. `None` means the root level itself, which
    /// only happens for the sole top-level node.
    pub target: Option<ItemId>,
    /// Relation to `target`.
    pub token: PositionToken,
}

impl Tree {
    /// Encode the current place of a live node.
    ///
    /// Prefers `right` of the previous sibling, then `left` of the next
    /// sibling, then `last-child` of the parent.
    pub fn relative_position(&self, node: NodeId) -> Option<RelativePosition> {
        if !self.is_alive(node) {
            return None;
        }
        let (target, token) = if let Some(prev) = self.prev_sibling(node) {
            (Some(prev), PositionToken::Right)
        } else if let Some(next) = self.next_sibling(node) {
            (Some(next), PositionToken::Left)
        } else {
            (self.parent_of(node), PositionToken::LastChild)
        };
        Some(RelativePosition {
            target: target.and_then(|t| self.item_id(t).cloned()),
            token,
        })
    }
}
