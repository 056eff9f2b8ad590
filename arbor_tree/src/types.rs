// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the page tree: handles, item ids, flags, and display state.

use alloc::string::String;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt;

use smallvec::SmallVec;

/// Identifier for a node in the tree (generational).
///
/// Handles are cheap to copy and only meaningful for the [`Tree`](crate::Tree)
/// that issued them. Once a node is removed its handle goes stale: the slot may
/// be reused, but with a higher generation, so stale handles never alias a new
/// node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Opaque, stable identifier of a page as known to the server.
///
/// Unique across a tree. Integers convert into their decimal string form so
/// numeric primary keys and slug-like ids share one representation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ItemId(String);

impl ItemId {
    /// Create an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(String::from(s))
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        Self(alloc::format!("{n}"))
    }
}

impl From<u32> for ItemId {
    fn from(n: u32) -> Self {
        Self::from(u64::from(n))
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

bitflags::bitflags! {
    /// Node flags controlling drag participation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node can be picked up and dragged.
        const DRAGGABLE = 0b0000_0001;
        /// Other nodes may be nested under this node by dragging.
        ///
        /// Clearing this flag is the "disable nesting" marker: the node still
        /// accepts siblings before and after it.
        const NESTABLE  = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::DRAGGABLE | Self::NESTABLE
    }
}

/// Whether a node displays as a leaf or as a branch with a disclosure toggle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// No children, no child container.
    Leaf,
    /// Has children, loaded or not.
    Branch,
}

/// Display state of a node.
///
/// This is the canonical state; class names for a markup renderer are derived
/// from it with [`NodeState::class_names`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeState {
    /// Leaf or branch.
    pub kind: NodeKind,
    /// Whether the children of a branch are shown. Ignored for leaves.
    pub expanded: bool,
    /// Whether the children of a branch are present in the tree.
    ///
    /// `false` means the server reported children that have not been fetched
    /// yet.
    pub children_loaded: bool,
}

impl NodeState {
    /// State of a freshly created leaf.
    pub const LEAF: Self = Self {
        kind: NodeKind::Leaf,
        expanded: false,
        children_loaded: true,
    };

    /// Returns `true` for a branch whose children are shown.
    pub fn is_open(&self) -> bool {
        self.kind == NodeKind::Branch && self.expanded
    }

    /// Class names a markup renderer would put on the list item.
    pub fn class_names(&self) -> SmallVec<[&'static str; 2]> {
        let mut names = SmallVec::new();
        match self.kind {
            NodeKind::Leaf => names.push("leaf"),
            NodeKind::Branch => {
                names.push("branch");
                names.push(if self.expanded { "expanded" } else { "collapsed" });
            }
        }
        names
    }
}

/// Server-supplied description of a node and its loaded descendants.
///
/// Used to build a tree from initial data and to merge lazily loaded subtrees.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeSpec {
    /// The node's stable id.
    pub id: ItemId,
    /// Loaded children in display order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<NodeSpec>,
    /// Set when the node has children on the server that are not included in
    /// `children` (lazy subtree).
    #[cfg_attr(feature = "serde", serde(default))]
    pub has_unloaded_children: bool,
    /// Whether loaded children start out shown.
    #[cfg_attr(feature = "serde", serde(default))]
    pub expanded: bool,
    /// Whether other nodes may be nested under this one.
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub nestable: bool,
    /// Whether the node may be dragged.
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub draggable: bool,
}

#[cfg(feature = "serde")]
fn default_true() -> bool {
    true
}

impl NodeSpec {
    /// A draggable, nestable leaf.
    pub fn leaf(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            children: Vec::new(),
            has_unloaded_children: false,
            expanded: false,
            nestable: true,
            draggable: true,
        }
    }

    /// An expanded branch with the given loaded children.
    pub fn branch(id: impl Into<ItemId>, children: Vec<Self>) -> Self {
        Self {
            children,
            expanded: true,
            ..Self::leaf(id)
        }
    }

    /// A collapsed branch whose children have not been loaded.
    pub fn lazy(id: impl Into<ItemId>) -> Self {
        Self {
            has_unloaded_children: true,
            ..Self::leaf(id)
        }
    }

    pub(crate) fn flags(&self) -> NodeFlags {
        let mut flags = NodeFlags::empty();
        flags.set(NodeFlags::DRAGGABLE, self.draggable);
        flags.set(NodeFlags::NESTABLE, self.nestable);
        flags
    }

    pub(crate) fn state(&self) -> NodeState {
        if self.children.is_empty() && !self.has_unloaded_children {
            NodeState::LEAF
        } else {
            NodeState {
                kind: NodeKind::Branch,
                expanded: self.expanded,
                children_loaded: !self.has_unloaded_children,
            }
        }
    }
}

/// Where a node lands relative to a target node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DropPosition {
    /// Immediately before the target, under the same parent.
    Before,
    /// Immediately after the target, under the same parent.
    After,
    /// Inside the target, as its first child.
    FirstChild,
    /// Inside the target, as its last child.
    LastChild,
}

impl DropPosition {
    /// Returns `true` for the two "inside" positions.
    pub fn is_inside(self) -> bool {
        matches!(self, Self::FirstChild | Self::LastChild)
    }
}

/// A drop decision: a target node and a position relative to it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DropTarget {
    /// The node the position is relative to.
    pub node: NodeId,
    /// Position relative to `node`.
    pub position: DropPosition,
}

impl DropTarget {
    /// Place before `node`.
    pub fn before(node: NodeId) -> Self {
        Self {
            node,
            position: DropPosition::Before,
        }
    }

    /// Place after `node`.
    pub fn after(node: NodeId) -> Self {
        Self {
            node,
            position: DropPosition::After,
        }
    }

    /// Place as first child of `node`.
    pub fn first_child(node: NodeId) -> Self {
        Self {
            node,
            position: DropPosition::FirstChild,
        }
    }

    /// Place as last child of `node`.
    pub fn last_child(node: NodeId) -> Self {
        Self {
            node,
            position: DropPosition::LastChild,
        }
    }
}

/// An absolute slot in the tree: a parent (or the root level) and an index
/// into its child list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    /// Parent node, `None` for the root level.
    pub parent: Option<NodeId>,
    /// Index into the parent's children.
    pub index: usize,
}

impl Location {
    /// A slot at the root level.
    pub const fn root(index: usize) -> Self {
        Self {
            parent: None,
            index,
        }
    }

    /// A slot under `parent`.
    pub const fn under(parent: NodeId, index: usize) -> Self {
        Self {
            parent: Some(parent),
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_follow_state() {
        assert_eq!(NodeState::LEAF.class_names().as_slice(), &["leaf"]);
        let open = NodeState {
            kind: NodeKind::Branch,
            expanded: true,
            children_loaded: true,
        };
        assert_eq!(open.class_names().as_slice(), &["branch", "expanded"]);
        assert!(open.is_open());
        let closed = NodeState {
            expanded: false,
            ..open
        };
        assert_eq!(closed.class_names().as_slice(), &["branch", "collapsed"]);
    }

    #[test]
    fn node_spec_state_and_flags() {
        assert_eq!(NodeSpec::leaf("a").state(), NodeState::LEAF);
        let lazy = NodeSpec::lazy("b").state();
        assert_eq!(lazy.kind, NodeKind::Branch);
        assert!(!lazy.children_loaded);
        assert!(!lazy.expanded);

        let mut spec = NodeSpec::leaf("c");
        spec.nestable = false;
        assert_eq!(spec.flags(), NodeFlags::DRAGGABLE);
    }

    #[test]
    fn item_ids_from_integers() {
        assert_eq!(ItemId::from(42_u64).as_str(), "42");
        assert_eq!(ItemId::from(7_u32), ItemId::from("7"));
    }
}
