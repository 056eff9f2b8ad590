// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Tree: an ordered page tree with reversible moves and nested-set serialization.
//!
//! This crate holds the structural half of a page-tree reorder engine.
//!
//! - Represents a hierarchy of pages with stable ids, ordered children, and explicit
//!   leaf/branch and expanded/collapsed display state.
//! - Stores host-supplied row rectangles and hit tests them, skipping collapsed
//!   subtrees and an optional excluded subtree (the node being dragged).
//! - Applies moves relative to a target node and returns a [`MoveReceipt`] that
//!   undoes the move exactly, including the display state of both parents.
//! - Serializes the tree as nested-set records and encodes a single node's place as
//!   a [`RelativePosition`].
//!
//! ## Not a renderer
//!
//! Nothing here draws or lays out rows. The host computes one rectangle per visible
//! row and hands it over with [`Tree::set_row_bounds`]. Class names for markup are
//! available as a derived view through [`NodeState::class_names`].
//!
//! ## Invariants
//!
//! - A node never keeps an empty list of loaded children: a parent that loses its
//!   last child becomes a leaf, and a leaf that gains a child becomes an expanded
//!   branch.
//! - [`Tree::revert`] right after [`Tree::apply_move`] restores an identical tree.
//! - [`nested_set::to_array`] yields `right = left + 1` exactly for leaves, and
//!   [`nested_set::from_records`] rebuilds the same structure.
//!
//! ## Example
//!
//! ```rust
//! use arbor_tree::nested_set::{self, SerializeOptions};
//! use arbor_tree::{DropTarget, NodeSpec, Tree};
//!
//! let mut tree = Tree::from_specs(&[NodeSpec::branch(
//!     "A",
//!     vec![NodeSpec::leaf("B"), NodeSpec::leaf("C")],
//! )])
//! .unwrap();
//! let b = tree.find("B").unwrap();
//! let c = tree.find("C").unwrap();
//!
//! let receipt = tree.apply_move(c, DropTarget::before(b)).unwrap();
//! let records = nested_set::to_array(&tree, &SerializeOptions::default());
//! let order: Vec<_> = records.iter().map(|r| (r.item_id.as_str(), r.left, r.right)).collect();
//! assert_eq!(order, [("root", 1, 8), ("A", 2, 7), ("C", 3, 4), ("B", 5, 6)]);
//!
//! tree.revert(&receipt).unwrap();
//! assert_eq!(tree.children_of(tree.find("A").unwrap()), &[b, c]);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod mutate;
pub mod nested_set;
mod tree;
mod types;

pub use error::TreeError;
pub use mutate::MoveReceipt;
pub use nested_set::{PositionRecord, PositionToken, RelativePosition, SerializeOptions};
pub use tree::{DepthFirst, Hit, QueryFilter, Tree};
pub use types::{
    DropPosition, DropTarget, ItemId, Location, NodeFlags, NodeId, NodeKind, NodeSpec, NodeState,
};
