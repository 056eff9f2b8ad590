// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::types::{ItemId, NodeId};

/// Errors from structural tree operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The handle does not refer to a live node.
    #[error("stale node handle {0:?}")]
    StaleNode(NodeId),
    /// An item with this id is already in the tree.
    #[error("duplicate item id `{0}`")]
    DuplicateId(ItemId),
    /// A node cannot be placed relative to itself or inside its own subtree.
    #[error("cannot move a node into its own subtree")]
    IntoOwnSubtree,
    /// The node has moved since the receipt was issued.
    #[error("move receipt no longer matches the tree")]
    StaleReceipt,
    /// A nested-set interval is empty, inverted, or overlaps a sibling.
    #[error("invalid nested-set interval for `{0}`")]
    InvalidInterval(ItemId),
    /// A record's `parent_id` disagrees with the parent implied by intervals.
    #[error("parent of `{0}` does not match its enclosing interval")]
    ParentMismatch(ItemId),
}
