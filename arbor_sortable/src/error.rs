// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use arbor_tree::{NodeId, TreeError};

/// Errors from driving a [`Sortable`](crate::Sortable).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SortableError {
    /// A drag is active or a move is still being committed.
    #[error("another drag or commit is in progress")]
    Busy,
    /// The node does not carry the draggable flag.
    #[error("node {0:?} is not draggable")]
    NotDraggable(NodeId),
    /// The node has no row rectangle, so it cannot be grabbed.
    #[error("node {0:?} has not been laid out")]
    NoGeometry(NodeId),
    /// No drag is active.
    #[error("no drag is active")]
    NotDragging,
    /// No move is waiting to be committed or rolled back.
    #[error("no move is pending")]
    NothingPending,
    /// A structural tree operation failed.
    #[error(transparent)]
    Tree(#[from] TreeError),
}
