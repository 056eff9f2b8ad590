// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Sortable: drag-to-reorder and drag-to-nest over an [`arbor_tree::Tree`].
//!
//! Everything here is sans-IO. The host feeds pointer positions and millisecond
//! timestamps and lays out rows; this crate decides where the dragged node would
//! land and applies the move on drop.
//!
//! - [`classify`]: the pure geometry classifier. Given the pointer, the dragged
//!   row's rectangle, and the last direction of travel, it computes a placeholder
//!   slot, infers indent and outdent from horizontal movement, and checks depth
//!   limits and root protection.
//! - [`DragSession`]: the state of one gesture, including the hover timer that
//!   expands collapsed branches (or asks the host to load them).
//! - [`Sortable`]: owns the tree and enforces a single gesture at a time through
//!   [`Phase::Idle`], [`Phase::Dragging`], and [`Phase::Committing`].
//!
//! The tree is not restructured while dragging. On drop, an allowed move is applied
//! speculatively and handed out as a [`PendingMove`] that the caller later commits
//! or rolls back.
//!
//! ## Minimal example
//!
//! ```
//! use arbor_sortable::{DropOutcome, Sortable, SortableConfig};
//! use arbor_tree::{NodeSpec, Tree};
//! use kurbo::{Point, Rect};
//!
//! let tree = Tree::from_specs(&[NodeSpec::leaf("F"), NodeSpec::leaf("G")]).unwrap();
//! let mut sortable = Sortable::new(tree, SortableConfig::default());
//! let f = sortable.tree().find("F").unwrap();
//! let g = sortable.tree().find("G").unwrap();
//! sortable.set_row_bounds(f, Some(Rect::new(0.0, 0.0, 200.0, 20.0)));
//! sortable.set_row_bounds(g, Some(Rect::new(0.0, 20.0, 200.0, 40.0)));
//!
//! // Dropping far outside the rows cancels; nothing moved.
//! sortable.begin_drag(f, Point::new(5.0, 5.0), 0).unwrap();
//! sortable.drag_to(Point::new(5.0, 38.0), 16).unwrap();
//! let outcome = sortable.drop_at(Point::new(900.0, 900.0), 32).unwrap();
//! assert_eq!(outcome, DropOutcome::Cancelled);
//! assert_eq!(sortable.tree().roots(), &[f, g]);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod classify;
mod config;
mod error;
mod session;
mod sortable;

pub use classify::{Classification, ClassifyInput, Direction, NestingPolicy, intersect};
pub use config::SortableConfig;
pub use error::SortableError;
pub use session::{DragSession, DragUpdate, HoverEvent};
pub use sortable::{DropOutcome, Phase, PendingMove, Sortable};
