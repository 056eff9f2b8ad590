// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Sync: persists page-tree moves with optimistic commit and rollback.
//!
//! After a drop, an [`arbor_sortable::Sortable`] has already applied the move and
//! sits in its committing phase. [`SyncCoordinator::settle`] turns the pending
//! move into a [`MoveRequest`] (`{id, target, position, site}`), sends it through
//! a [`MoveTransport`], and settles the tree:
//!
//! - status 200: committed, with the reply body returned as a reload fragment;
//! - body `NotFound`: the page vanished server-side, so the node is removed;
//! - anything else, a transport failure, or no answer within
//!   [`SyncConfig::timeout`]: the move is rolled back and a
//!   [`SyncError::user_message`] explains why.
//!
//! Nothing here is fatal. After any outcome the sortable is idle and a new drag
//! can start.
//!
//! The `http` feature adds an [`HttpTransport`] built on `reqwest`. Tests and demos
//! use the in-memory [`scripted::ScriptedTransport`].
//!
//! ```
//! use arbor_sortable::{DropOutcome, Sortable, SortableConfig};
//! use arbor_sync::scripted::{Scripted, ScriptedTransport};
//! use arbor_sync::{ServerReply, SyncConfig, SyncCoordinator, SyncOutcome};
//! use arbor_tree::{NodeSpec, Tree};
//! use kurbo::{Point, Rect};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let tree = Tree::from_specs(&[NodeSpec::leaf("E"), NodeSpec::leaf("D")]).unwrap();
//! let mut sortable = Sortable::new(tree, SortableConfig::default());
//! let (e, d) = (sortable.tree().find("E").unwrap(), sortable.tree().find("D").unwrap());
//! sortable.set_row_bounds(e, Some(Rect::new(0.0, 0.0, 200.0, 20.0)));
//! sortable.set_row_bounds(d, Some(Rect::new(0.0, 20.0, 200.0, 40.0)));
//!
//! let sync = SyncCoordinator::new(ScriptedTransport::new(), SyncConfig::new("/admin/pages"));
//! sync.transport().push(Scripted::Reply(ServerReply::with_status(403, "Permission denied")));
//!
//! sortable.begin_drag(d, Point::new(10.0, 30.0), 0).unwrap();
//! sortable.drag_to(Point::new(40.0, 30.0), 16).unwrap();
//! assert!(matches!(sortable.drop_at(Point::new(40.0, 30.0), 32).unwrap(), DropOutcome::Moved(_)));
//!
//! let outcome = sync.settle(&mut sortable).await.unwrap();
//! assert!(matches!(outcome, SyncOutcome::RolledBack { .. }));
//! assert_eq!(outcome.user_message().as_deref(), Some("Permission denied"));
//! assert_eq!(sortable.tree().parent_of(d), None);
//! # });
//! ```

mod config;
mod coordinator;
mod error;
#[cfg(feature = "http")]
mod http;
pub mod scripted;
mod transport;
mod wire;

pub use config::SyncConfig;
pub use coordinator::{SyncCoordinator, SyncOutcome};
pub use error::{SyncError, TransportError};
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use transport::MoveTransport;
pub use wire::{MoveKind, MoveRequest, NOT_FOUND_MARKER, ServerReply};
