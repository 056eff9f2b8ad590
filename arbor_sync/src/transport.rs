// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use async_trait::async_trait;

use arbor_tree::{ItemId, NodeSpec};

use crate::error::TransportError;
use crate::wire::{MoveRequest, ServerReply};

/// Asynchronous channel to the page-management backend.
///
/// Implementations only move bytes. Interpreting replies, timeouts, and
/// rollback live in [`SyncCoordinator`](crate::SyncCoordinator).
#[async_trait]
pub trait MoveTransport: Send + Sync {
    /// Post a move or copy and return whatever the backend answered.
    async fn send(&self, request: &MoveRequest) -> Result<ServerReply, TransportError>;

    /// Fetch the children of a lazily loaded branch.
    async fn load_children(&self, parent: &ItemId) -> Result<Vec<NodeSpec>, TransportError>;
}

#[async_trait]
impl<T: MoveTransport + ?Sized> MoveTransport for std::sync::Arc<T> {
    async fn send(&self, request: &MoveRequest) -> Result<ServerReply, TransportError> {
        (**self).send(request).await
    }

    async fn load_children(&self, parent: &ItemId) -> Result<Vec<NodeSpec>, TransportError> {
        (**self).load_children(parent).await
    }
}
