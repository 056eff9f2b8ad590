// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory transport that replays queued answers.
//!
//! Useful for tests and demos: queue replies, run the coordinator, then
//! inspect what was sent.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use arbor_tree::{ItemId, NodeSpec};

use crate::error::TransportError;
use crate::transport::MoveTransport;
use crate::wire::{MoveRequest, ServerReply};

/// One queued answer.
#[derive(Clone, Debug)]
pub enum Scripted {
    /// Answer with this reply.
    Reply(ServerReply),
    /// Fail at the transport level with this message.
    Fail(String),
    /// Never answer.
    Hang,
}

/// Transport answering from a queue. An empty queue answers `200` with an
/// empty body.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Scripted>>,
    children: Mutex<HashMap<ItemId, Vec<NodeSpec>>>,
    sent: Mutex<Vec<MoveRequest>>,
}

impl ScriptedTransport {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for the next [`MoveTransport::send`].
    pub fn push(&self, answer: Scripted) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(answer);
        self
    }

    /// Children returned when `parent` is loaded.
    pub fn set_children(&self, parent: impl Into<ItemId>, specs: Vec<NodeSpec>) -> &Self {
        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(parent.into(), specs);
        self
    }

    /// Every request received so far, in order.
    pub fn sent(&self) -> Vec<MoveRequest> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MoveTransport for ScriptedTransport {
    async fn send(&self, request: &MoveRequest) -> Result<ServerReply, TransportError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let answer = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match answer {
            None => Ok(ServerReply::ok("")),
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(message)) => Err(TransportError::Other(message)),
            Some(Scripted::Hang) => std::future::pending().await,
        }
    }

    async fn load_children(&self, parent: &ItemId) -> Result<Vec<NodeSpec>, TransportError> {
        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(parent)
            .ok_or_else(|| TransportError::Other(format!("no children scripted for `{parent}`")))
    }
}
