// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Request and reply shapes exchanged with the backend.

use arbor_tree::{ItemId, PositionToken};
use serde::{Deserialize, Serialize};

/// Body marker the backend returns when the page no longer exists.
pub const NOT_FOUND_MARKER: &str = "NotFound";

/// Whether the backend should move the page or create a copy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveKind {
    /// Relocate the page.
    Move,
    /// Copy the page (and its descendants) to the new place.
    Copy,
}

impl MoveKind {
    /// Endpoint path segment for this kind.
    pub fn action(self) -> &'static str {
        match self {
            Self::Move => "move-page",
            Self::Copy => "copy-page",
        }
    }
}

/// One move or copy, as posted to `<base>/<id>/<action>/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Move or copy.
    pub kind: MoveKind,
    /// The page being moved.
    pub id: ItemId,
    /// The neighbour or parent `position` refers to; `None` for the root level.
    pub target: Option<ItemId>,
    /// Relation to `target`.
    pub position: PositionToken,
    /// Site the page belongs to.
    pub site: Option<String>,
}

impl MoveRequest {
    /// Form-encoded body fields. Absent optional fields are left out.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("id", self.id.to_string()),
            ("position", self.position.as_str().to_owned()),
        ];
        if let Some(target) = &self.target {
            fields.push(("target", target.to_string()));
        }
        if let Some(site) = &self.site {
            fields.push(("site", site.clone()));
        }
        fields
    }
}

/// Raw backend answer: an HTTP-style status and the response body.
///
/// On success the body is an HTML fragment for reloading the tree in place;
/// on failure it is an error message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerReply {
    /// Status code; 200 means success.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl ServerReply {
    /// A 200 reply with `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    /// A reply with an arbitrary status.
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The body is the not-found marker.
    pub fn is_not_found(&self) -> bool {
        self.body.trim() == NOT_FOUND_MARKER
    }

    /// Status 200 and not the not-found marker.
    pub fn is_success(&self) -> bool {
        self.status == 200 && !self.is_not_found()
    }
}
