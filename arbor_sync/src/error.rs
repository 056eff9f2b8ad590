// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use arbor_sortable::SortableError;
use arbor_tree::TreeError;

/// A request could not be completed at the transport level.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP client failure (connect, TLS, body read).
    #[cfg(feature = "http")]
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Any other failure, described by the transport.
    #[error("{0}")]
    Other(String),
}

/// Why a move or load did not go through.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No answer within the configured timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),
    /// The request never completed.
    #[error("transport failure")]
    Transport(#[source] TransportError),
    /// The backend answered with a non-success status.
    #[error("rejected with status {status}: {message}")]
    Rejected {
        /// Status code of the reply.
        status: u16,
        /// Reply body, trimmed.
        message: String,
    },
    /// The page was deleted on the server.
    #[error("page not found on the server")]
    NotFound,
    /// The sortable was not in a state to sync.
    #[error(transparent)]
    Sortable(#[from] SortableError),
    /// A tree operation failed.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl SyncError {
    /// Message to show the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout(_) => {
                "The server did not respond in time. The change has been undone.".to_owned()
            }
            Self::Transport(_) => "Could not reach the server. The change has been undone.".to_owned(),
            Self::Rejected { status, message } if message.is_empty() => {
                format!("The server refused the change (status {status}).")
            }
            Self::Rejected { message, .. } => message.clone(),
            Self::NotFound => {
                "This page no longer exists and has been removed from the tree.".to_owned()
            }
            Self::Sortable(err) => err.to_string(),
            Self::Tree(err) => err.to_string(),
        }
    }
}
