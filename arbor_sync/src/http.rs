// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use async_trait::async_trait;

use arbor_tree::{ItemId, NodeSpec};

use crate::config::SyncConfig;
use crate::error::TransportError;
use crate::transport::MoveTransport;
use crate::wire::{MoveRequest, ServerReply};

/// [`MoveTransport`] over HTTP.
///
/// Moves and copies are form-encoded POSTs to `<base>/<id>/move-page/` and
/// `<base>/<id>/copy-page/`. Lazy children are fetched with a GET to
/// `<base>/<id>/<children_path>/` and decoded from a JSON array of
/// [`NodeSpec`]s. Request timeouts are left to the coordinator.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: SyncConfig,
}

impl HttpTransport {
    /// Transport with a fresh client.
    pub fn new(config: SyncConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Transport sharing an existing client (cookies, CSRF headers).
    pub fn with_client(client: reqwest::Client, config: SyncConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl MoveTransport for HttpTransport {
    async fn send(&self, request: &MoveRequest) -> Result<ServerReply, TransportError> {
        let url = self.config.endpoint(&request.id, request.kind.action());
        let response = self
            .client
            .post(url)
            .form(&request.form_fields())
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ServerReply { status, body })
    }

    async fn load_children(&self, parent: &ItemId) -> Result<Vec<NodeSpec>, TransportError> {
        let url = self.config.endpoint(parent, &self.config.children_path);
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
