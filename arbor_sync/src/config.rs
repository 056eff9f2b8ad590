// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use arbor_tree::ItemId;
use serde::{Deserialize, Serialize};

/// Where and how moves are persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the page-management endpoints; `<base>/<id>/move-page/`
    /// and friends are built from it.
    pub base_url: String,
    /// Site the tree belongs to, sent with every move when set.
    pub site: Option<String>,
    /// Upper bound for every request. Expiry rolls the move back.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Duration,
    /// Path segment of the lazy-children endpoint.
    pub children_path: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            site: None,
            timeout: Duration::from_secs(15),
            children_path: String::from("descendants"),
        }
    }
}

impl SyncConfig {
    /// Config for a backend rooted at `base_url`, other fields default.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// `<base>/<id>/<action>/`.
    pub fn endpoint(&self, id: &ItemId, action: &str) -> String {
        format!("{}/{id}/{action}/", self.base_url.trim_end_matches('/'))
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(
        clippy::cast_possible_truncation,
        reason = "Timeouts beyond u64 milliseconds are not meaningful."
    )]
    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
