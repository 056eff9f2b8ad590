// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::future::Future;

use arbor_sortable::{PendingMove, Sortable, SortableError};
use arbor_tree::{ItemId, NodeId, PositionToken, TreeError};
use tokio::time::timeout;

use crate::config::SyncConfig;
use crate::error::{SyncError, TransportError};
use crate::transport::MoveTransport;
use crate::wire::{MoveKind, MoveRequest, ServerReply};

/// Terminal state of one synced move.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The backend accepted the move; the tree is authoritative.
    Committed {
        /// The moved page.
        item: ItemId,
        /// Rendered fragment for reloading the tree in place, if any.
        fragment: Option<String>,
    },
    /// The move failed and was undone.
    RolledBack {
        /// The page that was moved back.
        item: ItemId,
        /// Why.
        error: SyncError,
    },
    /// The page no longer exists on the backend and was removed locally.
    Discarded {
        /// The removed page.
        item: ItemId,
    },
}

impl SyncOutcome {
    /// Returns `true` for [`SyncOutcome::Committed`].
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// The page the outcome is about.
    pub fn item(&self) -> &ItemId {
        match self {
            Self::Committed { item, .. }
            | Self::RolledBack { item, .. }
            | Self::Discarded { item } => item,
        }
    }

    /// Message to surface to the user, if the move did not go through.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Committed { .. } => None,
            Self::RolledBack { error, .. } => Some(error.user_message()),
            Self::Discarded { .. } => Some(SyncError::NotFound.user_message()),
        }
    }
}

/// Persists dropped moves and lazy loads through a [`MoveTransport`].
///
/// Every request is bounded by [`SyncConfig::timeout`]. Moves are optimistic:
/// the [`Sortable`] already shows the new position and is rolled back if the
/// backend does not confirm it. Copies are not optimistic and never touch the
/// tree.
#[derive(Debug)]
pub struct SyncCoordinator<T> {
    transport: T,
    config: SyncConfig,
}

impl<T: MoveTransport> SyncCoordinator<T> {
    /// Create a coordinator.
    pub fn new(transport: T, config: SyncConfig) -> Self {
        Self { transport, config }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The request that persists `pending`.
    pub fn request_for(&self, pending: &PendingMove) -> MoveRequest {
        MoveRequest {
            kind: MoveKind::Move,
            id: pending.item.clone(),
            target: pending.relative.target.clone(),
            position: pending.relative.token,
            site: self.config.site.clone(),
        }
    }

    /// Send the move `sortable` is committing and settle it.
    ///
    /// Success commits. A not-found reply removes the stale node. Anything
    /// else (rejection, transport failure, timeout) rolls the tree back. In
    /// every case the sortable ends up idle and the outcome says what
    /// happened. `Err` is only returned if nothing was pending or the
    /// rollback itself failed.
    pub async fn settle(&self, sortable: &mut Sortable) -> Result<SyncOutcome, SyncError> {
        let pending = sortable.pending().ok_or(SortableError::NothingPending)?;
        let request = self.request_for(pending);
        let item = request.id.clone();
        tracing::debug!(
            %item,
            relative_to = ?request.target.as_ref().map(ItemId::as_str),
            position = %request.position,
            "sending move"
        );

        let error = match self.bounded(self.transport.send(&request)).await {
            Ok(reply) if reply.is_not_found() => {
                sortable.discard_stale()?;
                tracing::warn!(%item, "page vanished on the server; removed locally");
                return Ok(SyncOutcome::Discarded { item });
            }
            Ok(reply) if reply.is_success() => {
                sortable.commit()?;
                tracing::info!(%item, "move committed");
                return Ok(SyncOutcome::Committed {
                    item,
                    fragment: fragment(reply),
                });
            }
            Ok(reply) => rejected(reply),
            Err(err) => err,
        };

        sortable.rollback()?;
        tracing::warn!(%item, error = %error, "move rolled back");
        Ok(SyncOutcome::RolledBack { item, error })
    }

    /// Copy a page next to or under `target`. Not optimistic: the tree is not
    /// touched, and on success the fragment for a reload is returned.
    pub async fn copy(
        &self,
        item: ItemId,
        target: Option<ItemId>,
        position: PositionToken,
    ) -> Result<Option<String>, SyncError> {
        let request = MoveRequest {
            kind: MoveKind::Copy,
            id: item,
            target,
            position,
            site: self.config.site.clone(),
        };
        tracing::debug!(item = %request.id, position = %request.position, "sending copy");
        let reply = self.bounded(self.transport.send(&request)).await?;
        if reply.is_not_found() {
            return Err(SyncError::NotFound);
        }
        if !reply.is_success() {
            return Err(rejected(reply));
        }
        tracing::info!(item = %request.id, "copy committed");
        Ok(fragment(reply))
    }

    /// Fetch and merge the children of a lazily loaded branch.
    ///
    /// Returns the number of merged nodes, 0 without a request if the
    /// children are already loaded. The host lays out the new rows; until
    /// then they are not drop targets.
    pub async fn load_children(
        &self,
        sortable: &mut Sortable,
        node: NodeId,
    ) -> Result<usize, SyncError> {
        let tree = sortable.tree();
        let state = tree.state(node).ok_or(TreeError::StaleNode(node))?;
        if state.children_loaded {
            return Ok(0);
        }
        let item = tree
            .item_id(node)
            .cloned()
            .ok_or(TreeError::StaleNode(node))?;
        tracing::debug!(%item, "loading children");
        let specs = self.bounded(self.transport.load_children(&item)).await?;
        let added = sortable.merge_children(node, &specs)?;
        tracing::debug!(%item, added, "children merged");
        Ok(added)
    }

    async fn bounded<R>(
        &self,
        request: impl Future<Output = Result<R, TransportError>>,
    ) -> Result<R, SyncError> {
        match timeout(self.config.timeout, request).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SyncError::Timeout(self.config.timeout)),
        }
    }
}

fn fragment(reply: ServerReply) -> Option<String> {
    (!reply.body.trim().is_empty()).then_some(reply.body)
}

fn rejected(reply: ServerReply) -> SyncError {
    SyncError::Rejected {
        status: reply.status,
        message: reply.body.trim().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use arbor_sortable::{DropOutcome, Phase, SortableConfig};
    use arbor_tree::nested_set::to_hierarchy;
    use arbor_tree::{NodeKind, NodeSpec, Tree};
    use kurbo::{Point, Rect};

    use super::*;
    use crate::scripted::{Scripted, ScriptedTransport};

    fn lay_out(sortable: &mut Sortable) {
        let rows: Vec<NodeId> = sortable.tree().visible().collect();
        for (i, n) in rows.into_iter().enumerate() {
            let x = sortable.tree().depth(n).unwrap() as f64 * 20.0;
            let y = i as f64 * 20.0;
            sortable.set_row_bounds(n, Some(Rect::new(x, y, 200.0, y + 20.0)));
        }
    }

    /// `E`, `D` at the root; dropping `D` indented nests it under `E`.
    fn nested_drop() -> Sortable {
        let tree = Tree::from_specs(&[NodeSpec::leaf("E"), NodeSpec::leaf("D")]).unwrap();
        let mut sortable = Sortable::new(tree, SortableConfig::default());
        lay_out(&mut sortable);
        let d = sortable.tree().find("D").unwrap();
        sortable.begin_drag(d, Point::new(10.0, 30.0), 0).unwrap();
        sortable.drag_to(Point::new(40.0, 30.0), 10).unwrap();
        let outcome = sortable.drop_at(Point::new(40.0, 30.0), 20).unwrap();
        assert!(matches!(outcome, DropOutcome::Moved(_)), "{outcome:?}");
        sortable
    }

    fn coordinator() -> SyncCoordinator<ScriptedTransport> {
        let config = SyncConfig {
            site: Some("1".into()),
            ..SyncConfig::new("/admin/pages")
        };
        SyncCoordinator::new(ScriptedTransport::new(), config)
    }

    #[tokio::test]
    async fn success_commits_with_fragment() {
        let sync = coordinator();
        sync.transport()
            .push(Scripted::Reply(ServerReply::ok("<ul>tree</ul>")));
        let mut sortable = nested_drop();

        let outcome = sync.settle(&mut sortable).await.unwrap();
        let SyncOutcome::Committed { item, fragment } = outcome else {
            panic!("expected commit, got {outcome:?}");
        };
        assert_eq!(item.as_str(), "D");
        assert_eq!(fragment.as_deref(), Some("<ul>tree</ul>"));
        assert_eq!(sortable.phase(), Phase::Idle);

        let e = sortable.tree().find("E").unwrap();
        assert_eq!(sortable.tree().children_of(e).len(), 1);

        let sent = sync.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, MoveKind::Move);
        assert_eq!(sent[0].target, Some(ItemId::from("E")));
        assert_eq!(sent[0].position, PositionToken::LastChild);
        assert_eq!(sent[0].site.as_deref(), Some("1"));
        assert_eq!(
            sync.config().endpoint(&sent[0].id, sent[0].kind.action()),
            "/admin/pages/D/move-page/"
        );
    }

    #[tokio::test]
    async fn forbidden_rolls_back() {
        let before = {
            let tree = Tree::from_specs(&[NodeSpec::leaf("E"), NodeSpec::leaf("D")]).unwrap();
            to_hierarchy(&tree)
        };
        let sync = coordinator();
        sync.transport().push(Scripted::Reply(ServerReply::with_status(
            403,
            "You do not have permission to move this page.",
        )));
        let mut sortable = nested_drop();

        let outcome = sync.settle(&mut sortable).await.unwrap();
        assert!(matches!(
            &outcome,
            SyncOutcome::RolledBack {
                error: SyncError::Rejected { status: 403, .. },
                ..
            }
        ));
        assert_eq!(
            outcome.user_message().as_deref(),
            Some("You do not have permission to move this page.")
        );
        assert_eq!(to_hierarchy(sortable.tree()), before);
        assert_eq!(sortable.tree().len(), 2, "no duplicate nodes");
        let e = sortable.tree().find("E").unwrap();
        assert_eq!(sortable.tree().state(e).unwrap().kind, NodeKind::Leaf);
        assert_eq!(sortable.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn not_found_removes_node() {
        let sync = coordinator();
        sync.transport().push(Scripted::Reply(ServerReply::ok("NotFound")));
        let mut sortable = nested_drop();

        let outcome = sync.settle(&mut sortable).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Discarded { .. }));
        assert!(outcome.user_message().is_some());
        assert!(sortable.tree().find("D").is_none());
        let e = sortable.tree().find("E").unwrap();
        assert_eq!(sortable.tree().state(e).unwrap().kind, NodeKind::Leaf);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_rolls_back() {
        let sync = coordinator();
        sync.transport().push(Scripted::Hang);
        let mut sortable = nested_drop();

        let outcome = sync.settle(&mut sortable).await.unwrap();
        let SyncOutcome::RolledBack { error, .. } = outcome else {
            panic!("expected rollback, got {outcome:?}");
        };
        assert!(matches!(error, SyncError::Timeout(d) if d == Duration::from_secs(15)));
        assert!(sortable.tree().parent_of(sortable.tree().find("D").unwrap()).is_none());
        assert_eq!(sortable.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn transport_failure_rolls_back() {
        let sync = coordinator();
        sync.transport()
            .push(Scripted::Fail("connection reset".into()));
        let mut sortable = nested_drop();

        let outcome = sync.settle(&mut sortable).await.unwrap();
        assert!(matches!(
            outcome,
            SyncOutcome::RolledBack {
                error: SyncError::Transport(_),
                ..
            }
        ));
        assert_eq!(sortable.tree().roots().len(), 2);
    }

    #[tokio::test]
    async fn new_drag_waits_for_settle() {
        let sync = coordinator();
        let mut sortable = nested_drop();
        let e = sortable.tree().find("E").unwrap();
        assert_eq!(
            sortable.begin_drag(e, Point::new(10.0, 10.0), 30),
            Err(SortableError::Busy)
        );
        sync.settle(&mut sortable).await.unwrap();
        assert!(sortable.begin_drag(e, Point::new(10.0, 10.0), 40).is_ok());
    }

    #[tokio::test]
    async fn settle_without_pending_move() {
        let sync = coordinator();
        let tree = Tree::from_specs(&[NodeSpec::leaf("a")]).unwrap();
        let mut sortable = Sortable::new(tree, SortableConfig::default());
        let err = sync.settle(&mut sortable).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Sortable(SortableError::NothingPending)
        ));
        assert!(sync.transport().sent().is_empty());
    }

    #[tokio::test]
    async fn cancelled_drop_sends_nothing() {
        let sync = coordinator();
        let tree = Tree::from_specs(&[NodeSpec::leaf("F"), NodeSpec::leaf("G")]).unwrap();
        let mut sortable = Sortable::new(tree, SortableConfig::default());
        lay_out(&mut sortable);
        let before = to_hierarchy(sortable.tree());
        let f = sortable.tree().find("F").unwrap();
        sortable.begin_drag(f, Point::new(10.0, 10.0), 0).unwrap();
        sortable.drag_to(Point::new(10.0, 37.0), 10).unwrap();
        let outcome = sortable.drop_at(Point::new(-50.0, 300.0), 20).unwrap();
        assert_eq!(outcome, DropOutcome::Cancelled);
        assert!(sync.settle(&mut sortable).await.is_err());
        assert!(sync.transport().sent().is_empty());
        assert_eq!(to_hierarchy(sortable.tree()), before);
    }

    #[tokio::test]
    async fn copy_leaves_tree_alone() {
        let sync = coordinator();
        sync.transport().push(Scripted::Reply(ServerReply::ok("<li>copy</li>")));
        sync.transport()
            .push(Scripted::Reply(ServerReply::with_status(500, "")));

        let fragment = sync
            .copy("D".into(), Some("E".into()), PositionToken::Right)
            .await
            .unwrap();
        assert_eq!(fragment.as_deref(), Some("<li>copy</li>"));
        let sent = sync.transport().sent();
        assert_eq!(sent[0].kind, MoveKind::Copy);
        assert_eq!(sent[0].kind.action(), "copy-page");

        let err = sync
            .copy("D".into(), None, PositionToken::LastChild)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Rejected { status: 500, .. }));
        assert_eq!(
            err.user_message(),
            "The server refused the change (status 500)."
        );
    }

    #[tokio::test]
    async fn load_children_merges() {
        let sync = coordinator();
        sync.transport().set_children(
            "P",
            vec![NodeSpec::leaf("p1"), NodeSpec::lazy("p2")],
        );
        let tree = Tree::from_specs(&[NodeSpec::lazy("P")]).unwrap();
        let mut sortable = Sortable::new(tree, SortableConfig::default());
        let p = sortable.tree().find("P").unwrap();

        assert_eq!(sync.load_children(&mut sortable, p).await.unwrap(), 2);
        assert!(sortable.tree().state(p).unwrap().children_loaded);
        assert_eq!(sortable.tree().children_of(p).len(), 2);

        let p2 = sortable.tree().find("p2").unwrap();
        let err = sync.load_children(&mut sortable, p2).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(TransportError::Other(_))));
    }

    #[tokio::test]
    async fn loaded_branch_is_not_fetched_again() {
        let sync = coordinator();
        sync.transport().set_children("P", vec![NodeSpec::leaf("p1")]);
        let tree = Tree::from_specs(&[NodeSpec::lazy("P")]).unwrap();
        let mut sortable = Sortable::new(tree, SortableConfig::default());
        let p = sortable.tree().find("P").unwrap();

        assert_eq!(sync.load_children(&mut sortable, p).await.unwrap(), 1);
        sync.transport().set_children("P", vec![NodeSpec::leaf("p1")]);
        assert_eq!(sync.load_children(&mut sortable, p).await.unwrap(), 0);
        assert_eq!(sortable.tree().children_of(p).len(), 1);
        assert_eq!(sortable.tree().len(), 2);
    }
}
