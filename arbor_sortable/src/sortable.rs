// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drag state machine that owns the tree.

use alloc::vec::Vec;

use arbor_tree::{
    ItemId, MoveReceipt, NodeFlags, NodeId, NodeSpec, RelativePosition, Tree, TreeError,
};
use kurbo::{Point, Rect};

use crate::classify::NestingPolicy;
use crate::config::SortableConfig;
use crate::error::SortableError;
use crate::session::{DragSession, DragUpdate, HoverEvent};

/// A move applied to the tree and waiting for the server's verdict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingMove {
    /// Undo information for the speculative move.
    pub receipt: MoveReceipt,
    /// Id of the moved node.
    pub item: ItemId,
    /// The node's new place, relative to a neighbour.
    pub relative: RelativePosition,
    auto_expanded: Vec<NodeId>,
}

/// How a drop ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropOutcome {
    /// The move was applied; commit or roll it back once the server answers.
    Moved(PendingMove),
    /// The placeholder never left the origin (or the pointer never moved far
    /// enough to start a drag). Nothing to send.
    Unchanged,
    /// Released outside the droppable area. Nothing to send, tree restored.
    Cancelled,
    /// The placement was not allowed. Nothing to send, tree unchanged.
    Rejected {
        /// Levels beyond `max_levels`, or 0 for other reasons.
        depth_overflow: usize,
    },
    /// No drag was active.
    NotDragging,
}

/// Coarse lifecycle state of a [`Sortable`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No drag and nothing in flight.
    Idle,
    /// A drag gesture is active.
    Dragging,
    /// A dropped move is waiting for the server.
    Committing,
}

#[derive(Clone, Debug)]
enum State {
    Idle,
    Dragging(DragSession),
    Committing(PendingMove),
}

/// Drag-to-reorder controller for a [`Tree`].
///
/// Feed it pointer events with millisecond timestamps; it keeps at most one
/// [`DragSession`] and, after a successful drop, at most one [`PendingMove`].
/// A new drag cannot start until the pending move is committed, rolled back,
/// or discarded.
///
/// ```
/// use arbor_sortable::{DropOutcome, Sortable, SortableConfig};
/// use arbor_tree::{NodeSpec, Tree};
/// use kurbo::{Point, Rect};
///
/// let tree = Tree::from_specs(&[NodeSpec::leaf("E"), NodeSpec::leaf("D")]).unwrap();
/// let mut sortable = Sortable::new(tree, SortableConfig::default());
/// let (e, d) = (sortable.tree().find("E").unwrap(), sortable.tree().find("D").unwrap());
/// sortable.set_row_bounds(e, Some(Rect::new(0.0, 0.0, 200.0, 20.0)));
/// sortable.set_row_bounds(d, Some(Rect::new(0.0, 20.0, 200.0, 40.0)));
///
/// sortable.begin_drag(d, Point::new(10.0, 30.0), 0).unwrap();
/// sortable.drag_to(Point::new(40.0, 30.0), 16).unwrap();
/// let DropOutcome::Moved(pending) = sortable.drop_at(Point::new(40.0, 30.0), 32).unwrap() else {
///     panic!("expected a move");
/// };
/// assert_eq!(sortable.tree().parent_of(d), Some(e));
/// assert_eq!(pending.relative.token.as_str(), "last-child");
/// sortable.commit().unwrap();
/// ```
#[derive(Debug)]
pub struct Sortable {
    tree: Tree,
    config: SortableConfig,
    policy: Option<NestingPolicy>,
    state: State,
}

impl Sortable {
    /// Wrap a tree.
    pub fn new(tree: Tree, config: SortableConfig) -> Self {
        Self {
            tree,
            config,
            policy: None,
            state: State::Idle,
        }
    }

    /// Install a host veto consulted on every classification.
    pub fn with_policy(mut self, policy: NestingPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// The tree, in whatever speculative state it is in.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access to the tree, only while idle.
    pub fn tree_mut(&mut self) -> Result<&mut Tree, SortableError> {
        match self.state {
            State::Idle => Ok(&mut self.tree),
            _ => Err(SortableError::Busy),
        }
    }

    /// Give the tree back.
    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Current configuration.
    pub fn config(&self) -> &SortableConfig {
        &self.config
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Dragging(_) => Phase::Dragging,
            State::Committing(_) => Phase::Committing,
        }
    }

    /// The active drag, if any.
    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            State::Dragging(session) => Some(session),
            _ => None,
        }
    }

    /// The move awaiting the server, if any.
    pub fn pending(&self) -> Option<&PendingMove> {
        match &self.state {
            State::Committing(pending) => Some(pending),
            _ => None,
        }
    }

    /// Update a row rectangle. Allowed in every phase, since layout follows
    /// expansion during a drag.
    pub fn set_row_bounds(&mut self, node: NodeId, row: Option<Rect>) {
        self.tree.set_row_bounds(node, row);
    }

    /// Merge lazily loaded children.
    ///
    /// Allowed in every phase. If a drag was waiting on these children after
    /// a [`HoverEvent::NeedsChildren`], the branch is expanded and will be
    /// collapsed again if the drag does not end in a move.
    pub fn merge_children(
        &mut self,
        parent: NodeId,
        specs: &[NodeSpec],
    ) -> Result<usize, SortableError> {
        let added = self.tree.merge_children(parent, specs)?;
        if let State::Dragging(session) = &mut self.state {
            session.children_arrived(&mut self.tree, parent);
        }
        Ok(added)
    }

    /// Pick up `node` with the pointer at `pointer`.
    pub fn begin_drag(
        &mut self,
        node: NodeId,
        pointer: Point,
        now: u64,
    ) -> Result<(), SortableError> {
        if !matches!(self.state, State::Idle) {
            return Err(SortableError::Busy);
        }
        let flags = self
            .tree
            .flags(node)
            .ok_or(TreeError::StaleNode(node))?;
        if !flags.contains(NodeFlags::DRAGGABLE) {
            return Err(SortableError::NotDraggable(node));
        }
        let row = self
            .tree
            .row_bounds(node)
            .filter(|_| self.tree.is_visible(node))
            .ok_or(SortableError::NoGeometry(node))?;
        let origin = self
            .tree
            .location_of(node)
            .ok_or(TreeError::StaleNode(node))?;
        #[cfg(feature = "tracing")]
        tracing::debug!(?node, ?origin, now, "drag started");
        #[cfg(not(feature = "tracing"))]
        let _ = now;
        self.state = State::Dragging(DragSession::new(node, origin, row, pointer));
        Ok(())
    }

    /// Pointer moved during a drag.
    pub fn drag_to(&mut self, pointer: Point, now: u64) -> Result<DragUpdate, SortableError> {
        let State::Dragging(session) = &mut self.state else {
            return Err(SortableError::NotDragging);
        };
        Ok(session.update(&mut self.tree, &self.config, self.policy, pointer, now))
    }

    /// Advance the hover timer without moving the pointer.
    pub fn tick(&mut self, now: u64) -> Option<HoverEvent> {
        let State::Dragging(session) = &mut self.state else {
            return None;
        };
        session.tick(&mut self.tree, &self.config, now)
    }

    /// Release the pointer.
    ///
    /// A drop outside the droppable area cancels. A drop that is not allowed
    /// is rejected. A drop back at the origin changes nothing. Otherwise the
    /// move is applied to the tree and the sortable enters
    /// [`Phase::Committing`].
    pub fn drop_at(&mut self, pointer: Point, now: u64) -> Result<DropOutcome, SortableError> {
        let State::Dragging(session) = &mut self.state else {
            return Ok(DropOutcome::NotDragging);
        };
        session.update(&mut self.tree, &self.config, self.policy, pointer, now);

        let area = self.config.container.or_else(|| self.tree.content_bounds());
        let inside = area.is_some_and(|a| a.contains(pointer));
        let outcome = if !inside {
            DropOutcome::Cancelled
        } else if !session.started() || session.is_at_origin() {
            DropOutcome::Unchanged
        } else if !session.allowed() {
            DropOutcome::Rejected {
                depth_overflow: session.depth_overflow(),
            }
        } else if let Some(target) = session.target() {
            let dragged = session.dragged();
            let auto_expanded = session.take_auto_expanded();
            let receipt = match self.tree.apply_move(dragged, target) {
                Ok(receipt) => receipt,
                Err(err) => {
                    self.state = State::Idle;
                    self.collapse(&auto_expanded);
                    return Err(err.into());
                }
            };
            let item = self
                .tree
                .item_id(dragged)
                .cloned()
                .ok_or(TreeError::StaleNode(dragged))?;
            let relative = self
                .tree
                .relative_position(dragged)
                .ok_or(TreeError::StaleNode(dragged))?;
            let pending = PendingMove {
                receipt,
                item,
                relative,
                auto_expanded,
            };
            #[cfg(feature = "tracing")]
            tracing::debug!(item = %pending.item, token = %pending.relative.token, "dropped");
            self.state = State::Committing(pending.clone());
            return Ok(DropOutcome::Moved(pending));
        } else {
            DropOutcome::Unchanged
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(?outcome, "drop ended without a move");
        self.end_drag();
        Ok(outcome)
    }

    /// Abort the active drag (Escape). Returns `false` if none was active.
    pub fn cancel_drag(&mut self) -> bool {
        if !matches!(self.state, State::Dragging(_)) {
            return false;
        }
        self.end_drag();
        true
    }

    /// Accept the pending move as authoritative.
    pub fn commit(&mut self) -> Result<PendingMove, SortableError> {
        match core::mem::replace(&mut self.state, State::Idle) {
            State::Committing(pending) => Ok(pending),
            other => {
                self.state = other;
                Err(SortableError::NothingPending)
            }
        }
    }

    /// Undo the pending move and collapse branches expanded during its drag.
    pub fn rollback(&mut self) -> Result<PendingMove, SortableError> {
        let pending = self.commit()?;
        self.tree.revert(&pending.receipt)?;
        self.collapse(&pending.auto_expanded);
        Ok(pending)
    }

    /// The server no longer knows the moved node: drop it from the tree
    /// instead of reverting.
    pub fn discard_stale(&mut self) -> Result<PendingMove, SortableError> {
        let pending = self.commit()?;
        self.tree.remove(pending.receipt.node);
        Ok(pending)
    }

    fn end_drag(&mut self) {
        if let State::Dragging(mut session) = core::mem::replace(&mut self.state, State::Idle) {
            let expanded = session.take_auto_expanded();
            self.collapse(&expanded);
        }
    }

    fn collapse(&mut self, nodes: &[NodeId]) {
        for &node in nodes.iter().rev() {
            self.tree.set_expanded(node, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use arbor_tree::nested_set::to_hierarchy;
    use arbor_tree::{Location, NodeKind, PositionToken};

    fn lay_out(sortable: &mut Sortable) {
        let rows: Vec<NodeId> = sortable.tree().visible().collect();
        for (i, n) in rows.into_iter().enumerate() {
            let x = sortable.tree().depth(n).unwrap() as f64 * 20.0;
            let y = i as f64 * 20.0;
            sortable.set_row_bounds(n, Some(Rect::new(x, y, 200.0, y + 20.0)));
        }
    }

    fn sortable(specs: &[NodeSpec], config: SortableConfig) -> Sortable {
        let mut s = Sortable::new(Tree::from_specs(specs).unwrap(), config);
        lay_out(&mut s);
        s
    }

    fn id(s: &Sortable, item: &str) -> NodeId {
        s.tree().find(item).unwrap()
    }

    #[test]
    fn nest_leaf_under_leaf() {
        let mut s = sortable(&[NodeSpec::leaf("E"), NodeSpec::leaf("D")], SortableConfig::default());
        let (e, d) = (id(&s, "E"), id(&s, "D"));
        s.begin_drag(d, Point::new(10.0, 30.0), 0).unwrap();
        assert_eq!(s.phase(), Phase::Dragging);
        let update = s.drag_to(Point::new(40.0, 30.0), 10).unwrap();
        assert!(update.changed);

        let DropOutcome::Moved(pending) = s.drop_at(Point::new(40.0, 30.0), 20).unwrap() else {
            panic!("expected a move");
        };
        assert_eq!(s.phase(), Phase::Committing);
        assert_eq!(s.tree().children_of(e), &[d]);
        let state = s.tree().state(e).unwrap();
        assert_eq!(state.kind, NodeKind::Branch);
        assert!(state.expanded);
        assert_eq!(pending.item.as_str(), "D");
        assert_eq!(pending.relative.target, Some("E".into()));
        assert_eq!(pending.relative.token, PositionToken::LastChild);

        s.commit().unwrap();
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn drag_down_past_sibling_then_indent() {
        let mut s = sortable(&[NodeSpec::leaf("D"), NodeSpec::leaf("E")], SortableConfig::default());
        let (d, e) = (id(&s, "D"), id(&s, "E"));
        s.begin_drag(d, Point::new(10.0, 10.0), 0).unwrap();
        // Bottom 20% of E's row crosses it.
        s.drag_to(Point::new(10.0, 37.0), 10).unwrap();
        assert_eq!(s.session().unwrap().placeholder(), Location::root(1));
        s.drag_to(Point::new(40.0, 37.0), 20).unwrap();
        assert_eq!(s.session().unwrap().placeholder(), Location::under(e, 0));
        assert!(matches!(
            s.drop_at(Point::new(40.0, 37.0), 30).unwrap(),
            DropOutcome::Moved(_)
        ));
        assert_eq!(s.tree().parent_of(d), Some(e));
    }

    #[test]
    fn rejected_drop_leaves_tree_unchanged() {
        let specs = [NodeSpec::branch("A", vec![NodeSpec::leaf("B")]), NodeSpec::leaf("C")];
        let config = SortableConfig {
            max_levels: Some(2),
            ..SortableConfig::default()
        };
        let mut s = sortable(&specs, config);
        let before = to_hierarchy(s.tree());
        let c = id(&s, "C");
        s.begin_drag(c, Point::new(10.0, 50.0), 0).unwrap();
        s.drag_to(Point::new(40.0, 50.0), 10).unwrap();
        assert!(s.session().unwrap().allowed());
        s.drag_to(Point::new(70.0, 50.0), 20).unwrap();
        let session = s.session().unwrap();
        assert!(!session.allowed());
        assert_eq!(session.depth_overflow(), 1);

        let outcome = s.drop_at(Point::new(70.0, 50.0), 30).unwrap();
        assert_eq!(outcome, DropOutcome::Rejected { depth_overflow: 1 });
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(to_hierarchy(s.tree()), before);
    }

    #[test]
    fn drop_outside_cancels() {
        let specs = [NodeSpec::leaf("F"), NodeSpec::leaf("G")];
        let mut s = sortable(&specs, SortableConfig::default());
        let before = to_hierarchy(s.tree());
        let f = id(&s, "F");
        s.begin_drag(f, Point::new(10.0, 10.0), 0).unwrap();
        s.drag_to(Point::new(10.0, 37.0), 10).unwrap();
        assert_eq!(
            s.drop_at(Point::new(500.0, 500.0), 20).unwrap(),
            DropOutcome::Cancelled
        );
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(to_hierarchy(s.tree()), before);
    }

    #[test]
    fn click_without_travel_is_unchanged() {
        let mut s = sortable(&[NodeSpec::leaf("a"), NodeSpec::leaf("b")], SortableConfig::default());
        let a = id(&s, "a");
        s.begin_drag(a, Point::new(10.0, 10.0), 0).unwrap();
        assert_eq!(
            s.drop_at(Point::new(10.5, 10.0), 5).unwrap(),
            DropOutcome::Unchanged
        );
        assert_eq!(s.drop_at(Point::new(0.0, 0.0), 6).unwrap(), DropOutcome::NotDragging);
    }

    #[test]
    fn busy_while_dragging_or_committing() {
        let mut s = sortable(&[NodeSpec::leaf("E"), NodeSpec::leaf("D")], SortableConfig::default());
        let (e, d) = (id(&s, "E"), id(&s, "D"));
        s.begin_drag(d, Point::new(10.0, 30.0), 0).unwrap();
        assert_eq!(s.begin_drag(e, Point::new(10.0, 10.0), 1), Err(SortableError::Busy));
        s.drag_to(Point::new(40.0, 30.0), 10).unwrap();
        s.drop_at(Point::new(40.0, 30.0), 20).unwrap();
        assert_eq!(s.begin_drag(e, Point::new(10.0, 10.0), 30), Err(SortableError::Busy));
        assert!(s.tree_mut().is_err());
        s.rollback().unwrap();
        assert!(s.begin_drag(e, Point::new(10.0, 10.0), 40).is_ok());
    }

    #[test]
    fn rollback_restores_and_discard_removes() {
        let specs = [NodeSpec::leaf("E"), NodeSpec::leaf("D")];
        let mut s = sortable(&specs, SortableConfig::default());
        let before = to_hierarchy(s.tree());
        let d = id(&s, "D");
        s.begin_drag(d, Point::new(10.0, 30.0), 0).unwrap();
        s.drag_to(Point::new(40.0, 30.0), 10).unwrap();
        s.drop_at(Point::new(40.0, 30.0), 20).unwrap();
        s.rollback().unwrap();
        assert_eq!(to_hierarchy(s.tree()), before);
        assert_eq!(s.rollback(), Err(SortableError::NothingPending));

        s.begin_drag(d, Point::new(10.0, 30.0), 30).unwrap();
        s.drag_to(Point::new(40.0, 30.0), 40).unwrap();
        s.drop_at(Point::new(40.0, 30.0), 50).unwrap();
        let pending = s.discard_stale().unwrap();
        assert!(!s.tree().is_alive(pending.receipt.node));
        assert_eq!(s.tree().state(id(&s, "E")).unwrap().kind, NodeKind::Leaf);
    }

    #[test]
    fn begin_drag_checks_node() {
        let mut s = sortable(&[NodeSpec::leaf("a"), NodeSpec::leaf("b")], SortableConfig::default());
        let (a, b) = (id(&s, "a"), id(&s, "b"));
        s.tree_mut().unwrap().set_flags(a, NodeFlags::NESTABLE);
        assert_eq!(
            s.begin_drag(a, Point::new(1.0, 1.0), 0),
            Err(SortableError::NotDraggable(a))
        );
        s.set_row_bounds(b, None);
        assert_eq!(
            s.begin_drag(b, Point::new(1.0, 21.0), 0),
            Err(SortableError::NoGeometry(b))
        );
        s.tree_mut().unwrap().remove(b);
        assert_eq!(
            s.begin_drag(b, Point::new(1.0, 21.0), 0),
            Err(SortableError::Tree(TreeError::StaleNode(b)))
        );
    }

    #[test]
    fn hover_expands_and_cancel_collapses() {
        let mut folder = NodeSpec::branch("P", vec![NodeSpec::leaf("p1")]);
        folder.expanded = false;
        let mut s = sortable(&[NodeSpec::leaf("X"), folder], SortableConfig::default());
        let (x, p) = (id(&s, "X"), id(&s, "P"));

        s.begin_drag(x, Point::new(10.0, 10.0), 0).unwrap();
        let update = s.drag_to(Point::new(10.0, 30.0), 100).unwrap();
        assert_eq!(update.hover, None);
        assert_eq!(s.tick(700), None, "delay counts from first hover");
        assert_eq!(s.tick(800), Some(HoverEvent::Expanded(p)));
        assert!(s.tree().state(p).unwrap().expanded);
        assert_eq!(s.session().unwrap().auto_expanded(), &[p]);

        assert!(s.cancel_drag());
        assert!(!s.tree().state(p).unwrap().expanded);
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn hover_on_lazy_branch_requests_children() {
        let mut s = sortable(&[NodeSpec::leaf("X"), NodeSpec::lazy("P")], SortableConfig::default());
        let (x, p) = (id(&s, "X"), id(&s, "P"));

        s.begin_drag(x, Point::new(10.0, 10.0), 0).unwrap();
        s.drag_to(Point::new(10.0, 30.0), 0).unwrap();
        assert_eq!(s.tick(700), Some(HoverEvent::NeedsChildren(p)));
        s.merge_children(p, &[NodeSpec::leaf("p1")]).unwrap();
        let state = s.tree().state(p).unwrap();
        assert!(state.children_loaded);
        assert!(state.expanded);

        // Newly merged rows take part once laid out.
        lay_out(&mut s);
        let p1 = id(&s, "p1");
        assert_eq!(s.tree().row_bounds(p1), Some(Rect::new(20.0, 40.0, 200.0, 60.0)));
        s.drag_to(Point::new(10.0, 57.0), 10).unwrap();
        assert_eq!(s.session().unwrap().placeholder(), Location::under(p, 1));
    }

    #[test]
    fn lazy_branch_nests_only_after_children_arrive() {
        let mut s = sortable(&[NodeSpec::lazy("L"), NodeSpec::leaf("D")], SortableConfig::default());
        let (l, d) = (id(&s, "L"), id(&s, "D"));
        let before = to_hierarchy(s.tree());

        s.begin_drag(d, Point::new(10.0, 30.0), 0).unwrap();
        s.drag_to(Point::new(40.0, 30.0), 10).unwrap();
        assert_eq!(s.drop_at(Point::new(40.0, 30.0), 20).unwrap(), DropOutcome::Unchanged);
        assert_eq!(to_hierarchy(s.tree()), before);
        assert!(!s.tree().state(l).unwrap().children_loaded);

        // Hovering the branch asks for its children; once merged, D can nest.
        s.begin_drag(d, Point::new(10.0, 30.0), 100).unwrap();
        s.drag_to(Point::new(40.0, 10.0), 110).unwrap();
        assert_eq!(s.session().unwrap().placeholder(), Location::root(1));
        assert_eq!(s.tick(810), Some(HoverEvent::NeedsChildren(l)));
        s.merge_children(l, &[NodeSpec::leaf("x")]).unwrap();
        lay_out(&mut s);
        s.drag_to(Point::new(45.0, 30.0), 820).unwrap();
        assert_eq!(s.session().unwrap().placeholder(), Location::under(l, 1));

        let DropOutcome::Moved(pending) = s.drop_at(Point::new(45.0, 30.0), 830).unwrap() else {
            panic!("expected a move");
        };
        assert_eq!(pending.relative.token, PositionToken::Right);
        assert_eq!(pending.relative.target.as_ref().map(ItemId::as_str), Some("x"));
        assert_eq!(s.tree().children_of(l), &[id(&s, "x"), d]);
        assert!(s.tree().is_visible(d));
    }

    #[test]
    fn moved_drop_keeps_hover_expansion_until_rollback() {
        let mut folder = NodeSpec::branch("P", vec![NodeSpec::leaf("p1")]);
        folder.expanded = false;
        let mut s = sortable(&[NodeSpec::leaf("X"), folder], SortableConfig::default());
        let (x, p) = (id(&s, "X"), id(&s, "P"));

        s.begin_drag(x, Point::new(10.0, 10.0), 0).unwrap();
        s.drag_to(Point::new(10.0, 30.0), 0).unwrap();
        s.tick(700);
        lay_out(&mut s);
        // Cross p1's lower zone, landing after it inside P.
        s.drag_to(Point::new(30.0, 57.0), 710).unwrap();
        assert_eq!(s.session().unwrap().placeholder(), Location::under(p, 1));
        let DropOutcome::Moved(_) = s.drop_at(Point::new(30.0, 57.0), 720).unwrap() else {
            panic!("expected a move");
        };
        assert!(s.tree().state(p).unwrap().expanded);
        s.rollback().unwrap();
        assert!(!s.tree().state(p).unwrap().expanded);
        assert_eq!(s.tree().parent_of(x), None);
    }
}
