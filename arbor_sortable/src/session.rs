// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! State of one drag gesture.

use alloc::vec::Vec;

use arbor_tree::{DropTarget, Location, NodeId, NodeKind, Tree};
use kurbo::{Point, Rect, Size, Vec2};

use crate::classify::{ClassifyInput, Direction, NestingPolicy, classify};
use crate::config::SortableConfig;

/// Timer-driven side effect of hovering a collapsed branch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HoverEvent {
    /// The branch had its children loaded and was expanded. The host should
    /// lay out the newly visible rows.
    Expanded(NodeId),
    /// The branch has children on the server that must be fetched and merged
    /// before it can expand.
    NeedsChildren(NodeId),
}

/// What a pointer move changed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DragUpdate {
    /// The placeholder moved.
    pub changed: bool,
    /// A hover timer fired during this move.
    pub hover: Option<HoverEvent>,
}

/// An active drag: the dragged node, where it came from, and where it would
/// land if dropped now.
///
/// The tree is not restructured while a session is alive. The placeholder is
/// a virtual slot indexed over the siblings with the dragged node left out.
#[derive(Clone, Debug)]
pub struct DragSession {
    dragged: NodeId,
    origin: Location,
    placeholder: Location,
    target: Option<DropTarget>,
    allowed: bool,
    depth_overflow: usize,
    direction: Direction,
    grab_offset: Vec2,
    row_size: Size,
    start: Point,
    last: Point,
    started: bool,
    /// Collapsed branch under the pointer and when hovering began (ms).
    hover: Option<(NodeId, u64)>,
    awaiting_children: Option<NodeId>,
    auto_expanded: Vec<NodeId>,
}

impl DragSession {
    pub(crate) fn new(dragged: NodeId, origin: Location, row: Rect, pointer: Point) -> Self {
        Self {
            dragged,
            origin,
            placeholder: origin,
            target: None,
            allowed: true,
            depth_overflow: 0,
            direction: Direction::Down,
            grab_offset: pointer - row.origin(),
            row_size: row.size(),
            start: pointer,
            last: pointer,
            started: false,
            hover: None,
            awaiting_children: None,
            auto_expanded: Vec::new(),
        }
    }

    /// The node being dragged.
    pub fn dragged(&self) -> NodeId {
        self.dragged
    }

    /// Where the dragged node was picked up.
    pub fn origin(&self) -> Location {
        self.origin
    }

    /// Current placeholder slot.
    pub fn placeholder(&self) -> Location {
        self.placeholder
    }

    /// The placeholder expressed relative to a neighbour, once the drag has
    /// started.
    pub fn target(&self) -> Option<DropTarget> {
        self.target
    }

    /// Whether dropping now would be accepted.
    pub fn allowed(&self) -> bool {
        self.allowed
    }

    /// Levels beyond `max_levels` at the current placeholder.
    pub fn depth_overflow(&self) -> usize {
        self.depth_overflow
    }

    /// Last vertical direction of travel.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns `true` once the pointer has moved far enough to count as a drag.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Returns `true` if the placeholder is back where the node started.
    pub fn is_at_origin(&self) -> bool {
        self.placeholder == self.origin
    }

    /// Rectangle of the dragged row following a pointer at `pointer`.
    pub fn helper_rect(&self, pointer: Point) -> Rect {
        Rect::from_origin_size(pointer - self.grab_offset, self.row_size)
    }

    /// Branches expanded by hovering during this drag, in expansion order.
    pub fn auto_expanded(&self) -> &[NodeId] {
        &self.auto_expanded
    }

    pub(crate) fn take_auto_expanded(&mut self) -> Vec<NodeId> {
        core::mem::take(&mut self.auto_expanded)
    }

    pub(crate) fn update(
        &mut self,
        tree: &mut Tree,
        config: &SortableConfig,
        policy: Option<NestingPolicy>,
        pointer: Point,
        now: u64,
    ) -> DragUpdate {
        if !self.started {
            if self.start.distance(pointer) < config.start_distance {
                return DragUpdate::default();
            }
            self.started = true;
        }
        let dy = pointer.y - self.last.y;
        if dy > 0.0 {
            self.direction = Direction::Down;
        } else if dy < 0.0 {
            self.direction = Direction::Up;
        }
        self.last = pointer;

        let out = classify(
            tree,
            config,
            &ClassifyInput {
                dragged: self.dragged,
                origin: self.origin,
                placeholder: self.placeholder,
                direction: self.direction,
                pointer,
                helper: self.helper_rect(pointer),
                policy,
            },
        );
        let changed = out.placeholder != self.placeholder;
        self.placeholder = out.placeholder;
        self.target = out.target;
        self.allowed = out.allowed;
        self.depth_overflow = out.depth_overflow;

        let collapsed = out.hovered.filter(|&h| {
            tree.state(h)
                .is_some_and(|s| s.kind == NodeKind::Branch && !s.expanded)
        });
        match (collapsed, self.hover) {
            (Some(h), Some((current, _))) if h == current && !changed => {}
            (Some(h), _) if config.expand_on_hover.is_some() => self.hover = Some((h, now)),
            _ => self.hover = None,
        }

        DragUpdate {
            changed,
            hover: self.tick(tree, config, now),
        }
    }

    pub(crate) fn tick(
        &mut self,
        tree: &mut Tree,
        config: &SortableConfig,
        now: u64,
    ) -> Option<HoverEvent> {
        let delay = config.expand_on_hover?;
        let (node, since) = self.hover?;
        if now.saturating_sub(since) < delay {
            return None;
        }
        self.hover = None;
        let state = tree.state(node)?;
        if state.children_loaded {
            tree.set_expanded(node, true);
            self.auto_expanded.push(node);
            #[cfg(feature = "tracing")]
            tracing::debug!(?node, "expanded on hover");
            Some(HoverEvent::Expanded(node))
        } else {
            self.awaiting_children = Some(node);
            Some(HoverEvent::NeedsChildren(node))
        }
    }

    /// Expand a branch whose children arrived after a
    /// [`HoverEvent::NeedsChildren`]. Returns `true` if it was awaited.
    pub(crate) fn children_arrived(&mut self, tree: &mut Tree, node: NodeId) -> bool {
        if self.awaiting_children != Some(node) {
            return false;
        }
        self.awaiting_children = None;
        if tree.set_expanded(node, true) {
            self.auto_expanded.push(node);
        }
        true
    }
}
