// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry classifier: pointer and row geometry in, drop decision out.
//!
//! Classification is pure. It reads the tree and the current drag state and
//! never mutates anything; the dragged node stays where it is for the whole
//! gesture and is simply left out of hit testing and sibling lists.
//!
//! Each evaluation runs three steps in order:
//!
//! 1. **Intersection.** The row under the pointer is crossed once the pointer
//!    covers `zone` of its height in the direction of travel. Crossing upward
//!    puts the placeholder before the row; crossing downward puts it after the
//!    row, or first inside it when the row is an open branch.
//! 2. **Outdent.** A placeholder at the end of its list moves out to follow
//!    its parent when the dragged row's leading edge is pulled past the
//!    parent row's leading edge.
//! 3. **Indent.** Otherwise a placeholder nests under its previous sibling
//!    when the leading edge is pushed `tab_size` past that sibling's edge.
//!
//! The resulting placement is then checked against `max_levels`, root
//! protection, the target's nestable flag, and an optional host policy. A
//! branch whose children are still on the server never receives a node.

use arbor_tree::{DropTarget, Location, NodeFlags, NodeId, QueryFilter, Tree};
use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::config::SortableConfig;

/// Host veto over a placement: `(tree, dragged, new_parent) -> allowed`.
pub type NestingPolicy = fn(&Tree, NodeId, Option<NodeId>) -> bool;

/// Vertical direction of travel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward smaller y.
    Up,
    /// Toward larger y.
    #[default]
    Down,
}

/// Decide whether a pointer at height `y` has crossed `row` while travelling
/// in `direction`.
///
/// Moving down, the row is crossed once `y` reaches `y0 + h * zone`; moving
/// up, once `y` reaches `y1 - h * zone`. At exactly the threshold the result
/// is the direction of travel, so a pointer resting on the midpoint with a
/// 50% zone never flips between before and after.
///
/// ```
/// use arbor_sortable::{Direction, intersect};
/// use kurbo::Rect;
///
/// let row = Rect::new(0.0, 0.0, 100.0, 20.0);
/// assert_eq!(intersect(row, 10.0, Direction::Down, 0.5), Some(Direction::Down));
/// assert_eq!(intersect(row, 10.0, Direction::Up, 0.5), Some(Direction::Up));
/// assert_eq!(intersect(row, 10.0, Direction::Down, 0.8), None);
/// ```
pub fn intersect(row: Rect, y: f64, direction: Direction, zone: f64) -> Option<Direction> {
    let h = row.height();
    let crossed = match direction {
        Direction::Down => y >= row.y0 + h * zone,
        Direction::Up => y <= row.y1 - h * zone,
    };
    crossed.then_some(direction)
}

/// Everything the classifier needs to know about the drag in progress.
#[derive(Clone, Copy, Debug)]
pub struct ClassifyInput {
    /// The node being dragged.
    pub dragged: NodeId,
    /// Where the dragged node started.
    pub origin: Location,
    /// The current placeholder, indexed over siblings without the dragged node.
    pub placeholder: Location,
    /// Current direction of travel.
    pub direction: Direction,
    /// Pointer position.
    pub pointer: Point,
    /// The dragged row as it follows the pointer.
    pub helper: Rect,
    /// Optional host veto.
    pub policy: Option<NestingPolicy>,
}

/// Result of one classification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    /// Placeholder after this evaluation.
    pub placeholder: Location,
    /// The placeholder expressed as a target relative to an existing node.
    pub target: Option<DropTarget>,
    /// Whether dropping here would be accepted.
    pub allowed: bool,
    /// Levels beyond `max_levels`, or 0.
    pub depth_overflow: usize,
    /// Row under the pointer, if any.
    pub hovered: Option<NodeId>,
}

pub(crate) type Siblings = SmallVec<[NodeId; 16]>;

/// Children of `parent` (or the roots) with the dragged node left out.
pub(crate) fn siblings_without(tree: &Tree, parent: Option<NodeId>, dragged: NodeId) -> Siblings {
    tree.list_of(parent)
        .iter()
        .copied()
        .filter(|&c| c != dragged)
        .collect()
}

fn slot_of(tree: &Tree, node: NodeId, dragged: NodeId) -> Option<Location> {
    let parent = tree.parent_of(node);
    let index = siblings_without(tree, parent, dragged)
        .iter()
        .position(|&c| c == node)?;
    Some(Location { parent, index })
}

/// Express a placeholder slot as a target relative to a neighbour.
///
/// Prefers after the previous sibling, then before the next sibling, then
/// first child of the parent.
pub fn drop_target(tree: &Tree, dragged: NodeId, placeholder: Location) -> Option<DropTarget> {
    let list = siblings_without(tree, placeholder.parent, dragged);
    if let Some(prev) = placeholder.index.checked_sub(1).and_then(|i| list.get(i)) {
        Some(DropTarget::after(*prev))
    } else if let Some(next) = list.get(placeholder.index) {
        Some(DropTarget::before(*next))
    } else {
        placeholder.parent.map(DropTarget::first_child)
    }
}

/// Run one classification step.
pub fn classify(tree: &Tree, config: &SortableConfig, input: &ClassifyInput) -> Classification {
    let dragged = input.dragged;
    let origin_is_root = input.origin.parent.is_none();
    let mut placeholder = input.placeholder;

    let hovered = tree
        .hit_test_point(input.pointer, QueryFilter::new().excluding(dragged))
        .map(|hit| hit.node);

    if let Some(item) = hovered
        && let Some(row) = tree.row_bounds(item)
        && let Some(dir) = intersect(row, input.pointer.y, input.direction, config.intersect_zone())
        && let Some(slot) = slot_of(tree, item, dragged)
    {
        let candidate = match dir {
            Direction::Up => slot,
            Direction::Down => {
                let open = tree.state(item).is_some_and(|s| s.is_open());
                if open && !siblings_without(tree, Some(item), dragged).is_empty() {
                    Location::under(item, 0)
                } else {
                    Location {
                        index: slot.index + 1,
                        ..slot
                    }
                }
            }
        };
        if !(config.protect_root && candidate.parent.is_none() != origin_is_root) {
            placeholder = candidate;
        }
    }

    if let Some(next) = outdent(tree, config, input, placeholder) {
        placeholder = next;
    } else if let Some(next) = indent(tree, config, input, placeholder, origin_is_root) {
        placeholder = next;
    }

    let (allowed, depth_overflow) = check_allowed(tree, config, input, placeholder);

    #[cfg(feature = "tracing")]
    tracing::trace!(?placeholder, allowed, depth_overflow, "classified");

    Classification {
        placeholder,
        target: drop_target(tree, dragged, placeholder),
        allowed,
        depth_overflow,
        hovered,
    }
}

fn outdent(
    tree: &Tree,
    config: &SortableConfig,
    input: &ClassifyInput,
    placeholder: Location,
) -> Option<Location> {
    let parent = placeholder.parent?;
    let list = siblings_without(tree, Some(parent), input.dragged);
    if placeholder.index < list.len() {
        return None;
    }
    let grandparent = tree.parent_of(parent);
    if config.protect_root && grandparent.is_none() {
        return None;
    }
    let row = tree.row_bounds(parent)?;
    let past = if config.rtl {
        input.helper.x1 > row.x1
    } else {
        input.helper.x0 < row.x0
    };
    if !past {
        return None;
    }
    let slot = slot_of(tree, parent, input.dragged)?;
    Some(Location {
        parent: grandparent,
        index: slot.index + 1,
    })
}

fn indent(
    tree: &Tree,
    config: &SortableConfig,
    input: &ClassifyInput,
    placeholder: Location,
    origin_is_root: bool,
) -> Option<Location> {
    if config.protect_root && origin_is_root {
        return None;
    }
    let list = siblings_without(tree, placeholder.parent, input.dragged);
    let prev = *list.get(placeholder.index.checked_sub(1)?)?;
    if !tree.flags(prev)?.contains(NodeFlags::NESTABLE) {
        return None;
    }
    let state = tree.state(prev)?;
    // Unloaded children are merged first; the hover timer asks for them.
    if !state.children_loaded {
        return None;
    }
    let children = siblings_without(tree, Some(prev), input.dragged);
    if !state.is_open() && !children.is_empty() {
        return None;
    }
    let row = tree.row_bounds(prev)?;
    let past = if config.rtl {
        input.helper.x1 < row.x1 - config.tab_size
    } else {
        input.helper.x0 > row.x0 + config.tab_size
    };
    past.then(|| Location::under(prev, children.len()))
}

fn check_allowed(
    tree: &Tree,
    config: &SortableConfig,
    input: &ClassifyInput,
    placeholder: Location,
) -> (bool, usize) {
    let parent = placeholder.parent;
    let level = parent.and_then(|p| tree.depth(p)).map_or(1, |d| d + 2);
    let levels = level + tree.subtree_height(input.dragged);

    let mut allowed = true;
    let mut overflow = 0;
    if let Some(max) = config.max_levels
        && levels > max
    {
        overflow = levels - max;
        allowed = false;
    }
    if config.protect_root && parent.is_none() != input.origin.parent.is_none() {
        allowed = false;
    }
    if let Some(p) = parent
        && (!tree.flags(p).is_some_and(|f| f.contains(NodeFlags::NESTABLE))
            || !tree.state(p).is_some_and(|s| s.children_loaded))
    {
        allowed = false;
    }
    if let Some(policy) = input.policy
        && !policy(tree, input.dragged, parent)
    {
        allowed = false;
    }
    (allowed, overflow)
}
