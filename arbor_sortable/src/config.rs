// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Rect;

/// Tuning for a [`Sortable`](crate::Sortable).
///
/// All distances are in the same world-space units as the row rectangles.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SortableConfig {
    /// Horizontal distance the dragged row must travel past a sibling's
    /// leading edge before it nests under that sibling.
    pub tab_size: f64,
    /// Maximum nesting depth (1-based, counting the dragged subtree).
    /// `None` means unlimited.
    pub max_levels: Option<usize>,
    /// Keep root-level nodes at the root level and everything else below it.
    pub protect_root: bool,
    /// Delay in milliseconds before a collapsed branch under the pointer is
    /// expanded. `None` disables auto-expand and uses the lighter 50%
    /// intersection zone.
    pub expand_on_hover: Option<u64>,
    /// Mirror horizontal indent/outdent tests for right-to-left layouts.
    pub rtl: bool,
    /// Pointer travel required before a press turns into a drag.
    pub start_distance: f64,
    /// Droppable area. Defaults to the union of all visible rows.
    pub container: Option<Rect>,
}

impl Default for SortableConfig {
    fn default() -> Self {
        Self {
            tab_size: 20.0,
            max_levels: None,
            protect_root: false,
            expand_on_hover: Some(700),
            rtl: false,
            start_distance: 1.0,
            container: None,
        }
    }
}

impl SortableConfig {
    /// Fraction of a row's height the pointer must cover before the row is
    /// considered crossed.
    pub fn intersect_zone(&self) -> f64 {
        if self.expand_on_hover.is_some() {
            0.8
        } else {
            0.5
        }
    }
}
