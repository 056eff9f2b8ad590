// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: structure, display state, row geometry, queries.

use alloc::{vec, vec::Vec};
use hashbrown::HashMap;
use kurbo::{Point, Rect};

use crate::error::TreeError;
use crate::types::{ItemId, Location, NodeFlags, NodeId, NodeKind, NodeSpec, NodeState};

/// Ordered page tree.
///
/// Nodes are stored in a slot arena addressed by generational [`NodeId`]s and
/// are also reachable by their server-side [`ItemId`]. Root-level order is
/// kept explicitly, so the tree can have any number of top-level pages.
///
/// Besides structure, every node carries its display [`NodeState`] and an
/// optional world-space row rectangle supplied by the host layout. Rows are
/// what hit testing runs against; a node without a row (for example, one that
/// was merged from a lazy load and has not been laid out yet) is never hit.
///
/// ## Example
///
/// ```rust
/// use arbor_tree::{NodeSpec, Tree};
///
/// let mut tree = Tree::from_specs(&[NodeSpec::branch(
///     "a",
///     vec![NodeSpec::leaf("b"), NodeSpec::leaf("c")],
/// )])
/// .unwrap();
///
/// let a = tree.find("a").unwrap();
/// assert_eq!(tree.children_of(a).len(), 2);
/// assert_eq!(tree.depth(tree.find("c").unwrap()), Some(1));
/// ```
pub struct Tree {
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    roots: Vec<NodeId>,
    by_item: HashMap<ItemId, NodeId>,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.by_item.len();
        let free = self.free_list.len();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .field("roots", &self.roots.len())
            .finish_non_exhaustive()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Results of a hit test.
#[derive(Clone, Debug)]
pub struct Hit {
    /// The matched node.
    pub node: NodeId,
    /// Path from root to node (inclusive).
    pub path: Vec<NodeId>,
}

/// Filters applied during hit testing.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryFilter {
    /// Bitfield of required node flags. Only nodes containing all these flags will be included.
    pub required_flags: NodeFlags,
    /// A subtree to leave out entirely, typically the node being dragged.
    pub exclude: Option<NodeId>,
}

impl QueryFilter {
    /// Create a new empty filter (includes all visible nodes with rows).
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter to only draggable nodes.
    pub fn draggable(mut self) -> Self {
        self.required_flags |= NodeFlags::DRAGGABLE;
        self
    }

    /// Filter to only nodes that accept nested children.
    pub fn nestable(mut self) -> Self {
        self.required_flags |= NodeFlags::NESTABLE;
        self
    }

    /// Leave out `node` and all of its descendants.
    pub fn excluding(mut self, node: NodeId) -> Self {
        self.exclude = Some(node);
        self
    }

    /// Check if a node's flags satisfy this filter.
    pub fn matches(&self, node_flags: NodeFlags) -> bool {
        node_flags.contains(self.required_flags)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    generation: u32,
    pub(crate) item: ItemId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) state: NodeState,
    pub(crate) flags: NodeFlags,
    pub(crate) row: Option<Rect>,
}

impl Node {
    fn new(generation: u32, item: ItemId, state: NodeState, flags: NodeFlags) -> Self {
        Self {
            generation,
            item,
            parent: None,
            children: Vec::new(),
            state,
            flags,
            row: None,
        }
    }
}

impl Tree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            roots: Vec::new(),
            by_item: HashMap::new(),
        }
    }

    /// Build a tree from server-supplied root-level specs.
    ///
    /// Fails without building anything if an id appears twice.
    pub fn from_specs(specs: &[NodeSpec]) -> Result<Self, TreeError> {
        let mut tree = Self::new();
        tree.check_new_ids(specs)?;
        for spec in specs {
            tree.attach_spec(None, spec);
        }
        Ok(tree)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.by_item.len()
    }

    /// Returns `true` if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.by_item.is_empty()
    }

    /// Append a new leaf under `parent` (or at the root level if `None`).
    ///
    /// A leaf parent is promoted to an expanded branch.
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        item: impl Into<ItemId>,
    ) -> Result<NodeId, TreeError> {
        let item = item.into();
        if let Some(p) = parent
            && !self.is_alive(p)
        {
            return Err(TreeError::StaleNode(p));
        }
        if self.by_item.contains_key(&item) {
            return Err(TreeError::DuplicateId(item));
        }
        let id = self.alloc(item, NodeState::LEAF, NodeFlags::default());
        let index = self.list(parent).len();
        self.link_at(id, Location { parent, index });
        Ok(id)
    }

    /// Merge lazily loaded children under `parent`.
    ///
    /// The specs are appended after any children already present, the parent
    /// is marked as loaded, and its kind is updated to match. Returns the
    /// number of nodes added (descendants included). Fails without changing
    /// the tree if any id is already present.
    pub fn merge_children(
        &mut self,
        parent: NodeId,
        specs: &[NodeSpec],
    ) -> Result<usize, TreeError> {
        if !self.is_alive(parent) {
            return Err(TreeError::StaleNode(parent));
        }
        self.check_new_ids(specs)?;
        let before = self.len();
        for spec in specs {
            self.attach_spec(Some(parent), spec);
        }
        let node = self.node_mut(parent);
        node.state.children_loaded = true;
        if node.children.is_empty() {
            node.state.kind = NodeKind::Leaf;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(parent = %self.node(parent).item, added = self.len() - before, "merged children");
        Ok(self.len() - before)
    }

    /// Remove a node (and its subtree) from the tree.
    ///
    /// A parent left without children becomes a leaf. Returns `false` if `id`
    /// was already stale.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.unlink(id);
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Some(node) = self.nodes[n.idx()].take() else {
                unreachable!("subtree slots are occupied");
            };
            self.by_item.remove(&node.item);
            self.free_list.push(n.idx());
            stack.extend(node.children);
        }
        true
    }

    /// Returns true if `id` refers to a live node.
    ///
    /// A `NodeId` is considered live if its slot exists and its generation matches
    /// the current generation stored in that slot.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    /// Look up a node by its server-side id.
    pub fn find(&self, item: &str) -> Option<NodeId> {
        self.by_item.get(item).copied()
    }

    /// Returns the server-side id of a live node.
    pub fn item_id(&self, id: NodeId) -> Option<&ItemId> {
        self.node_opt(id).map(|n| &n.item)
    }

    /// Returns the parent of a node if live, or `None` for roots or stale ids.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node_opt(id).and_then(|n| n.parent)
    }

    /// Get the children of a node, or empty slice if node is stale.
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        match self.node_opt(id) {
            Some(n) => &n.children,
            None => &[],
        }
    }

    /// Root-level nodes in display order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The list a live node belongs to (its parent's children, or the roots).
    pub fn siblings_of(&self, id: NodeId) -> &[NodeId] {
        if !self.is_alive(id) {
            return &[];
        }
        self.list(self.node(id).parent)
    }

    /// The children of `parent`, or the root list for `None`.
    ///
    /// Returns an empty slice for a stale parent.
    pub fn list_of(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(p) if !self.is_alive(p) => &[],
            _ => self.list(parent),
        }
    }

    /// Current slot of a live node.
    pub fn location_of(&self, id: NodeId) -> Option<Location> {
        let parent = self.node_opt(id)?.parent;
        let index = self.list(parent).iter().position(|&c| c == id)?;
        Some(Location { parent, index })
    }

    /// Number of ancestors of a live node.
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let mut current = self.node_opt(id)?.parent;
        let mut depth = 0;
        while let Some(p) = current {
            depth += 1;
            current = self.node(p).parent;
        }
        Some(depth)
    }

    /// Number of loaded levels below a node: 0 for a leaf, 1 for a node with
    /// only leaf children, and so on. Stale ids report 0.
    pub fn subtree_height(&self, id: NodeId) -> usize {
        if !self.is_alive(id) {
            return 0;
        }
        let mut max = 0;
        let mut stack = vec![(id, 0_usize)];
        while let Some((n, level)) = stack.pop() {
            max = max.max(level);
            for &c in &self.node(n).children {
                stack.push((c, level + 1));
            }
        }
        max
    }

    /// Returns `true` if `node` is `root` or one of its descendants.
    pub fn in_subtree(&self, root: NodeId, node: NodeId) -> bool {
        if !self.is_alive(root) || !self.is_alive(node) {
            return false;
        }
        let mut current = Some(node);
        while let Some(n) = current {
            if n == root {
                return true;
            }
            current = self.node(n).parent;
        }
        false
    }

    /// Display state of a live node.
    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.node_opt(id).map(|n| n.state)
    }

    /// Show or hide the children of a branch.
    ///
    /// Returns `true` if the state changed. Leaves cannot be expanded.
    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> bool {
        match self.node_opt_mut(id) {
            Some(n) if n.state.kind == NodeKind::Branch && n.state.expanded != expanded => {
                n.state.expanded = expanded;
                true
            }
            _ => false,
        }
    }

    /// Returns the flags of a node if the identifier is live.
    pub fn flags(&self, id: NodeId) -> Option<NodeFlags> {
        self.node_opt(id).map(|n| n.flags)
    }

    /// Update node flags.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        if let Some(n) = self.node_opt_mut(id) {
            n.flags = flags;
        }
    }

    /// World-space row rectangle of a live node, if the host has laid it out.
    pub fn row_bounds(&self, id: NodeId) -> Option<Rect> {
        self.node_opt(id).and_then(|n| n.row)
    }

    /// Set or clear the row rectangle of a node.
    ///
    /// Rows are the node's own line only, not including its children.
    pub fn set_row_bounds(&mut self, id: NodeId, row: Option<Rect>) {
        if let Some(n) = self.node_opt_mut(id) {
            n.row = row;
        }
    }

    /// Returns `true` if every ancestor of a live node is an expanded branch.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let Some(node) = self.node_opt(id) else {
            return false;
        };
        let mut current = node.parent;
        while let Some(p) = current {
            let parent = self.node(p);
            if !parent.state.is_open() {
                return false;
            }
            current = parent.parent;
        }
        true
    }

    /// Iterate all live nodes in depth-first (display) order.
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst::new(self, false)
    }

    /// Iterate nodes whose ancestors are all expanded, in display order.
    pub fn visible(&self) -> DepthFirst<'_> {
        DepthFirst::new(self, true)
    }

    /// Union of the rows of all visible, laid-out nodes.
    pub fn content_bounds(&self) -> Option<Rect> {
        self.visible()
            .filter_map(|id| self.node(id).row)
            .reduce(|acc, r| acc.union(r))
    }

    /// Hit test a world-space point against visible rows.
    ///
    /// Rows use half-open containment, so stacked rows sharing an edge never
    /// both match. When rows overlap, the one later in display order wins,
    /// which favours descendants over their ancestors.
    pub fn hit_test_point(&self, point: Point, filter: QueryFilter) -> Option<Hit> {
        let mut best = None;
        for id in self.visible() {
            let node = self.node(id);
            if !filter.matches(node.flags) {
                continue;
            }
            if let Some(ex) = filter.exclude
                && self.in_subtree(ex, id)
            {
                continue;
            }
            if node.row.is_some_and(|r| r.contains(point)) {
                best = Some(id);
            }
        }
        best.map(|node| {
            let mut path = vec![node];
            let mut current = self.node(node).parent;
            while let Some(p) = current {
                path.push(p);
                current = self.node(p).parent;
            }
            path.reverse();
            Hit { node, path }
        })
    }

    /// Get the next node in depth-first traversal order.
    ///
    /// Returns `None` if no next node exists or if the current node is stale.
    /// This is a standard tree traversal that does not wrap around.
    pub fn next_depth_first(&self, current: NodeId) -> Option<NodeId> {
        if !self.is_alive(current) {
            return None;
        }
        if let Some(&first_child) = self.node(current).children.first() {
            return Some(first_child);
        }
        let mut node = current;
        loop {
            if let Some(next) = self.next_sibling(node) {
                return Some(next);
            }
            node = self.parent_of(node)?;
        }
    }

    /// Get the previous node in reverse depth-first traversal order.
    ///
    /// Returns `None` if no previous node exists or if the current node is stale.
    /// This is a standard tree traversal that does not wrap around.
    pub fn prev_depth_first(&self, current: NodeId) -> Option<NodeId> {
        if !self.is_alive(current) {
            return None;
        }
        if let Some(prev) = self.prev_sibling(current) {
            return Some(self.last_in_subtree(prev));
        }
        self.parent_of(current)
    }

    /// The sibling after a live node, if any.
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.siblings_of(node);
        let pos = siblings.iter().position(|&id| id == node)?;
        siblings.get(pos + 1).copied()
    }

    /// The sibling before a live node, if any.
    pub fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.siblings_of(node);
        let pos = siblings.iter().position(|&id| id == node)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    fn last_in_subtree(&self, node: NodeId) -> NodeId {
        let mut node = node;
        while let Some(&last) = self.node(node).children.last() {
            node = last;
        }
        node
    }

    // --- internals ---

    /// Access a node; panics if `id` is stale.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.idx()].as_ref().expect("dangling NodeId")
    }

    /// Access a node mutably; panics if `id` is stale.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.idx()].as_mut().expect("dangling NodeId")
    }

    fn node_opt(&self, id: NodeId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    fn node_opt_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    pub(crate) fn list(&self, parent: Option<NodeId>) -> &Vec<NodeId> {
        match parent {
            Some(p) => &self.node(p).children,
            None => &self.roots,
        }
    }

    fn list_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent {
            Some(p) => &mut self.node_mut(p).children,
            None => &mut self.roots,
        }
    }

    fn alloc(&mut self, item: ItemId, state: NodeState, flags: NodeFlags) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, item.clone(), state, flags));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes
                .push(Some(Node::new(generation, item.clone(), state, flags)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        let id = NodeId::new(idx, generation);
        self.by_item.insert(item, id);
        id
    }

    /// Insert a detached node at `loc`, promoting a leaf parent to an
    /// expanded branch.
    pub(crate) fn link_at(&mut self, id: NodeId, loc: Location) {
        if let Some(p) = loc.parent {
            let parent = self.node_mut(p);
            if parent.state.kind == NodeKind::Leaf {
                parent.state = NodeState {
                    kind: NodeKind::Branch,
                    expanded: true,
                    children_loaded: true,
                };
            }
        }
        let list = self.list_mut(loc.parent);
        let index = loc.index.min(list.len());
        list.insert(index, id);
        self.node_mut(id).parent = loc.parent;
    }

    /// Detach a node from its list, demoting a parent left empty to a leaf.
    pub(crate) fn unlink(&mut self, id: NodeId) -> Location {
        let parent = self.node(id).parent;
        let list = self.list_mut(parent);
        let index = list
            .iter()
            .position(|&c| c == id)
            .expect("child is listed under its parent");
        list.remove(index);
        if let Some(p) = parent {
            let parent = self.node_mut(p);
            if parent.children.is_empty() && parent.state.children_loaded {
                parent.state = NodeState::LEAF;
            }
        }
        self.node_mut(id).parent = None;
        Location { parent, index }
    }

    pub(crate) fn set_state(&mut self, id: NodeId, state: NodeState) {
        self.node_mut(id).state = state;
    }

    fn check_new_ids(&self, specs: &[NodeSpec]) -> Result<(), TreeError> {
        let mut seen = hashbrown::HashSet::new();
        let mut stack: Vec<&NodeSpec> = specs.iter().collect();
        while let Some(spec) = stack.pop() {
            if self.by_item.contains_key(&spec.id) || !seen.insert(&spec.id) {
                return Err(TreeError::DuplicateId(spec.id.clone()));
            }
            stack.extend(spec.children.iter());
        }
        Ok(())
    }

    /// Append a spec (ids already checked) and its loaded descendants.
    fn attach_spec(&mut self, parent: Option<NodeId>, spec: &NodeSpec) {
        let id = self.alloc(spec.id.clone(), spec.state(), spec.flags());
        let index = self.list(parent).len();
        let list = self.list_mut(parent);
        list.insert(index, id);
        self.node_mut(id).parent = parent;
        if let Some(p) = parent {
            let state = &mut self.node_mut(p).state;
            if state.kind == NodeKind::Leaf {
                *state = NodeState {
                    kind: NodeKind::Branch,
                    expanded: true,
                    children_loaded: true,
                };
            }
        }
        for child in &spec.children {
            self.attach_spec(Some(id), child);
        }
    }
}

/// Depth-first iterator over a [`Tree`], optionally skipping the contents of
/// collapsed branches.
#[derive(Debug)]
pub struct DepthFirst<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
    skip_collapsed: bool,
}

impl<'a> DepthFirst<'a> {
    fn new(tree: &'a Tree, skip_collapsed: bool) -> Self {
        Self {
            tree,
            stack: tree.roots.iter().rev().copied().collect(),
            skip_collapsed,
        }
    }
}

impl Iterator for DepthFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);
        if !self.skip_collapsed || node.state.is_open() {
            self.stack.extend(node.children.iter().rev().copied());
        }
        Some(id)
    }
}
