// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural moves with exact undo.

use crate::error::TreeError;
use crate::tree::Tree;
use crate::types::{DropPosition, DropTarget, Location, NodeId, NodeState};

/// Everything needed to undo one [`Tree::apply_move`].
///
/// Both parents' display state is captured before the move, so a revert also
/// undoes leaf/branch promotion and demotion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveReceipt {
    /// The node that moved.
    pub node: NodeId,
    /// Where it was.
    pub from: Location,
    /// Where it is now.
    pub to: Location,
    from_parent_state: Option<NodeState>,
    to_parent_state: Option<NodeState>,
}

impl MoveReceipt {
    /// Returns `true` if the node ended up where it started.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

impl Tree {
    /// Resolve a drop target into the slot `node` would occupy once detached.
    pub fn resolve_target(&self, node: NodeId, target: DropTarget) -> Result<Location, TreeError> {
        if !self.is_alive(node) {
            return Err(TreeError::StaleNode(node));
        }
        if !self.is_alive(target.node) {
            return Err(TreeError::StaleNode(target.node));
        }
        if self.in_subtree(node, target.node) {
            return Err(TreeError::IntoOwnSubtree);
        }
        let without = |parent: Option<NodeId>| {
            self.list(parent).iter().copied().filter(move |&c| c != node)
        };
        Ok(match target.position {
            DropPosition::Before | DropPosition::After => {
                let parent = self.parent_of(target.node);
                let index = without(parent)
                    .position(|c| c == target.node)
                    .ok_or(TreeError::StaleNode(target.node))?;
                let index = if target.position == DropPosition::After {
                    index + 1
                } else {
                    index
                };
                Location { parent, index }
            }
            DropPosition::FirstChild => Location::under(target.node, 0),
            DropPosition::LastChild => Location::under(target.node, without(Some(target.node)).count()),
        })
    }

    /// Detach `node` and reinsert it relative to `target`.
    ///
    /// A parent left without children is demoted to a leaf, and a leaf that
    /// gains its first child becomes an expanded branch.
    pub fn apply_move(&mut self, node: NodeId, target: DropTarget) -> Result<MoveReceipt, TreeError> {
        let to = self.resolve_target(node, target)?;
        self.move_to(node, to)
    }

    /// Move `node` to an absolute slot, as computed against the tree with
    /// `node` detached.
    pub fn move_to(&mut self, node: NodeId, to: Location) -> Result<MoveReceipt, TreeError> {
        if !self.is_alive(node) {
            return Err(TreeError::StaleNode(node));
        }
        if let Some(p) = to.parent {
            if !self.is_alive(p) {
                return Err(TreeError::StaleNode(p));
            }
            if self.in_subtree(node, p) {
                return Err(TreeError::IntoOwnSubtree);
            }
        }
        let from = self.location_of(node).ok_or(TreeError::StaleNode(node))?;
        let from_parent_state = from.parent.and_then(|p| self.state(p));
        let to_parent_state = to.parent.and_then(|p| self.state(p));

        self.unlink(node);
        self.link_at(node, to);
        let to = self.location_of(node).ok_or(TreeError::StaleNode(node))?;
        if from.parent == to.parent
            && let (Some(p), Some(state)) = (from.parent, from_parent_state)
        {
            self.set_state(p, state);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(node = %self.node(node).item, ?from, ?to, "moved node");
        Ok(MoveReceipt {
            node,
            from,
            to,
            from_parent_state,
            to_parent_state,
        })
    }

    /// Undo a move, restoring the original slot and both parents' state.
    ///
    /// Fails with [`TreeError::StaleReceipt`] if the node is no longer where
    /// the receipt left it.
    pub fn revert(&mut self, receipt: &MoveReceipt) -> Result<(), TreeError> {
        let node = receipt.node;
        if self.location_of(node) != Some(receipt.to) {
            return Err(TreeError::StaleReceipt);
        }
        if let Some(p) = receipt.from.parent
            && (!self.is_alive(p) || self.in_subtree(node, p))
        {
            return Err(TreeError::StaleReceipt);
        }
        self.unlink(node);
        self.link_at(node, receipt.from);
        if let (Some(p), Some(state)) = (receipt.to.parent, receipt.to_parent_state) {
            self.set_state(p, state);
        }
        if let (Some(p), Some(state)) = (receipt.from.parent, receipt.from_parent_state) {
            self.set_state(p, state);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(node = %self.node(node).item, to = ?receipt.from, "reverted move");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeKind, NodeSpec};
    use alloc::vec;
    use alloc::vec::Vec;

    fn shape(tree: &Tree) -> Vec<(&str, Option<&str>)> {
        tree.depth_first()
            .map(|n| {
                (
                    tree.item_id(n).unwrap().as_str(),
                    tree.parent_of(n).map(|p| tree.item_id(p).unwrap().as_str()),
                )
            })
            .collect()
    }

    fn id(tree: &Tree, item: &str) -> NodeId {
        tree.find(item).unwrap()
    }

    #[test]
    fn reorder_within_parent() {
        let mut tree =
            Tree::from_specs(&[NodeSpec::branch("A", vec![NodeSpec::leaf("B"), NodeSpec::leaf("C")])])
                .unwrap();
        let (b, c) = (id(&tree, "B"), id(&tree, "C"));
        let receipt = tree.apply_move(c, DropTarget::before(b)).unwrap();
        assert_eq!(shape(&tree), [("A", None), ("C", Some("A")), ("B", Some("A"))]);
        assert_eq!(receipt.from.index, 1);
        assert_eq!(receipt.to.index, 0);
        assert!(tree.state(id(&tree, "A")).unwrap().is_open());
    }

    #[test]
    fn nesting_promotes_and_emptying_demotes() {
        let mut tree = Tree::from_specs(&[NodeSpec::leaf("D"), NodeSpec::leaf("E")]).unwrap();
        let (d, e) = (id(&tree, "D"), id(&tree, "E"));
        let before = tree.state(e).unwrap();

        let receipt = tree.apply_move(d, DropTarget::first_child(e)).unwrap();
        let state = tree.state(e).unwrap();
        assert_eq!(state.kind, NodeKind::Branch);
        assert!(state.expanded);
        assert_eq!(tree.parent_of(d), Some(e));

        tree.revert(&receipt).unwrap();
        assert_eq!(tree.state(e).unwrap(), before);
        assert_eq!(tree.roots(), &[d, e]);

        tree.apply_move(d, DropTarget::last_child(e)).unwrap();
        tree.apply_move(d, DropTarget::after(e)).unwrap();
        assert_eq!(tree.state(e).unwrap(), NodeState::LEAF);
        assert!(tree.children_of(e).is_empty());
    }

    #[test]
    fn revert_restores_collapsed_origin() {
        let mut spec = NodeSpec::branch("P", vec![NodeSpec::leaf("X")]);
        spec.expanded = false;
        let mut tree = Tree::from_specs(&[spec, NodeSpec::leaf("Q")]).unwrap();
        let (p, x, q) = (id(&tree, "P"), id(&tree, "X"), id(&tree, "Q"));
        let p_state = tree.state(p).unwrap();

        let receipt = tree.apply_move(x, DropTarget::after(q)).unwrap();
        assert_eq!(tree.state(p).unwrap(), NodeState::LEAF);
        tree.revert(&receipt).unwrap();
        assert_eq!(tree.state(p).unwrap(), p_state);
        assert_eq!(tree.children_of(p), &[x]);
    }

    #[test]
    fn same_parent_keeps_state() {
        let mut spec = NodeSpec::branch("P", vec![NodeSpec::leaf("X")]);
        spec.expanded = false;
        let mut tree = Tree::from_specs(&[spec]).unwrap();
        let (p, x) = (id(&tree, "P"), id(&tree, "X"));
        let state = tree.state(p).unwrap();
        let receipt = tree.apply_move(x, DropTarget::first_child(p)).unwrap();
        assert!(receipt.is_noop());
        assert_eq!(tree.state(p).unwrap(), state);
    }

    #[test]
    fn after_sibling_accounts_for_detach() {
        let mut tree = Tree::from_specs(&[
            NodeSpec::leaf("a"),
            NodeSpec::leaf("b"),
            NodeSpec::leaf("c"),
        ])
        .unwrap();
        let (a, b, c) = (id(&tree, "a"), id(&tree, "b"), id(&tree, "c"));
        let receipt = tree.apply_move(a, DropTarget::after(b)).unwrap();
        assert_eq!(tree.roots(), &[b, a, c]);
        assert_eq!(receipt.to, Location::root(1));
        tree.revert(&receipt).unwrap();
        assert_eq!(tree.roots(), &[a, b, c]);
    }

    #[test]
    fn rejects_own_subtree_and_stale() {
        let mut tree =
            Tree::from_specs(&[NodeSpec::branch("A", vec![NodeSpec::leaf("B")])]).unwrap();
        let (a, b) = (id(&tree, "A"), id(&tree, "B"));
        assert_eq!(
            tree.apply_move(a, DropTarget::first_child(b)),
            Err(TreeError::IntoOwnSubtree)
        );
        assert_eq!(
            tree.apply_move(a, DropTarget::before(a)),
            Err(TreeError::IntoOwnSubtree)
        );
        tree.remove(b);
        assert_eq!(
            tree.apply_move(b, DropTarget::after(a)),
            Err(TreeError::StaleNode(b))
        );
    }

    #[test]
    fn revert_detects_stale_receipt() {
        let mut tree = Tree::from_specs(&[
            NodeSpec::leaf("a"),
            NodeSpec::leaf("b"),
            NodeSpec::leaf("c"),
        ])
        .unwrap();
        let (a, b, c) = (id(&tree, "a"), id(&tree, "b"), id(&tree, "c"));
        let first = tree.apply_move(a, DropTarget::after(c)).unwrap();
        tree.apply_move(a, DropTarget::before(b)).unwrap();
        assert_eq!(tree.revert(&first), Err(TreeError::StaleReceipt));
    }
}
