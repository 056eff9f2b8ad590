// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag-to-reorder a small page tree and persist the moves.
//!
//! This walkthrough shows how to combine:
//! - `arbor_tree` for the page hierarchy and nested-set dumps,
//! - `arbor_sortable` for pointer-driven drag classification,
//! - `arbor_sync` for optimistic commit and rollback against a backend.
//!
//! The backend is scripted: the first move is accepted, the second is refused
//! with a 403, and the third drag is cancelled by dropping outside the tree.
//!
//! Run:
//! - `cargo run -p arbor_examples --example page_tree_sync`
//! - `RUST_LOG=info cargo run -p arbor_examples --example page_tree_sync` for quieter logs

use arbor_sortable::{DropOutcome, Sortable, SortableConfig};
use arbor_sync::scripted::{Scripted, ScriptedTransport};
use arbor_sync::{ServerReply, SyncConfig, SyncCoordinator};
use arbor_tree::nested_set::{SerializeOptions, to_array};
use arbor_tree::{NodeSpec, Tree};
use kurbo::{Point, Rect};
use tracing_subscriber::EnvFilter;

const ROW_HEIGHT: f64 = 20.0;
const ROW_WIDTH: f64 = 240.0;
const INDENT: f64 = 20.0;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let tree = Tree::from_specs(&[
        NodeSpec::leaf("about"),
        NodeSpec::leaf("team"),
        NodeSpec::leaf("contact"),
    ])?;
    let mut sortable = Sortable::new(tree, SortableConfig::default());
    let sync = SyncCoordinator::new(ScriptedTransport::new(), SyncConfig::new("/admin/pages"));
    sync.transport()
        .push(Scripted::Reply(ServerReply::ok("<ul id=\"tree\">...</ul>")))
        .push(Scripted::Reply(ServerReply::with_status(
            403,
            "Permission denied",
        )));

    layout(&mut sortable);
    print_tree("initial", sortable.tree());

    // Nest `team` under `about` by dragging it one indent to the right.
    let team = sortable.tree().find("team").ok_or("missing page `team`")?;
    drag_right(&mut sortable, team, 1, 0)?;
    let outcome = sync.settle(&mut sortable).await?;
    println!("move of `{}` committed: {}", outcome.item(), outcome.is_committed());
    layout(&mut sortable);
    print_tree("after nesting", sortable.tree());

    // The backend refuses the next move; the tree snaps back.
    let contact = sortable
        .tree()
        .find("contact")
        .ok_or("missing page `contact`")?;
    drag_right(&mut sortable, contact, 2, 100)?;
    let outcome = sync.settle(&mut sortable).await?;
    if let Some(message) = outcome.user_message() {
        println!("move of `{}` rolled back: {message}", outcome.item());
    }
    layout(&mut sortable);
    print_tree("after rollback", sortable.tree());

    // Dropping outside the tree cancels without talking to the backend.
    let start = row_center(1);
    sortable.begin_drag(team, start, 200)?;
    sortable.drag_to(Point::new(start.x, 400.0), 216)?;
    let outcome = sortable.drop_at(Point::new(start.x, 400.0), 232)?;
    println!("drop outside the tree: {outcome:?}");
    println!("requests sent: {}", sync.transport().sent().len());

    Ok(())
}

/// Drag the node shown on visible row `row` one indent to the right and drop.
fn drag_right(
    sortable: &mut Sortable,
    node: arbor_tree::NodeId,
    row: usize,
    now: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = row_center(row);
    let nested = Point::new(start.x + INDENT * 1.5, start.y);
    sortable.begin_drag(node, start, now)?;
    sortable.drag_to(nested, now + 16)?;
    match sortable.drop_at(nested, now + 32)? {
        DropOutcome::Moved(pending) => {
            println!(
                "dropped `{}`: {} {}",
                pending.item,
                pending.relative.token,
                pending
                    .relative
                    .target
                    .as_ref()
                    .map_or("(root)", |t| t.as_str()),
            );
            Ok(())
        }
        other => Err(format!("expected a move, got {other:?}").into()),
    }
}

fn row_center(row: usize) -> Point {
    Point::new(10.0, row as f64 * ROW_HEIGHT + ROW_HEIGHT / 2.0)
}

/// One row per visible page, indented by depth. Hidden pages get no geometry.
fn layout(sortable: &mut Sortable) {
    let all: Vec<_> = sortable.tree().depth_first().collect();
    for id in all {
        sortable.set_row_bounds(id, None);
    }
    let visible: Vec<_> = sortable
        .tree()
        .visible()
        .map(|id| (id, sortable.tree().depth(id).unwrap_or(0)))
        .collect();
    for (row, (id, depth)) in visible.into_iter().enumerate() {
        let y0 = row as f64 * ROW_HEIGHT;
        let x0 = depth as f64 * INDENT;
        sortable.set_row_bounds(id, Some(Rect::new(x0, y0, ROW_WIDTH, y0 + ROW_HEIGHT)));
    }
}

fn print_tree(label: &str, tree: &Tree) {
    println!("-- {label}");
    for record in to_array(tree, &SerializeOptions::default()) {
        println!(
            "{:indent$}{} [{}, {}]",
            "",
            record.item_id,
            record.left,
            record.right,
            indent = record.depth * 2,
        );
    }
}
