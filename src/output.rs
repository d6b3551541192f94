//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every entity (collection, item) is its semantic identity, a positional
//! index plus a title, with source files shown as secondary context via
//! indented `Source:` lines.
//!
//! # Entity Display Contract
//!
//! 1. **Header line**: positional index + title (+ member count for collections)
//! 2. **Context lines**: indented `Source:`, `Tags:`
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Content
//! 001 site (1 item)
//!     Source: (placeholder)
//!     001 tags (0 items)
//!         Source: (placeholder)
//!         001 meta (1 item)
//!             Source: (placeholder)
//!         002 rust (2 items)
//!             Source: (placeholder)
//!         003 web (1 item)
//!             Source: (placeholder)
//!     002 posts (1 item)
//!         Source: posts.md
//!         001 2024 (2 items)
//!             Source: (placeholder)
//!             001 Hello, world
//!                 Source: posts/2024/hello-world.md
//!                 Tags: rust, web
//!             002 Second
//!                 Source: posts/2024/second.md
//!                 Tags: rust
//!         002 (draft)
//!             Source: posts/draft.markdown
//!     003 About
//!         Source: about.md
//!         Tags: meta
//!
//! Skipped
//!     data/authors.yaml
//!     images/cover.jpg
//!
//! Parsed 5 files into 4 items and 7 collections
//! ```
//!
//! ## Build
//!
//! ```text
//! Collections
//! 001 site → collections/site.json
//! Items
//! 001 site/about → items/site/about.json
//! Index → index.json
//!
//! Wrote 4 items, 7 collections
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::context::Context;
use crate::export::ExportSummary;
use crate::hierarchy::leaf_name;
use crate::model::{CollectionId, ItemId, ModelRef};
use crate::scan::ScanReport;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Format a collection header: positional index + name + member count.
///
/// ```text
/// 001 posts (3 items)
/// ```
fn collection_header(index: usize, name: &str, members: usize) -> String {
    format!("{} {} ({})", format_index(index), name, plural(members, "item"))
}

/// Format an item line: titled items show the title, untitled show the leaf
/// name in parens.
///
/// ```text
/// 001 Hello, world     // titled
/// 002 (draft)          // untitled: the name is the identity
/// ```
fn item_line(index: usize, title: Option<&str>, name: &str) -> String {
    match title {
        Some(t) if !t.is_empty() => format!("{} {}", format_index(index), t),
        _ => format!("{} ({})", format_index(index), name),
    }
}

fn display_path(path: &Path, source_root: &Path) -> String {
    path.strip_prefix(source_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

// ============================================================================
// Tree walker
// ============================================================================

/// A flattened node from walking the collection hierarchy.
struct TreeNode {
    depth: usize,
    position: usize,
    model: ModelRef,
}

/// Walk the hierarchy from the root entities, assigning positional indices per
/// sibling level. Child collections come before child items; tag membership
/// is not hierarchy and is not walked.
fn walk_tree(ctx: &Context) -> Vec<TreeNode> {
    let roots: Vec<ModelRef> = ctx
        .graph()
        .collection_ids()
        .filter(|&c| ctx.collection(c).is_some_and(|c| c.parent().is_none()))
        .map(ModelRef::Collection)
        .chain(
            ctx.graph()
                .item_ids()
                .filter(|&i| ctx.item(i).is_some_and(|i| i.parent().is_none()))
                .map(ModelRef::Item),
        )
        .collect();

    let mut nodes = Vec::new();
    walk_tree_recursive(ctx, &roots, 0, &mut nodes);
    nodes
}

fn walk_tree_recursive(ctx: &Context, models: &[ModelRef], depth: usize, nodes: &mut Vec<TreeNode>) {
    for (i, &model) in models.iter().enumerate() {
        nodes.push(TreeNode {
            depth,
            position: i + 1,
            model,
        });
        if let ModelRef::Collection(id) = model {
            let children = hierarchical_children(ctx, id);
            walk_tree_recursive(ctx, &children, depth + 1, nodes);
        }
    }
}

fn hierarchical_children(ctx: &Context, id: CollectionId) -> Vec<ModelRef> {
    let Some(collection) = ctx.collection(id) else {
        return Vec::new();
    };
    let collections = collection.collections().iter().copied().map(ModelRef::Collection);
    let items = collection
        .items()
        .iter()
        .copied()
        .filter(|&item| ctx.item(item).and_then(|i| i.parent()) == Some(id))
        .map(ModelRef::Item);
    collections.chain(items).collect()
}

fn item_title(ctx: &Context, id: ItemId) -> Option<&str> {
    ctx.item(id)?.document()?.get("title").and_then(Value::as_str)
}

// ============================================================================
// Scan output
// ============================================================================

/// Format scan output showing the discovered content graph.
pub fn format_scan_output(ctx: &Context, report: &ScanReport, source_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let sources: HashMap<ModelRef, &Path> = report
        .parsed
        .iter()
        .map(|p| (p.model, p.path.as_path()))
        .collect();
    let source_line = |model: ModelRef| {
        sources
            .get(&model)
            .map(|path| display_path(path, source_root))
            .unwrap_or_else(|| "(placeholder)".to_string())
    };

    lines.push("Content".to_string());
    for node in walk_tree(ctx) {
        let base_indent = indent(node.depth);
        match node.model {
            ModelRef::Collection(id) => {
                let Some(collection) = ctx.collection(id) else {
                    continue;
                };
                let header = collection_header(
                    node.position,
                    leaf_name(collection.id()),
                    collection.items().len(),
                );
                lines.push(format!("{}{}", base_indent, header));
                lines.push(format!("{}    Source: {}", base_indent, source_line(node.model)));
            }
            ModelRef::Item(id) => {
                let Some(item) = ctx.item(id) else {
                    continue;
                };
                let header = item_line(node.position, item_title(ctx, id), leaf_name(item.id()));
                lines.push(format!("{}{}", base_indent, header));
                lines.push(format!("{}    Source: {}", base_indent, source_line(node.model)));
                if !item.tags().is_empty() {
                    let tags: Vec<&str> = item
                        .tags()
                        .iter()
                        .filter_map(|t| ctx.collection(*t))
                        .map(|c| leaf_name(c.id()))
                        .collect();
                    lines.push(format!("{}    Tags: {}", base_indent, tags.join(", ")));
                }
            }
        }
    }

    if !report.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        for path in &report.skipped {
            lines.push(format!("    {}", display_path(path, source_root)));
        }
    }

    if !report.failed.is_empty() {
        lines.push(String::new());
        lines.push("Failed".to_string());
        for failed in &report.failed {
            lines.push(format!("    {}", display_path(&failed.path, source_root)));
            lines.push(format!("        {}", failed.error));
        }
    }

    lines.push(String::new());
    lines.push(format_summary(ctx, report));
    lines
}

fn format_summary(ctx: &Context, report: &ScanReport) -> String {
    let mut summary = format!(
        "Parsed {} into {} and {}",
        plural(report.parsed.len(), "file"),
        plural(ctx.items().len(), "item"),
        plural(ctx.collections().len(), "collection"),
    );
    if !report.failed.is_empty() {
        summary.push_str(&format!(" ({} failed)", report.failed.len()));
    }
    summary
}

/// Print scan output to stdout.
pub fn print_scan_output(ctx: &Context, report: &ScanReport, source_root: &Path) {
    for line in format_scan_output(ctx, report, source_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Check output
// ============================================================================

/// One-line verdict plus any failures.
pub fn format_check_output(ctx: &Context, report: &ScanReport, source_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    if report.is_clean() {
        lines.push(format!("OK: {}", format_summary(ctx, report)));
    } else {
        lines.push(format!("FAILED: {}", format_summary(ctx, report)));
        for failed in &report.failed {
            lines.push(format!(
                "    {}: {}",
                display_path(&failed.path, source_root),
                failed.error
            ));
        }
    }
    lines
}

pub fn print_check_output(ctx: &Context, report: &ScanReport, source_root: &Path) {
    for line in format_check_output(ctx, report, source_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Build output
// ============================================================================

fn identifier_of(path: &Path, kind_dir: &str) -> String {
    let relative = path.strip_prefix(kind_dir).unwrap_or(path).with_extension("");
    relative.to_string_lossy().replace('\\', "/")
}

/// Format build output listing every written file.
pub fn format_build_output(summary: &ExportSummary) -> Vec<String> {
    let mut lines = Vec::new();

    for (title, dir, paths) in [
        ("Collections", "collections", &summary.collections),
        ("Items", "items", &summary.items),
    ] {
        if paths.is_empty() {
            continue;
        }
        lines.push(title.to_string());
        for (i, path) in paths.iter().enumerate() {
            lines.push(format!(
                "{} {} \u{2192} {}",
                format_index(i + 1),
                identifier_of(path, dir),
                path.to_string_lossy().replace('\\', "/")
            ));
        }
    }
    lines.push(format!("Index \u{2192} {}", summary.index.display()));

    lines.push(String::new());
    lines.push(format!(
        "Wrote {}, {}",
        plural(summary.items.len(), "item"),
        plural(summary.collections.len(), "collection")
    ));
    lines
}

/// Print build output to stdout.
pub fn print_build_output(summary: &ExportSummary) {
    for line in format_build_output(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
