//! Shared test utilities for the hyde test suite.
//!
//! Provides fixture setup, lookup helpers, and hierarchy assertions that work
//! with a populated [`Context`].
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let (ctx, _) = scan(tmp.path()).unwrap();
//!
//! let hello = find_item(&ctx, "site/posts/2024/hello-world");
//! assert_parent_chain(&ctx, hello.parent(), &["site/posts/2024", "site/posts", "site"]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::context::Context;
use crate::model::{Collection, CollectionId, Item, ModelKind};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Context lookups: panic with a clear message on miss
// =========================================================================

/// All identifiers of one kind, in creation order.
pub fn identifiers(ctx: &Context, kind: ModelKind) -> Vec<String> {
    match kind {
        ModelKind::Item => ctx.items().iter().map(|i| i.id().to_string()).collect(),
        ModelKind::Collection => ctx
            .collections()
            .iter()
            .map(|c| c.id().to_string())
            .collect(),
    }
}

/// Find an item by identifier. Panics if not found.
pub fn find_item<'a>(ctx: &'a Context, id: &str) -> &'a Item {
    ctx.find_item(id)
        .and_then(|i| ctx.item(i))
        .unwrap_or_else(|| {
            let available = identifiers(ctx, ModelKind::Item);
            panic!("item '{id}' not found. Available: {available:?}")
        })
}

/// Find a collection by identifier. Panics if not found.
pub fn find_collection<'a>(ctx: &'a Context, id: &str) -> &'a Collection {
    ctx.find_collection(id)
        .and_then(|c| ctx.collection(c))
        .unwrap_or_else(|| {
            let available = identifiers(ctx, ModelKind::Collection);
            panic!("collection '{id}' not found. Available: {available:?}")
        })
}

// =========================================================================
// Hierarchy assertions
// =========================================================================

/// Assert the chain of parents starting at `start`, nearest first, and that
/// every link is mirrored in the parent's child list.
pub fn assert_parent_chain(ctx: &Context, start: Option<CollectionId>, expected: &[&str]) {
    let mut actual = Vec::new();
    let mut cursor = start;
    while let Some(id) = cursor {
        let collection = ctx
            .collection(id)
            .unwrap_or_else(|| panic!("dangling collection reference {id:?}"));
        if let Some(parent) = collection.parent() {
            let siblings = ctx.collection(parent).map(Collection::collections);
            assert!(
                siblings.is_some_and(|s| s.contains(&id)),
                "'{}' is not listed under its parent",
                collection.id()
            );
        }
        actual.push(collection.id().to_string());
        cursor = collection.parent();
    }
    assert_eq!(actual, expected, "parent chain mismatch");
}
