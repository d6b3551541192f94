//! Identifier rules and lazy ancestor materialization.
//!
//! Identifiers are `/`-separated paths. Segment order encodes ancestry:
//!
//! ```text
//! site/posts/2024/hello    item
//! site/posts/2024          ← parent collection
//! site/posts               ← grandparent collection
//! site                     ← root collection (no parent)
//! ```
//!
//! Before anything claims `site/posts/2024` as its parent, the whole chain up to
//! `site` must exist and be linked. [`Context::resolve_or_create_ancestor`]
//! creates whatever is missing as empty placeholder collections. Each step drops
//! one trailing segment, so resolution always terminates.

use crate::context::Context;
use crate::model::{Collection, CollectionId, ModelError};
use std::path::{Component, Path};
use tracing::debug;

pub const SEPARATOR: char = '/';

/// Reject identifiers with empty segments (`""`, `"/a"`, `"a/"`, `"a//b"`).
pub fn validate_identifier(id: &str) -> Result<(), ModelError> {
    if id.is_empty() {
        return Err(ModelError::InvalidArgument(
            "identifier must not be empty".into(),
        ));
    }
    if id.split(SEPARATOR).any(str::is_empty) {
        return Err(ModelError::InvalidArgument(format!(
            "identifier '{id}' contains an empty path segment"
        )));
    }
    Ok(())
}

/// Everything before the last separator, or `None` for a root identifier.
///
/// - `"a/b/c"` → `Some("a/b")`
/// - `"a"` → `None`
pub fn parent_identifier_of(id: &str) -> Option<&str> {
    id.rfind(SEPARATOR).map(|pos| &id[..pos])
}

/// All ancestors from the immediate parent up to the root.
pub fn ancestors_of(id: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(parent_identifier_of(id), |id| parent_identifier_of(*id))
}

/// Last path segment.
pub fn leaf_name(id: &str) -> &str {
    id.rsplit(SEPARATOR).next().unwrap_or(id)
}

/// Join segments into one identifier, trimming stray separators and skipping
/// empty segments.
///
/// `join_identifier(["site", "tags/", "/rust"])` → `"site/tags/rust"`
pub fn join_identifier<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for segment in segments {
        for part in segment.as_ref().split(SEPARATOR).map(str::trim) {
            if part.is_empty() {
                continue;
            }
            if !joined.is_empty() {
                joined.push(SEPARATOR);
            }
            joined.push_str(part);
        }
    }
    joined
}

/// Derive an identifier from a file path.
///
/// Strips `input_root` when the path lives under it, drops the extension, and
/// joins the remaining components with `/` regardless of platform.
pub fn identifier_from_path(path: &Path, input_root: Option<&Path>) -> Result<String, ModelError> {
    let relative = input_root
        .and_then(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);
    let stem = relative.with_extension("");

    let mut segments = Vec::new();
    for component in stem.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(ModelError::InvalidArgument(format!(
                    "path '{}' escapes the input root",
                    path.display()
                )));
            }
        }
    }

    let id = join_identifier(&segments);
    validate_identifier(&id)?;
    Ok(id)
}

impl Context {
    /// Return the collection for `id`, creating it and any missing ancestors.
    pub fn resolve_or_create_ancestor(&mut self, id: &str) -> Result<CollectionId, ModelError> {
        validate_identifier(id)?;
        if let Some(existing) = self.find_collection(id) {
            return Ok(existing);
        }

        let parent = match parent_identifier_of(id) {
            Some(parent_id) => Some(self.resolve_or_create_ancestor(parent_id)?),
            None => None,
        };

        let collection = self.track_collection(Collection::new(id))?;
        self.graph_mut().set_collection_parent(collection, parent)?;
        debug!(id, "created placeholder collection");
        Ok(collection)
    }

    /// Resolve the parent collection implied by `id`, if it has one.
    pub fn resolve_parent(&mut self, id: &str) -> Result<Option<CollectionId>, ModelError> {
        match parent_identifier_of(id) {
            Some(parent_id) => self.resolve_or_create_ancestor(parent_id).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // =========================================================================
    // Identifier helpers
    // =========================================================================

    #[test]
    fn parent_strips_last_segment() {
        assert_eq!(parent_identifier_of("foo/bar/baz"), Some("foo/bar"));
    }

    #[test]
    fn parent_of_root_is_none() {
        assert_eq!(parent_identifier_of("foo"), None);
    }

    #[test]
    fn n_separators_reach_root_in_n_steps() {
        let id = "a/b/c/d";
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(next) = current.and_then(parent_identifier_of) {
            current = Some(next);
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(ancestors_of(id).collect::<Vec<_>>(), vec!["a/b/c", "a/b", "a"]);
    }

    #[test]
    fn invalid_identifiers_rejected() {
        for bad in ["", "/a", "a/", "a//b"] {
            assert!(
                matches!(validate_identifier(bad), Err(ModelError::InvalidArgument(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(validate_identifier("a/b").is_ok());
    }

    #[test]
    fn join_trims_separators() {
        assert_eq!(join_identifier(["site", "tags/", "/rust"]), "site/tags/rust");
        assert_eq!(join_identifier(["site", "", "x"]), "site/x");
        assert_eq!(join_identifier(["content", "tags", "web/frontend"]), "content/tags/web/frontend");
    }

    #[test]
    fn leaf_name_is_last_segment() {
        assert_eq!(leaf_name("a/b/c"), "c");
        assert_eq!(leaf_name("a"), "a");
    }

    #[test]
    fn identifier_from_path_strips_root_and_extension() {
        let id = identifier_from_path(
            Path::new("content/posts/a/b.md"),
            Some(Path::new("content")),
        )
        .unwrap();
        assert_eq!(id, "posts/a/b");
    }

    #[test]
    fn identifier_from_path_without_root() {
        let id = identifier_from_path(Path::new("foo/bar/baz.markdown"), None).unwrap();
        assert_eq!(id, "foo/bar/baz");
    }

    #[test]
    fn identifier_from_path_rejects_parent_dirs() {
        let path: PathBuf = ["..", "secret.md"].iter().collect();
        assert!(identifier_from_path(&path, None).is_err());
    }

    // =========================================================================
    // Ancestor resolution
    // =========================================================================

    #[test]
    fn resolving_creates_full_linked_chain() {
        let mut ctx = Context::new("site").unwrap();
        let leaf = ctx.resolve_or_create_ancestor("a/b/c").unwrap();

        assert_eq!(ctx.collections().len(), 3);

        let mut cursor = Some(leaf);
        let mut seen = Vec::new();
        while let Some(id) = cursor {
            let collection = ctx.collection(id).unwrap();
            seen.push(collection.id().to_string());
            if let Some(parent) = collection.parent() {
                assert!(ctx.collection(parent).unwrap().collections().contains(&id));
            }
            cursor = collection.parent();
        }
        assert_eq!(seen, vec!["a/b/c", "a/b", "a"]);
    }

    #[test]
    fn resolving_reuses_existing_collections() {
        let mut ctx = Context::new("site").unwrap();
        let first = ctx.resolve_or_create_ancestor("a/b").unwrap();
        let again = ctx.resolve_or_create_ancestor("a/b").unwrap();
        let sibling = ctx.resolve_or_create_ancestor("a/c").unwrap();

        assert_eq!(first, again);
        assert_eq!(ctx.collections().len(), 3);

        let root = ctx.find_collection("a").unwrap();
        assert_eq!(ctx.collection(root).unwrap().collections(), &[first, sibling]);
    }

    #[test]
    fn resolving_invalid_identifier_creates_nothing() {
        let mut ctx = Context::new("site").unwrap();
        assert!(ctx.resolve_or_create_ancestor("a//b").is_err());
        assert!(ctx.collections().is_empty());
    }

    #[test]
    fn resolve_parent_of_root_is_none() {
        let mut ctx = Context::new("site").unwrap();
        assert_eq!(ctx.resolve_parent("site").unwrap(), None);
        assert!(ctx.collections().is_empty());
    }
}
