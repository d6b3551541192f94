//! # Hyde
//!
//! Turns a directory of Markdown and YAML content into a linked graph of items
//! and collections, then serializes that graph as JSON:API documents. Your
//! filesystem is the data source: directories become collections, content
//! files become items, and front-matter `tags` become tag collections.
//!
//! # Architecture: Parse, Link, Serialize
//!
//! ```text
//! 1. Parse      text       →  Content           (front matter + body)
//! 2. Link       Content    →  Context graph     (ancestors, parent, tags)
//! 3. Serialize  entity     →  JSON:API document (linkage-only relationships)
//! ```
//!
//! Every entity has a `/`-separated identifier derived from its path under the
//! source root and namespaced by the context name:
//!
//! ```text
//! content/posts/2024/hello.md   →  site/posts/2024/hello          (item)
//!                                   site/posts/2024, site/posts, site (collections)
//! tags: [rust]                  →  site/tags/rust                 (collection)
//! ```
//!
//! Ancestor collections are created lazily as placeholders. A content file that
//! later targets a placeholder's identifier (`posts.md` next to `posts/`) merges
//! its attributes into the existing collection instead of creating a duplicate.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`model`] | `Item`, `Collection`, typed ids and the `Graph` arena with two-sided relationship setters |
//! | [`hierarchy`] | Identifier rules and lazy ancestor materialization |
//! | [`parser`] | Front-matter splitting, YAML decoding, tag resolution, `parse_file` |
//! | [`merge`] | First-write-wins attribute merging for find-or-create |
//! | [`context`] | The per-run registry: name, graph, identifier indexes |
//! | [`jsonapi`] | JSON:API wire types |
//! | [`serializer`] | Per-kind serializer configuration and JSON:API serialization |
//! | [`config`] | `hyde.toml` loading, validation, merging over stock defaults |
//! | [`scan`] | Walks a source root and feeds every file to the parser |
//! | [`export`] | Writes one JSON:API document per entity plus an index |
//! | [`output`] | CLI output formatting: tree display of scan and build results |
//!
//! # Design Decisions
//!
//! ## Arena Over Shared Pointers
//!
//! Parents point at children and children point back. Instead of reference
//! counting, every entity lives in one [`model::Graph`] and relationships hold
//! typed indices. The only way to change a relationship is through the graph's
//! setters, which update both sides together and validate before mutating.
//!
//! ## No Global Instance
//!
//! A [`context::Context`] is created explicitly and threaded through parsing and
//! serialization. Two contexts never share state, so tests and multiple source
//! trees in one process stay independent.

pub mod config;
pub mod context;
pub mod export;
pub mod hierarchy;
pub mod jsonapi;
pub mod merge;
pub mod model;
pub mod output;
pub mod parser;
pub mod scan;
pub mod serializer;

#[cfg(test)]
pub(crate) mod test_helpers;
