//! Writing serialized entities to disk.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.json                       # every entity, collections first
//! ├── collections/
//! │   └── site/
//! │       ├── posts.json               # collection site/posts
//! │       └── posts/2024.json          # collection site/posts/2024
//! └── items/
//!     └── site/
//!         └── posts/2024/hello.json    # item site/posts/2024/hello
//! ```
//!
//! Items and collections live in separate trees because an item and a
//! collection may share an identifier. Every file holds a pruned JSON:API
//! document (no blank relationships).

use crate::context::Context;
use crate::hierarchy::SEPARATOR;
use crate::jsonapi::JsonApiDocument;
use crate::model::{ModelError, ModelKind, ModelRef};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const INDEX_FILENAME: &str = "index.json";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Identifier '{0}' cannot be used as an output path")]
    UnsafeIdentifier(String),
}

/// Files written by [`export`], relative to the output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub items: Vec<PathBuf>,
    pub collections: Vec<PathBuf>,
    pub index: PathBuf,
}

/// Directory under the output root for entities of `kind`.
pub fn kind_dir(kind: ModelKind) -> &'static str {
    match kind {
        ModelKind::Item => "items",
        ModelKind::Collection => "collections",
    }
}

/// Relative output path for an entity: `<kind dir>/<identifier>.json`.
pub fn entity_path(kind: ModelKind, id: &str) -> Result<PathBuf, ExportError> {
    let mut path = PathBuf::from(kind_dir(kind));
    for segment in id.split(SEPARATOR) {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Err(ExportError::UnsafeIdentifier(id.to_string()));
        }
        path.push(segment);
    }
    let file_name = path
        .file_name()
        .map(|name| format!("{}.json", name.to_string_lossy()))
        .ok_or_else(|| ExportError::UnsafeIdentifier(id.to_string()))?;
    path.set_file_name(file_name);
    Ok(path)
}

/// Serialize every entity of `ctx` into `output_dir`.
pub fn export(ctx: &Context, output_dir: &Path, pretty: bool) -> Result<ExportSummary, ExportError> {
    fs::create_dir_all(output_dir)?;
    let mut summary = ExportSummary::default();

    for model in ctx.models() {
        let id = ctx
            .identifier(model)
            .ok_or_else(|| ModelError::InvalidArgument(format!("unknown model {model:?}")))?;
        let relative = entity_path(model.kind(), id)?;
        write_document(&output_dir.join(&relative), &ctx.serialize(model)?, pretty)?;
        debug!(id, path = %relative.display(), "wrote entity");

        match model {
            ModelRef::Item(_) => summary.items.push(relative),
            ModelRef::Collection(_) => summary.collections.push(relative),
        }
    }

    write_document(&output_dir.join(INDEX_FILENAME), &ctx.serialize_all()?, pretty)?;
    summary.index = PathBuf::from(INDEX_FILENAME);

    info!(
        output = %output_dir.display(),
        items = summary.items.len(),
        collections = summary.collections.len(),
        "export finished"
    );
    Ok(summary)
}

fn write_document(path: &Path, document: &JsonApiDocument, pretty: bool) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut json = document.to_json_string(pretty)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseOptions;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn entity_path_nests_identifier_segments() {
        assert_eq!(
            entity_path(ModelKind::Item, "site/posts/hello").unwrap(),
            PathBuf::from("items/site/posts/hello.json")
        );
        assert_eq!(
            entity_path(ModelKind::Collection, "site").unwrap(),
            PathBuf::from("collections/site.json")
        );
    }

    #[test]
    fn entity_path_keeps_dots_inside_names() {
        assert_eq!(
            entity_path(ModelKind::Item, "site/v1.2").unwrap(),
            PathBuf::from("items/site/v1.2.json")
        );
    }

    #[test]
    fn entity_path_rejects_traversal() {
        for bad in ["site/../etc", "./x", "a\\b"] {
            assert!(
                matches!(entity_path(ModelKind::Item, bad), Err(ExportError::UnsafeIdentifier(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn export_writes_one_file_per_entity_and_index() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = Context::new("site").unwrap();
        ctx.parse("---\ntitle: Hi\n---\nBody", &ParseOptions::new("site/posts/hi").with_ext("md"))
            .unwrap();

        let summary = export(&ctx, tmp.path(), true).unwrap();
        assert_eq!(
            summary.collections,
            vec![
                PathBuf::from("collections/site.json"),
                PathBuf::from("collections/site/posts.json"),
            ]
        );
        assert_eq!(summary.items, vec![PathBuf::from("items/site/posts/hi.json")]);

        let item = read_json(&tmp.path().join("items/site/posts/hi.json"));
        assert_eq!(item["data"]["id"], json!("site/posts/hi"));
        assert_eq!(item["data"]["attributes"]["body"], json!("Body"));

        let root = read_json(&tmp.path().join("collections/site.json"));
        assert_eq!(root["data"]["relationships"].get("parent"), None);

        let index = read_json(&tmp.path().join(INDEX_FILENAME));
        assert_eq!(index["data"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn compact_output_is_single_line() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = Context::new("site").unwrap();
        ctx.parse("x", &ParseOptions::new("site/a")).unwrap();

        export(&ctx, tmp.path(), false).unwrap();
        let text = fs::read_to_string(tmp.path().join("items/site/a.json")).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
