//! Content file parsing.
//!
//! Turns raw text into [`Content`] (extension, front matter document, body) and,
//! given a [`Context`], into a registered entity with its parent and tags wired.
//!
//! ## File format
//!
//! ```text
//! ---                      ← opening delimiter, first line after trimming
//! title: Hello
//! tags: [rust, web]        ← resolved to <context>/tags/rust, <context>/tags/web
//! ---                      ← closing delimiter
//! Body text, trimmed.
//! ```
//!
//! Files with a `yml`/`yaml` extension are YAML-only: the whole text is the
//! document and there is no body. Text without an opening delimiter is all body.

use crate::context::Context;
use crate::hierarchy::{identifier_from_path, join_identifier, validate_identifier};
use crate::merge::Attributes;
use crate::model::{CollectionId, Content, Document, Item, ModelError, ModelRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const DELIMITER: &str = "---";
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mbs"];
const YAML_EXTENSIONS: &[&str] = &["yml", "yaml"];

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Front matter opened with '---' but never closed")]
    UnterminatedFrontMatter,
    #[error("Front matter must be a mapping, got {0}")]
    NotAMapping(&'static str),
    #[error("Front matter keys must be scalars, got {0}")]
    UnsupportedKey(String),
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Which file extensions `parse_file` accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Markdown only: `md`, `markdown`, `mbs`.
    #[default]
    Markdown,
    /// Markdown plus YAML data files (`yml`, `yaml`).
    Content,
}

impl ParseMode {
    /// Whether files with `ext` (no leading dot, any case) are parsed.
    pub fn permits(self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        let ext = ext.as_str();
        match self {
            ParseMode::Markdown => MARKDOWN_EXTENSIONS.contains(&ext),
            ParseMode::Content => {
                MARKDOWN_EXTENSIONS.contains(&ext) || YAML_EXTENSIONS.contains(&ext)
            }
        }
    }
}

/// Options for parsing text that did not come from a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub id: String,
    pub ext: Option<String>,
}

impl ParseOptions {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ext: None,
        }
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = Some(ext.into());
        self
    }
}

/// Options for [`Context::parse_file`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// Explicit identifier. Derived from the path when absent.
    pub id: Option<String>,
    /// Prefix stripped from the path before deriving the identifier.
    pub input_root: Option<PathBuf>,
}

/// Whether `ext` selects the YAML-only path. Anything else, including no
/// extension at all, is treated as markdown with optional front matter.
fn is_yaml_extension(ext: Option<&str>) -> bool {
    ext.is_some_and(|ext| YAML_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Split trimmed text into `(front matter, body)`.
///
/// Both delimiters must sit on a line of their own; trailing whitespace on the
/// delimiter line is ignored. The body is returned trimmed.
pub fn split_front_matter(text: &str) -> Result<(Option<&str>, &str), ParseError> {
    let text = text.trim_start_matches('\u{feff}').trim();

    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok((None, text));
    };
    if first.trim_end() != DELIMITER {
        return Ok((None, text));
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            let yaml = &text[yaml_start..offset];
            let body = text[offset + line.len()..].trim();
            return Ok((Some(yaml), body));
        }
        offset += line.len();
    }
    Err(ParseError::UnterminatedFrontMatter)
}

/// Decode a YAML mapping into a JSON-compatible document.
///
/// Empty input and YAML `null` decode to `None`.
pub fn decode_yaml(yaml: &str) -> Result<Option<Document>, ParseError> {
    if yaml.trim().is_empty() {
        return Ok(None);
    }
    let mut raw: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    raw.apply_merge()?;
    match yaml_to_json(raw)? {
        Value::Object(document) => Ok(Some(document)),
        Value::Null => Ok(None),
        Value::Bool(_) => Err(ParseError::NotAMapping("a boolean")),
        Value::Number(_) => Err(ParseError::NotAMapping("a number")),
        Value::String(_) => Err(ParseError::NotAMapping("a string")),
        Value::Array(_) => Err(ParseError::NotAMapping("a sequence")),
    }
}

/// Convert a YAML value into JSON. Scalar mapping keys become their text
/// form (`2024` → `"2024"`). YAML type tags (`!foo`) are dropped and
/// non-finite floats become `null`.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, ParseError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => yaml_number(&n),
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut document = Document::new();
            for (key, value) in mapping {
                document.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(document)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::from(i)
    } else if let Some(u) = n.as_u64() {
        Value::from(u)
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number)
    }
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, ParseError> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        other @ (Yaml::Sequence(_) | Yaml::Mapping(_)) => Err(ParseError::UnsupportedKey(
            serde_yaml::to_string(&other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        )),
    }
}

/// Parse raw text into content attributes. `ext` is stored without a leading dot.
pub fn parse(text: &str, ext: Option<&str>) -> Result<Content, ParseError> {
    let ext = ext.map(|e| e.trim_start_matches('.').to_string());

    if is_yaml_extension(ext.as_deref()) {
        return Ok(Content {
            document: decode_yaml(text)?,
            ext,
            body: None,
        });
    }

    let (yaml, body) = split_front_matter(text)?;
    let document = match yaml {
        Some(yaml) => decode_yaml(yaml)?,
        None => None,
    };
    Ok(Content {
        ext,
        document,
        body: (!body.is_empty()).then(|| body.to_string()),
    })
}

/// Parse text into a detached item. `tags` stays inside the document.
pub fn parse_item(text: &str, options: &ParseOptions) -> Result<Item, ParseError> {
    validate_identifier(&options.id)?;
    let content = parse(text, options.ext.as_deref())?;
    Ok(Item::with_content(options.id.clone(), content))
}

/// Read and parse a file into a detached item.
///
/// Returns `Ok(None)` without reading when `mode` does not permit the extension.
pub fn parse_file(
    path: &Path,
    options: &FileOptions,
    mode: ParseMode,
) -> Result<Option<Item>, ParseError> {
    let Some(ext) = permitted_extension(path, mode) else {
        return Ok(None);
    };
    let id = match &options.id {
        Some(id) => id.clone(),
        None => identifier_from_path(path, options.input_root.as_deref())?,
    };
    let text = fs::read_to_string(path)?;
    parse_item(&text, &ParseOptions { id, ext: Some(ext) }).map(Some)
}

fn permitted_extension(path: &Path, mode: ParseMode) -> Option<String> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if mode.permits(ext) {
        Some(ext.to_string())
    } else {
        debug!(path = %path.display(), ext, "skipping file with unsupported extension");
        None
    }
}

/// Remove the `tags` list from a document and return its values as strings.
///
/// A `tags` key holding anything other than a sequence is left in place.
pub fn take_tags(document: &mut Document) -> Result<Option<Vec<String>>, ParseError> {
    if !document.get("tags").is_some_and(Value::is_array) {
        return Ok(None);
    }
    let Some(Value::Array(values)) = document.shift_remove("tags") else {
        return Ok(None);
    };

    values
        .into_iter()
        .map(|value| {
            let tag = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => return Err(ParseError::InvalidTag(other.to_string())),
            };
            if tag.split('/').all(|segment| segment.trim().is_empty()) {
                return Err(ParseError::InvalidTag(format!("{tag:?}")));
            }
            Ok(tag)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

impl Context {
    /// Identifier of the collection that collects everything tagged `tag`.
    pub fn tag_identifier(&self, tag: &str) -> String {
        join_identifier([self.name(), "tags", tag])
    }

    /// Parse text and register it under `options.id`.
    ///
    /// Tags are resolved to `<name>/tags/<tag>` collections (created on demand)
    /// and removed from the document. An existing entity with the same
    /// identifier absorbs the parsed attributes instead of being replaced.
    pub fn parse(&mut self, text: &str, options: &ParseOptions) -> Result<ModelRef, ParseError> {
        validate_identifier(&options.id)?;
        let mut content = parse(text, options.ext.as_deref())?;

        let tags = match content.document.as_mut() {
            Some(document) => take_tags(document)?,
            None => None,
        };
        let tags = match tags {
            Some(tags) => Some(self.resolve_tags(&tags)?),
            None => None,
        };

        Ok(self.find_or_create_with(&options.id, Attributes { content, tags })?)
    }

    /// Read and parse a file.
    ///
    /// Returns `Ok(None)` without reading when the context's mode does not
    /// permit the extension. Without an explicit id, the identifier is the
    /// path relative to `input_root`, extension removed, under the context name.
    pub fn parse_file(
        &mut self,
        path: &Path,
        options: &FileOptions,
    ) -> Result<Option<ModelRef>, ParseError> {
        let Some(ext) = permitted_extension(path, self.mode()) else {
            return Ok(None);
        };
        let id = match &options.id {
            Some(id) => id.clone(),
            None => join_identifier([
                self.name().to_string(),
                identifier_from_path(path, options.input_root.as_deref())?,
            ]),
        };
        let text = fs::read_to_string(path)?;
        debug!(path = %path.display(), id = %id, "parsing file");
        self.parse(&text, &ParseOptions { id, ext: Some(ext) })
            .map(Some)
    }

    fn resolve_tags(&mut self, tags: &[String]) -> Result<Vec<CollectionId>, ModelError> {
        tags.iter()
            .map(|tag| {
                let id = self.tag_identifier(tag);
                self.resolve_or_create_ancestor(&id)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn document_of(content: &Content) -> Value {
        content
            .document
            .clone()
            .map(Value::Object)
            .unwrap_or(Value::Null)
    }

    // =========================================================================
    // Front matter
    // =========================================================================

    #[test]
    fn splits_front_matter_from_body() {
        let (yaml, body) = split_front_matter("---\ntitle: A\n---\nHello\n").unwrap();
        assert_eq!(yaml, Some("title: A\n"));
        assert_eq!(body, "Hello");
    }

    #[test]
    fn no_delimiter_means_all_body() {
        let content = parse("  Just text.\n\n", Some("md")).unwrap();
        assert_eq!(content.body.as_deref(), Some("Just text."));
        assert_eq!(content.document, None);
    }

    #[test]
    fn delimiter_must_be_whole_line() {
        let (yaml, body) = split_front_matter("----\nnot yaml").unwrap();
        assert_eq!(yaml, None);
        assert_eq!(body, "----\nnot yaml");
    }

    #[test]
    fn tolerates_trailing_spaces_and_crlf() {
        let (yaml, body) = split_front_matter("--- \r\na: 1\r\n---\r\nBody").unwrap();
        assert_eq!(yaml, Some("a: 1\r\n"));
        assert_eq!(body, "Body");
    }

    #[test]
    fn unterminated_front_matter_is_an_error() {
        let err = parse("---\ntitle: A\nno closing", Some("md")).unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedFrontMatter));
    }

    #[test]
    fn empty_front_matter_has_no_document() {
        let content = parse("---\n---\nBody", Some("md")).unwrap();
        assert_eq!(content.document, None);
        assert_eq!(content.body.as_deref(), Some("Body"));
    }

    #[test]
    fn front_matter_only_has_no_body() {
        let content = parse("---\na: 1\n---\n", Some("md")).unwrap();
        assert_eq!(document_of(&content), json!({"a": 1}));
        assert_eq!(content.body, None);
    }

    #[test]
    fn non_mapping_front_matter_is_rejected() {
        let err = parse("---\n- a\n- b\n---\nx", Some("md")).unwrap_err();
        assert!(matches!(err, ParseError::NotAMapping("a sequence")));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = parse("---\ntitle: [unclosed\n---\nx", Some("md")).unwrap_err();
        assert!(matches!(err, ParseError::Yaml(_)));
    }

    #[test]
    fn document_keeps_key_order() {
        let content = parse("---\nzeta: 1\nalpha: 2\nmid: 3\n---\n", Some("md")).unwrap();
        let keys: Vec<_> = content.document.unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn scalar_keys_become_strings() {
        let content = parse("---\n2024: best\ntrue: yes\n1.5: half\ntitle: x\n---\nb", Some("md")).unwrap();
        assert_eq!(
            document_of(&content),
            json!({"2024": "best", "true": "yes", "1.5": "half", "title": "x"})
        );
        assert_eq!(content.body.as_deref(), Some("b"));
    }

    #[test]
    fn nested_scalar_keys_become_strings() {
        let content = parse("---\nyears:\n  2023: [1, 2]\n---\n", Some("md")).unwrap();
        assert_eq!(document_of(&content), json!({"years": {"2023": [1, 2]}}));
    }

    #[test]
    fn compound_keys_are_rejected() {
        let err = parse("---\n? [a, b]\n: pair\n---\n", Some("md")).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedKey(_)));
    }

    #[test]
    fn merge_keys_are_applied() {
        let content = parse(
            "---\nbase: &base\n  layout: post\npost:\n  <<: *base\n  title: T\n---\n",
            Some("md"),
        )
        .unwrap();
        assert_eq!(document_of(&content)["post"], json!({"layout": "post", "title": "T"}));
    }

    #[test]
    fn yaml_extension_decodes_whole_text() {
        let content = parse("name: Ada\nrole: author\n", Some(".yaml")).unwrap();
        assert_eq!(content.ext.as_deref(), Some("yaml"));
        assert_eq!(document_of(&content), json!({"name": "Ada", "role": "author"}));
        assert_eq!(content.body, None);
    }

    // =========================================================================
    // Modes
    // =========================================================================

    #[test]
    fn markdown_mode_permits_markdown_only() {
        for ext in ["md", "markdown", "mbs", "MD"] {
            assert!(ParseMode::Markdown.permits(ext), "{ext}");
        }
        for ext in ["yml", "yaml", "txt", "jpg", ""] {
            assert!(!ParseMode::Markdown.permits(ext), "{ext}");
        }
    }

    #[test]
    fn content_mode_adds_yaml() {
        assert!(ParseMode::Content.permits("yml"));
        assert!(ParseMode::Content.permits("yaml"));
        assert!(ParseMode::Content.permits("md"));
        assert!(!ParseMode::Content.permits("json"));
    }

    // =========================================================================
    // Detached parsing
    // =========================================================================

    #[test]
    fn detached_item_keeps_tags_in_document() {
        let item = parse_item(
            "---\ntags:\n  - foo\n---\nHello",
            &ParseOptions::new("post").with_ext("md"),
        )
        .unwrap();
        assert_eq!(item.id(), "post");
        assert_eq!(item.body(), Some("Hello"));
        assert_eq!(item.document().unwrap()["tags"], json!(["foo"]));
        assert!(item.tags().is_empty());
    }

    #[test]
    fn detached_parse_file_derives_id_from_path() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("posts");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.md"), "Body").unwrap();

        let item = parse_file(
            &dir.join("a.md"),
            &FileOptions {
                id: None,
                input_root: Some(tmp.path().to_path_buf()),
            },
            ParseMode::Markdown,
        )
        .unwrap()
        .unwrap();
        assert_eq!(item.id(), "posts/a");
        assert_eq!(item.ext(), Some("md"));
    }

    // =========================================================================
    // Tags
    // =========================================================================

    #[test]
    fn take_tags_stringifies_scalars() {
        let mut doc = json!({"tags": ["a", 2, true], "x": 1})
            .as_object()
            .cloned()
            .unwrap();
        let tags = take_tags(&mut doc).unwrap();
        assert_eq!(tags, Some(vec!["a".into(), "2".into(), "true".into()]));
        assert_eq!(Value::Object(doc), json!({"x": 1}));
    }

    #[test]
    fn take_tags_ignores_non_sequence() {
        let mut doc = json!({"tags": "rust"}).as_object().cloned().unwrap();
        assert_eq!(take_tags(&mut doc).unwrap(), None);
        assert_eq!(doc["tags"], json!("rust"));
    }

    #[test]
    fn nested_tag_values_are_rejected() {
        let mut doc = json!({"tags": [{"a": 1}]}).as_object().cloned().unwrap();
        assert!(matches!(take_tags(&mut doc), Err(ParseError::InvalidTag(_))));

        let mut doc = json!({"tags": ["  "]}).as_object().cloned().unwrap();
        assert!(matches!(take_tags(&mut doc), Err(ParseError::InvalidTag(_))));
    }

    // =========================================================================
    // Context parsing
    // =========================================================================

    #[test]
    fn context_parse_resolves_tags() {
        let mut ctx = Context::default();
        let model = ctx
            .parse(
                "---\ntags:\n  - foo\n---\nHello",
                &ParseOptions::new("content/post").with_ext("md"),
            )
            .unwrap();

        let item = ctx.item(model.as_item().unwrap()).unwrap();
        assert_eq!(item.body(), Some("Hello"));
        assert!(!item.document().unwrap().contains_key("tags"));

        let tag_ids: Vec<_> = item
            .tags()
            .iter()
            .map(|t| ctx.collection(*t).unwrap().id())
            .collect();
        assert_eq!(tag_ids, vec!["content/tags/foo"]);

        let foo = ctx.find_collection("content/tags/foo").unwrap();
        assert_eq!(ctx.collection(foo).unwrap().items(), &[model.as_item().unwrap()]);
    }

    #[test]
    fn context_parse_rejects_invalid_id_before_creating_anything() {
        let mut ctx = Context::default();
        let err = ctx
            .parse("---\ntags: [a]\n---\n", &ParseOptions::new("a//b"))
            .unwrap_err();
        assert!(matches!(err, ParseError::Model(ModelError::InvalidArgument(_))));
        assert!(ctx.is_empty());
    }

    #[test]
    fn parse_into_existing_collection_merges() {
        let mut ctx = Context::new("site").unwrap();
        ctx.parse("x", &ParseOptions::new("site/posts/a").with_ext("md"))
            .unwrap();
        let model = ctx
            .parse(
                "---\ntitle: Posts\n---\nIndex",
                &ParseOptions::new("site/posts").with_ext("md"),
            )
            .unwrap();

        assert_eq!(model.kind(), ModelKind::Collection);
        let posts = ctx.collection(model.as_collection().unwrap()).unwrap();
        assert_eq!(posts.document().unwrap()["title"], json!("Posts"));
        assert_eq!(posts.items().len(), 1);
    }

    #[test]
    fn parse_file_namespaces_under_context_name() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("posts/a");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("b.md"), "---\ntitle: B\n---\nBody").unwrap();

        let mut ctx = Context::new("site").unwrap();
        let model = ctx
            .parse_file(
                &dir.join("b.md"),
                &FileOptions {
                    id: None,
                    input_root: Some(tmp.path().to_path_buf()),
                },
            )
            .unwrap()
            .unwrap();

        let item = ctx.item(model.as_item().unwrap()).unwrap();
        assert_eq!(item.id(), "site/posts/a/b");

        let mut chain = Vec::new();
        let mut cursor = item.parent();
        while let Some(id) = cursor {
            let collection = ctx.collection(id).unwrap();
            chain.push(collection.id());
            cursor = collection.parent();
        }
        assert_eq!(chain, vec!["site/posts/a", "site/posts", "site"]);
    }

    #[test]
    fn parse_file_skips_unpermitted_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.yaml");
        fs::write(&path, "a: 1").unwrap();

        let mut ctx = Context::default();
        assert_eq!(ctx.parse_file(&path, &FileOptions::default()).unwrap(), None);
        assert!(ctx.is_empty());

        let mut ctx = Context::default().with_mode(ParseMode::Content);
        let model = ctx
            .parse_file(
                &path,
                &FileOptions {
                    id: Some("content/data".into()),
                    input_root: None,
                },
            )
            .unwrap();
        assert!(model.is_some());
    }

    #[test]
    fn parse_file_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = Context::default();
        let err = ctx
            .parse_file(&tmp.path().join("missing.md"), &FileOptions::default())
            .unwrap_err();
        assert!(matches!(err, ParseError::Io(_)));
    }
}
