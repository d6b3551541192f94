//! JSON:API serialization of the content graph.
//!
//! One [`SerializerConfig`] per entity kind names the wire type, which content
//! attributes to emit and which relationships to link. Relationships are
//! linkage-only (`{type, id}`); names listed in `embed` additionally put the
//! related resources (attributes only) into the top-level `included` array.
//!
//! Two type strategies:
//!
//! - [`TypeStrategy::Fixed`]: every item is `hyde/items`, every collection is
//!   `hyde/collections` (or the configured `type_name`).
//! - [`TypeStrategy::Declared`]: the document's own `type` string wins. The
//!   document's top-level keys become the attributes, and `parent`, `children`
//!   and `tags` linkages are injected from the graph. `children` skips
//!   entities without a parsed document. A `relationships` mapping
//!   in the document adds further linkages by identifier:
//!
//! ```yaml
//! type: blog/post
//! title: Hello
//! relationships:
//!   author: site/people/ada
//!   related: [site/posts/a, site/posts/b]
//! ```
//!
//! [`Serializers::serialize`] materializes every configured relationship, with
//! `null` and `[]` placeholders. [`Serializers::serialize_without_blank_rels`]
//! prunes those placeholders and any envelope left empty; it is what
//! [`Context::serialize`] uses.

use crate::context::Context;
use crate::jsonapi::{JsonApiDocument, PrimaryData, Relationship, Resource, ResourceIdentifier};
use crate::model::{Content, ModelError, ModelKind, ModelRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

pub const ITEM_TYPE: &str = "hyde/items";
pub const COLLECTION_TYPE: &str = "hyde/collections";

/// Content attributes a serializer may emit.
pub const ATTRIBUTE_NAMES: &[&str] = &["ext", "document", "body"];
pub const ITEM_RELATIONSHIPS: &[&str] = &["parent", "tags"];
pub const COLLECTION_RELATIONSHIPS: &[&str] = &["parent", "collections", "items"];

/// Relationships injected from the graph in declared mode.
pub const DECLARED_RELATIONSHIPS: &[&str] = &["parent", "children", "tags"];

/// Document keys that are never emitted as attributes in declared mode.
const RESERVED_KEYS: &[&str] = &["type", "relationships"];

/// How the wire `type` of a resource is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeStrategy {
    /// By entity kind.
    #[default]
    Fixed,
    /// By the document's `type` key, falling back to the kind's type.
    Declared,
}

/// Serialization settings for one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerializerConfig {
    pub type_name: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<String>,
    /// Relationships whose targets are also emitted under `included`.
    #[serde(default)]
    pub embed: Vec<String>,
}

impl SerializerConfig {
    pub fn item() -> Self {
        Self {
            type_name: ITEM_TYPE.to_string(),
            attributes: vec!["document".into(), "body".into()],
            relationships: strings(ITEM_RELATIONSHIPS),
            embed: Vec::new(),
        }
    }

    pub fn collection() -> Self {
        Self {
            type_name: COLLECTION_TYPE.to_string(),
            attributes: vec!["document".into(), "body".into()],
            relationships: strings(COLLECTION_RELATIONSHIPS),
            embed: Vec::new(),
        }
    }

    /// Relationship names valid for `kind` in fixed mode.
    pub fn known_relationships(kind: ModelKind) -> &'static [&'static str] {
        match kind {
            ModelKind::Item => ITEM_RELATIONSHIPS,
            ModelKind::Collection => COLLECTION_RELATIONSHIPS,
        }
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// The serializer pair of a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Serializers {
    pub types: TypeStrategy,
    pub item: SerializerConfig,
    pub collection: SerializerConfig,
}

impl Default for Serializers {
    fn default() -> Self {
        Self {
            types: TypeStrategy::Fixed,
            item: SerializerConfig::item(),
            collection: SerializerConfig::collection(),
        }
    }
}

/// Related entities before they are turned into linkage.
enum Related {
    One(Option<ModelRef>),
    Many(Vec<ModelRef>),
}

impl Related {
    fn models(&self) -> Vec<ModelRef> {
        match self {
            Related::One(one) => one.iter().copied().collect(),
            Related::Many(many) => many.clone(),
        }
    }
}

fn unknown(model: ModelRef) -> ModelError {
    ModelError::InvalidArgument(format!("model {model:?} is not part of this context"))
}

impl Serializers {
    pub fn config_for(&self, kind: ModelKind) -> &SerializerConfig {
        match kind {
            ModelKind::Item => &self.item,
            ModelKind::Collection => &self.collection,
        }
    }

    /// Wire type of `model`.
    pub fn type_for(&self, ctx: &Context, model: ModelRef) -> String {
        let configured = &self.config_for(model.kind()).type_name;
        if self.types == TypeStrategy::Declared {
            let declared = ctx
                .graph()
                .content(model)
                .and_then(|c| c.document.as_ref())
                .and_then(|d| d.get("type"))
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty());
            if let Some(declared) = declared {
                return declared.to_string();
            }
        }
        configured.clone()
    }

    pub fn identifier_for(&self, ctx: &Context, model: ModelRef) -> Result<ResourceIdentifier, ModelError> {
        let id = ctx.identifier(model).ok_or_else(|| unknown(model))?;
        Ok(ResourceIdentifier {
            kind: self.type_for(ctx, model),
            id: id.to_string(),
        })
    }

    /// Serialize one entity with every configured relationship present.
    pub fn serialize(&self, ctx: &Context, model: ModelRef) -> Result<JsonApiDocument, ModelError> {
        let (resource, embedded) = self.primary_resource(ctx, model)?;
        let included = self.included(ctx, &embedded, &[model])?;
        Ok(JsonApiDocument {
            data: PrimaryData::One(resource),
            included,
        })
    }

    /// Serialize several entities into one document with a `data` list.
    pub fn serialize_many(&self, ctx: &Context, models: &[ModelRef]) -> Result<JsonApiDocument, ModelError> {
        let mut resources = Vec::with_capacity(models.len());
        let mut embedded = Vec::new();
        for &model in models {
            let (resource, related) = self.primary_resource(ctx, model)?;
            resources.push(resource);
            embedded.extend(related);
        }
        let included = self.included(ctx, &embedded, models)?;
        Ok(JsonApiDocument {
            data: PrimaryData::Many(resources),
            included,
        })
    }

    /// Like [`serialize`](Self::serialize), minus relationships whose data is
    /// `null` or `[]`.
    pub fn serialize_without_blank_rels(
        &self,
        ctx: &Context,
        model: ModelRef,
    ) -> Result<JsonApiDocument, ModelError> {
        let mut document = self.serialize(ctx, model)?;
        document.prune();
        Ok(document)
    }

    pub fn serialize_many_without_blank_rels(
        &self,
        ctx: &Context,
        models: &[ModelRef],
    ) -> Result<JsonApiDocument, ModelError> {
        let mut document = self.serialize_many(ctx, models)?;
        document.prune();
        Ok(document)
    }

    /// Build the primary resource and collect the targets of embedded relationships.
    fn primary_resource(&self, ctx: &Context, model: ModelRef) -> Result<(Resource, Vec<ModelRef>), ModelError> {
        let config = self.config_for(model.kind());
        let related = self.related(ctx, model)?;

        let mut embedded = Vec::new();
        let mut relationships = IndexMap::with_capacity(related.len());
        for (name, targets) in related {
            if config.embed.contains(&name) {
                embedded.extend(targets.models());
            }
            let relationship = match targets {
                Related::One(one) => {
                    Relationship::one(one.map(|m| self.identifier_for(ctx, m)).transpose()?)
                }
                Related::Many(many) => Relationship::many(
                    many.into_iter()
                        .map(|m| self.identifier_for(ctx, m))
                        .collect::<Result<_, _>>()?,
                ),
            };
            relationships.insert(name, relationship);
        }

        let resource = Resource {
            kind: self.type_for(ctx, model),
            id: ctx.identifier(model).ok_or_else(|| unknown(model))?.to_string(),
            attributes: Some(self.attributes(ctx, model)?),
            relationships: Some(relationships),
        };
        Ok((resource, embedded))
    }

    /// Attribute-only resources for `embedded`, skipping primary entities and repeats.
    fn included(
        &self,
        ctx: &Context,
        embedded: &[ModelRef],
        primary: &[ModelRef],
    ) -> Result<Vec<Resource>, ModelError> {
        let mut seen: HashSet<ModelRef> = primary.iter().copied().collect();
        let mut included = Vec::new();
        for &model in embedded {
            if !seen.insert(model) {
                continue;
            }
            included.push(Resource {
                kind: self.type_for(ctx, model),
                id: ctx.identifier(model).ok_or_else(|| unknown(model))?.to_string(),
                attributes: Some(self.attributes(ctx, model)?),
                relationships: None,
            });
        }
        Ok(included)
    }

    fn attributes(&self, ctx: &Context, model: ModelRef) -> Result<Map<String, Value>, ModelError> {
        let content = ctx.graph().content(model).ok_or_else(|| unknown(model))?;
        let config = self.config_for(model.kind());
        let mut attributes = Map::new();

        if self.types == TypeStrategy::Declared {
            if let Some(document) = &content.document {
                for (key, value) in document {
                    if !RESERVED_KEYS.contains(&key.as_str()) {
                        attributes.insert(key.clone(), value.clone());
                    }
                }
            }
            for name in &config.attributes {
                if name == "document" || attributes.contains_key(name) {
                    continue;
                }
                if let Some(value) = content_attribute(content, name) {
                    attributes.insert(name.clone(), value);
                }
            }
            return Ok(attributes);
        }

        for name in &config.attributes {
            if let Some(value) = content_attribute(content, name) {
                attributes.insert(name.clone(), value);
            }
        }
        Ok(attributes)
    }

    fn related(&self, ctx: &Context, model: ModelRef) -> Result<IndexMap<String, Related>, ModelError> {
        let graph = ctx.graph();
        let mut related = IndexMap::new();

        match self.types {
            TypeStrategy::Fixed => {
                let config = self.config_for(model.kind());
                for name in &config.relationships {
                    if let Some(targets) = graph_relationship(ctx, model, name)? {
                        related.insert(name.clone(), targets);
                    }
                }
            }
            TypeStrategy::Declared => {
                for name in DECLARED_RELATIONSHIPS {
                    if let Some(targets) = graph_relationship(ctx, model, name)? {
                        related.insert(name.to_string(), targets);
                    }
                }
                let declared = graph
                    .content(model)
                    .and_then(|c| c.document.as_ref())
                    .and_then(|d| d.get("relationships"));
                if let Some(declared) = declared {
                    self.declared_relationships(ctx, model, declared, &mut related);
                }
            }
        }
        Ok(related)
    }

    /// Resolve a document's `relationships` mapping through the registry.
    fn declared_relationships(
        &self,
        ctx: &Context,
        model: ModelRef,
        declared: &Value,
        related: &mut IndexMap<String, Related>,
    ) {
        let owner = ctx.identifier(model).unwrap_or_default();
        let Some(declared) = declared.as_object() else {
            warn!(id = owner, "ignoring 'relationships' that is not a mapping");
            return;
        };

        let resolve = |target: &str| {
            let found = ctx.find(target);
            if found.is_none() {
                warn!(id = owner, target_id = target, "declared relationship target not found");
            }
            found
        };

        for (name, value) in declared {
            if related.contains_key(name) {
                warn!(id = owner, relationship = name.as_str(), "declared relationship shadows a graph relationship");
                continue;
            }
            let targets = match value {
                Value::String(target) => Related::One(resolve(target)),
                Value::Array(targets) => Related::Many(
                    targets
                        .iter()
                        .filter_map(Value::as_str)
                        .filter_map(|target| resolve(target))
                        .collect(),
                ),
                Value::Null => Related::One(None),
                other => {
                    warn!(id = owner, relationship = name.as_str(), value = %other, "ignoring declared relationship that is not an identifier");
                    continue;
                }
            };
            related.insert(name.clone(), targets);
        }
    }
}

fn content_attribute(content: &Content, name: &str) -> Option<Value> {
    match name {
        "ext" => content.ext.clone().map(Value::String),
        "document" => content.document.clone().map(Value::Object),
        "body" => content.body.clone().map(Value::String),
        _ => None,
    }
}

/// A relationship read straight from the graph. `None` when `name` does not
/// apply to the model's kind.
fn graph_relationship(ctx: &Context, model: ModelRef, name: &str) -> Result<Option<Related>, ModelError> {
    let graph = ctx.graph();
    let related = match (model, name) {
        (_, "parent") => Related::One(graph.parent_of(model).map(ModelRef::Collection)),
        (ModelRef::Item(id), "tags") => {
            let item = graph.item(id).ok_or_else(|| unknown(model))?;
            Related::Many(item.tags().iter().copied().map(ModelRef::Collection).collect())
        }
        (ModelRef::Collection(_), "tags") => Related::Many(Vec::new()),
        (ModelRef::Collection(id), "collections") => {
            let collection = graph.collection(id).ok_or_else(|| unknown(model))?;
            Related::Many(collection.collections().iter().copied().map(ModelRef::Collection).collect())
        }
        (ModelRef::Collection(id), "items") => {
            let collection = graph.collection(id).ok_or_else(|| unknown(model))?;
            Related::Many(collection.items().iter().copied().map(ModelRef::Item).collect())
        }
        (ModelRef::Collection(id), "children") => {
            // Placeholders without a parsed document are structure, not content.
            let collection = graph.collection(id).ok_or_else(|| unknown(model))?;
            let collections = collection
                .collections()
                .iter()
                .copied()
                .filter(|&child| graph.collection(child).is_some_and(|c| c.document().is_some()))
                .map(ModelRef::Collection);
            let items = collection
                .items()
                .iter()
                .copied()
                .filter(|&item| graph.item(item).is_some_and(|i| i.document().is_some()))
                .map(ModelRef::Item);
            Related::Many(collections.chain(items).collect())
        }
        (ModelRef::Item(_), "children") => Related::Many(Vec::new()),
        _ => return Ok(None),
    };
    Ok(Some(related))
}

impl Context {
    /// Serialize one entity with the kind's configured serializer, blank
    /// relationships omitted.
    pub fn serialize(&self, model: ModelRef) -> Result<JsonApiDocument, ModelError> {
        self.serializers().serialize_without_blank_rels(self, model)
    }

    /// Serialize every entity, collections first.
    pub fn serialize_all(&self) -> Result<JsonApiDocument, ModelError> {
        self.serializers()
            .serialize_many_without_blank_rels(self, &self.models())
    }
}
