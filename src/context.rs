//! The per-run registry of every item and collection.
//!
//! A [`Context`] is one parse session: a name that namespaces every identifier
//! it derives from file paths, the [`Graph`] arena owning all entities, and one
//! identifier index per entity kind. Nothing is global; callers create a context,
//! thread it through parsing, then hand it to the serializer.
//!
//! # Invariants
//! - Identifiers are unique per kind. `track_*` refuses duplicates with
//!   [`ModelError::DuplicateIdentifier`]; [`Context::find_or_create_with`]
//!   merges into the existing entity instead.
//! - An item and a collection may share an identifier (`posts.md` next to
//!   `posts/`), since the partitions are disjoint.
//! - Entities are never removed during a run.

use crate::config::HydeConfig;
use crate::hierarchy::validate_identifier;
use crate::merge::{self, Attributes};
use crate::model::{Collection, CollectionId, Graph, Item, ItemId, Model, ModelError, ModelKind, ModelRef};
use crate::parser::ParseMode;
use crate::serializer::Serializers;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Context name used by [`Context::default`].
pub const DEFAULT_NAME: &str = "content";

#[derive(Debug)]
pub struct Context {
    name: String,
    mode: ParseMode,
    serializers: Serializers,
    graph: Graph,
    items_by_id: HashMap<String, ItemId>,
    collections_by_id: HashMap<String, CollectionId>,
}

impl Default for Context {
    fn default() -> Self {
        Self::unchecked(DEFAULT_NAME.to_string())
    }
}

impl Context {
    /// Create an empty context. The name must itself be a valid identifier.
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self::unchecked(name))
    }

    /// Create a context from a loaded configuration.
    pub fn from_config(config: &HydeConfig) -> Result<Self, ModelError> {
        Ok(Self::new(config.name.clone())?
            .with_mode(config.mode)
            .with_serializers(config.serializer.clone()))
    }

    fn unchecked(name: String) -> Self {
        Self {
            name,
            mode: ParseMode::default(),
            serializers: Serializers::default(),
            graph: Graph::new(),
            items_by_id: HashMap::new(),
            collections_by_id: HashMap::new(),
        }
    }

    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_serializers(mut self, serializers: Serializers) -> Self {
        self.serializers = serializers;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    pub fn serializers(&self) -> &Serializers {
        &self.serializers
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable graph access. Only the relationship setters and content
    /// attributes are reachable from here; identifiers and indexes stay in sync.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn items(&self) -> &[Item] {
        self.graph.items()
    }

    pub fn collections(&self) -> &[Collection] {
        self.graph.collections()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.graph.item(id)
    }

    pub fn collection(&self, id: CollectionId) -> Option<&Collection> {
        self.graph.collection(id)
    }

    pub fn find_item(&self, id: &str) -> Option<ItemId> {
        self.items_by_id.get(id).copied()
    }

    pub fn find_collection(&self, id: &str) -> Option<CollectionId> {
        self.collections_by_id.get(id).copied()
    }

    /// Look up an identifier in either partition, items first.
    pub fn find(&self, id: &str) -> Option<ModelRef> {
        self.find_item(id)
            .map(ModelRef::Item)
            .or_else(|| self.find_collection(id).map(ModelRef::Collection))
    }

    /// Look up an identifier in one partition.
    pub fn find_kind(&self, kind: ModelKind, id: &str) -> Option<ModelRef> {
        match kind {
            ModelKind::Item => self.find_item(id).map(ModelRef::Item),
            ModelKind::Collection => self.find_collection(id).map(ModelRef::Collection),
        }
    }

    pub fn identifier(&self, model: ModelRef) -> Option<&str> {
        self.graph.identifier(model)
    }

    /// Every tracked entity, collections first, each partition in creation order.
    pub fn models(&self) -> Vec<ModelRef> {
        self.graph
            .collection_ids()
            .map(ModelRef::Collection)
            .chain(self.graph.item_ids().map(ModelRef::Item))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items_by_id.len() + self.collections_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a new item.
    pub fn track_item(&mut self, item: Item) -> Result<ItemId, ModelError> {
        validate_identifier(item.id())?;
        if self.items_by_id.contains_key(item.id()) {
            return Err(ModelError::DuplicateIdentifier {
                kind: ModelKind::Item,
                id: item.id().to_string(),
            });
        }
        let key = item.id().to_string();
        let id = self.graph.push_item(item);
        self.items_by_id.insert(key, id);
        Ok(id)
    }

    /// Register a new collection.
    pub fn track_collection(&mut self, collection: Collection) -> Result<CollectionId, ModelError> {
        validate_identifier(collection.id())?;
        if self.collections_by_id.contains_key(collection.id()) {
            return Err(ModelError::DuplicateIdentifier {
                kind: ModelKind::Collection,
                id: collection.id().to_string(),
            });
        }
        let key = collection.id().to_string();
        let id = self.graph.push_collection(collection);
        self.collections_by_id.insert(key, id);
        Ok(id)
    }

    pub fn track_model(&mut self, model: Model) -> Result<ModelRef, ModelError> {
        match model {
            Model::Item(item) => self.track_item(item).map(ModelRef::Item),
            Model::Collection(collection) => self.track_collection(collection).map(ModelRef::Collection),
        }
    }

    /// Return the entity for `id`, or create an item for it together with its
    /// ancestor chain.
    pub fn find_or_create(&mut self, id: &str) -> Result<ModelRef, ModelError> {
        self.find_or_create_with(id, Attributes::default())
    }

    /// Like [`find_or_create`](Self::find_or_create), then apply `attributes`.
    ///
    /// A new item takes the attributes as they are. An existing entity merges
    /// them first-write-wins (see [`crate::merge`]).
    pub fn find_or_create_with(
        &mut self,
        id: &str,
        attributes: Attributes,
    ) -> Result<ModelRef, ModelError> {
        validate_identifier(id)?;

        if let Some(existing) = self.find(id) {
            self.merge_into(existing, attributes)?;
            return Ok(existing);
        }

        let parent = self.resolve_parent(id)?;
        let item = self.track_item(Item::with_content(id, attributes.content))?;
        self.graph.set_item_parent(item, parent)?;
        if let Some(tags) = attributes.tags {
            self.graph.set_item_tags(item, tags)?;
        }
        debug!(id, "created item");
        Ok(ModelRef::Item(item))
    }

    fn merge_into(&mut self, model: ModelRef, attributes: Attributes) -> Result<(), ModelError> {
        let Attributes { content, tags } = attributes;
        let unknown = || ModelError::InvalidArgument(format!("unknown model {model:?}"));

        merge::merge_content(self.graph.content_mut(model).ok_or_else(unknown)?, content);

        match (model, tags) {
            (ModelRef::Item(item), Some(incoming)) => {
                // Lists merge element-wise over the existing length and a
                // reference never replaces another, so the existing tags stand.
                let current = self.graph.item(item).ok_or_else(unknown)?.tags();
                if current != incoming.as_slice() {
                    debug!(
                        id = self.identifier(model),
                        kept = current.len(),
                        ignored = incoming.len(),
                        "kept existing tags while merging"
                    );
                }
            }
            (ModelRef::Collection(_), Some(incoming)) if !incoming.is_empty() => {
                warn!(
                    id = self.identifier(model),
                    count = incoming.len(),
                    "collections cannot carry tags; dropping them"
                );
            }
            _ => {}
        }

        debug!(id = self.identifier(model), "merged attributes into existing entity");
        Ok(())
    }
}
