//! Items, collections, and the arena that owns them.
//!
//! The content graph has exactly two entity kinds:
//!
//! - [`Item`]: a single content file. Belongs to at most one parent
//!   [`Collection`] and carries an ordered set of tag collections.
//! - [`Collection`]: a hierarchy node. Holds child collections and member
//!   items. Member items arrive both through hierarchy (`posts/hello` lives in
//!   `posts`) and through tagging (`tags/rust` lists every item tagged `rust`).
//!
//! ## Ownership
//!
//! Every entity lives in a [`Graph`] arena and is addressed by a typed index
//! ([`ItemId`], [`CollectionId`]). Relationship fields store those indices, never
//! owned values, so the graph can hold back-references (child → parent,
//! tag → item) without reference counting.
//!
//! ## Two-sided relationships
//!
//! Relationship fields are private. The only way to change them is through the
//! setters on [`Graph`], which update both sides in one call:
//!
//! ```text
//! set_item_parent(x, Some(q))      p.items -= x;  q.items += x;  x.parent = q
//! set_collection_parent(c, Some(q)) p.collections -= c;  q.collections += c;  c.parent = q
//! set_item_tags(x, [c])            a.items -= x;  b.items -= x;  c.items += x;  x.tags = [c]
//! ```
//!
//! Setters validate every argument before touching the graph, so a rejected
//! call leaves all lists exactly as they were.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Parsed front matter: an ordered key → value mapping.
pub type Document = Map<String, Value>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Duplicate {kind} identifier: {id}")]
    DuplicateIdentifier { kind: ModelKind, id: String },
}

/// The two entity kinds of the content graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Item,
    Collection,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Item => f.write_str("item"),
            ModelKind::Collection => f.write_str("collection"),
        }
    }
}

/// Index of an [`Item`] inside its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(usize);

/// Index of a [`Collection`] inside its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(usize);

impl ItemId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl CollectionId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Reference to either entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelRef {
    Item(ItemId),
    Collection(CollectionId),
}

impl ModelRef {
    pub fn kind(self) -> ModelKind {
        match self {
            ModelRef::Item(_) => ModelKind::Item,
            ModelRef::Collection(_) => ModelKind::Collection,
        }
    }

    pub fn as_item(self) -> Option<ItemId> {
        match self {
            ModelRef::Item(id) => Some(id),
            ModelRef::Collection(_) => None,
        }
    }

    pub fn as_collection(self) -> Option<CollectionId> {
        match self {
            ModelRef::Collection(id) => Some(id),
            ModelRef::Item(_) => None,
        }
    }
}

impl From<ItemId> for ModelRef {
    fn from(id: ItemId) -> Self {
        ModelRef::Item(id)
    }
}

impl From<CollectionId> for ModelRef {
    fn from(id: CollectionId) -> Self {
        ModelRef::Collection(id)
    }
}

/// Content-bearing attributes shared by both kinds.
///
/// Collections usually leave these empty; they are filled when a content file
/// targets an identifier that already exists as a placeholder collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    /// File extension without the leading dot (`md`, `yaml`).
    pub ext: Option<String>,
    /// Decoded front matter.
    pub document: Option<Document>,
    /// Text after the front matter, trimmed.
    pub body: Option<String>,
}

impl Content {
    pub fn is_empty(&self) -> bool {
        self.ext.is_none() && self.document.is_none() && self.body.is_none()
    }
}

/// A single piece of content.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: String,
    content: Content,
    parent: Option<CollectionId>,
    tags: Vec<CollectionId>,
}

impl Item {
    /// Create a detached item. Relationships are wired once it is in a graph.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_content(id, Content::default())
    }

    pub fn with_content(id: impl Into<String>, content: Content) -> Self {
        Self {
            id: id.into(),
            content,
            parent: None,
            tags: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut Content {
        &mut self.content
    }

    pub fn ext(&self) -> Option<&str> {
        self.content.ext.as_deref()
    }

    pub fn document(&self) -> Option<&Document> {
        self.content.document.as_ref()
    }

    pub fn body(&self) -> Option<&str> {
        self.content.body.as_deref()
    }

    pub fn parent(&self) -> Option<CollectionId> {
        self.parent
    }

    pub fn tags(&self) -> &[CollectionId] {
        &self.tags
    }
}

/// A hierarchy node holding child collections and member items.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    id: String,
    content: Content,
    parent: Option<CollectionId>,
    collections: Vec<CollectionId>,
    items: Vec<ItemId>,
}

impl Collection {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Content::default(),
            parent: None,
            collections: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut Content {
        &mut self.content
    }

    pub fn document(&self) -> Option<&Document> {
        self.content.document.as_ref()
    }

    pub fn parent(&self) -> Option<CollectionId> {
        self.parent
    }

    pub fn collections(&self) -> &[CollectionId] {
        &self.collections
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }
}

/// An owned entity of either kind, used when handing a new entity to the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    Item(Item),
    Collection(Collection),
}

impl Model {
    pub fn id(&self) -> &str {
        match self {
            Model::Item(item) => item.id(),
            Model::Collection(collection) => collection.id(),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Model::Item(_) => ModelKind::Item,
            Model::Collection(_) => ModelKind::Collection,
        }
    }
}

/// Arena owning every item and collection of one context.
#[derive(Debug, Default)]
pub struct Graph {
    items: Vec<Item>,
    collections: Vec<Collection>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move an item into the arena. Any relationships it carried are dropped;
    /// they only become real through the setters.
    pub(crate) fn push_item(&mut self, mut item: Item) -> ItemId {
        item.parent = None;
        item.tags.clear();
        self.items.push(item);
        ItemId(self.items.len() - 1)
    }

    pub(crate) fn push_collection(&mut self, mut collection: Collection) -> CollectionId {
        collection.parent = None;
        collection.collections.clear();
        collection.items.clear();
        self.collections.push(collection);
        CollectionId(self.collections.len() - 1)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.0)
    }

    pub fn collection(&self, id: CollectionId) -> Option<&Collection> {
        self.collections.get(id.0)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(id.0)
    }

    pub fn collection_mut(&mut self, id: CollectionId) -> Option<&mut Collection> {
        self.collections.get_mut(id.0)
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        (0..self.items.len()).map(ItemId)
    }

    pub fn collection_ids(&self) -> impl Iterator<Item = CollectionId> + '_ {
        (0..self.collections.len()).map(CollectionId)
    }

    /// Identifier of either kind.
    pub fn identifier(&self, model: ModelRef) -> Option<&str> {
        match model {
            ModelRef::Item(id) => self.item(id).map(Item::id),
            ModelRef::Collection(id) => self.collection(id).map(Collection::id),
        }
    }

    /// Content attributes of either kind.
    pub fn content(&self, model: ModelRef) -> Option<&Content> {
        match model {
            ModelRef::Item(id) => self.item(id).map(Item::content),
            ModelRef::Collection(id) => self.collection(id).map(Collection::content),
        }
    }

    pub fn content_mut(&mut self, model: ModelRef) -> Option<&mut Content> {
        match model {
            ModelRef::Item(id) => self.item_mut(id).map(Item::content_mut),
            ModelRef::Collection(id) => self.collection_mut(id).map(Collection::content_mut),
        }
    }

    pub fn parent_of(&self, model: ModelRef) -> Option<CollectionId> {
        match model {
            ModelRef::Item(id) => self.item(id).and_then(Item::parent),
            ModelRef::Collection(id) => self.collection(id).and_then(Collection::parent),
        }
    }

    /// Move an item under `parent`, or detach it with `None`.
    pub fn set_item_parent(
        &mut self,
        item: ItemId,
        parent: Option<CollectionId>,
    ) -> Result<(), ModelError> {
        self.check_item(item)?;
        if let Some(parent) = parent {
            self.check_collection(parent)?;
        }

        // A collection's items holds children and tagged items alike; a
        // membership still backed by a tag survives the move.
        if let Some(previous) = self.items[item.0].parent {
            if !self.items[item.0].tags.contains(&previous) {
                detach(&mut self.collections[previous.0].items, item);
            }
        }
        if let Some(parent) = parent {
            attach(&mut self.collections[parent.0].items, item);
        }
        self.items[item.0].parent = parent;
        Ok(())
    }

    /// Move a collection under `parent`, or detach it with `None`.
    ///
    /// Rejects parents that would close a cycle (the collection itself or
    /// one of its descendants).
    pub fn set_collection_parent(
        &mut self,
        collection: CollectionId,
        parent: Option<CollectionId>,
    ) -> Result<(), ModelError> {
        self.check_collection(collection)?;
        if let Some(parent) = parent {
            self.check_collection(parent)?;
            let mut cursor = Some(parent);
            while let Some(ancestor) = cursor {
                if ancestor == collection {
                    return Err(ModelError::InvalidArgument(format!(
                        "collection '{}' cannot be nested under '{}'",
                        self.collections[collection.0].id, self.collections[parent.0].id
                    )));
                }
                cursor = self.collections[ancestor.0].parent;
            }
        }

        if let Some(previous) = self.collections[collection.0].parent {
            detach(&mut self.collections[previous.0].collections, collection);
        }
        if let Some(parent) = parent {
            attach(&mut self.collections[parent.0].collections, collection);
        }
        self.collections[collection.0].parent = parent;
        Ok(())
    }

    /// Replace an item's tag set.
    ///
    /// Every element must reference a collection of this graph. The new set
    /// fully replaces the old one; repeated tags collapse to their first
    /// occurrence.
    pub fn set_item_tags<I>(&mut self, item: ItemId, tags: I) -> Result<(), ModelError>
    where
        I: IntoIterator,
        I::Item: Into<ModelRef>,
    {
        self.check_item(item)?;

        let mut next: Vec<CollectionId> = Vec::new();
        for tag in tags {
            match tag.into() {
                ModelRef::Collection(collection) => {
                    self.check_collection(collection)?;
                    attach(&mut next, collection);
                }
                ModelRef::Item(other) => {
                    let name = self
                        .item(other)
                        .map(|i| i.id.clone())
                        .unwrap_or_else(|| format!("#{}", other.0));
                    return Err(ModelError::InvalidArgument(format!(
                        "tags must be collections, got item '{name}'"
                    )));
                }
            }
        }

        let previous = std::mem::take(&mut self.items[item.0].tags);
        let parent = self.items[item.0].parent;
        for tag in previous {
            if Some(tag) != parent {
                detach(&mut self.collections[tag.0].items, item);
            }
        }
        for &tag in &next {
            attach(&mut self.collections[tag.0].items, item);
        }
        self.items[item.0].tags = next;
        Ok(())
    }

    fn check_item(&self, id: ItemId) -> Result<(), ModelError> {
        if id.0 < self.items.len() {
            Ok(())
        } else {
            Err(ModelError::InvalidArgument(format!(
                "unknown item #{}",
                id.0
            )))
        }
    }

    fn check_collection(&self, id: CollectionId) -> Result<(), ModelError> {
        if id.0 < self.collections.len() {
            Ok(())
        } else {
            Err(ModelError::InvalidArgument(format!(
                "unknown collection #{}",
                id.0
            )))
        }
    }
}

fn attach<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn detach<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if let Some(pos) = list.iter().position(|v| *v == value) {
        list.remove(pos);
    }
}
