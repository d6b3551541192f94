//! JSON:API wire types.
//!
//! Only the subset the serializer emits: a top-level document with primary
//! `data` and optional `included`, resources with `attributes` and
//! `relationships`, and linkage-only relationships.
//!
//! ```json
//! {
//!   "data": {
//!     "type": "hyde/items",
//!     "id": "site/posts/hello",
//!     "attributes": { "document": { "title": "Hello" }, "body": "..." },
//!     "relationships": {
//!       "parent": { "data": { "type": "hyde/collections", "id": "site/posts" } },
//!       "tags": { "data": [] }
//!     }
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonApiDocument {
    pub data: PrimaryData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    One(Resource),
    Many(Vec<Resource>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<IndexMap<String, Relationship>>,
}

/// A relationship object. `data` is always written, `null` included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub data: Option<Linkage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl Relationship {
    pub fn one(identifier: Option<ResourceIdentifier>) -> Self {
        Self {
            data: identifier.map(Linkage::One),
        }
    }

    pub fn many(identifiers: Vec<ResourceIdentifier>) -> Self {
        Self {
            data: Some(Linkage::Many(identifiers)),
        }
    }

    /// `null` data or an empty list.
    pub fn is_blank(&self) -> bool {
        match &self.data {
            None => true,
            Some(Linkage::One(_)) => false,
            Some(Linkage::Many(list)) => list.is_empty(),
        }
    }

    pub fn identifiers(&self) -> &[ResourceIdentifier] {
        match &self.data {
            None => &[],
            Some(Linkage::One(one)) => std::slice::from_ref(one),
            Some(Linkage::Many(list)) => list,
        }
    }
}

impl Resource {
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier {
            kind: self.kind.clone(),
            id: self.id.clone(),
        }
    }

    /// Drop blank relationships, then any envelope left empty.
    pub fn prune(&mut self) {
        if let Some(relationships) = &mut self.relationships {
            relationships.retain(|_, relationship| !relationship.is_blank());
        }
        if self.relationships.as_ref().is_some_and(IndexMap::is_empty) {
            self.relationships = None;
        }
        if self.attributes.as_ref().is_some_and(Map::is_empty) {
            self.attributes = None;
        }
    }
}

impl JsonApiDocument {
    pub fn resources(&self) -> &[Resource] {
        match &self.data {
            PrimaryData::One(one) => std::slice::from_ref(one),
            PrimaryData::Many(list) => list,
        }
    }

    pub fn prune(&mut self) {
        match &mut self.data {
            PrimaryData::One(one) => one.prune(),
            PrimaryData::Many(list) => list.iter_mut().for_each(Resource::prune),
        }
        self.included.iter_mut().for_each(Resource::prune);
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
