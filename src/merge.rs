//! First-write-wins attribute merging.
//!
//! Used when parsed content targets an identifier the context already knows,
//! typically a placeholder collection created while resolving someone else's
//! ancestors. Incoming data never overwrites what is already there; it only
//! fills gaps:
//!
//! | existing       | incoming     | result                                        |
//! |----------------|--------------|-----------------------------------------------|
//! | mapping        | mapping      | existing keys kept, missing keys added, shared keys merged recursively |
//! | list           | list         | element-wise merge over the *existing* length; extra incoming elements dropped |
//! | null / absent  | anything     | incoming                                      |
//! | anything else  | anything     | existing                                      |

use crate::model::{CollectionId, Content, Document};
use serde_json::Value;

/// Incoming attributes for find-or-create.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub content: Content,
    /// Resolved tag collections. `None` when the source carried no tag list.
    pub tags: Option<Vec<CollectionId>>,
}

pub fn merge_value(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(current), Value::Object(incoming)) => merge_document(current, incoming),
        (Value::Array(current), Value::Array(incoming)) => {
            for (slot, value) in current.iter_mut().zip(incoming) {
                merge_value(slot, value);
            }
        }
        (slot, incoming) if slot.is_null() => *slot = incoming,
        _ => {}
    }
}

pub fn merge_document(existing: &mut Document, incoming: Document) {
    for (key, value) in incoming {
        match existing.get_mut(&key) {
            Some(slot) => merge_value(slot, value),
            None => {
                existing.insert(key, value);
            }
        }
    }
}

pub fn merge_option<T>(existing: &mut Option<T>, incoming: Option<T>) {
    if existing.is_none() {
        *existing = incoming;
    }
}

pub fn merge_content(existing: &mut Content, incoming: Content) {
    merge_option(&mut existing.ext, incoming.ext);
    merge_option(&mut existing.body, incoming.body);
    match existing.document.as_mut() {
        Some(current) => {
            if let Some(incoming) = incoming.document {
                merge_document(current, incoming);
            }
        }
        None => existing.document = incoming.document,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn mapping_keeps_existing_and_fills_gaps() {
        let mut existing = doc(json!({"title": "Posts", "order": 1}));
        merge_document(&mut existing, doc(json!({"title": "Ignored", "layout": "list"})));
        assert_eq!(
            Value::Object(existing),
            json!({"title": "Posts", "order": 1, "layout": "list"})
        );
    }

    #[test]
    fn nested_mappings_merge_per_leaf() {
        let mut existing = json!({"seo": {"title": "A"}});
        merge_value(&mut existing, json!({"seo": {"title": "B", "image": "x.png"}}));
        assert_eq!(existing, json!({"seo": {"title": "A", "image": "x.png"}}));
    }

    #[test]
    fn lists_merge_over_existing_length_only() {
        let mut existing = json!([{"a": 1}, {"b": 2}]);
        merge_value(
            &mut existing,
            json!([{"a": 9, "c": 3}, {"d": 4}, {"extra": true}]),
        );
        assert_eq!(existing, json!([{"a": 1, "c": 3}, {"b": 2, "d": 4}]));
    }

    #[test]
    fn null_is_replaced_but_false_is_kept() {
        let mut existing = json!({"draft": false, "summary": null});
        merge_value(&mut existing, json!({"draft": true, "summary": "text"}));
        assert_eq!(existing, json!({"draft": false, "summary": "text"}));
    }

    #[test]
    fn scalar_mismatch_keeps_existing() {
        let mut existing = json!("keep");
        merge_value(&mut existing, json!({"other": 1}));
        assert_eq!(existing, json!("keep"));
    }

    #[test]
    fn content_adopts_missing_fields() {
        let mut existing = Content {
            ext: None,
            document: Some(doc(json!({"title": "Posts"}))),
            body: Some("Existing".into()),
        };
        merge_content(
            &mut existing,
            Content {
                ext: Some("md".into()),
                document: Some(doc(json!({"title": "Other", "layout": "list"}))),
                body: Some("Incoming".into()),
            },
        );
        assert_eq!(existing.ext.as_deref(), Some("md"));
        assert_eq!(existing.body.as_deref(), Some("Existing"));
        assert_eq!(
            existing.document.map(Value::Object),
            Some(json!({"title": "Posts", "layout": "list"}))
        );
    }

    #[test]
    fn placeholder_content_takes_everything() {
        let mut existing = Content::default();
        let incoming = Content {
            ext: Some("md".into()),
            document: Some(doc(json!({"title": "T"}))),
            body: Some("B".into()),
        };
        merge_content(&mut existing, incoming.clone());
        assert_eq!(existing, incoming);
    }
}
