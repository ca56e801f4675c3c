//! Document envelope returned by the backend

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreResult;

/// A stored document: system attributes plus the collection-defined fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Document {
    /// Build a document from a JSON object of fields; non-object values yield an empty field map
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            created_at,
            updated_at: created_at,
            data,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Value used for ordering and filtering, including system attributes
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "$id" => Some(Value::String(self.id.clone())),
            "$createdAt" => Some(Value::String(self.created_at.to_rfc3339())),
            "$updatedAt" => Some(Value::String(self.updated_at.to_rfc3339())),
            other => self.data.get(other).cloned(),
        }
    }

    /// Merge `patch` into the field map, replacing existing keys
    pub fn apply_patch(&mut self, patch: Map<String, Value>, at: DateTime<Utc>) {
        for (key, value) in patch {
            self.data.insert(key, value);
        }
        self.updated_at = at;
    }

    /// Decode the whole envelope into a typed model
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Result of a list call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentList {
    /// Number of documents matching the filters, ignoring cursor and limit
    pub total: u64,
    pub documents: Vec<Document>,
}

impl DocumentList {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn decode_all<T: DeserializeOwned>(&self) -> StoreResult<Vec<T>> {
        self.documents.iter().map(Document::decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_backend_payload() {
        let payload = json!({
            "$id": "post-1",
            "$createdAt": "2024-01-02T03:04:05.000+00:00",
            "$updatedAt": "2024-01-02T03:04:05.000+00:00",
            "$collectionId": "posts",
            "caption": "hello",
            "tags": ["a", "b"]
        });

        let doc: Document = serde_json::from_value(payload).unwrap();
        assert_eq!(doc.id, "post-1");
        assert_eq!(doc.field("caption"), Some(&json!("hello")));
        assert_eq!(doc.field("$collectionId"), Some(&json!("posts")));
    }

    #[test]
    fn test_decode_into_typed_model() {
        #[derive(Deserialize)]
        struct Caption {
            #[serde(rename = "$id")]
            id: String,
            caption: String,
        }

        let doc = Document::new("p", Utc::now(), json!({ "caption": "sunset" }));
        let decoded: Caption = doc.decode().unwrap();
        assert_eq!(decoded.id, "p");
        assert_eq!(decoded.caption, "sunset");
    }

    #[test]
    fn test_apply_patch_overwrites_fields() {
        let created = Utc::now();
        let mut doc = Document::new("p", created, json!({ "caption": "old", "location": "x" }));
        let later = created + chrono::Duration::seconds(5);

        let patch = json!({ "caption": "new" });
        if let Value::Object(map) = patch {
            doc.apply_patch(map, later);
        }

        assert_eq!(doc.field("caption"), Some(&json!("new")));
        assert_eq!(doc.field("location"), Some(&json!("x")));
        assert_eq!(doc.updated_at, later);
        assert_eq!(doc.created_at, created);
    }
}
