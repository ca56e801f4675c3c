//! Serde helpers for relation and nullable attributes
//!
//! The backend returns relations either as a bare id or as the expanded
//! related document; both collapse to the id.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

fn reference_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("$id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Single required relation
pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    reference_id(&value).ok_or_else(|| de::Error::custom("expected an id or a related document"))
}

/// List of relations or plain strings; `null` is an empty list
pub fn ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                reference_id(item)
                    .ok_or_else(|| de::Error::custom("expected an id or a related document"))
            })
            .collect(),
        _ => Err(de::Error::custom("expected a list")),
    }
}

pub fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
