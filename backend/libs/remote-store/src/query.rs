//! List query predicates
//!
//! Queries are sent to the backend as JSON objects of the form
//! `{"method": ..., "attribute": ..., "values": [...]}`, one per `queries[]`
//! parameter.

use serde_json::{json, Value};

/// System attribute holding the document creation time
pub const CREATED_AT: &str = "$createdAt";

/// Page size the backend applies when no `Limit` is given
pub const DEFAULT_LIMIT: usize = 25;

/// A single list predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Attribute equals any of the values (array attributes: contains any)
    Equal { attribute: String, values: Vec<Value> },
    /// Full-text match on a string attribute
    Search { attribute: String, term: String },
    OrderAsc(String),
    OrderDesc(String),
    /// Resume strictly after the document with this id
    CursorAfter(String),
    /// Resume strictly before the document with this id
    CursorBefore(String),
    Limit(usize),
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equal {
            attribute: attribute.into(),
            values: vec![value.into()],
        }
    }

    pub fn search(attribute: impl Into<String>, term: impl Into<String>) -> Self {
        Self::Search {
            attribute: attribute.into(),
            term: term.into(),
        }
    }

    pub fn order_asc(attribute: impl Into<String>) -> Self {
        Self::OrderAsc(attribute.into())
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Self::OrderDesc(attribute.into())
    }

    pub fn cursor_after(id: impl Into<String>) -> Self {
        Self::CursorAfter(id.into())
    }

    pub fn cursor_before(id: impl Into<String>) -> Self {
        Self::CursorBefore(id.into())
    }

    pub fn limit(limit: usize) -> Self {
        Self::Limit(limit)
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Equal { .. } => "equal",
            Self::Search { .. } => "search",
            Self::OrderAsc(_) => "orderAsc",
            Self::OrderDesc(_) => "orderDesc",
            Self::CursorAfter(_) => "cursorAfter",
            Self::CursorBefore(_) => "cursorBefore",
            Self::Limit(_) => "limit",
        }
    }

    /// Wire representation
    pub fn to_value(&self) -> Value {
        match self {
            Self::Equal { attribute, values } => json!({
                "method": self.method(),
                "attribute": attribute,
                "values": values,
            }),
            Self::Search { attribute, term } => json!({
                "method": self.method(),
                "attribute": attribute,
                "values": [term],
            }),
            Self::OrderAsc(attribute) | Self::OrderDesc(attribute) => json!({
                "method": self.method(),
                "attribute": attribute,
            }),
            Self::CursorAfter(id) | Self::CursorBefore(id) => json!({
                "method": self.method(),
                "values": [id],
            }),
            Self::Limit(limit) => json!({
                "method": self.method(),
                "values": [limit],
            }),
        }
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}
