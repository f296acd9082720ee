//! JSON Schema type descriptors
//!
//! Schemas travel as plain JSON objects so that keywords the mapper does not
//! understand (`format`, `description`, `maxLength`, ...) pass through
//! untouched. This module only knows how to read the `type` keyword and how
//! to build the descriptors of injected columns.

use serde_json::{json, Value};

/// JSON Schema primitive type names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    /// `"null"`
    Null,
    /// `"boolean"`
    Boolean,
    /// `"integer"`
    Integer,
    /// `"number"`
    Number,
    /// `"string"`
    String,
    /// `"object"`
    Object,
    /// `"array"`
    Array,
}

impl JsonType {
    /// Keyword spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Object => "object",
            JsonType::Array => "array",
        }
    }
}

/// Names listed under a descriptor's `type` keyword.
///
/// `type` may be a single string or a list of strings; anything else yields
/// nothing.
pub fn type_names(descriptor: &Value) -> Vec<&str> {
    match descriptor.get("type") {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Check whether a descriptor declares `ty` among its types
pub fn has_type(descriptor: &Value, ty: JsonType) -> bool {
    type_names(descriptor).contains(&ty.as_str())
}

/// Check whether a descriptor carries a `type` keyword at all
pub fn is_typed(descriptor: &Value) -> bool {
    descriptor.get("type").is_some()
}

/// Descriptor of a string column
pub fn string_type() -> Value {
    json!({ "type": ["string"] })
}

/// Descriptor of a timezone-aware timestamp column
pub fn date_time_type() -> Value {
    json!({ "type": ["string"], "format": "date-time" })
}

/// Descriptor of a boolean column
pub fn boolean_type() -> Value {
    json!({ "type": ["boolean"] })
}
