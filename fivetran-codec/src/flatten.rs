//! Schema and record flattening
//!
//! Nested object properties are expanded into top-level columns named
//! `parent<sep>child`, down to a maximum nesting level. Objects that are not
//! expanded, and all arrays, become JSON-encoded strings.
//!
//! Record flattening consults the flattened schema: a nested object whose
//! flattened name is already a schema column is kept whole (and encoded)
//! instead of being expanded.

use fivetran_format::constants::MAX_FLATTENED_KEY_LEN;
use fivetran_format::types::{self, JsonType};
use fivetran_format::JsonMap;
use serde_json::{json, Value};
use thiserror::Error;

/// Errors raised while flattening a schema
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlattenError {
    /// Schema has no `properties` object to flatten
    #[error("schema has no `properties` object")]
    MissingProperties,
    /// Two properties flatten to the same column name
    #[error("Duplicate column name produced in schema: {0}")]
    DuplicateColumn(String),
}

/// Flatten a schema's `properties`, leaving every other schema keyword as is.
///
/// Resulting properties are sorted by name.
pub fn flatten_schema(
    schema: &JsonMap,
    max_depth: Option<usize>,
    separator: &str,
) -> Result<JsonMap, FlattenError> {
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .ok_or(FlattenError::MissingProperties)?;

    let mut items = Vec::with_capacity(properties.len());
    flatten_properties(properties, &[], separator, 0, max_depth, &mut items);

    items.sort_by(|a, b| a.0.cmp(&b.0));
    if let Some(pair) = items.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(FlattenError::DuplicateColumn(pair[0].0.clone()));
    }

    let mut flattened = schema.clone();
    flattened.insert(
        "properties".to_string(),
        Value::Object(items.into_iter().collect()),
    );
    Ok(flattened)
}

fn flatten_properties(
    properties: &JsonMap,
    parents: &[&str],
    separator: &str,
    level: usize,
    max_depth: Option<usize>,
    items: &mut Vec<(String, Value)>,
) {
    for (name, descriptor) in properties {
        let key = flatten_key(name, parents, separator);

        if !types::is_typed(descriptor) {
            items.push((key, descriptor.clone()));
            continue;
        }

        let is_object = types::has_type(descriptor, JsonType::Object);
        let nested = descriptor.get("properties").and_then(Value::as_object);
        match nested {
            Some(nested) if is_object && within(level, max_depth) => {
                let mut path = parents.to_vec();
                path.push(name);
                flatten_properties(nested, &path, separator, level + 1, max_depth, items);
            }
            _ if is_object || types::has_type(descriptor, JsonType::Array) => {
                items.push((key, encoded_descriptor(descriptor)));
            }
            _ => items.push((key, descriptor.clone())),
        }
    }
}

/// Descriptor of a column holding a JSON-encoded object or array
fn encoded_descriptor(original: &Value) -> Value {
    if types::has_type(original, JsonType::Null) {
        json!({ "type": ["string", "null"] })
    } else {
        json!({ "type": "string" })
    }
}

/// Flatten a record against the schema produced by [`flatten_schema`].
pub fn flatten_record(
    record: &JsonMap,
    flattened_schema: &JsonMap,
    max_depth: Option<usize>,
    separator: &str,
) -> JsonMap {
    let mut out = JsonMap::new();
    flatten_record_node(
        record,
        flattened_schema,
        &[],
        separator,
        0,
        max_depth,
        &mut out,
    );
    out
}

fn flatten_record_node(
    node: &JsonMap,
    flattened_schema: &JsonMap,
    parents: &[&str],
    separator: &str,
    level: usize,
    max_depth: Option<usize>,
    out: &mut JsonMap,
) {
    for (name, value) in node {
        let key = flatten_key(name, parents, separator);
        match value {
            Value::Object(nested)
                if !is_schema_column(flattened_schema, &key) && within(level, max_depth) =>
            {
                let mut path = parents.to_vec();
                path.push(name);
                flatten_record_node(
                    nested,
                    flattened_schema,
                    &path,
                    separator,
                    level + 1,
                    max_depth,
                    out,
                );
            }
            Value::Object(_) | Value::Array(_) => {
                out.insert(key, Value::String(value.to_string()));
            }
            _ => {
                out.insert(key, value.clone());
            }
        }
    }
}

/// An empty schema knows no columns, so nothing is expanded against it.
fn is_schema_column(flattened_schema: &JsonMap, key: &str) -> bool {
    if flattened_schema.is_empty() {
        return true;
    }
    flattened_schema
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|properties| properties.contains_key(key))
}

fn within(level: usize, max_depth: Option<usize>) -> bool {
    max_depth.map_or(true, |max| level < max)
}

/// Join a property name onto its parents.
///
/// Names reaching [`MAX_FLATTENED_KEY_LEN`] have their segments abbreviated
/// from the outermost parent inwards until they fit.
pub fn flatten_key(name: &str, parents: &[&str], separator: &str) -> String {
    let mut parts: Vec<String> = parents
        .iter()
        .map(|p| p.to_string())
        .chain(std::iter::once(name.to_string()))
        .collect();

    let mut reducer_index = 0;
    while parts.join(separator).len() >= MAX_FLATTENED_KEY_LEN && reducer_index < parts.len() {
        parts[reducer_index] = abbreviate(&parts[reducer_index]);
        reducer_index += 1;
    }

    parts.join(separator)
}

/// `customer_address` -> `ca`; short or single-word segments keep three characters
fn abbreviate(segment: &str) -> String {
    let capitals: String = upper_camel(segment)
        .chars()
        .filter(|c| !c.is_ascii_lowercase())
        .collect();
    if capitals.chars().count() > 1 {
        capitals.to_lowercase()
    } else {
        segment.chars().take(3).collect::<String>().to_lowercase()
    }
}

fn upper_camel(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::with_capacity(segment.len());
    let mut i = 0;
    if let Some(first) = chars.first() {
        out.extend(first.to_uppercase());
        i = 1;
    }
    while i < chars.len() {
        if chars[i] == '_' && i + 1 < chars.len() {
            out.extend(chars[i + 1].to_uppercase());
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(value: Value) -> JsonMap {
        value.as_object().expect("object").clone()
    }

    fn nested_schema() -> JsonMap {
        map(json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "owner": {
                    "type": ["object", "null"],
                    "properties": {
                        "name": {"type": "string"},
                        "address": {
                            "type": "object",
                            "properties": {"city": {"type": "string"}}
                        }
                    }
                },
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        }))
    }

    #[test]
    fn test_flatten_schema_one_level() {
        let flat = flatten_schema(&nested_schema(), Some(1), "_").unwrap();
        let props = flat["properties"].as_object().unwrap();
        let names: Vec<&str> = props.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["id", "owner_address", "owner_name", "tags"]);
        assert_eq!(props["owner_address"], json!({"type": "string"}));
        assert_eq!(props["tags"], json!({"type": "string"}));
        assert_eq!(props["id"], json!({"type": "integer"}));
        assert_eq!(flat["type"], "object");
    }

    #[test]
    fn test_flatten_schema_unbounded() {
        let flat = flatten_schema(&nested_schema(), None, "_").unwrap();
        let props = flat["properties"].as_object().unwrap();
        assert!(props.contains_key("owner_address_city"));
        assert!(!props.contains_key("owner_address"));
    }

    #[test]
    fn test_flatten_schema_depth_zero_encodes_objects() {
        let flat = flatten_schema(&nested_schema(), Some(0), "_").unwrap();
        let props = flat["properties"].as_object().unwrap();
        assert_eq!(props["owner"], json!({"type": ["string", "null"]}));
    }

    #[test]
    fn test_flatten_schema_requires_properties() {
        let err = flatten_schema(&map(json!({"type": "object"})), Some(1), "_").unwrap_err();
        assert_eq!(err, FlattenError::MissingProperties);
    }

    #[test]
    fn test_flatten_schema_duplicate_columns() {
        let schema = map(json!({
            "properties": {
                "a_b": {"type": "string"},
                "a": {"type": "object", "properties": {"b": {"type": "string"}}}
            }
        }));
        let err = flatten_schema(&schema, Some(1), "_").unwrap_err();
        assert_eq!(err, FlattenError::DuplicateColumn("a_b".to_string()));
    }

    #[test]
    fn test_flatten_record_against_schema() {
        let flat_schema = flatten_schema(&nested_schema(), Some(1), "_").unwrap();
        let record = map(json!({
            "id": 1,
            "owner": {"name": "Ada", "address": {"city": "London"}},
            "tags": ["a", "b"]
        }));
        let flat = flatten_record(&record, &flat_schema, Some(1), "_");
        assert_eq!(
            Value::Object(flat),
            json!({
                "id": 1,
                "owner_name": "Ada",
                "owner_address": "{\"city\":\"London\"}",
                "tags": "[\"a\",\"b\"]"
            })
        );
    }

    #[test]
    fn test_flatten_record_keeps_declared_object_columns_whole() {
        let schema = map(json!({"properties": {"meta": {"type": "string"}}}));
        let record = map(json!({"meta": {"k": "v"}}));
        let flat = flatten_record(&record, &schema, Some(1), "_");
        assert_eq!(flat["meta"], "{\"k\":\"v\"}");
    }

    #[test]
    fn test_flatten_record_with_empty_schema_encodes_objects() {
        let record = map(json!({"meta": {"k": "v"}, "n": null}));
        let flat = flatten_record(&record, &JsonMap::new(), Some(1), "_");
        assert_eq!(flat["meta"], "{\"k\":\"v\"}");
        assert_eq!(flat["n"], Value::Null);
    }

    #[test]
    fn test_flatten_key_short() {
        assert_eq!(flatten_key("city", &["owner", "address"], "_"), "owner_address_city");
        assert_eq!(flatten_key("id", &[], "__"), "id");
    }

    #[test]
    fn test_flatten_key_abbreviates_long_names() {
        let parent = "customer_shipping_address".repeat(6);
        let name = "x".repeat(120);
        let key = flatten_key(&name, &[parent.as_str()], "_");
        assert!(key.len() < MAX_FLATTENED_KEY_LEN);
        assert!(key.ends_with(&name));
        assert_eq!(abbreviate("customer_address"), "ca");
        assert_eq!(abbreviate("customer"), "cus");
    }
}
