//! Fivetran mapper test utilities
//!
//! Shared builders for records, schemas and Singer message lines.

use chrono::{DateTime, FixedOffset};
use serde_json::{json, Map, Value};

/// Builder for creating test records; keys keep insertion order
pub struct RecordBuilder {
    fields: Map<String, Value>,
}

impl RecordBuilder {
    /// Create a new record builder
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Add a field with a string value
    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.fields
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add a field with an integer value
    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), Value::Number(value.into()));
        self
    }

    /// Add a field with a boolean value
    pub fn bool(mut self, key: &str, value: bool) -> Self {
        self.fields.insert(key.to_string(), Value::Bool(value));
        self
    }

    /// Add a field with a null value
    pub fn null(mut self, key: &str) -> Self {
        self.fields.insert(key.to_string(), Value::Null);
        self
    }

    /// Add a field with an object value
    pub fn object(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Add a field with an array value
    pub fn array(mut self, key: &str, value: Vec<Value>) -> Self {
        self.fields.insert(key.to_string(), Value::Array(value));
        self
    }

    /// Build the record as a map
    pub fn build(self) -> Map<String, Value> {
        self.fields
    }

    /// Build the record as a JSON value
    pub fn build_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Schema with no properties at all
pub fn empty_schema() -> Map<String, Value> {
    as_map(json!({ "type": "object", "properties": {} }))
}

/// A small schema mixing casing conventions and one nested object
pub fn animals_schema() -> Map<String, Value> {
    as_map(json!({
        "type": "object",
        "properties": {
            "id": { "type": "integer" },
            "animalName": { "type": ["string", "null"] },
            "OwnerInfo": {
                "type": ["object", "null"],
                "properties": {
                    "firstName": { "type": "string" },
                    "IPAddress": { "type": "string" }
                }
            },
            "tags": { "type": "array", "items": { "type": "string" } },
            "_sdc_extracted_at": { "type": ["string", "null"], "format": "date-time" },
            "_sdc_deleted_at": { "type": ["string", "null"], "format": "date-time" }
        }
    }))
}

/// SCHEMA line
pub fn schema_line(stream: &str, schema: &Map<String, Value>, key_properties: &[&str]) -> String {
    json!({
        "type": "SCHEMA",
        "stream": stream,
        "schema": schema,
        "key_properties": key_properties,
    })
    .to_string()
}

/// RECORD line
pub fn record_line(stream: &str, record: &Map<String, Value>) -> String {
    json!({ "type": "RECORD", "stream": stream, "record": record }).to_string()
}

/// STATE line
pub fn state_line(value: Value) -> String {
    json!({ "type": "STATE", "value": value }).to_string()
}

/// ACTIVATE_VERSION line
pub fn activate_version_line(stream: &str, version: i64) -> String {
    json!({ "type": "ACTIVATE_VERSION", "stream": stream, "version": version }).to_string()
}

/// Join lines into newline-terminated protocol input
pub fn to_input(lines: &[String]) -> String {
    let mut input = lines.join("\n");
    input.push('\n');
    input
}

/// Parse newline-delimited output into JSON values, skipping blank lines
pub fn parse_output(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("output line is JSON"))
        .collect()
}

/// Parse an RFC 3339 timestamp, keeping its offset
pub fn parse_timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
