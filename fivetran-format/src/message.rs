//! Singer message model
//!
//! Inbound lines are parsed into a [`JsonMap`] first and validated by hand so
//! that a missing required key reports which keys were absent, the way the
//! Singer tooling does. Outbound messages serialize with `type` as the first
//! key.

use crate::error::{MapperError, Result};
use crate::JsonMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Message kinds of the Singer protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Stream schema declaration
    Schema,
    /// Data record
    Record,
    /// Checkpoint
    State,
    /// Table version switch
    ActivateVersion,
    /// Batch file manifest (not supported by this mapper)
    Batch,
}

impl MessageKind {
    /// Wire spelling of the `type` key
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Schema => "SCHEMA",
            MessageKind::Record => "RECORD",
            MessageKind::State => "STATE",
            MessageKind::ActivateVersion => "ACTIVATE_VERSION",
            MessageKind::Batch => "BATCH",
        }
    }

    /// Parse the `type` key
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SCHEMA" => Some(MessageKind::Schema),
            "RECORD" => Some(MessageKind::Record),
            "STATE" => Some(MessageKind::State),
            "ACTIVATE_VERSION" => Some(MessageKind::ActivateVersion),
            "BATCH" => Some(MessageKind::Batch),
            _ => None,
        }
    }

    /// Keys a line of this kind must carry besides `type`
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            MessageKind::Schema => &["stream", "schema"],
            MessageKind::Record => &["stream", "record"],
            MessageKind::State | MessageKind::ActivateVersion | MessageKind::Batch => &[],
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SCHEMA message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMessage {
    /// Stream id
    pub stream: String,
    /// JSON Schema of the stream's records
    pub schema: JsonMap,
    /// Primary key columns
    #[serde(default, deserialize_with = "null_as_empty")]
    pub key_properties: Vec<String>,
    /// Replication key columns
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bookmark_keys: Vec<String>,
}

/// RECORD message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMessage {
    /// Stream id
    pub stream: String,
    /// Record payload
    pub record: JsonMap,
    /// Table version, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    /// RFC 3339 extraction time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_extracted: Option<String>,
}

/// A Singer message
///
/// STATE and ACTIVATE_VERSION payloads are opaque: they hold every key of the
/// original line except `type`, in the original order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// SCHEMA message
    Schema(SchemaMessage),
    /// RECORD message
    Record(RecordMessage),
    /// STATE message
    State(JsonMap),
    /// ACTIVATE_VERSION message
    ActivateVersion(JsonMap),
}

impl Message {
    /// Parse one protocol line
    pub fn from_line(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(MapperError::InvalidMessage {
                kind: "line",
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    /// Build a message from an already parsed line
    pub fn from_map(map: JsonMap) -> Result<Self> {
        let kind = match map.get("type") {
            Some(Value::String(name)) => MessageKind::parse(name)
                .ok_or_else(|| MapperError::UnknownMessageType(name.clone()))?,
            Some(other) => {
                return Err(MapperError::InvalidMessage {
                    kind: "line",
                    reason: format!("`type` must be a string, got {}", json_kind(other)),
                })
            }
            None => return Err(missing_keys(&map, &["type"])),
        };

        assert_line_requires(&map, kind.required_keys())?;

        match kind {
            MessageKind::Schema => {
                Ok(Message::Schema(from_object(map, MessageKind::Schema)?))
            }
            MessageKind::Record => {
                Ok(Message::Record(from_object(map, MessageKind::Record)?))
            }
            MessageKind::State => Ok(Message::State(without_type(map))),
            MessageKind::ActivateVersion => Ok(Message::ActivateVersion(without_type(map))),
            MessageKind::Batch => Err(MapperError::UnsupportedMessageType(
                MessageKind::Batch.to_string(),
            )),
        }
    }

    /// Kind of this message
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Schema(_) => MessageKind::Schema,
            Message::Record(_) => MessageKind::Record,
            Message::State(_) => MessageKind::State,
            Message::ActivateVersion(_) => MessageKind::ActivateVersion,
        }
    }

    /// Stream id, if the message belongs to one
    pub fn stream(&self) -> Option<&str> {
        match self {
            Message::Schema(m) => Some(&m.stream),
            Message::Record(m) => Some(&m.stream),
            Message::ActivateVersion(payload) => payload.get("stream").and_then(Value::as_str),
            Message::State(_) => None,
        }
    }

    /// Serialize as a single protocol line (no trailing newline)
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn from_object<T: serde::de::DeserializeOwned>(map: JsonMap, kind: MessageKind) -> Result<T> {
    serde_json::from_value(Value::Object(map)).map_err(|e| MapperError::InvalidMessage {
        kind: kind.as_str(),
        reason: e.to_string(),
    })
}

fn without_type(map: JsonMap) -> JsonMap {
    map.into_iter().filter(|(key, _)| key != "type").collect()
}

fn assert_line_requires(map: &JsonMap, required: &[&str]) -> Result<()> {
    if required.iter().all(|key| map.contains_key(*key)) {
        Ok(())
    } else {
        Err(missing_keys(map, required))
    }
}

fn missing_keys(map: &JsonMap, required: &[&str]) -> MapperError {
    MapperError::MissingRequiredFields {
        missing: required
            .iter()
            .filter(|key| !map.contains_key(**key))
            .map(|key| key.to_string())
            .collect(),
        line: Value::Object(map.clone()).to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_schema_with_defaults() {
        let msg = Message::from_line(
            r#"{"type":"SCHEMA","stream":"animals","schema":{"properties":{}}}"#,
        )
        .unwrap();
        match msg {
            Message::Schema(schema) => {
                assert_eq!(schema.stream, "animals");
                assert!(schema.key_properties.is_empty());
                assert!(schema.bookmark_keys.is_empty());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_null_key_properties_are_empty() {
        let msg = Message::from_line(
            r#"{"type":"SCHEMA","stream":"s","schema":{},"key_properties":null}"#,
        )
        .unwrap();
        let Message::Schema(schema) = msg else {
            panic!("expected schema");
        };
        assert!(schema.key_properties.is_empty());
    }

    #[test]
    fn test_schema_missing_fields() {
        let err = Message::from_line(r#"{"type":"SCHEMA","stream":"animals"}"#).unwrap_err();
        match err {
            MapperError::MissingRequiredFields { missing, .. } => {
                assert_eq!(missing, vec!["schema".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_record_missing_stream_and_record() {
        let err = Message::from_line(r#"{"type":"RECORD"}"#).unwrap_err();
        match err {
            MapperError::MissingRequiredFields { missing, .. } => {
                assert_eq!(missing, vec!["stream".to_string(), "record".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_type() {
        let err = Message::from_line(r#"{"stream":"animals"}"#).unwrap_err();
        assert!(matches!(err, MapperError::MissingRequiredFields { .. }));
    }

    #[test]
    fn test_unknown_and_batch_types() {
        assert!(matches!(
            Message::from_line(r#"{"type":"NOPE"}"#),
            Err(MapperError::UnknownMessageType(t)) if t == "NOPE"
        ));
        assert!(matches!(
            Message::from_line(r#"{"type":"BATCH","stream":"s"}"#),
            Err(MapperError::UnsupportedMessageType(_))
        ));
    }

    #[test]
    fn test_record_wrong_shape() {
        let err = Message::from_line(r#"{"type":"RECORD","stream":"s","record":[1]}"#)
            .unwrap_err();
        assert!(matches!(err, MapperError::InvalidMessage { kind: "RECORD", .. }));
    }

    #[test]
    fn test_state_round_trips_unchanged() {
        let line = r#"{"type":"STATE","value":{"bookmarks":{"animals":{"id":3}}}}"#;
        let msg = Message::from_line(line).unwrap();
        assert_eq!(msg.kind(), MessageKind::State);
        assert_eq!(msg.to_line().unwrap(), line);
    }

    #[test]
    fn test_activate_version_round_trips_unchanged() {
        let line = r#"{"type":"ACTIVATE_VERSION","stream":"animals","version":17}"#;
        let msg = Message::from_line(line).unwrap();
        assert_eq!(msg.stream(), Some("animals"));
        assert_eq!(msg.to_line().unwrap(), line);
    }

    #[test]
    fn test_record_serialization_skips_absent_optionals() {
        let msg = Message::Record(RecordMessage {
            stream: "animals".to_string(),
            record: json!({"name": "Otis"}).as_object().unwrap().clone(),
            version: None,
            time_extracted: None,
        });
        assert_eq!(
            msg.to_line().unwrap(),
            r#"{"type":"RECORD","stream":"animals","record":{"name":"Otis"}}"#
        );
    }
}
