//! Error types for the Fivetran mapper

use thiserror::Error;

/// Mapper error types
#[derive(Debug, Error)]
pub enum MapperError {
    /// A message line lacks keys its type requires.
    #[error("Line is missing required {} key(s): {line}", .missing.join(", "))]
    MissingRequiredFields {
        /// Required keys that were absent
        missing: Vec<String>,
        /// The offending line, re-serialized
        line: String,
    },
    /// A RECORD arrived for a stream that has not been described by a SCHEMA.
    #[error("Stream '{0}' received a record before its schema")]
    UnknownStream(String),
    /// Message `type` is not part of the Singer protocol.
    #[error("Unknown message type '{0}' in message")]
    UnknownMessageType(String),
    /// Message `type` is valid Singer but not handled by this mapper.
    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(String),
    /// A message field has the wrong shape.
    #[error("Invalid {kind} message: {reason}")]
    InvalidMessage {
        /// Message type being parsed
        kind: &'static str,
        /// What was wrong
        reason: String,
    },
    /// Raw schema cannot be flattened.
    #[error("Invalid schema for stream '{stream}': {reason}")]
    InvalidSchema {
        /// Stream the schema belongs to
        stream: String,
        /// What was wrong
        reason: String,
    },
    /// Flattening produced the same column twice.
    #[error("Duplicate column name produced in schema: {0}")]
    DuplicateColumn(String),
    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// I/O operation failed while reading or writing messages.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MapperError>;
