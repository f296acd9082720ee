//! Fivetran mapper format - Core primitives with no I/O dependencies
//!
//! This crate provides the building blocks shared by the mapping engine and
//! the message pipeline:
//!
//! - Reserved column names and protocol constants
//! - Property/stream name normalization
//! - Singer message model
//! - JSON Schema type descriptors for injected columns
//! - Error types

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod message;
pub mod names;
pub mod types;

// Re-export commonly used types
pub use constants::SystemColumn;
pub use error::{MapperError, Result};
pub use message::{Message, MessageKind, RecordMessage, SchemaMessage};
pub use names::normalize;

/// A JSON object with insertion-ordered keys (records, schemas, payloads).
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_column_names_are_canonical() {
        for column in SystemColumn::ALL {
            assert_eq!(normalize(column.as_str()), column.as_str());
        }
    }
}
