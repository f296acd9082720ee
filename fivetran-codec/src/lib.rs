//! Fivetran mapper codec - Per-stream transformation engine
//!
//! This crate turns raw Singer schemas and records into their Fivetran-shaped
//! counterparts:
//!
//! - Schema and record flattening to a bounded depth
//! - Surrogate key derivation
//! - The record pipeline stages (flatten, rename, key, synced, deleted)
//! - [`StreamMap`], the per-stream state tying schema and records together

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod flatten;
pub mod stages;
pub mod stream_map;
pub mod surrogate;

// Re-export commonly used types
pub use fivetran_format::{JsonMap, MapperError, Result, SystemColumn};

// Re-export our own types
pub use flatten::{flatten_key, flatten_record, flatten_schema, FlattenError};
pub use stream_map::StreamMap;
pub use surrogate::derive_surrogate_key;

use fivetran_format::constants::{DEFAULT_FLATTENING_MAX_DEPTH, FLATTENING_SEPARATOR};

/// Flattening options for a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatteningOptions {
    /// Expand nested objects into top-level columns
    pub enabled: bool,
    /// Maximum nesting level to expand (`None` = unbounded)
    pub max_depth: Option<usize>,
    /// Separator between parent and child names
    pub separator: String,
}

impl Default for FlatteningOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: Some(DEFAULT_FLATTENING_MAX_DEPTH),
            separator: FLATTENING_SEPARATOR.to_string(),
        }
    }
}

impl FlatteningOptions {
    /// Enabled flattening down to `max_depth`
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Flattening turned off; schemas and records keep their nesting
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Check whether objects at nesting `level` may still be expanded
    pub fn expands(&self, level: usize) -> bool {
        self.max_depth.map_or(true, |max| level < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flattening() {
        let opts = FlatteningOptions::default();
        assert!(opts.enabled);
        assert_eq!(opts.max_depth, Some(1));
        assert_eq!(opts.separator, "_");
    }

    #[test]
    fn test_expands() {
        assert!(FlatteningOptions::new(Some(1)).expands(0));
        assert!(!FlatteningOptions::new(Some(1)).expands(1));
        assert!(!FlatteningOptions::new(Some(0)).expands(0));
        assert!(FlatteningOptions::new(None).expands(1_000));
    }
}
