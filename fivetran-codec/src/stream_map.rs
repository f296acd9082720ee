//! Per-stream schema and record transformation

use crate::flatten::{flatten_schema, FlattenError};
use crate::{stages, FlatteningOptions};
use chrono::{DateTime, Utc};
use fivetran_format::constants::FLATTENING_SEPARATOR;
use fivetran_format::types::{boolean_type, date_time_type, string_type};
use fivetran_format::{normalize, JsonMap, MapperError, Result, SystemColumn};
use serde_json::Value;
use tracing::{debug, warn};

/// Mapping state of one output stream.
///
/// Built from a SCHEMA message; every later SCHEMA for the same stream builds
/// a new one from scratch. Records are transformed against it statelessly.
#[derive(Debug, Clone)]
pub struct StreamMap {
    stream_alias: String,
    raw_schema: JsonMap,
    raw_key_properties: Vec<String>,
    flattening: FlatteningOptions,
    /// Schema right after flattening, before renaming and column injection.
    /// Record flattening looks nested keys up here.
    flattened_schema: JsonMap,
    transformed_schema: JsonMap,
    transformed_key_properties: Vec<String>,
}

impl StreamMap {
    /// Build the mapping state for a stream.
    ///
    /// The flattening separator is always `_`, whatever `flattening` says.
    ///
    /// # Errors
    ///
    /// [`MapperError::InvalidSchema`] if `raw_schema` has no `properties`
    /// object, [`MapperError::DuplicateColumn`] if flattening produces the
    /// same column twice.
    pub fn new(
        stream_alias: impl Into<String>,
        raw_schema: &JsonMap,
        key_properties: &[String],
        flattening: FlatteningOptions,
    ) -> Result<Self> {
        let stream_alias = stream_alias.into();
        let flattening = FlatteningOptions {
            separator: FLATTENING_SEPARATOR.to_string(),
            ..flattening
        };

        let flattened_schema = if flattening.enabled {
            flatten_schema(raw_schema, flattening.max_depth, &flattening.separator).map_err(
                |err| match err {
                    FlattenError::DuplicateColumn(column) => MapperError::DuplicateColumn(column),
                    other => MapperError::InvalidSchema {
                        stream: stream_alias.clone(),
                        reason: other.to_string(),
                    },
                },
            )?
        } else {
            raw_schema.clone()
        };

        let mut stream_map = Self {
            stream_alias,
            raw_schema: raw_schema.clone(),
            raw_key_properties: key_properties.to_vec(),
            flattening,
            transformed_schema: flattened_schema.clone(),
            flattened_schema,
            transformed_key_properties: key_properties.to_vec(),
        };
        stream_map.apply_key_property_transformations();
        stream_map.apply_schema_transformations()?;

        debug!(
            stream = %stream_map.stream_alias,
            key_properties = ?stream_map.transformed_key_properties,
            columns = stream_map.properties().map_or(0, |p| p.len()),
            "registered stream map"
        );
        Ok(stream_map)
    }

    /// Name of the output stream
    pub fn stream_alias(&self) -> &str {
        &self.stream_alias
    }

    /// Schema as declared upstream
    pub fn raw_schema(&self) -> &JsonMap {
        &self.raw_schema
    }

    /// Key properties as declared upstream
    pub fn raw_key_properties(&self) -> &[String] {
        &self.raw_key_properties
    }

    /// Check whether this map was built from exactly this declaration
    pub fn is_built_from(&self, raw_schema: &JsonMap, key_properties: &[String]) -> bool {
        self.raw_schema == *raw_schema && self.raw_key_properties == key_properties
    }

    /// Flattening options in effect (separator already forced)
    pub fn flattening(&self) -> &FlatteningOptions {
        &self.flattening
    }

    /// Schema after flattening only
    pub fn flattened_schema(&self) -> &JsonMap {
        &self.flattened_schema
    }

    /// Schema to emit downstream
    pub fn transformed_schema(&self) -> &JsonMap {
        &self.transformed_schema
    }

    /// Key properties to emit downstream
    pub fn transformed_key_properties(&self) -> &[String] {
        &self.transformed_key_properties
    }

    /// Check whether records of this stream get a derived `_fivetran_id`
    pub fn uses_surrogate_key(&self) -> bool {
        matches!(
            self.transformed_key_properties.as_slice(),
            [only] if SystemColumn::Id.matches(only)
        )
    }

    /// Every record is kept; the mapper only rewrites.
    pub fn include(&self, _record: &JsonMap) -> bool {
        true
    }

    /// Transform one record, stamping `_fivetran_synced` with the current time
    /// when the record carries no extraction timestamp.
    pub fn transform(&self, record: JsonMap) -> Result<Option<JsonMap>> {
        self.transform_at(record, Utc::now())
    }

    /// Transform one record using `now` as the fallback sync time.
    ///
    /// Returns `None` for records that are filtered out, which never happens
    /// for this mapper.
    pub fn transform_at(&self, record: JsonMap, now: DateTime<Utc>) -> Result<Option<JsonMap>> {
        let flattened = stages::flatten(record, &self.flattened_schema, &self.flattening);
        let mut record = stages::rename(flattened);

        if self.uses_surrogate_key() {
            stages::inject_surrogate_key(&mut record)?;
        }
        stages::inject_synced(&mut record, now);
        stages::inject_deleted(&mut record);

        Ok(self.include(&record).then_some(record))
    }

    fn properties(&self) -> Option<&JsonMap> {
        self.transformed_schema
            .get("properties")
            .and_then(Value::as_object)
    }

    fn apply_key_property_transformations(&mut self) {
        let keys: Vec<String> = self
            .transformed_key_properties
            .iter()
            .map(|name| normalize(name))
            .collect();

        self.transformed_key_properties =
            if keys.is_empty() || keys.iter().any(|k| SystemColumn::Id.matches(k)) {
                vec![SystemColumn::Id.as_str().to_string()]
            } else {
                keys
            };
    }

    fn apply_schema_transformations(&mut self) -> Result<()> {
        let properties = match self.transformed_schema.get("properties") {
            Some(Value::Object(properties)) => properties.clone(),
            _ => {
                return Err(MapperError::InvalidSchema {
                    stream: self.stream_alias.clone(),
                    reason: FlattenError::MissingProperties.to_string(),
                })
            }
        };

        let mut renamed = stages::rename(properties);

        for key in &self.transformed_key_properties {
            if !SystemColumn::Id.matches(key) && !renamed.contains_key(key) {
                warn!(
                    stream = %self.stream_alias,
                    key_property = %key,
                    "key property is not a column of the transformed schema"
                );
            }
        }

        if self.uses_surrogate_key() {
            renamed.insert(SystemColumn::Id.as_str().to_string(), string_type());
        }
        renamed.insert(SystemColumn::Synced.as_str().to_string(), date_time_type());
        renamed.insert(SystemColumn::Deleted.as_str().to_string(), boolean_type());

        self.transformed_schema
            .insert("properties".to_string(), Value::Object(renamed));
        Ok(())
    }
}
