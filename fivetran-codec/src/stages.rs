//! Record pipeline stages
//!
//! A record passes through these stages in order:
//!
//! 1. [`flatten`] nested objects into top-level columns
//! 2. [`rename`] every column to its canonical name
//! 3. [`inject_surrogate_key`] when the stream has no natural key
//! 4. [`inject_synced`] from `_sdc_extracted_at` or the current time
//! 5. [`inject_deleted`] from `_sdc_deleted_at`
//!
//! [`StreamMap::transform`](crate::StreamMap::transform) composes them.

use crate::flatten::flatten_record;
use crate::surrogate::derive_surrogate_key;
use crate::FlatteningOptions;
use chrono::{DateTime, SecondsFormat, Utc};
use fivetran_format::constants::{SDC_DELETED_AT, SDC_EXTRACTED_AT};
use fivetran_format::{normalize, JsonMap, Result, SystemColumn};
use serde_json::Value;

/// Flatten a record against the stream's flattened schema
pub fn flatten(record: JsonMap, flattened_schema: &JsonMap, opts: &FlatteningOptions) -> JsonMap {
    if !opts.enabled {
        return record;
    }
    flatten_record(&record, flattened_schema, opts.max_depth, &opts.separator)
}

/// Rename every top-level column.
///
/// Columns are visited in their original order; each is taken out and put
/// back under its canonical name. A canonical name that is still present is
/// overwritten in place, otherwise the column moves to the end. On a
/// collision the non-canonical spelling therefore wins, e.g.
/// `{"userName": 1, "other": 0, "user_name": 2}` becomes
/// `{"other": 0, "user_name": 1}`.
pub fn rename(record: JsonMap) -> JsonMap {
    let names: Vec<String> = record.keys().cloned().collect();
    let mut columns: Vec<(String, Value)> = record.into_iter().collect();

    for name in names {
        let Some(pos) = columns.iter().position(|(key, _)| *key == name) else {
            continue;
        };
        let (_, value) = columns.remove(pos);
        let canonical = normalize(&name);
        match columns.iter_mut().find(|(key, _)| *key == canonical) {
            Some(slot) => slot.1 = value,
            None => columns.push((canonical, value)),
        }
    }

    columns.into_iter().collect()
}

/// Set `_fivetran_id` to the digest of the record as it stands.
pub fn inject_surrogate_key(record: &mut JsonMap) -> Result<()> {
    let key = derive_surrogate_key(record)?;
    record.insert(SystemColumn::Id.as_str().to_string(), Value::String(key));
    Ok(())
}

/// Set `_fivetran_synced`.
///
/// An `_sdc_extracted_at` column (any casing) is reused verbatim, null
/// included; otherwise `now` is written as RFC 3339.
pub fn inject_synced(record: &mut JsonMap, now: DateTime<Utc>) {
    let synced = lookup_case_insensitive(record, SDC_EXTRACTED_AT)
        .cloned()
        .unwrap_or_else(|| Value::String(format_timestamp(now)));
    record.insert(SystemColumn::Synced.as_str().to_string(), synced);
}

/// Set `_fivetran_deleted` from the truthiness of `_sdc_deleted_at` (any casing).
pub fn inject_deleted(record: &mut JsonMap) {
    let deleted = lookup_case_insensitive(record, SDC_DELETED_AT).is_some_and(is_truthy);
    record.insert(
        SystemColumn::Deleted.as_str().to_string(),
        Value::Bool(deleted),
    );
}

/// Find a column by lower-cased name; the last matching column wins.
pub fn lookup_case_insensitive<'a>(record: &'a JsonMap, name: &str) -> Option<&'a Value> {
    record
        .iter()
        .filter(|(key, _)| key.to_lowercase() == name)
        .last()
        .map(|(_, value)| value)
}

/// Null, `false`, zero and empty strings/arrays/objects are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// RFC 3339 with an explicit `+00:00` offset.
///
/// Microseconds are written unless they are all zero, in which case the
/// fraction is left out entirely.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    let precision = if at.timestamp_subsec_micros() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    at.to_rfc3339_opts(precision, false)
}
