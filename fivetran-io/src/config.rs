//! Mapper configuration
//!
//! Settings come from JSON files and, optionally, from the environment.
//! Sources are applied in the order given; later sources override earlier
//! ones key by key.

use fivetran_codec::FlatteningOptions;
use fivetran_format::constants::{DEFAULT_FLATTENING_MAX_DEPTH, ENV_PREFIX};
use fivetran_format::{JsonMap, MapperError, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Setting key enabling flattening
pub const FLATTENING_ENABLED: &str = "flattening_enabled";
/// Setting key bounding flattening depth
pub const FLATTENING_MAX_DEPTH: &str = "flattening_max_depth";

/// Where configuration is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A JSON object file
    File(PathBuf),
    /// `MAPPER_FIVETRAN_*` environment variables
    Env,
}

impl FromStr for ConfigSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(if s == "ENV" {
            ConfigSource::Env
        } else {
            ConfigSource::File(PathBuf::from(s))
        })
    }
}

/// Description of one setting, reported by `--about`
#[derive(Debug, Clone, Serialize)]
pub struct SettingInfo {
    /// Setting key
    pub name: &'static str,
    /// JSON Schema type(s) accepted
    #[serde(rename = "type")]
    pub kind: &'static [&'static str],
    /// Default value
    pub default: Value,
    /// Human readable description
    pub description: &'static str,
}

/// Mapper settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapperConfig {
    /// Flatten nested schema properties and record values
    pub flattening_enabled: bool,
    /// Maximum depth to flatten to; `None` means unbounded
    pub flattening_max_depth: Option<usize>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            flattening_enabled: true,
            flattening_max_depth: Some(DEFAULT_FLATTENING_MAX_DEPTH),
        }
    }
}

impl MapperConfig {
    /// Build the configuration from sources applied left to right
    pub fn from_sources(sources: &[ConfigSource]) -> Result<Self> {
        let mut config = Self::default();
        for source in sources {
            match source {
                ConfigSource::File(path) => config.merge_file(path)?,
                ConfigSource::Env => config.merge_env(std::env::vars())?,
            }
        }
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Apply the settings of a JSON object file
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MapperError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            MapperError::InvalidConfig(format!("{} is not valid JSON: {e}", path.display()))
        })?;
        match value {
            Value::Object(map) => self.merge_json(&map),
            _ => Err(MapperError::InvalidConfig(format!(
                "{} must contain a JSON object",
                path.display()
            ))),
        }
    }

    /// Apply the settings of a JSON object
    pub fn merge_json(&mut self, settings: &JsonMap) -> Result<()> {
        for (key, value) in settings {
            self.apply(key, value)?;
        }
        Ok(())
    }

    /// Apply `MAPPER_FIVETRAN_*` variables from `vars`
    pub fn merge_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, raw) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let key = key.to_lowercase();
            let value = parse_env_value(&key, &raw)?;
            self.apply(&key, &value)?;
        }
        Ok(())
    }

    /// Flattening options for stream maps
    pub fn flattening_options(&self) -> FlatteningOptions {
        FlatteningOptions {
            enabled: self.flattening_enabled,
            max_depth: self.flattening_max_depth,
            ..FlatteningOptions::default()
        }
    }

    /// Settings understood by the mapper
    pub fn settings() -> Vec<SettingInfo> {
        vec![
            SettingInfo {
                name: FLATTENING_ENABLED,
                kind: &["boolean", "null"],
                default: Value::Bool(true),
                description: "Enable schema and record flattening",
            },
            SettingInfo {
                name: FLATTENING_MAX_DEPTH,
                kind: &["integer", "null"],
                default: Value::from(DEFAULT_FLATTENING_MAX_DEPTH),
                description: "Maximum depth to flatten nested objects to; null for no limit",
            },
        ]
    }

    fn apply(&mut self, key: &str, value: &Value) -> Result<()> {
        match key {
            FLATTENING_ENABLED => {
                self.flattening_enabled = match value {
                    Value::Bool(enabled) => *enabled,
                    Value::Null => true,
                    other => return Err(invalid(key, "a boolean", other)),
                };
            }
            FLATTENING_MAX_DEPTH => {
                self.flattening_max_depth = match value {
                    Value::Null => None,
                    Value::Number(n) => match n.as_u64() {
                        Some(depth) => Some(usize::try_from(depth).unwrap_or(usize::MAX)),
                        None => return Err(invalid(key, "a non-negative integer", value)),
                    },
                    other => return Err(invalid(key, "a non-negative integer or null", other)),
                };
            }
            _ => warn!(setting = key, "ignoring unknown setting"),
        }
        Ok(())
    }
}

fn parse_env_value(key: &str, raw: &str) -> Result<Value> {
    let raw = raw.trim();
    match key {
        FLATTENING_ENABLED => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(MapperError::InvalidConfig(format!(
                "{ENV_PREFIX}{} must be a boolean, got '{raw}'",
                key.to_uppercase()
            ))),
        },
        FLATTENING_MAX_DEPTH => {
            if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
                return Ok(Value::Null);
            }
            raw.parse::<u64>().map(Value::from).map_err(|_| {
                MapperError::InvalidConfig(format!(
                    "{ENV_PREFIX}{} must be a non-negative integer, got '{raw}'",
                    key.to_uppercase()
                ))
            })
        }
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn invalid(key: &str, expected: &str, got: &Value) -> MapperError {
    MapperError::InvalidConfig(format!("{key} must be {expected}, got {got}"))
}
