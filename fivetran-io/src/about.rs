//! Mapper metadata for `--about`

use crate::config::{MapperConfig, SettingInfo};
use fivetran_format::constants::MAPPER_NAME;
use fivetran_format::Result;
use serde::Serialize;
use std::fmt::Write as _;

/// Output format of [`AboutInfo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AboutFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Markdown suitable for a README
    Markdown,
}

/// Name, version, capabilities and settings of the mapper
#[derive(Debug, Clone, Serialize)]
pub struct AboutInfo {
    /// Plugin name
    pub name: &'static str,
    /// Plugin version
    pub version: &'static str,
    /// Short description
    pub description: &'static str,
    /// Optional behaviors supported
    pub capabilities: Vec<&'static str>,
    /// Settings understood by the mapper
    pub settings: Vec<SettingInfo>,
}

impl Default for AboutInfo {
    fn default() -> Self {
        Self {
            name: MAPPER_NAME,
            version: env!("CARGO_PKG_VERSION"),
            description: "Singer inline mapper shaping streams for Fivetran destinations",
            capabilities: vec!["flattening"],
            settings: MapperConfig::settings(),
        }
    }
}

impl AboutInfo {
    /// Render in the requested format
    pub fn render(&self, format: AboutFormat) -> Result<String> {
        match format {
            AboutFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            AboutFormat::Markdown => Ok(self.to_markdown()),
        }
    }

    /// Markdown rendering
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        // writing into a String cannot fail
        let _ = writeln!(md, "# `{}`\n", self.name);
        let _ = writeln!(md, "{}\n", self.description);
        let _ = writeln!(md, "Version: {}\n", self.version);

        let _ = writeln!(md, "## Capabilities\n");
        for capability in &self.capabilities {
            let _ = writeln!(md, "* `{capability}`");
        }

        let _ = writeln!(md, "\n## Settings\n");
        let _ = writeln!(md, "| Setting | Type | Default | Description |");
        let _ = writeln!(md, "|:--------|:-----|:--------|:------------|");
        for setting in &self.settings {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} |",
                setting.name,
                setting.kind.join(", "),
                setting.default,
                setting.description
            );
        }
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_lists_settings() {
        let json = AboutInfo::default().render(AboutFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], "mapper-fivetran");
        assert_eq!(value["capabilities"], serde_json::json!(["flattening"]));
        let names: Vec<&str> = value["settings"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|s| s["name"].as_str())
            .collect();
        assert_eq!(names, vec!["flattening_enabled", "flattening_max_depth"]);
    }

    #[test]
    fn test_markdown() {
        let md = AboutInfo::default().render(AboutFormat::Markdown).unwrap();
        assert!(md.starts_with("# `mapper-fivetran`"));
        assert!(md.contains("| flattening_max_depth | integer, null | 1 |"));
    }
}
