// Per-user settings
// Loaded from ~/.config/plandiff/settings.json

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::Color;

/// chrono format for the timestamp in marked file names.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Marking
    #[serde(rename = "mark.color")]
    pub mark_color: String,

    // Indicator sentinels
    #[serde(rename = "indicator.changed")]
    pub indicator_changed: String,

    #[serde(rename = "indicator.unchanged")]
    pub indicator_unchanged: String,

    // Profile
    #[serde(rename = "profile.path")]
    pub profile_path: Option<PathBuf>,  // None = built-in profile

    // Output
    #[serde(rename = "output.timestampFormat")]
    pub timestamp_format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mark_color: "#FF0000".to_string(),
            indicator_changed: "有".to_string(),
            indicator_unchanged: "無".to_string(),
            profile_path: None,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

const DEFAULT_CONFIG: &str = r##"{
    // Font color for changed cells (#RRGGBB)
    "mark.color": "#FF0000",

    // Values written to indicator cells
    "indicator.changed": "有",
    "indicator.unchanged": "無",

    // Comparison profile (TOML); null = built-in plan profile
    "profile.path": null,

    // chrono format for the timestamp in marked file names
    "output.timestampFormat": "%Y%m%d%H%M%S"
}
"##;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plandiff");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`. A missing file is created with defaults; an
    /// unreadable or malformed file falls back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            Self::create_default_file(path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), "error parsing settings.json: {e}; using defaults");
                Self::default()
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), "error reading settings.json: {e}");
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring `//` comment lines.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Mark color as 0xRRGGBB. A malformed value falls back to red.
    pub fn mark_rgb(&self) -> u32 {
        match Color::parse(&self.mark_color) {
            Some(color) => color.to_hex(),
            None => {
                tracing::warn!(value = %self.mark_color, "invalid mark.color, using #FF0000");
                0xFF0000
            }
        }
    }

    /// Timestamp format for marked file names. A format chrono cannot
    /// render falls back to the default.
    pub fn timestamp_format(&self) -> &str {
        let invalid = StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error));
        if invalid {
            tracing::warn!(
                value = %self.timestamp_format,
                "invalid output.timestampFormat, using {DEFAULT_TIMESTAMP_FORMAT}"
            );
            return DEFAULT_TIMESTAMP_FORMAT;
        }
        &self.timestamp_format
    }

    /// Create default settings file with comments
    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!("error creating config directory: {e}");
                return;
            }
        }

        if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
            tracing::warn!("error writing default settings.json: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_parses_to_defaults() {
        assert_eq!(Settings::parse(DEFAULT_CONFIG).unwrap(), Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings = Settings::parse(
            r##"{
    // only the color
    "mark.color": "#0000FF"
}"##,
        )
        .unwrap();
        assert_eq!(settings.mark_rgb(), 0x0000FF);
        assert_eq!(settings.indicator_changed, "有");
    }

    #[test]
    fn bad_color_falls_back_to_red() {
        let settings = Settings { mark_color: "red".into(), ..Default::default() };
        assert_eq!(settings.mark_rgb(), 0xFF0000);
    }

    #[test]
    fn missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plandiff").join("settings.json");

        let settings = Settings::load_from(&path);
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn bad_timestamp_format_falls_back() {
        let settings = Settings { timestamp_format: "%Y%Q".into(), ..Default::default() };
        assert_eq!(settings.timestamp_format(), DEFAULT_TIMESTAMP_FORMAT);

        let settings = Settings { timestamp_format: "%Y-%m-%d".into(), ..Default::default() };
        assert_eq!(settings.timestamp_format(), "%Y-%m-%d");
    }

    #[test]
    fn timestamp_format_is_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "output.timestampFormat": "%Y%m%d" }"#).unwrap();
        assert_eq!(Settings::load_from(&path).timestamp_format(), "%Y%m%d");
    }
}
