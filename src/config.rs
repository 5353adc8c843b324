//! Configuration persistence for editor defaults

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::annotations::ToolSettings;
use crate::domain::{Color, Padding, RedactStyle, Tool};

/// Background used until the user picks another one
pub const DEFAULT_BACKGROUND: &str = "linear-gradient(135deg, #667eea 0%, #764ba2 100%)";

/// Initial style configuration of an editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Tool active when the editor opens
    pub tool: Tool,
    pub color: Color,
    pub stroke_width: f32,
    pub font_size: f32,
    pub padding: Padding,
    /// Flat color or `linear-gradient(...)` descriptor
    pub background: String,
    pub corner_radius: f32,
    /// Pixelation block size in source pixels
    pub pixelation_block_size: u32,
    pub redact_style: RedactStyle,
    /// Font used to rasterize text objects
    pub font_path: Option<PathBuf>,
    /// Directory exports are written to
    pub save_location: PathBuf,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tool: Tool::Select,
            color: Color::default(),
            stroke_width: 3.0,
            font_size: 24.0,
            padding: Padding::uniform(32.0),
            background: DEFAULT_BACKGROUND.to_string(),
            corner_radius: 12.0,
            pixelation_block_size: 10,
            redact_style: RedactStyle::Pixelate,
            font_path: None,
            save_location: default_save_location(),
        }
    }
}

fn default_save_location() -> PathBuf {
    dirs::desktop_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Desktop")))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl EditorConfig {
    /// File name inside the application config directory
    pub const FILE_NAME: &'static str = "editor.json";

    /// `<config dir>/snipp/editor.json`, if the platform has a config dir
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("snipp").join(Self::FILE_NAME))
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            log::warn!("No config directory available, using defaults");
            return Self::default();
        };
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from_path(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Error loading config, using defaults: {err:#}");
                Self::default()
            }
        }
    }

    /// Save configuration to disk
    pub fn save(&self) {
        let Some(path) = Self::path() else {
            log::error!("No config directory available, settings not saved");
            return;
        };
        if let Err(err) = self.save_to_path(&path) {
            log::error!("Failed to save config: {err:#}");
        }
    }

    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Style settings for newly created objects
    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            color: self.color,
            stroke_width: self.stroke_width,
            font_size: self.font_size,
            block_size: self.pixelation_block_size.max(1),
            redact_style: self.redact_style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.tool, Tool::Select);
        assert_eq!(config.color, Color::rgb(0xff, 0x3b, 0x30));
        assert_eq!(config.padding, Padding::uniform(32.0));
        assert_eq!(config.background, DEFAULT_BACKGROUND);
        assert_eq!(config.corner_radius, 12.0);
        assert_eq!(config.tool_settings().block_size, 10);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("editor.json");
        let config = EditorConfig {
            tool: Tool::Arrow,
            color: Color::rgb(1, 2, 3),
            corner_radius: 0.0,
            redact_style: RedactStyle::Sample,
            font_path: Some(PathBuf::from("/fonts/Inter.ttf")),
            ..EditorConfig::default()
        };
        config.save_to_path(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"tool\": \"arrow\""));
        assert!(raw.contains("\"#010203\""));

        assert_eq!(EditorConfig::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");
        fs::write(&path, r##"{ "tool": "blur", "color": "#00ff00" }"##).unwrap();

        let config = EditorConfig::load_from_path(&path).unwrap();
        assert_eq!(config.tool, Tool::Blur);
        assert_eq!(config.color, Color::rgb(0, 255, 0));
        assert_eq!(config.stroke_width, 3.0);
        assert_eq!(config.background, DEFAULT_BACKGROUND);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");
        fs::write(&path, "{ not json").unwrap();
        let err = EditorConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().starts_with("Invalid config"));

        assert!(EditorConfig::load_from_path(&dir.path().join("missing.json")).is_err());
    }
}
