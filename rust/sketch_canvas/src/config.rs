//! Canvas Configuration
//!
//! Read once at startup from `<config_dir>/sketch_canvas/config.toml` on
//! desktop. Every field is optional; missing ones take the defaults below.
//!
//! ```toml
//! width = 1024
//! height = 500
//! history_limit = 32
//! color = "#1e90ff"
//! export_dir = "/home/me/Pictures"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::color::Rgb;
use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::tool::ToolState;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    /// Canvas size in pixels
    pub width: u32,
    pub height: u32,
    /// Color a blank or cleared canvas is filled with
    pub background: String,
    /// Undo entries kept before the oldest is evicted, 0 for unbounded
    pub history_limit: usize,
    /// Key of the auto-saved image in the key-value store
    pub storage_key: String,
    pub jpeg_quality: u8,
    /// Font for the text tool; the system sans-serif face when unset
    pub font_path: Option<PathBuf>,
    /// Where exported files go on desktop; the working directory when unset
    pub export_dir: Option<PathBuf>,
    /// Initial control values
    pub color: String,
    pub stroke_width: f32,
    pub opacity: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: "#ffffff".to_owned(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            storage_key: "savedDrawing".to_owned(),
            jpeg_quality: 92,
            font_path: None,
            export_dir: None,
            color: "#000000".to_owned(),
            stroke_width: 5.0,
            opacity: 1.0,
        }
    }
}

impl CanvasConfig {
    #[cfg(not(target_arch = "wasm32"))]
    const FILENAME: &'static str = "config.toml";

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// `<config_dir>/sketch_canvas/config.toml`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push(env!("CARGO_PKG_NAME"));
        path.push(Self::FILENAME);
        Some(path)
    }

    /// Load the user's config, falling back to defaults when there is none
    /// or it can't be used.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            log::warn!("No config directory available, using defaults");
            return Self::default();
        };
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::from_file(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyCanvas {
                width: self.width,
                height: self.height,
            });
        }
        self.background_color()?;
        self.initial_tool_state()?;
        Ok(())
    }

    pub fn background_color(&self) -> Result<Rgb, ConfigError> {
        Ok(Rgb::from_hex(&self.background)?)
    }

    pub fn initial_tool_state(&self) -> Result<ToolState, ConfigError> {
        let color = Rgb::from_hex(&self.color)?;
        Ok(ToolState::new(color, self.stroke_width, self.opacity)?)
    }
}
