//! Editor configuration.
//!
//! Every value has a default; a missing or broken file never stops a session.

use crate::camera::CameraSettings;
use crate::tools::ToolSettings;
use crate::viewport::Projection;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "previz-editor.toml";
pub const CONFIG_PATH_ENV: &str = "PREVIZ_EDITOR_CONFIG";
pub const DEFAULT_MODEL_NAME: &str = "editorModel";
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config encode error: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
    pub pixels_per_unit: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        let projection = Projection::default();
        Self {
            width: projection.width,
            height: projection.height,
            pixels_per_unit: projection.pixels_per_unit,
        }
    }
}

impl ViewportConfig {
    pub fn projection(&self) -> Projection {
        Projection::new(self.width, self.height, self.pixels_per_unit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Name of the bound model the editor publishes into.
    pub model_name: String,
    pub history_capacity: usize,
    /// Offset applied to duplicated and pasted objects.
    pub duplicate_offset: Vec3,
    pub viewport: ViewportConfig,
    pub tools: ToolSettings,
    pub camera: CameraSettings,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            duplicate_offset: Vec3::X,
            viewport: ViewportConfig::default(),
            tools: ToolSettings::default(),
            camera: CameraSettings::default(),
        }
    }
}

impl EditorConfig {
    /// Loads from TOML, falling back to defaults on any error.
    pub fn load_from_file(path: &Path) -> Self {
        match Self::try_load_from_file(path) {
            Ok(config) => {
                log::info!("Config loaded from {}", path.display());
                config
            }
            Err(ConfigError::Io(_)) => {
                log::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => {
                log::warn!("Config {} unusable, using defaults: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn try_load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }

    /// `PREVIZ_EDITOR_CONFIG` if set, else `previz-editor.toml` in the
    /// working directory.
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}
