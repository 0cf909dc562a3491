use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read mesh config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid mesh config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    #[default]
    Baseline,
    ExtendedLighting,
    ShaderExtended,
}

/// Rendering toggles consumed by mesh construction and draw-range emission.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MeshConfig {
    pub cull_faces: bool,
    pub short_uv: bool,
    // Unaligned polygons farther than this many sections may be skipped.
    // Absent means unlimited.
    pub max_unaligned_polygon_distance: Option<u32>,
    pub silence_errors: bool,
    pub layout: LayoutKind,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            cull_faces: true,
            short_uv: true,
            max_unaligned_polygon_distance: None,
            silence_errors: false,
            layout: LayoutKind::Baseline,
        }
    }
}

impl MeshConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(src)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let src = fs::read_to_string(path)?;
        Self::from_toml_str(&src)
    }
}
