//! TOML scene files: meshes made of tessellation batches made of vertices.

use std::fs;
use std::path::Path;

use facet_geom::{SectionCoord, Vec3};
use facet_mesh::constants::{DEFAULT_BRIGHTNESS, DEFAULT_COLOR, DRAW_MODE_QUADS};
use facet_mesh::{BatchFlags, DrawMode, InputVertex, TessellationBatch, VertexLayout};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to read scene: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid scene: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("scene contains no meshes")]
    Empty,
}

#[derive(Deserialize, Debug)]
pub struct Scene {
    #[serde(default, rename = "mesh")]
    pub meshes: Vec<SceneMesh>,
}

#[derive(Deserialize, Debug)]
pub struct SceneMesh {
    pub section: [i32; 3],
    #[serde(default)]
    pub pass: u32,
    #[serde(default)]
    pub dimension: Option<i32>,
    #[serde(default, rename = "batch")]
    pub batches: Vec<SceneBatch>,
}

#[derive(Deserialize, Debug)]
pub struct SceneBatch {
    // Host primitive code; quads unless stated
    #[serde(default = "default_mode")]
    pub mode: u32,
    #[serde(default)]
    pub translation: [f64; 3],
    // Host flags byte: bit0 texture, bit1 brightness, bit2 color, bit3 normals
    #[serde(default)]
    pub flags: Option<u8>,
    #[serde(default)]
    pub vertices: Vec<SceneVertex>,
}

fn default_mode() -> u32 {
    DRAW_MODE_QUADS
}

#[derive(Deserialize, Debug, Clone)]
pub struct SceneVertex {
    pub pos: [f32; 3],
    #[serde(default)]
    pub uv: [f32; 2],
    #[serde(default)]
    pub color: Option<u32>,
    #[serde(default)]
    pub brightness: Option<u32>,
    #[serde(default)]
    pub normal: Option<[f32; 3]>,
}

impl SceneVertex {
    fn to_input(&self) -> InputVertex {
        let [x, y, z] = self.pos;
        let mut v = InputVertex::new(Vec3::new(x, y, z), self.uv);
        v.color = self.color.unwrap_or(DEFAULT_COLOR);
        let brightness = self.brightness.unwrap_or(DEFAULT_BRIGHTNESS);
        v.brightness = brightness;
        v.brightness_rgb = [brightness; 3];
        if let Some([nx, ny, nz]) = self.normal {
            v.normal = Vec3::new(nx, ny, nz);
        }
        v
    }
}

impl Scene {
    pub fn from_toml_str(src: &str) -> Result<Self, SceneError> {
        let scene: Scene = toml::from_str(src)?;
        if scene.meshes.is_empty() {
            return Err(SceneError::Empty);
        }
        Ok(scene)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let src = fs::read_to_string(path)?;
        Self::from_toml_str(&src)
    }
}

impl SceneMesh {
    pub fn coord(&self) -> SectionCoord {
        SectionCoord::from(self.section)
    }

    /// Encodes every batch into `layout`'s host stream.
    pub fn batches(&self, layout: VertexLayout) -> Vec<TessellationBatch> {
        self.batches
            .iter()
            .map(|b| {
                let mut data = Vec::with_capacity(b.vertices.len() * layout.input_vertex_size());
                for v in &b.vertices {
                    layout.push_input_vertex(&v.to_input(), &mut data);
                }
                let flags = b.flags.map(BatchFlags::from_bits).unwrap_or_default();
                TessellationBatch::new(DrawMode::from_code(b.mode), b.vertices.len(), data)
                    .with_translation(b.translation)
                    .with_flags(flags)
            })
            .collect()
    }
}
