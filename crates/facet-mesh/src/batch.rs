//! Raw tessellation batches handed over by the host renderer.

use crate::constants::{DRAW_MODE_QUADS, DRAW_MODE_TRIANGLES};

/// Primitive mode of a batch, keyed by the host's primitive code.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DrawMode {
    Triangles,
    Quads,
    Unsupported(u32),
}

impl DrawMode {
    #[inline]
    pub fn from_code(code: u32) -> DrawMode {
        match code {
            DRAW_MODE_TRIANGLES => DrawMode::Triangles,
            DRAW_MODE_QUADS => DrawMode::Quads,
            other => DrawMode::Unsupported(other),
        }
    }

    #[inline]
    pub fn code(self) -> u32 {
        match self {
            DrawMode::Triangles => DRAW_MODE_TRIANGLES,
            DrawMode::Quads => DRAW_MODE_QUADS,
            DrawMode::Unsupported(code) => code,
        }
    }

    /// Input vertices consumed per primitive, `None` for unsupported modes.
    #[inline]
    pub fn input_vertices(self) -> Option<usize> {
        match self {
            DrawMode::Triangles => Some(3),
            DrawMode::Quads => Some(4),
            DrawMode::Unsupported(_) => None,
        }
    }

    #[inline]
    pub fn triangulates(self) -> bool {
        matches!(self, DrawMode::Quads)
    }
}

/// Which optional attributes a batch actually carries.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BatchFlags {
    pub has_texture: bool,
    pub has_brightness: bool,
    pub has_color: bool,
    pub has_normals: bool,
}

impl BatchFlags {
    const TEXTURE: u8 = 1;
    const BRIGHTNESS: u8 = 2;
    const COLOR: u8 = 4;
    const NORMALS: u8 = 8;

    pub const fn new(
        has_texture: bool,
        has_brightness: bool,
        has_color: bool,
        has_normals: bool,
    ) -> Self {
        Self {
            has_texture,
            has_brightness,
            has_color,
            has_normals,
        }
    }

    /// Decodes the host's one-byte flag encoding.
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            has_texture: bits & Self::TEXTURE != 0,
            has_brightness: bits & Self::BRIGHTNESS != 0,
            has_color: bits & Self::COLOR != 0,
            has_normals: bits & Self::NORMALS != 0,
        }
    }

    pub const fn bits(self) -> u8 {
        let mut bits = 0;
        if self.has_texture {
            bits |= Self::TEXTURE;
        }
        if self.has_brightness {
            bits |= Self::BRIGHTNESS;
        }
        if self.has_color {
            bits |= Self::COLOR;
        }
        if self.has_normals {
            bits |= Self::NORMALS;
        }
        bits
    }
}

impl Default for BatchFlags {
    /// Texture, brightness and color present; no normals.
    fn default() -> Self {
        Self::new(true, true, true, false)
    }
}

/// One flush of the host tessellator: a flat word buffer in the host's own
/// per-vertex stride plus the translation that was active while it was filled.
#[derive(Clone, Debug)]
pub struct TessellationBatch {
    pub mode: DrawMode,
    pub vertex_count: usize,
    pub data: Vec<u32>,
    pub translation: [f64; 3],
    pub flags: BatchFlags,
}

impl TessellationBatch {
    pub fn new(mode: DrawMode, vertex_count: usize, data: Vec<u32>) -> Self {
        Self {
            mode,
            vertex_count,
            data,
            translation: [0.0; 3],
            flags: BatchFlags::default(),
        }
    }

    pub fn with_translation(mut self, translation: [f64; 3]) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_flags(mut self, flags: BatchFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_byte_round_trips() {
        for bits in 0u8..16 {
            assert_eq!(BatchFlags::from_bits(bits).bits(), bits);
        }
        let f = BatchFlags::from_bits(0b0101);
        assert!(f.has_texture && f.has_color);
        assert!(!f.has_brightness && !f.has_normals);
    }

    #[test]
    fn draw_mode_codes() {
        assert_eq!(DrawMode::from_code(7), DrawMode::Quads);
        assert_eq!(DrawMode::from_code(4), DrawMode::Triangles);
        assert_eq!(DrawMode::from_code(1), DrawMode::Unsupported(1));
        assert_eq!(DrawMode::Unsupported(1).input_vertices(), None);
        assert!(DrawMode::Quads.triangulates());
    }
}
