//! Shared constants for facet-mesh. Centralizes the packed-format magic numbers.

use facet_geom::SECTION_EDGE;

/// Every encoded polygon is a triangle.
pub const VERTICES_PER_POLYGON: usize = 3;

// Word offsets of the position inside one packed polygon vertex (all layouts)
pub const POLYGON_OFFSET_XPOS: usize = 0;
pub const POLYGON_OFFSET_YPOS: usize = 1;
pub const POLYGON_OFFSET_ZPOS: usize = 2;

/// Sections per region edge; batch translations are reduced modulo the region span.
pub const REGION_SECTIONS: i32 = 16;
pub const REGION_SPAN_BLOCKS: f64 = (REGION_SECTIONS * SECTION_EDGE) as f64;

/// Packs sky and block light levels the way the host lightmap expects them.
#[inline]
pub const fn pack_brightness(sky: u32, block: u32) -> u32 {
    (sky << 20) | (block << 4)
}

/// Full sky and block light.
pub const DEFAULT_BRIGHTNESS: u32 = pack_brightness(15, 15);
/// Opaque white.
pub const DEFAULT_COLOR: u32 = 0xFFFF_FFFF;

/// Fixed-point scale of the compact 16-bit UV encoding.
pub const COMPACT_UV_SCALE: f32 = 32768.0;

// Host primitive codes
pub const DRAW_MODE_TRIANGLES: u32 = 4;
pub const DRAW_MODE_QUADS: u32 = 7;

/// Initial word capacity of a fresh polygon buffer.
pub(crate) const INITIAL_POLYGON_WORDS: usize = 1024;

/// Maps a host batch translation to the region-relative offset added to its vertices.
#[inline]
pub fn to_relative_offset(translation: f64) -> f32 {
    let d = -translation;
    (d - (d / REGION_SPAN_BLOCKS).floor() * REGION_SPAN_BLOCKS) as f32
}
