//! Interchangeable vertex layouts.
//!
//! A layout fixes three word/byte formats:
//! - the host's input vertex (words per vertex in a [`TessellationBatch`]),
//! - the packed polygon vertex kept in the scratch [`PolygonBuffer`],
//! - the finished GPU vertex written by [`VertexLayout::serialize`].
//!
//! Finished-vertex field tables (little-endian, byte offsets):
//!
//! | layout            | fields                                                                 | stride |
//! |-------------------|------------------------------------------------------------------------|--------|
//! | baseline          | pos 3×f32, uv 2×u16 or 2×f32, color 4×u8, brightness 2×i16              | 24 / 28 |
//! | extended lighting | pos 3×f32, uv 2×u16 or 2×f32, color 4×u8, brightness r/g/b 3×(2×i16)    | 32 / 36 |
//! | shader extended   | pos, uv 2×f32, color, brightness, entity 2×u32, normal 3×f32, tangent 4×f32, mid-uv 2×f32 | 72 |
//!
//! [`TessellationBatch`]: crate::batch::TessellationBatch
//! [`PolygonBuffer`]: crate::scratch::PolygonBuffer

use facet_geom::Vec3;

use crate::batch::BatchFlags;
use crate::config::{LayoutKind, MeshConfig};
use crate::constants::{
    COMPACT_UV_SCALE, DEFAULT_BRIGHTNESS, DEFAULT_COLOR, POLYGON_OFFSET_XPOS, POLYGON_OFFSET_YPOS,
    POLYGON_OFFSET_ZPOS,
};
use crate::writer::BufferWriter;

// Packed polygon vertex word offsets shared by every layout
const POLYGON_OFFSET_U: usize = 3;
const POLYGON_OFFSET_V: usize = 4;
const POLYGON_OFFSET_C: usize = 5;
// Baseline and shader: single packed brightness
const POLYGON_OFFSET_B: usize = 6;
// Extended lighting: per-channel brightness
const POLYGON_OFFSET_BR: usize = 6;
// Shader: extra block copied verbatim (entity data, normal, tangent, mid-texture)
const POLYGON_OFFSET_SHADER_EXTRA: usize = 7;
const SHADER_EXTRA_WORDS: usize = 2 + 3 + 4 + 2;

/// Numeric type of one attribute component.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ComponentType {
    Float,
    UnsignedByte,
    Short,
    UnsignedShort,
    UnsignedInt,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub components: usize,
    pub component_bytes: usize,
    pub ty: ComponentType,
    /// Byte offset inside one vertex.
    pub offset: usize,
}

impl VertexAttribute {
    #[inline]
    pub fn size(&self) -> usize {
        self.components * self.component_bytes
    }
}

/// Ordered attribute list used to bind a finished buffer for drawing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeSet {
    attributes: Vec<VertexAttribute>,
    stride: usize,
}

impl AttributeSet {
    pub fn add_attribute(
        &mut self,
        name: &'static str,
        components: usize,
        component_bytes: usize,
        ty: ComponentType,
    ) {
        let attr = VertexAttribute {
            name,
            components,
            component_bytes,
            ty,
            offset: self.stride,
        };
        self.stride += attr.size();
        self.attributes.push(attr);
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn get(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VertexAttribute> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// One host vertex in structured form, for building raw input streams.
/// Fields a layout does not carry are ignored when it is written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputVertex {
    pub pos: Vec3,
    pub uv: [f32; 2],
    pub color: u32,
    /// Host-packed normal word (baseline and extended-lighting streams).
    pub packed_normal: u32,
    pub brightness: u32,
    pub brightness_rgb: [u32; 3],
    pub entity: [u32; 2],
    pub normal: Vec3,
    pub tangent: [f32; 4],
    pub mid_uv: [f32; 2],
}

impl InputVertex {
    pub fn new(pos: Vec3, uv: [f32; 2]) -> Self {
        Self {
            pos,
            uv,
            ..Self::default()
        }
    }
}

impl Default for InputVertex {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            uv: [0.0; 2],
            color: DEFAULT_COLOR,
            packed_normal: 0,
            brightness: DEFAULT_BRIGHTNESS,
            brightness_rgb: [DEFAULT_BRIGHTNESS; 3],
            entity: [0; 2],
            normal: Vec3::ZERO,
            tangent: [0.0; 4],
            mid_uv: [0.0; 2],
        }
    }
}

/// Vertex layout strategy, chosen once per rendering configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VertexLayout {
    /// Position, UV, packed color, packed brightness.
    Baseline { compact_uv: bool },
    /// Baseline with separate red/green/blue brightness words.
    ExtendedLighting { compact_uv: bool },
    /// Shader-pack layout; UVs are always full precision.
    ShaderExtended,
}

impl VertexLayout {
    pub fn from_config(config: &MeshConfig) -> Self {
        let compact_uv = config.short_uv;
        match config.layout {
            LayoutKind::Baseline => VertexLayout::Baseline { compact_uv },
            LayoutKind::ExtendedLighting => VertexLayout::ExtendedLighting { compact_uv },
            LayoutKind::ShaderExtended => VertexLayout::ShaderExtended,
        }
    }

    pub fn kind(self) -> LayoutKind {
        match self {
            VertexLayout::Baseline { .. } => LayoutKind::Baseline,
            VertexLayout::ExtendedLighting { .. } => LayoutKind::ExtendedLighting,
            VertexLayout::ShaderExtended => LayoutKind::ShaderExtended,
        }
    }

    #[inline]
    pub fn compact_uv(self) -> bool {
        match self {
            VertexLayout::Baseline { compact_uv }
            | VertexLayout::ExtendedLighting { compact_uv } => compact_uv,
            VertexLayout::ShaderExtended => false,
        }
    }

    /// Words per vertex in the host's input stream.
    #[inline]
    pub fn input_vertex_size(self) -> usize {
        match self {
            // pos + uv + color + normal + brightness
            VertexLayout::Baseline { .. } => 3 + 2 + 1 + 1 + 1,
            // pos + uv + color + normal + brightness rgb + 2 unused
            VertexLayout::ExtendedLighting { .. } => 3 + 2 + 1 + 1 + 3 + 2,
            // pos + uv + color + brightness + entity + normal + tangent + mid-uv
            VertexLayout::ShaderExtended => 3 + 2 + 1 + 1 + 2 + 3 + 4 + 2,
        }
    }

    /// Words per vertex in the polygon buffer.
    #[inline]
    pub fn polygon_vertex_size(self) -> usize {
        match self {
            VertexLayout::Baseline { .. } => 3 + 2 + 1 + 1,
            VertexLayout::ExtendedLighting { .. } => 3 + 2 + 1 + 3,
            VertexLayout::ShaderExtended => 3 + 2 + 1 + 1 + SHADER_EXTRA_WORDS,
        }
    }

    /// Words per packed polygon: its vertices plus the trailing normal word.
    #[inline]
    pub fn polygon_size(self, vertices_per_polygon: usize) -> usize {
        self.polygon_vertex_size() * vertices_per_polygon + 1
    }

    /// Bytes per finished vertex.
    #[inline]
    pub fn stride(self) -> usize {
        let uv = if self.compact_uv() { 2 * 2 } else { 2 * 4 };
        match self {
            VertexLayout::Baseline { .. } => 12 + uv + 4 + 4,
            VertexLayout::ExtendedLighting { .. } => 12 + uv + 4 + 3 * 4,
            VertexLayout::ShaderExtended => 4 * self.polygon_vertex_size(),
        }
    }

    pub fn attributes(self) -> AttributeSet {
        let mut attrs = AttributeSet::default();
        attrs.add_attribute("POS", 3, 4, ComponentType::Float);
        if self.compact_uv() {
            attrs.add_attribute("TEXTURE", 2, 2, ComponentType::UnsignedShort);
        } else {
            attrs.add_attribute("TEXTURE", 2, 4, ComponentType::Float);
        }
        attrs.add_attribute("COLOR", 4, 1, ComponentType::UnsignedByte);
        match self {
            VertexLayout::Baseline { .. } => {
                attrs.add_attribute("BRIGHTNESS", 2, 2, ComponentType::Short);
            }
            VertexLayout::ExtendedLighting { .. } => {
                attrs.add_attribute("BRIGHTNESS_RED", 2, 2, ComponentType::Short);
                attrs.add_attribute("BRIGHTNESS_GREEN", 2, 2, ComponentType::Short);
                attrs.add_attribute("BRIGHTNESS_BLUE", 2, 2, ComponentType::Short);
            }
            VertexLayout::ShaderExtended => {
                attrs.add_attribute("BRIGHTNESS", 2, 2, ComponentType::Short);
                attrs.add_attribute("ENTITY_DATA_1", 1, 4, ComponentType::UnsignedInt);
                attrs.add_attribute("ENTITY_DATA_2", 1, 4, ComponentType::UnsignedInt);
                attrs.add_attribute("NORMAL", 3, 4, ComponentType::Float);
                attrs.add_attribute("TANGENT", 4, 4, ComponentType::Float);
                attrs.add_attribute("MIDTEXTURE", 2, 4, ComponentType::Float);
            }
        }
        attrs
    }

    /// Appends one vertex to a raw input stream in this layout's host format.
    pub fn push_input_vertex(self, v: &InputVertex, out: &mut Vec<u32>) {
        out.extend_from_slice(&[
            v.pos.x.to_bits(),
            v.pos.y.to_bits(),
            v.pos.z.to_bits(),
            v.uv[0].to_bits(),
            v.uv[1].to_bits(),
            v.color,
        ]);
        match self {
            VertexLayout::Baseline { .. } => {
                out.extend_from_slice(&[v.packed_normal, v.brightness]);
            }
            VertexLayout::ExtendedLighting { .. } => {
                out.push(v.packed_normal);
                out.extend_from_slice(&v.brightness_rgb);
                out.extend_from_slice(&[0, 0]);
            }
            VertexLayout::ShaderExtended => {
                out.push(v.brightness);
                out.extend_from_slice(&v.entity);
                out.extend_from_slice(&[
                    v.normal.x.to_bits(),
                    v.normal.y.to_bits(),
                    v.normal.z.to_bits(),
                ]);
                out.extend(v.tangent.iter().map(|t| t.to_bits()));
                out.extend(v.mid_uv.iter().map(|t| t.to_bits()));
            }
        }
    }

    /// Packs one input vertex into a polygon-buffer vertex, translating its
    /// position and substituting defaults for attributes the batch lacks.
    pub fn polygonize(self, src: &[u32], dst: &mut [u32], offset: Vec3, flags: BatchFlags) {
        dst[POLYGON_OFFSET_XPOS] = (f32::from_bits(src[0]) + offset.x).to_bits();
        dst[POLYGON_OFFSET_YPOS] = (f32::from_bits(src[1]) + offset.y).to_bits();
        dst[POLYGON_OFFSET_ZPOS] = (f32::from_bits(src[2]) + offset.z).to_bits();

        dst[POLYGON_OFFSET_U] = src[3];
        dst[POLYGON_OFFSET_V] = src[4];

        dst[POLYGON_OFFSET_C] = if flags.has_color { src[5] } else { DEFAULT_COLOR };

        match self {
            VertexLayout::Baseline { .. } => {
                dst[POLYGON_OFFSET_B] = if flags.has_brightness {
                    src[7]
                } else {
                    DEFAULT_BRIGHTNESS
                };
            }
            VertexLayout::ExtendedLighting { .. } => {
                let channels = &mut dst[POLYGON_OFFSET_BR..POLYGON_OFFSET_BR + 3];
                if flags.has_brightness {
                    channels.copy_from_slice(&src[7..10]);
                } else {
                    channels.fill(DEFAULT_BRIGHTNESS);
                }
            }
            VertexLayout::ShaderExtended => {
                dst[POLYGON_OFFSET_B] = if flags.has_brightness {
                    src[6]
                } else {
                    DEFAULT_BRIGHTNESS
                };
                let extra =
                    POLYGON_OFFSET_SHADER_EXTRA..POLYGON_OFFSET_SHADER_EXTRA + SHADER_EXTRA_WORDS;
                dst[extra.clone()].copy_from_slice(&src[extra]);
            }
        }
    }

    /// Writes the vertices of the polygon starting at `polygon_offset` to `out`.
    ///
    /// Every vertex must end on a multiple of `expected_stride`; anything else
    /// is a layout programming error.
    pub fn serialize(
        self,
        polygons: &[u32],
        polygon_offset: usize,
        out: &mut BufferWriter,
        expected_stride: usize,
        vertices_per_polygon: usize,
    ) {
        let vertex_size = self.polygon_vertex_size();
        for vi in 0..vertices_per_polygon {
            let v = &polygons[polygon_offset + vi * vertex_size..][..vertex_size];
            match self {
                VertexLayout::ShaderExtended => {
                    for &word in v {
                        out.write_u32(word);
                    }
                }
                VertexLayout::Baseline { compact_uv }
                | VertexLayout::ExtendedLighting { compact_uv } => {
                    out.write_f32(f32::from_bits(v[POLYGON_OFFSET_XPOS]));
                    out.write_f32(f32::from_bits(v[POLYGON_OFFSET_YPOS]));
                    out.write_f32(f32::from_bits(v[POLYGON_OFFSET_ZPOS]));

                    let u = f32::from_bits(v[POLYGON_OFFSET_U]);
                    let w = f32::from_bits(v[POLYGON_OFFSET_V]);
                    if compact_uv {
                        out.write_u16(compact_uv_component(u));
                        out.write_u16(compact_uv_component(w));
                    } else {
                        out.write_f32(u);
                        out.write_f32(w);
                    }

                    out.write_u32(v[POLYGON_OFFSET_C]);
                    if let VertexLayout::ExtendedLighting { .. } = self {
                        for &channel in &v[POLYGON_OFFSET_BR..POLYGON_OFFSET_BR + 3] {
                            out.write_u32(channel);
                        }
                    } else {
                        out.write_u32(v[POLYGON_OFFSET_B]);
                    }
                }
            }
            debug_assert_eq!(
                out.position() % expected_stride,
                0,
                "vertex write misaligned with stride {expected_stride}"
            );
        }
    }
}

/// 16-bit fixed-point UV: rounds half up, then keeps the low 16 bits, so 1.0
/// encodes as 0x8000 for an unsigned-short attribute.
#[inline]
pub fn compact_uv_component(v: f32) -> u16 {
    (v * COMPACT_UV_SCALE + 0.5).floor() as i32 as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_uv_rounds_and_wraps() {
        assert_eq!(compact_uv_component(0.0), 0);
        assert_eq!(compact_uv_component(0.5), 0x4000);
        assert_eq!(compact_uv_component(1.0), 0x8000);
        assert_eq!(compact_uv_component(1.5 / 32768.0), 2);
    }

    #[test]
    fn input_stream_matches_declared_size() {
        for layout in [
            VertexLayout::Baseline { compact_uv: true },
            VertexLayout::ExtendedLighting { compact_uv: false },
            VertexLayout::ShaderExtended,
        ] {
            let mut out = Vec::new();
            layout.push_input_vertex(&InputVertex::default(), &mut out);
            assert_eq!(out.len(), layout.input_vertex_size());
        }
    }
}
