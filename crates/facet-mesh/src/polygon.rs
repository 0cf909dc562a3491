//! Polygon encoder: raw host vertices to packed polygon words.

use facet_geom::Vec3;

use crate::batch::BatchFlags;
use crate::constants::{POLYGON_OFFSET_XPOS, POLYGON_OFFSET_YPOS, POLYGON_OFFSET_ZPOS};
use crate::layout::VertexLayout;
use crate::normal::PolygonNormal;

#[inline]
fn position_at(polygons: &[u32], vertex_offset: usize) -> Vec3 {
    Vec3::from_bits(
        polygons[vertex_offset + POLYGON_OFFSET_XPOS],
        polygons[vertex_offset + POLYGON_OFFSET_YPOS],
        polygons[vertex_offset + POLYGON_OFFSET_ZPOS],
    )
}

/// Bitwise position equality; `-0.0` and `0.0` differ here.
#[inline]
fn same_position(polygons: &[u32], a: usize, b: usize) -> bool {
    polygons[a + POLYGON_OFFSET_XPOS] == polygons[b + POLYGON_OFFSET_XPOS]
        && polygons[a + POLYGON_OFFSET_YPOS] == polygons[b + POLYGON_OFFSET_YPOS]
        && polygons[a + POLYGON_OFFSET_ZPOS] == polygons[b + POLYGON_OFFSET_ZPOS]
}

/// Classifies the triangle whose first vertex starts at `base`.
#[inline]
fn triangle_normal(polygons: &[u32], base: usize, vertex_size: usize) -> PolygonNormal {
    let p0 = position_at(polygons, base);
    let p1 = position_at(polygons, base + vertex_size);
    let p2 = position_at(polygons, base + vertex_size * 2);
    PolygonNormal::from_vector((p1 - p0).cross(p2 - p1))
}

/// Encodes one input primitive starting at `src[0]` into `dst`.
///
/// A triangle fills `layout.polygon_size(3)` words; a quad (`triangulate`)
/// fills twice that, as triangles `{0,1,2}` and `{3,0,2}`. Each polygon's
/// trailing word receives its own normal bucket.
///
/// Returns `true` when the primitive collapsed to a single point and was
/// dropped; the caller must not advance its write cursor in that case.
pub fn encode_polygon(
    layout: VertexLayout,
    src: &[u32],
    dst: &mut [u32],
    offset: Vec3,
    triangulate: bool,
    flags: BatchFlags,
) -> bool {
    let in_size = layout.input_vertex_size();
    let vs = layout.polygon_vertex_size();
    let second = layout.polygon_size(3);

    for i in 0..3 {
        layout.polygonize(&src[i * in_size..], &mut dst[i * vs..], offset, flags);
    }
    if triangulate {
        layout.polygonize(&src[3 * in_size..], &mut dst[second..], offset, flags);
        layout.polygonize(src, &mut dst[second + vs..], offset, flags);
        layout.polygonize(&src[2 * in_size..], &mut dst[second + 2 * vs..], offset, flags);
    }

    let mut dropped = (1..3).all(|i| same_position(dst, 0, i * vs));
    if triangulate && !same_position(dst, 0, second) {
        dropped = false;
    }
    if dropped {
        return true;
    }

    dst[3 * vs] = triangle_normal(dst, 0, vs) as u32;
    if triangulate {
        // A non-planar quad gets a separate normal for its second half.
        dst[second + 3 * vs] = triangle_normal(dst, second, vs) as u32;
    }
    false
}
