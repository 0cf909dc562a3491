use facet_mesh::{
    BufferWriter, ComponentType, InputVertex, LayoutKind, MeshConfig, Vec3, VertexLayout,
};

fn polygon_words(layout: VertexLayout) -> Vec<u32> {
    let mut src = Vec::new();
    for (i, p) in [Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)]
        .into_iter()
        .enumerate()
    {
        let mut v = InputVertex::new(p, [0.5, 1.0]);
        v.brightness = 0x10 + i as u32;
        v.brightness_rgb = [1, 2, 3];
        v.entity = [11, 12];
        v.tangent = [1.0, 0.0, 0.0, 1.0];
        layout.push_input_vertex(&v, &mut src);
    }
    let mut dst = vec![0u32; layout.polygon_size(3)];
    facet_mesh::encode_polygon(layout, &src, &mut dst, Vec3::ZERO, false, Default::default());
    dst
}

#[test]
fn strides_per_layout() {
    let cases = [
        (VertexLayout::Baseline { compact_uv: true }, 24),
        (VertexLayout::Baseline { compact_uv: false }, 28),
        (VertexLayout::ExtendedLighting { compact_uv: true }, 32),
        (VertexLayout::ExtendedLighting { compact_uv: false }, 36),
        (VertexLayout::ShaderExtended, 72),
    ];
    for (layout, stride) in cases {
        assert_eq!(layout.stride(), stride, "{layout:?}");
        assert_eq!(layout.attributes().stride(), stride, "{layout:?}");
    }
}

#[test]
fn input_and_polygon_vertex_sizes() {
    let base = VertexLayout::Baseline { compact_uv: true };
    let ext = VertexLayout::ExtendedLighting { compact_uv: true };
    let shader = VertexLayout::ShaderExtended;
    assert_eq!((base.input_vertex_size(), base.polygon_vertex_size()), (8, 7));
    assert_eq!((ext.input_vertex_size(), ext.polygon_vertex_size()), (12, 9));
    assert_eq!((shader.input_vertex_size(), shader.polygon_vertex_size()), (18, 18));
    assert_eq!(base.polygon_size(3), 22);
}

#[test]
fn serialized_length_is_vertices_times_stride() {
    for layout in [
        VertexLayout::Baseline { compact_uv: true },
        VertexLayout::Baseline { compact_uv: false },
        VertexLayout::ExtendedLighting { compact_uv: true },
        VertexLayout::ExtendedLighting { compact_uv: false },
        VertexLayout::ShaderExtended,
    ] {
        let words = polygon_words(layout);
        let mut out = BufferWriter::default();
        layout.serialize(&words, 0, &mut out, layout.stride(), 3);
        assert_eq!(out.into_inner().len(), 3 * layout.stride(), "{layout:?}");
    }
}

#[test]
fn baseline_compact_vertex_bytes() {
    let layout = VertexLayout::Baseline { compact_uv: true };
    let words = polygon_words(layout);
    let mut out = BufferWriter::default();
    layout.serialize(&words, 0, &mut out, layout.stride(), 3);
    let bytes = out.into_inner();
    let second = &bytes[24..48];
    assert_eq!(f32::from_le_bytes(second[0..4].try_into().unwrap()), 1.0);
    assert_eq!(u16::from_le_bytes([second[12], second[13]]), 0x4000);
    assert_eq!(u16::from_le_bytes([second[14], second[15]]), 0x8000);
    assert_eq!(u32::from_le_bytes(second[16..20].try_into().unwrap()), 0xFFFF_FFFF);
    assert_eq!(u32::from_le_bytes(second[20..24].try_into().unwrap()), 0x11);
}

#[test]
fn shader_layout_copies_words_verbatim() {
    let layout = VertexLayout::ShaderExtended;
    let words = polygon_words(layout);
    let mut out = BufferWriter::default();
    layout.serialize(&words, 0, &mut out, layout.stride(), 3);
    let bytes = out.into_inner();
    let entity = u32::from_le_bytes(bytes[28..32].try_into().unwrap());
    assert_eq!(entity, 11);
    assert_eq!(f32::from_le_bytes(bytes[12..16].try_into().unwrap()), 0.5);
}

#[test]
fn attribute_tables() {
    let attrs = VertexLayout::ExtendedLighting { compact_uv: true }.attributes();
    let names: Vec<_> = attrs.iter().map(|a| a.name).collect();
    assert_eq!(
        names,
        ["POS", "TEXTURE", "COLOR", "BRIGHTNESS_RED", "BRIGHTNESS_GREEN", "BRIGHTNESS_BLUE"]
    );
    let tex = attrs.get("TEXTURE").unwrap();
    assert_eq!((tex.offset, tex.ty), (12, ComponentType::UnsignedShort));
    assert_eq!(attrs.get("BRIGHTNESS_BLUE").unwrap().offset, 28);

    let shader = VertexLayout::ShaderExtended.attributes();
    assert_eq!(shader.len(), 9);
    assert_eq!(shader.get("MIDTEXTURE").unwrap().offset, 64);
}

#[test]
fn layout_from_config() {
    let config = MeshConfig {
        short_uv: false,
        layout: LayoutKind::ExtendedLighting,
        ..MeshConfig::default()
    };
    let layout = VertexLayout::from_config(&config);
    assert_eq!(layout, VertexLayout::ExtendedLighting { compact_uv: false });
    assert_eq!(layout.kind(), LayoutKind::ExtendedLighting);

    let shader = MeshConfig {
        layout: LayoutKind::ShaderExtended,
        ..MeshConfig::default()
    };
    assert!(!VertexLayout::from_config(&shader).compact_uv());
}
