use std::sync::Arc;

use facet_mesh::{
    BatchFlags, DrawMode, DrawRange, GpuStatus, InputVertex, MeshConfig, MeshContext, MeshCounters,
    MeshBuilder, PolygonNormal, ScratchArena, SectionCoord, Severity, TessellationBatch, Vec3,
    VertexLayout,
};

fn v(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3::new(x, y, z)
}

// Triangle whose (p1-p0) x (p2-p1) points along `n`; `n` of ZERO gives an unaligned one.
fn corners(n: PolygonNormal) -> [Vec3; 3] {
    let (a, b) = match n {
        PolygonNormal::PosX => (v(0., 1., 0.), v(0., 0., 1.)),
        PolygonNormal::NegX => (v(0., 0., 1.), v(0., 1., 0.)),
        PolygonNormal::PosY => (v(0., 0., 1.), v(1., 0., 0.)),
        PolygonNormal::NegY => (v(1., 0., 0.), v(0., 0., 1.)),
        PolygonNormal::PosZ => (v(1., 0., 0.), v(0., 1., 0.)),
        PolygonNormal::NegZ => (v(0., 1., 0.), v(1., 0., 0.)),
        PolygonNormal::None => (v(1., 0., 0.), v(0., 1., 1.)),
    };
    let p0 = v(2., 2., 2.);
    let p1 = p0 + a;
    [p0, p1, p1 + b]
}

fn triangles(layout: VertexLayout, normals: &[PolygonNormal]) -> TessellationBatch {
    let mut data = Vec::new();
    for &n in normals {
        for p in corners(n) {
            layout.push_input_vertex(&InputVertex::new(p, [0.25, 0.5]), &mut data);
        }
    }
    TessellationBatch::new(DrawMode::Triangles, normals.len() * 3, data)
}

const ALL: [PolygonNormal; 7] = [
    PolygonNormal::NegY,
    PolygonNormal::PosX,
    PolygonNormal::None,
    PolygonNormal::NegZ,
    PolygonNormal::PosY,
    PolygonNormal::NegX,
    PolygonNormal::PosZ,
];

fn build(ctx: &MeshContext, arena: &mut ScratchArena, pass: u32, batch: &TessellationBatch) -> facet_mesh::ChunkMesh {
    let mut builder = MeshBuilder::begin(SectionCoord::new(0, 0, 0), pass, arena, ctx);
    builder.ingest(batch);
    builder.finish()
}

#[test]
fn primary_pass_is_bucket_ordered() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let mesh = build(&ctx, &mut arena, 0, &triangles(ctx.layout, &ALL));
    assert_eq!(mesh.polygon_count(), 7);
    let starts = mesh.sub_mesh_starts();
    for (slot, start) in starts.iter().enumerate() {
        assert_eq!(*start, Some(slot));
    }
    assert_eq!(mesh.sub_mesh_start(PolygonNormal::None), Some(0));
    assert_eq!(mesh.sub_mesh_start(PolygonNormal::NegY), Some(6));
    assert_eq!(
        mesh.bytes().map(<[u8]>::len),
        Some(7 * 3 * ctx.layout.stride())
    );
    assert!(arena.polygons.is_empty());
}

#[test]
fn all_buckets_visible_from_inside_merge_to_one_range() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let mesh = build(&ctx, &mut arena, 0, &triangles(ctx.layout, &ALL));
    let ranges = mesh.visible_ranges(SectionCoord::new(0, 0, 0), 0, &ctx.config);
    assert_eq!(
        ranges,
        vec![DrawRange {
            first_vertex: 0,
            vertex_count: 21
        }]
    );
}

#[test]
fn hidden_bucket_splits_ranges() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let mut mesh = build(&ctx, &mut arena, 0, &triangles(ctx.layout, &ALL));
    mesh.mark_resident(100);

    // East of the mesh: the -X bucket (slot 4) faces away.
    let ranges = mesh.visible_ranges(SectionCoord::new(5, 0, 0), 0, &ctx.config);
    assert_eq!(
        ranges,
        vec![
            DrawRange { first_vertex: 100, vertex_count: 12 },
            DrawRange { first_vertex: 115, vertex_count: 6 },
        ]
    );

    // West of the mesh: the +X bucket (slot 2) faces away.
    let ranges = mesh.visible_ranges(SectionCoord::new(-5, 0, 0), 0, &ctx.config);
    assert_eq!(
        ranges,
        vec![
            DrawRange { first_vertex: 100, vertex_count: 6 },
            DrawRange { first_vertex: 109, vertex_count: 12 },
        ]
    );
}

#[test]
fn empty_buckets_do_not_break_or_end_ranges() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let batch = triangles(ctx.layout, &[PolygonNormal::NegY, PolygonNormal::PosY]);
    let mesh = build(&ctx, &mut arena, 0, &batch);
    assert_eq!(mesh.sub_mesh_start(PolygonNormal::PosY), Some(0));
    assert_eq!(mesh.sub_mesh_start(PolygonNormal::NegY), Some(1));
    assert_eq!(mesh.sub_mesh_start(PolygonNormal::PosX), None);

    let above = mesh.visible_ranges(SectionCoord::new(0, 5, 0), 0, &ctx.config);
    assert_eq!(above, vec![DrawRange { first_vertex: 0, vertex_count: 3 }]);
    let below = mesh.visible_ranges(SectionCoord::new(0, -5, 0), 0, &ctx.config);
    assert_eq!(below, vec![DrawRange { first_vertex: 3, vertex_count: 3 }]);
    let inside = mesh.visible_ranges(SectionCoord::new(0, 0, 0), 0, &ctx.config);
    assert_eq!(inside, vec![DrawRange { first_vertex: 0, vertex_count: 6 }]);
}

#[test]
fn culling_disabled_emits_whole_buffer() {
    let config = MeshConfig {
        cull_faces: false,
        ..MeshConfig::default()
    };
    let ctx = MeshContext::new(config);
    let mut arena = ScratchArena::new();
    let mut mesh = build(&ctx, &mut arena, 0, &triangles(ctx.layout, &ALL));
    mesh.mark_resident(9);
    let mut out = Vec::new();
    let n = mesh.emit_visible_ranges(SectionCoord::new(40, -40, 40), 0, &ctx.config, &mut out);
    assert_eq!(n, 1);
    assert_eq!(out, vec![DrawRange { first_vertex: 9, vertex_count: 21 }]);
}

#[test]
fn unaligned_bucket_is_distance_gated_after_primary_pass() {
    let config = MeshConfig {
        max_unaligned_polygon_distance: Some(2),
        ..MeshConfig::default()
    };
    let ctx = MeshContext::new(config);
    let mut arena = ScratchArena::new();
    let batch = triangles(ctx.layout, &[PolygonNormal::None]);

    let primary = build(&ctx, &mut arena, 0, &batch);
    let far = SectionCoord::new(10, 0, 0);
    assert_eq!(primary.visible_ranges(far, 0, &ctx.config).len(), 1);

    let later = build(&ctx, &mut arena, 1, &batch);
    assert!(later.visible_ranges(far, 1, &ctx.config).is_empty());
    assert_eq!(later.visible_ranges(SectionCoord::new(1, 0, 0), 1, &ctx.config).len(), 1);
}

#[test]
fn later_pass_keeps_ingestion_order() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let mesh = build(&ctx, &mut arena, 1, &triangles(ctx.layout, &ALL));
    let mut starts = [None; PolygonNormal::COUNT];
    starts[0] = Some(0);
    assert_eq!(mesh.sub_mesh_starts(), starts);

    // First serialized vertex is the first ingested polygon's first corner.
    let bytes = mesh.bytes().unwrap_or_default();
    let x = f32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let y = f32::from_le_bytes(bytes[4..8].try_into().unwrap());
    let first = corners(ALL[0])[0];
    assert_eq!((x, y), (first.x, first.y));
}

#[test]
fn quads_triangulate_with_per_half_normals() {
    let ctx = MeshContext::default();
    let layout = ctx.layout;
    let mut data = Vec::new();
    for p in [v(0., 0., 0.), v(1., 0., 0.), v(1., 1., 0.), v(0., 1., 0.)] {
        layout.push_input_vertex(&InputVertex::new(p, [0.0, 0.0]), &mut data);
    }
    let batch = TessellationBatch::new(DrawMode::Quads, 4, data);
    let mut arena = ScratchArena::new();
    let mesh = build(&ctx, &mut arena, 0, &batch);
    assert_eq!(mesh.polygon_count(), 2);
    assert_eq!(mesh.vertex_count(), 6);
    assert_eq!(mesh.sub_mesh_start(PolygonNormal::PosZ), Some(0));
}

#[test]
fn zero_vertex_batch_is_ignored_but_counted() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let mut builder = MeshBuilder::begin(SectionCoord::new(1, 2, 3), 0, &mut arena, &ctx);
    let empty = TessellationBatch::new(DrawMode::Unsupported(1), 0, Vec::new())
        .with_flags(BatchFlags::new(false, false, false, false));
    builder.ingest(&empty);
    let mesh = builder.finish();
    assert_eq!(mesh.batch_count(), 1);
    assert_eq!(mesh.polygon_count(), 0);
    assert!(mesh.diagnostics().is_empty());
    assert!(mesh.visible_ranges(SectionCoord::new(1, 2, 3), 0, &ctx.config).is_empty());
}

#[test]
fn unsupported_mode_discards_geometry_with_error() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let mut builder = MeshBuilder::begin(SectionCoord::new(0, 0, 0), 0, &mut arena, &ctx).with_dimension(-1);
    builder.ingest(&triangles(ctx.layout, &ALL));
    let mut bad = triangles(ctx.layout, &[PolygonNormal::PosX]);
    bad.mode = DrawMode::Unsupported(1);
    builder.ingest(&bad);
    let mesh = builder.finish();
    assert_eq!(mesh.polygon_count(), 0);
    assert!(mesh.has_errors());
    assert!(
        mesh.diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Error && d.message == "Unsupported draw mode: 1")
    );
}

#[test]
fn missing_texture_is_an_error_and_silencing_hides_it() {
    let flags = BatchFlags::new(false, true, true, false);
    for silence in [false, true] {
        let ctx = MeshContext::new(MeshConfig {
            silence_errors: silence,
            ..MeshConfig::default()
        });
        let mut arena = ScratchArena::new();
        let batch = triangles(ctx.layout, &[PolygonNormal::PosX]).with_flags(flags);
        let mesh = build(&ctx, &mut arena, 0, &batch);
        assert_eq!(mesh.polygon_count(), 0);
        assert_eq!(mesh.has_errors(), !silence);
    }
}

#[test]
fn truncated_data_is_rejected() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let mut batch = triangles(ctx.layout, &[PolygonNormal::PosX, PolygonNormal::PosY]);
    batch.data.truncate(batch.data.len() - 1);
    let mesh = build(&ctx, &mut arena, 0, &batch);
    assert_eq!(mesh.polygon_count(), 0);
    assert!(mesh.has_errors());
}

// A vertex count whose word total overflows is truncation, not a panic.
#[test]
fn overflowing_vertex_count_is_rejected() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let batch = TessellationBatch::new(DrawMode::Triangles, usize::MAX, vec![0; 24]);
    let mesh = build(&ctx, &mut arena, 0, &batch);
    assert_eq!(mesh.polygon_count(), 0);
    assert!(mesh.has_errors());
    let error = mesh
        .diagnostics()
        .iter()
        .find(|d| d.severity == Severity::Error)
        .unwrap();
    assert!(error.message.starts_with("Vertex data is truncated"));
    assert!(arena.polygons.is_empty());
}

#[test]
fn missing_color_warns_once_and_keeps_geometry() {
    let ctx = MeshContext::default();
    let flags = BatchFlags::new(true, true, false, false);
    let mut arena = ScratchArena::new();
    let mut builder = MeshBuilder::begin(SectionCoord::new(0, 0, 0), 0, &mut arena, &ctx).with_dimension(0);
    builder.ingest(&triangles(ctx.layout, &[PolygonNormal::PosX]).with_flags(flags));
    builder.ingest(&triangles(ctx.layout, &[PolygonNormal::PosY]).with_flags(flags));
    let mesh = builder.finish();
    assert_eq!(mesh.polygon_count(), 2);
    assert!(!mesh.has_errors());
    let warnings: Vec<_> = mesh
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].message,
        "Warnings in chunk (0, 0, 0) in dimension 0: Color data is missing"
    );
    assert_eq!(ctx.warnings.len(), 1);
}

#[test]
fn stale_scratch_is_reset_on_begin() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    {
        let mut abandoned = MeshBuilder::begin(SectionCoord::new(0, 0, 0), 0, &mut arena, &ctx);
        abandoned.ingest(&triangles(ctx.layout, &[PolygonNormal::PosX]));
        assert_eq!(abandoned.polygon_count(), 1);
    }
    let mut builder = MeshBuilder::begin(SectionCoord::new(0, 0, 0), 0, &mut arena, &ctx);
    assert!(
        builder
            .diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Internal)
    );
    builder.ingest(&triangles(ctx.layout, &[PolygonNormal::PosY]));
    let mesh = builder.finish();
    assert_eq!(mesh.polygon_count(), 1);
    assert_eq!(mesh.sub_mesh_start(PolygonNormal::PosY), Some(0));
    assert_eq!(arena.stale_resets(), 1);
}

#[test]
fn cancel_leaves_arena_clean() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let mut builder = MeshBuilder::begin(SectionCoord::new(0, 0, 0), 0, &mut arena, &ctx);
    builder.ingest(&triangles(ctx.layout, &ALL));
    builder.cancel();
    assert!(arena.polygons.is_empty());
    assert!(arena.begin());
}

#[test]
fn byte_accounting_balances_over_lifecycle() {
    let counters = Arc::new(MeshCounters::new());
    let ctx = MeshContext::with_counters(MeshConfig::default(), Arc::clone(&counters));
    let mut arena = ScratchArena::new();
    let a = build(&ctx, &mut arena, 0, &triangles(ctx.layout, &ALL));
    let mut b = build(&ctx, &mut arena, 1, &triangles(ctx.layout, &ALL[..2]));
    let expected = (a.buffer_size() + b.buffer_size()) as i64;
    assert_eq!(counters.resident_bytes(), expected);
    assert_eq!(counters.live_instances(), 2);

    b.destroy();
    b.destroy();
    assert_eq!(counters.resident_bytes(), a.buffer_size() as i64);
    assert_eq!(counters.live_instances(), 1);

    drop(a);
    let snap = counters.snapshot();
    assert_eq!(snap.resident_bytes, 0);
    assert_eq!(snap.live_instances, 0);
}

#[test]
fn gpu_status_follows_upload_and_delete() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let mut mesh = build(&ctx, &mut arena, 0, &triangles(ctx.layout, &ALL));
    assert_eq!(mesh.gpu_status(), GpuStatus::Constructed);
    mesh.mark_pending_upload();
    assert_eq!(mesh.gpu_status(), GpuStatus::PendingUpload);
    mesh.mark_resident(42);
    assert_eq!(mesh.gpu_status(), GpuStatus::Resident);
    assert_eq!(mesh.first_vertex(), 42);

    mesh.destroy();
    assert_eq!(mesh.gpu_status(), GpuStatus::PendingDelete);
    assert!(mesh.bytes().is_none());
    assert_eq!(mesh.buffer_size(), 7 * 3 * ctx.layout.stride());
    assert!(mesh.visible_ranges(SectionCoord::new(0, 0, 0), 0, &ctx.config).is_empty());
    mesh.confirm_gpu_delete();
    assert_eq!(mesh.gpu_status(), GpuStatus::Destroyed);

    let mut never_uploaded = build(&ctx, &mut arena, 0, &triangles(ctx.layout, &ALL));
    never_uploaded.destroy();
    assert_eq!(never_uploaded.gpu_status(), GpuStatus::Destroyed);
}

#[test]
fn distance_is_measured_from_section_center() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let mut builder = MeshBuilder::begin(SectionCoord::new(1, 0, 0), 0, &mut arena, &ctx);
    builder.ingest(&triangles(ctx.layout, &[PolygonNormal::PosX]));
    let mesh = builder.finish();
    assert_eq!(mesh.distance_sq_to(v(24., 8., 8.)), 0.0);
    assert_eq!(mesh.distance_sq_to(v(24., 8., 11.)), 9.0);
}

#[test]
fn translation_moves_vertices_into_region_space() {
    let ctx = MeshContext::default();
    let mut arena = ScratchArena::new();
    let batch = triangles(ctx.layout, &[PolygonNormal::PosZ]).with_translation([-300.0, 0.0, 256.0]);
    let mesh = build(&ctx, &mut arena, 0, &batch);
    let bytes = mesh.bytes().unwrap_or_default();
    let x = f32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let z = f32::from_le_bytes(bytes[8..12].try_into().unwrap());
    // 300 mod 256 = 44; -256 mod 256 = 0
    assert_eq!(x, 2.0 + 44.0);
    assert_eq!(z, 2.0);
}

#[test]
fn collapsed_polygons_contribute_no_bytes() {
    let ctx = MeshContext::default();
    let layout = ctx.layout;
    let mut batch = triangles(layout, &[PolygonNormal::PosX]);
    let p = v(3.0, 3.0, 3.0);
    for _ in 0..3 {
        layout.push_input_vertex(&InputVertex::new(p, [0.0, 0.0]), &mut batch.data);
    }
    batch.vertex_count += 3;
    let mut arena = ScratchArena::new();
    let mesh = build(&ctx, &mut arena, 0, &batch);
    assert_eq!(mesh.polygon_count(), 1);
    assert_eq!(mesh.buffer_size(), 3 * layout.stride());
}

#[test]
fn every_layout_sizes_buffer_by_stride() {
    use facet_mesh::LayoutKind;
    for (kind, short_uv) in [
        (LayoutKind::Baseline, true),
        (LayoutKind::Baseline, false),
        (LayoutKind::ExtendedLighting, true),
        (LayoutKind::ExtendedLighting, false),
        (LayoutKind::ShaderExtended, true),
    ] {
        let ctx = MeshContext::new(MeshConfig {
            layout: kind,
            short_uv,
            ..MeshConfig::default()
        });
        let mut arena = ScratchArena::new();
        let mesh = build(&ctx, &mut arena, 0, &triangles(ctx.layout, &ALL));
        assert_eq!(mesh.stride(), ctx.layout.stride());
        assert_eq!(mesh.buffer_size(), 7 * 3 * ctx.layout.stride(), "{kind:?}");
        assert_eq!(mesh.buffer_size() % mesh.stride(), 0);
    }
}
