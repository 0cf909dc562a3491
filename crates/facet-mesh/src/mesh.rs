//! Chunk mesh lifecycle: construction on a worker's scratch arena, the
//! finished bucket-ordered buffer, and visibility-driven draw ranges.

use std::sync::Arc;

use facet_geom::{SectionCoord, Vec3};

use crate::batch::TessellationBatch;
use crate::config::MeshConfig;
use crate::constants::{VERTICES_PER_POLYGON, to_relative_offset};
use crate::context::MeshContext;
use crate::counters::MeshCounters;
use crate::diagnostics::{Diagnostic, Severity};
use crate::normal::{NORMAL_ORDER, PolygonNormal};
use crate::polygon::encode_polygon;
use crate::scratch::ScratchArena;
use crate::writer::BufferWriter;

/// Where the finished buffer stands with respect to the GPU.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GpuStatus {
    Constructed,
    PendingUpload,
    Resident,
    /// Buffer released while resident; the GPU copy awaits deletion.
    PendingDelete,
    Destroyed,
}

/// One contiguous run of vertices to submit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DrawRange {
    pub first_vertex: usize,
    pub vertex_count: usize,
}

/// A mesh under construction. Holds the worker's arena exclusively until it
/// is finished or cancelled.
pub struct MeshBuilder<'a> {
    coord: SectionCoord,
    pass: u32,
    dimension: Option<i32>,
    batch_count: usize,
    diagnostics: Vec<Diagnostic>,
    arena: &'a mut ScratchArena,
    ctx: &'a MeshContext,
}

impl<'a> MeshBuilder<'a> {
    /// Starts constructing the mesh for `coord` at draw pass `pass`.
    ///
    /// Finding leftover polygons in the arena means an earlier construction on
    /// this worker never finished; they are discarded and an internal
    /// diagnostic is recorded on this mesh.
    pub fn begin(
        coord: SectionCoord,
        pass: u32,
        arena: &'a mut ScratchArena,
        ctx: &'a MeshContext,
    ) -> Self {
        let mut diagnostics = Vec::new();
        if !arena.begin() {
            diagnostics.push(Diagnostic::new(
                Severity::Internal,
                "construction started before the previous mesh finished; stale polygons discarded",
            ));
        }
        Self {
            coord,
            pass,
            dimension: None,
            batch_count: 0,
            diagnostics,
            arena,
            ctx,
        }
    }

    pub fn with_dimension(mut self, dimension: i32) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn coord(&self) -> SectionCoord {
        self.coord
    }

    pub fn pass(&self) -> u32 {
        self.pass
    }

    /// Polygons accumulated so far.
    pub fn polygon_count(&self) -> usize {
        self.arena.polygons.len() / self.ctx.layout.polygon_size(VERTICES_PER_POLYGON)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn dimension_label(&self) -> String {
        self.dimension
            .map(|d| d.to_string())
            .unwrap_or_else(|| "UNKNOWN".to_owned())
    }

    /// Validates one batch and encodes its polygons into the arena.
    ///
    /// Unsupported draw modes, missing texture data and truncated vertex data
    /// reject the batch and discard the mesh's geometry so far. Missing
    /// brightness or color only warns; defaults are substituted.
    pub fn ingest(&mut self, batch: &TessellationBatch) {
        self.batch_count += 1;

        // Empty flushes are common and their flags are meaningless.
        if batch.is_empty() {
            return;
        }

        let layout = self.ctx.layout;
        let mut errors: Vec<String> = Vec::new();
        let mut warnings: Vec<&'static str> = Vec::new();

        let input_vertices = match batch.mode.input_vertices() {
            Some(n) => n,
            None => {
                errors.push(format!("Unsupported draw mode: {}", batch.mode.code()));
                VERTICES_PER_POLYGON
            }
        };
        if !batch.flags.has_texture {
            errors.push("Texture data is missing.".to_owned());
        }
        if !batch.flags.has_brightness {
            warnings.push("Brightness data is missing");
        }
        if !batch.flags.has_color {
            warnings.push("Color data is missing");
        }

        let primitive_words = input_vertices * layout.input_vertex_size();
        let polygon_count = batch.vertex_count / input_vertices;
        let needed = match polygon_count.checked_mul(primitive_words) {
            Some(words) if words <= batch.data.len() => words,
            _ => {
                errors.push(format!(
                    "Vertex data is truncated: {} words for {} vertices",
                    batch.data.len(),
                    batch.vertex_count
                ));
                0
            }
        };

        if !errors.is_empty() {
            self.reject(batch, &errors, &warnings, polygon_count);
            return;
        }

        let triangulate = batch.mode.triangulates();
        let polygon_size =
            layout.polygon_size(VERTICES_PER_POLYGON) * if triangulate { 2 } else { 1 };
        let offset = Vec3::new(
            to_relative_offset(batch.translation[0]),
            to_relative_offset(batch.translation[1]),
            to_relative_offset(batch.translation[2]),
        );

        let buf = &mut self.arena.polygons;
        buf.ensure_capacity(polygon_count * polygon_size);
        for src in batch.data[..needed].chunks_exact(primitive_words) {
            let dst = buf.spare_mut(polygon_size);
            let dropped = encode_polygon(layout, src, dst, offset, triangulate, batch.flags);
            if !dropped {
                buf.advance(polygon_size);
            }
        }

        if warnings.is_empty() || self.arena.polygons.is_empty() || self.ctx.config.silence_errors {
            return;
        }
        let message = format!(
            "Warnings in chunk ({}, {}, {}) in dimension {}: {}",
            self.coord.x,
            self.coord.y,
            self.coord.z,
            self.dimension_label(),
            warnings.join(", ")
        );
        self.ctx.warnings.show_once(&message);
        if !self.diagnostics.iter().any(|d| d.message == message) {
            self.diagnostics.push(Diagnostic::new(Severity::Warning, message));
        }
    }

    fn reject(
        &mut self,
        batch: &TessellationBatch,
        errors: &[String],
        warnings: &[&str],
        polygon_count: usize,
    ) {
        let had_geometry = polygon_count > 0 || !self.arena.polygons.is_empty();
        self.arena.polygons.reset();
        if !had_geometry || self.ctx.config.silence_errors {
            return;
        }

        let (x, y, z) = (self.coord.x, self.coord.y, self.coord.z);
        log::error!(
            target: "mesh",
            "Errors in chunk ({x}, {y}, {z}) in dimension {}:",
            self.dimension_label()
        );
        for error in errors {
            log::error!(target: "mesh", "Error: {error}");
            self.diagnostics
                .push(Diagnostic::new(Severity::Error, error.clone()));
        }
        for warning in warnings {
            log::error!(target: "mesh", "Warning: {warning}");
        }
        let (bx, by, bz) = self.coord.origin_block();
        log::error!(
            target: "mesh",
            "(Section block pos: ({bx}, {by}, {bz}), \
             batch translation: ({}, {}, {}), batch ordinal: {})",
            batch.translation[0],
            batch.translation[1],
            batch.translation[2],
            self.batch_count
        );
        log::error!(target: "mesh", "Skipping chunk due to errors.");
    }

    /// Discards everything ingested so far; used when a threaded build is superseded.
    pub fn cancel(self) {
        self.arena.cancel();
    }

    /// Sorts (primary pass only), serializes and hands back the finished mesh.
    /// The arena is empty again afterwards.
    pub fn finish(self) -> ChunkMesh {
        let layout = self.ctx.layout;
        let vertices_per_polygon = VERTICES_PER_POLYGON;
        let polygon_size = layout.polygon_size(vertices_per_polygon);
        let stride = layout.stride();

        let words = self.arena.polygons.as_slice();
        let polygon_count = words.len() / polygon_size;
        let mut out = BufferWriter::with_capacity(polygon_count * vertices_per_polygon * stride);
        let mut sub_mesh_start = [None; PolygonNormal::COUNT];

        if self.pass == 0 {
            let order = self.arena.sorter.sort(words, polygon_size, polygon_count);
            for (slot, start) in sub_mesh_start.iter_mut().enumerate() {
                if order.bucket_len(slot) > 0 {
                    *start = Some(order.starts[slot]);
                }
            }
            for &index in order.permutation {
                let offset = index as usize * polygon_size;
                layout.serialize(words, offset, &mut out, stride, vertices_per_polygon);
            }
        } else {
            // Later passes keep ingestion order and live in a single bucket.
            if polygon_count > 0 {
                sub_mesh_start[0] = Some(0);
            }
            for index in 0..polygon_count {
                let offset = index * polygon_size;
                layout.serialize(words, offset, &mut out, stride, vertices_per_polygon);
            }
        }

        let buffer = out.into_inner();
        debug_assert_eq!(buffer.len(), polygon_count * vertices_per_polygon * stride);
        self.ctx.counters.mesh_created(buffer.len());
        self.arena.polygons.reset();

        log::trace!(
            target: "mesh",
            "finished ({}, {}, {}) pass {}: {} polygons, {} bytes",
            self.coord.x,
            self.coord.y,
            self.coord.z,
            self.pass,
            polygon_count,
            buffer.len()
        );

        ChunkMesh {
            coord: self.coord,
            pass: self.pass,
            polygon_count,
            vertices_per_polygon,
            stride,
            buffer_size: buffer.len(),
            buffer: Some(buffer),
            sub_mesh_start,
            gpu_status: GpuStatus::Constructed,
            first_vertex: 0,
            batch_count: self.batch_count,
            diagnostics: self.diagnostics,
            counters: Arc::clone(&self.ctx.counters),
        }
    }
}

/// Finished GPU-ready geometry for one section and draw pass.
#[derive(Debug)]
pub struct ChunkMesh {
    coord: SectionCoord,
    pass: u32,
    polygon_count: usize,
    vertices_per_polygon: usize,
    stride: usize,
    buffer: Option<Vec<u8>>,
    buffer_size: usize,
    // Start polygon of each NORMAL_ORDER bucket, None when empty.
    sub_mesh_start: [Option<usize>; PolygonNormal::COUNT],
    gpu_status: GpuStatus,
    first_vertex: usize,
    batch_count: usize,
    diagnostics: Vec<Diagnostic>,
    counters: Arc<MeshCounters>,
}

impl ChunkMesh {
    pub fn coord(&self) -> SectionCoord {
        self.coord
    }

    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn polygon_count(&self) -> usize {
        self.polygon_count
    }

    pub fn vertices_per_polygon(&self) -> usize {
        self.vertices_per_polygon
    }

    pub fn vertex_count(&self) -> usize {
        self.polygon_count * self.vertices_per_polygon
    }

    /// Bytes per vertex of the layout the mesh was built with.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Finished vertex bytes; `None` once destroyed.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.buffer.as_deref()
    }

    /// Byte length fixed at `finish`, kept after destruction.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Start polygon of each bucket in [`NORMAL_ORDER`] order.
    pub fn sub_mesh_starts(&self) -> [Option<usize>; PolygonNormal::COUNT] {
        self.sub_mesh_start
    }

    pub fn sub_mesh_start(&self, normal: PolygonNormal) -> Option<usize> {
        self.sub_mesh_start[normal.order_slot()]
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Batches handed to `ingest`, empty ones included.
    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    pub fn gpu_status(&self) -> GpuStatus {
        self.gpu_status
    }

    pub fn first_vertex(&self) -> usize {
        self.first_vertex
    }

    pub fn mark_pending_upload(&mut self) {
        if self.gpu_status == GpuStatus::Constructed {
            self.gpu_status = GpuStatus::PendingUpload;
        }
    }

    /// Records that the buffer now lives in GPU memory starting at `first_vertex`.
    pub fn mark_resident(&mut self, first_vertex: usize) {
        if self.buffer.is_some() {
            self.gpu_status = GpuStatus::Resident;
            self.first_vertex = first_vertex;
        }
    }

    /// Acknowledges that the GPU copy of a destroyed mesh has been freed.
    pub fn confirm_gpu_delete(&mut self) {
        if self.gpu_status == GpuStatus::PendingDelete {
            self.gpu_status = GpuStatus::Destroyed;
        }
    }

    /// Squared distance from the section's block-space centre to `point`.
    pub fn distance_sq_to(&self, point: Vec3) -> f64 {
        let c = self.coord.center();
        let dx = f64::from(c.x) - f64::from(point.x);
        let dy = f64::from(c.y) - f64::from(point.y);
        let dz = f64::from(c.z) - f64::from(point.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Releases the buffer and reverses its byte accounting. Idempotent.
    /// A resident mesh becomes `PendingDelete`; freeing the GPU copy is left
    /// to the upload side.
    pub fn destroy(&mut self) {
        if self.buffer.take().is_none() {
            return;
        }
        self.counters.mesh_destroyed(self.buffer_size);
        self.gpu_status = match self.gpu_status {
            GpuStatus::Resident => GpuStatus::PendingDelete,
            _ => GpuStatus::Destroyed,
        };
    }

    pub fn is_destroyed(&self) -> bool {
        self.buffer.is_none()
    }

    fn is_normal_visible(
        &self,
        normal: PolygonNormal,
        camera: SectionCoord,
        pass: u32,
        config: &MeshConfig,
    ) -> bool {
        let s = self.coord;
        match normal {
            PolygonNormal::PosX => camera.x >= s.x,
            PolygonNormal::NegX => camera.x < s.x + 1,
            PolygonNormal::PosY => camera.y >= s.y,
            PolygonNormal::NegY => camera.y < s.y + 1,
            PolygonNormal::PosZ => camera.z >= s.z,
            PolygonNormal::NegZ => camera.z < s.z + 1,
            PolygonNormal::None => {
                pass == 0
                    || match config.max_unaligned_polygon_distance {
                        None => true,
                        Some(max) => camera.distance_sq(s) < i64::from(max) * i64::from(max),
                    }
            }
        }
    }

    /// Appends the vertex ranges worth drawing from `camera`'s section and
    /// returns how many were appended.
    ///
    /// Buckets are walked in [`NORMAL_ORDER`]; consecutive visible buckets
    /// (empty ones skipped) merge into one range. With face culling off the
    /// whole buffer is one range.
    pub fn emit_visible_ranges(
        &self,
        camera: SectionCoord,
        pass: u32,
        config: &MeshConfig,
        out: &mut Vec<DrawRange>,
    ) -> usize {
        if self.is_destroyed() || self.polygon_count == 0 {
            return 0;
        }
        let vpp = self.vertices_per_polygon;

        if !config.cull_faces {
            out.push(DrawRange {
                first_vertex: self.first_vertex,
                vertex_count: self.polygon_count * vpp,
            });
            return 1;
        }

        let mut emitted = 0;
        let mut start: Option<usize> = None;
        for slot in 0..=NORMAL_ORDER.len() {
            let bucket_start = self.sub_mesh_start.get(slot).copied();
            if let Some(None) = bucket_start {
                continue;
            }
            let bucket_start = bucket_start.flatten();

            let visible = slot < NORMAL_ORDER.len()
                && self.is_normal_visible(NORMAL_ORDER[slot], camera, pass, config);

            match start {
                None if visible => start = bucket_start,
                Some(first) if !visible => {
                    let end = bucket_start.unwrap_or(self.polygon_count);
                    out.push(DrawRange {
                        first_vertex: self.first_vertex + first * vpp,
                        vertex_count: (end - first) * vpp,
                    });
                    emitted += 1;
                    start = None;
                }
                _ => {}
            }
        }
        emitted
    }

    /// Convenience wrapper around [`emit_visible_ranges`](Self::emit_visible_ranges).
    pub fn visible_ranges(
        &self,
        camera: SectionCoord,
        pass: u32,
        config: &MeshConfig,
    ) -> Vec<DrawRange> {
        let mut out = Vec::new();
        self.emit_visible_ranges(camera, pass, config, &mut out);
        out
    }
}

impl Drop for ChunkMesh {
    fn drop(&mut self) {
        self.destroy();
    }
}
