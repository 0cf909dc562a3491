//! Chunk-mesh construction: polygon encoding, face-normal bucketing and
//! GPU vertex layouts for one 16x16x16 section at a time.
#![forbid(unsafe_code)]

pub mod batch;
pub mod config;
pub mod constants;
pub mod context;
pub mod counters;
pub mod diagnostics;
pub mod layout;
pub mod mesh;
pub mod normal;
pub mod polygon;
pub mod scratch;
pub mod writer;

pub use batch::{BatchFlags, DrawMode, TessellationBatch};
pub use config::{ConfigError, LayoutKind, MeshConfig};
pub use context::MeshContext;
pub use counters::{CounterSnapshot, MeshCounters};
pub use diagnostics::{Diagnostic, Severity, WarningLog};
pub use layout::{AttributeSet, ComponentType, InputVertex, VertexAttribute, VertexLayout};
pub use mesh::{ChunkMesh, DrawRange, GpuStatus, MeshBuilder};
pub use normal::{NORMAL_ORDER, PolygonNormal};
pub use polygon::encode_polygon;
pub use scratch::{BucketOrder, BucketSorter, PolygonBuffer, ScratchArena};
pub use writer::BufferWriter;

pub use facet_geom::{SectionCoord, Vec3};
