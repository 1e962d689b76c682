//! GPU backend contract consumed by the overlay renderer.
//!
//! The renderer only decides *when* draws happen and *with what batched
//! data*; everything below that (shader modules, vertex formats, index
//! buffers, glyph atlases) belongs to the backend.
//!
//! # Available Backends
//!
//! - [`DummyBackend`]: records every submission, for tests and headless runs.
//!
//! Host applications implement [`OverlayBackend`] over their own device.

pub mod dummy;

pub use dummy::{DrawRecord, DummyBackend, TextRecord};

use glam::Vec3;

use crate::error::BackendResult;
use crate::vertex::OverlayVertex;

/// Whether a primitive takes part in depth testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DepthMode {
    /// Depth tested; hidden behind world geometry.
    Occluded,
    /// Drawn through world geometry.
    SeeThrough,
}

impl DepthMode {
    pub fn from_see_through(see_through: bool) -> Self {
        if see_through {
            Self::SeeThrough
        } else {
            Self::Occluded
        }
    }

    pub fn is_see_through(self) -> bool {
        matches!(self, Self::SeeThrough)
    }

    /// Cache partition and deferred replay position; see-through comes first.
    pub(crate) fn index(self) -> usize {
        match self {
            Self::SeeThrough => 0,
            Self::Occluded => 1,
        }
    }
}

/// Primitive assembly used by a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    LineList,
    TriangleList,
    TriangleFan,
}

impl PrimitiveTopology {
    /// Number of sequential indices needed to draw `vertex_count` vertices.
    pub fn index_count(self, vertex_count: u32) -> u32 {
        match self {
            Self::LineList | Self::TriangleList => vertex_count,
            Self::TriangleFan => vertex_count.saturating_sub(2) * 3,
        }
    }
}

/// The pipeline families the overlay renderer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineKind {
    /// Wide lines; parameterized by stroke width.
    Lines,
    /// Filled boxes.
    Filled,
    /// Free triangles (pyramids).
    Triangles,
    /// Filled circles.
    TriangleFan,
    /// Text labels.
    Text,
}

impl PipelineKind {
    pub fn topology(self) -> PrimitiveTopology {
        match self {
            Self::Lines => PrimitiveTopology::LineList,
            Self::Filled | Self::Triangles | Self::Text => PrimitiveTopology::TriangleList,
            Self::TriangleFan => PrimitiveTopology::TriangleFan,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Lines => "lines",
            Self::Filled => "filled",
            Self::Triangles => "triangles",
            Self::TriangleFan => "triangle_fan",
            Self::Text => "text",
        }
    }
}

/// Everything a backend needs to build one pipeline object.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDescriptor {
    pub kind: PipelineKind,
    pub depth: DepthMode,
    pub topology: PrimitiveTopology,
    /// Stroke width in pixels; only set for [`PipelineKind::Lines`].
    pub line_width: Option<f32>,
    /// Offset depth slightly toward the viewer to avoid z-fighting with the
    /// surfaces the overlay hugs. Never set for see-through pipelines.
    pub view_offset_layering: bool,
    pub label: String,
}

impl PipelineDescriptor {
    pub fn new(kind: PipelineKind, depth: DepthMode, line_width: Option<f32>) -> Self {
        let mut label = format!("overlay_{}", kind.name());
        if let Some(width) = line_width {
            label.push_str(&format!("_{width:.2}"));
        }
        if depth.is_see_through() {
            label.push_str("_xray");
        }
        Self {
            kind,
            depth,
            topology: kind.topology(),
            line_width,
            view_offset_layering: !depth.is_see_through(),
            label,
        }
    }
}

/// Opaque backend pipeline identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u64);

/// A text label ready for glyph emission.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraw<'a> {
    pub text: &'a str,
    /// Viewer-relative anchor (horizontal center, baseline).
    pub origin: Vec3,
    /// World units per glyph unit.
    pub scale: f32,
    /// Text color; `None` uses the backend's default (white).
    pub color: Option<[f32; 4]>,
    pub background: [f32; 4],
    pub shadow: bool,
}

/// GPU backend used by the overlay renderer.
///
/// Draw submission follows the usual pass shape:
/// `begin_pass`, `bind_pipeline`, `set_vertex_buffer`, `draw_indexed`,
/// `end_pass`. Vertex buffers are transient and owned by the backend for the
/// duration of one pass.
pub trait OverlayBackend {
    /// Backend name, for logging.
    fn name(&self) -> &'static str;

    /// Build a pipeline object. Called at most once per cache key.
    fn create_pipeline(&self, descriptor: &PipelineDescriptor) -> BackendResult<PipelineHandle>;

    /// Open a render pass over the main color target.
    fn begin_pass(&mut self, label: &str) -> BackendResult<()>;

    fn bind_pipeline(&mut self, pipeline: PipelineHandle);

    /// Upload vertices into a transient vertex buffer bound to slot 0.
    fn set_vertex_buffer(&mut self, vertices: &[OverlayVertex]) -> BackendResult<()>;

    /// Draw with a sequential index buffer of `index_count` indices.
    fn draw_indexed(&mut self, index_count: u32) -> BackendResult<()>;

    /// Emit and draw the glyphs of a label with the bound text pipeline.
    fn draw_text(&mut self, text: &TextDraw<'_>) -> BackendResult<()>;

    fn end_pass(&mut self);
}
