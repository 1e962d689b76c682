//! The overlay renderer and its draw-submission boundary.

use std::path::Path;
use std::sync::Arc;

use crate::backend::{OverlayBackend, TextDraw};
use crate::config::OverlayConfig;
use crate::deferred::OverlayFrameState;
use crate::error::{OverlayError, OverlayResult};
use crate::frame::OverlayFrame;
use crate::pipeline_cache::{OverlayPipeline, PipelineCache, PipelineKey};
use crate::vertex::OverlayVertex;
use crate::viewer::ViewerSnapshot;

/// Label of every pass the overlay renderer opens.
const PASS_LABEL: &str = "overlay_immediate_draw";

/// Initial capacity of the reusable staging buffer (number of vertices).
const DEFAULT_STAGING_CAPACITY: usize = 4096;

/// Counters for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draw calls that reached the backend, text included.
    pub draw_calls: u32,
    /// Draw calls dropped because the backend failed.
    pub failed_draws: u32,
    /// Line batches flushed.
    pub line_batches: u32,
    /// Deferred primitives replayed by the deferred flush.
    pub deferred_replayed: u32,
}

/// Owns the backend, the pipeline cache and the per-frame overlay state.
///
/// Create once when the render subsystem starts; call
/// [`begin_frame`](Self::begin_frame) once per rendered frame.
///
/// # Example
///
/// ```ignore
/// let mut renderer = OverlayRenderer::new(backend, OverlayConfig::default());
///
/// // Each frame:
/// let mut frame = renderer.begin_frame(ViewerSnapshot::new(camera_pos, partial_tick));
/// frame.draw_filled_box(aabb, color, 1.0, Placement::World, DepthMode::SeeThrough);
/// frame.lines(3.0, DepthMode::Occluded, |lines| {
///     lines.draw_path(&waypoints, color, 1.0);
/// });
/// let stats = frame.end();
/// ```
pub struct OverlayRenderer<B: OverlayBackend> {
    pub(crate) backend: B,
    pub(crate) pipelines: PipelineCache,
    pub(crate) state: OverlayFrameState,
    pub(crate) config: OverlayConfig,
    pub(crate) staging: Vec<OverlayVertex>,
}

impl<B: OverlayBackend> OverlayRenderer<B> {
    pub fn new(backend: B, config: OverlayConfig) -> Self {
        log::info!(
            "Overlay renderer initialized on {} (enabled: {})",
            backend.name(),
            config.enabled
        );
        Self {
            backend,
            pipelines: PipelineCache::new(),
            state: OverlayFrameState::new(),
            config,
            staging: Vec::with_capacity(DEFAULT_STAGING_CAPACITY),
        }
    }

    /// Create a renderer with the config at `path`, or defaults if it can't be loaded.
    pub fn with_config_file(backend: B, path: &Path) -> Self {
        Self::new(backend, OverlayConfig::load_or_default(path))
    }

    /// Start a frame as seen from `viewer`.
    ///
    /// The frame starts in the deferring phase.
    pub fn begin_frame(&mut self, viewer: ViewerSnapshot) -> OverlayFrame<'_, B> {
        self.state.frame_index += 1;
        OverlayFrame::new(self, viewer)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn pipelines(&self) -> &PipelineCache {
        &self.pipelines
    }

    pub fn state(&self) -> &OverlayFrameState {
        &self.state
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: OverlayConfig) {
        self.config = config;
    }

    /// Get (building on first use) the pipeline for `key`.
    pub fn pipeline(&self, key: PipelineKey) -> OverlayResult<Arc<OverlayPipeline>> {
        self.pipelines
            .get_or_create(key, |descriptor| self.backend.create_pipeline(descriptor))
    }
}

/// Borrowed view of everything a draw needs.
///
/// This is the outermost draw boundary: backend failures stop here, get
/// logged with the primitive and pipeline involved, and are counted in
/// [`FrameStats::failed_draws`].
pub(crate) struct DrawTarget<'a, B: OverlayBackend> {
    pub backend: &'a mut B,
    pub pipelines: &'a PipelineCache,
    pub staging: &'a mut Vec<OverlayVertex>,
    pub stats: &'a mut FrameStats,
}

impl<B: OverlayBackend> DrawTarget<'_, B> {
    fn pipeline(&self, key: PipelineKey) -> OverlayResult<Arc<OverlayPipeline>> {
        let backend = &*self.backend;
        self.pipelines
            .get_or_create(key, |descriptor| backend.create_pipeline(descriptor))
    }

    /// Emit vertices into the staging buffer and draw them as one call.
    pub fn draw_with(
        &mut self,
        key: PipelineKey,
        primitive: &str,
        emit: impl FnOnce(&mut Vec<OverlayVertex>),
    ) {
        let mut vertices = std::mem::take(self.staging);
        vertices.clear();
        emit(&mut vertices);
        self.draw_vertices(key, primitive, &vertices);
        *self.staging = vertices;
    }

    pub fn draw_vertices(&mut self, key: PipelineKey, primitive: &str, vertices: &[OverlayVertex]) {
        if vertices.is_empty() {
            return;
        }
        match self.try_draw(key, vertices) {
            Ok(()) => self.stats.draw_calls += 1,
            Err(e) => {
                log::error!("Failed to draw overlay {primitive}: {e}");
                self.stats.failed_draws += 1;
            }
        }
    }

    fn try_draw(&mut self, key: PipelineKey, vertices: &[OverlayVertex]) -> OverlayResult<()> {
        let pipeline = self.pipeline(key)?;
        let index_count = key.kind.topology().index_count(vertices.len() as u32);

        self.backend
            .begin_pass(PASS_LABEL)
            .map_err(|e| OverlayError::backend(format!("begin pass for {}", pipeline.label), e))?;
        self.backend.bind_pipeline(pipeline.handle);
        let result = self
            .backend
            .set_vertex_buffer(vertices)
            .and_then(|()| self.backend.draw_indexed(index_count));
        self.backend.end_pass();

        result.map_err(|e| OverlayError::backend(pipeline.label.clone(), e))
    }

    pub fn draw_text(&mut self, key: PipelineKey, text: TextDraw<'_>) {
        match self.try_draw_text(key, text) {
            Ok(()) => self.stats.draw_calls += 1,
            Err(e) => {
                log::error!("Failed to draw overlay label: {e}");
                self.stats.failed_draws += 1;
            }
        }
    }

    fn try_draw_text(&mut self, key: PipelineKey, text: TextDraw<'_>) -> OverlayResult<()> {
        let pipeline = self.pipeline(key)?;

        self.backend
            .begin_pass(PASS_LABEL)
            .map_err(|e| OverlayError::backend(format!("begin pass for {}", pipeline.label), e))?;
        self.backend.bind_pipeline(pipeline.handle);
        let result = self.backend.draw_text(&text);
        self.backend.end_pass();

        result.map_err(|e| OverlayError::backend(format!("{} ({:?})", pipeline.label, text.text), e))
    }
}
