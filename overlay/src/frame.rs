//! Per-frame drawing surface.
//!
//! A frame moves through two phases:
//!
//! - **Deferring**: the render pass can't take filled shapes or labels yet.
//!   Boxes, pyramids and labels requested now are parked in the deferred
//!   queue. Lines go straight to a batching session, and circles, spheres
//!   and cylinders draw directly.
//! - **Immediate**: entered by the deferred flush, which replays the queue
//!   through the same draw path and empties it. Everything draws directly.
//!
//! The deferred flush runs once per frame. [`FrameHandlers`] runs it at
//! [`DEFERRED_FLUSH_PRIORITY`]; a frame that is ended (or dropped) without
//! it flushes on the way out.

use glam::DVec3;

use crate::backend::{DepthMode, OverlayBackend, PipelineKind, TextDraw};
use crate::deferred::{DeferredPrimitive, FilledBox, Label, Pyramid, DEFAULT_LABEL_BACKGROUND};
use crate::distance::{DynamicLabel, DynamicLabelOptions};
use crate::lines::LineBatcher;
use crate::pipeline_cache::PipelineKey;
use crate::renderer::{DrawTarget, FrameStats, OverlayRenderer};
use crate::shapes::{self, Aabb};
use crate::viewer::{Placement, ViewerSnapshot};

/// Priority at which [`FrameHandlers`] replays the deferred queue.
pub const DEFERRED_FLUSH_PRIORITY: i32 = 999;

/// Label glyph units per unit of label scale.
const LABEL_UNIT: f64 = 0.05;

/// Inflation applied to highlighted blocks so they don't z-fight the block faces.
const BLOCK_INFLATE: f64 = 0.002;

/// Segments used for circle outlines, fills and cylinders.
const CIRCLE_SEGMENTS: u32 = 64;

/// Distance ahead of the eye where eye lines start.
const EYE_LINE_OFFSET: f64 = 2.0;

/// Which requests the frame can draw directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Deferring,
    Immediate,
}

/// Options for [`OverlayFrame::draw_waypoint_filled`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaypointStyle {
    pub see_through: bool,
    /// Growth on the horizontal sides.
    pub extra_size: f64,
    pub extra_size_top: f64,
    pub extra_size_bottom: f64,
    /// Floor of the distance alpha; `None` uses the configured minimum.
    pub minimum_alpha: Option<f32>,
    /// Fade out with distance instead of fading in.
    pub inverse_alpha: bool,
}

/// Options for [`OverlayFrame::draw_label`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    pub see_through: bool,
    pub color: Option<[f32; 4]>,
    /// `None` uses the configured label scale.
    pub scale: Option<f64>,
    pub shadow: bool,
    pub y_offset: f32,
    pub background: [f32; 4],
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            see_through: false,
            color: None,
            scale: None,
            shadow: false,
            y_offset: 0.0,
            background: DEFAULT_LABEL_BACKGROUND,
        }
    }
}

/// A path waypoint with an optional display name.
#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    pub position: DVec3,
    pub name: Option<String>,
}

impl PathNode {
    pub fn new(position: DVec3) -> Self {
        Self {
            position,
            name: None,
        }
    }

    pub fn named(position: DVec3, name: impl Into<String>) -> Self {
        Self {
            position,
            name: Some(name.into()),
        }
    }
}

/// Options for [`OverlayFrame::draw_path_with_waypoints`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStyle {
    /// Extra first waypoint (typically just ahead of the viewer's eye).
    pub start: Option<DVec3>,
    /// `None` uses the configured path color.
    pub color: Option<[f32; 4]>,
    /// `None` uses the configured line width.
    pub width: Option<f32>,
    pub depth: DepthMode,
    /// `None` uses the configured pull-in.
    pub pull_in: Option<f64>,
    /// Draw a dynamic label at every named node.
    pub show_names: bool,
    pub name_scale: f64,
    /// Highlight the last node's block in this color.
    pub mark_last: Option<[f32; 4]>,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            start: None,
            color: None,
            width: None,
            depth: DepthMode::Occluded,
            pull_in: None,
            show_names: false,
            name_scale: 1.0,
            mark_last: Some([1.0; 4]),
        }
    }
}

/// One frame of overlay drawing.
///
/// Obtain via [`OverlayRenderer::begin_frame`]. End with [`end`](Self::end)
/// to get the frame's counters.
pub struct OverlayFrame<'r, B: OverlayBackend> {
    renderer: &'r mut OverlayRenderer<B>,
    viewer: ViewerSnapshot,
    phase: FramePhase,
    flushed: bool,
    stats: FrameStats,
}

impl<'r, B: OverlayBackend> OverlayFrame<'r, B> {
    pub(crate) fn new(renderer: &'r mut OverlayRenderer<B>, viewer: ViewerSnapshot) -> Self {
        Self {
            renderer,
            viewer,
            phase: FramePhase::Deferring,
            flushed: false,
            stats: FrameStats::default(),
        }
    }

    pub fn viewer(&self) -> &ViewerSnapshot {
        &self.viewer
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Primitives currently waiting for a deferred flush.
    pub fn deferred_len(&self) -> usize {
        self.renderer.state.queue.len()
    }

    fn enabled(&self) -> bool {
        self.renderer.config.enabled
    }

    fn target(&mut self) -> DrawTarget<'_, B> {
        DrawTarget {
            backend: &mut self.renderer.backend,
            pipelines: &self.renderer.pipelines,
            staging: &mut self.renderer.staging,
            stats: &mut self.stats,
        }
    }

    /// Park a primitive for the next deferred flush, whatever the phase.
    ///
    /// Ignored while the overlay is disabled.
    pub fn defer(&mut self, primitive: DeferredPrimitive) {
        if !self.enabled() {
            return;
        }
        self.renderer.state.queue.defer(primitive);
    }

    /// Replay and clear the deferred queue, then switch to the immediate phase.
    ///
    /// Runs at most once per frame; later calls only log a warning.
    /// Primitives deferred during or after the flush wait for the next frame.
    pub fn flush_deferred(&mut self) {
        if self.flushed {
            log::warn!(
                "Deferred overlay flush requested twice in frame {}; ignoring",
                self.renderer.state.frame_index
            );
            return;
        }
        self.flushed = true;
        self.phase = FramePhase::Immediate;

        let batch = self.renderer.state.queue.take();
        if batch.is_empty() {
            return;
        }
        let count = batch.len();
        for primitive in batch {
            self.stats.deferred_replayed += 1;
            match primitive {
                DeferredPrimitive::FilledBox(b) => self.draw_box_now(&b),
                DeferredPrimitive::Pyramid(p) => self.draw_pyramid_now(&p),
                DeferredPrimitive::Label(l) => self.draw_label_now(&l),
            }
        }
        log::debug!(
            "Replayed {} deferred overlay primitives in frame {}",
            count,
            self.renderer.state.frame_index
        );
    }

    /// Finish the frame, flushing the deferred queue if it hasn't been.
    pub fn end(mut self) -> FrameStats {
        if !self.flushed {
            self.flush_deferred();
        }
        self.stats
    }

    // ------------------------------------------------------------------
    // Filled shapes and labels (deferrable)
    // ------------------------------------------------------------------

    /// Filled translucent box.
    ///
    /// `placement` says whether `aabb` is in world coordinates or already
    /// relative to the viewer.
    pub fn draw_filled_box(
        &mut self,
        aabb: Aabb,
        color: [f32; 4],
        alpha_multiplier: f32,
        placement: Placement,
        depth: DepthMode,
    ) {
        if !self.enabled() {
            return;
        }
        let filled = FilledBox {
            aabb,
            placement,
            color,
            alpha_multiplier,
            depth,
        };
        match self.phase {
            FramePhase::Deferring => self.defer(DeferredPrimitive::FilledBox(filled)),
            FramePhase::Immediate => self.draw_box_now(&filled),
        }
    }

    fn draw_box_now(&mut self, filled: &FilledBox) {
        let min = self.viewer.resolve(filled.aabb.min, filled.placement);
        let max = self.viewer.resolve(filled.aabb.max, filled.placement);
        let color = shapes::shade_filled(filled.color, filled.alpha_multiplier);
        let key = PipelineKey::fixed(PipelineKind::Filled, filled.depth);
        self.target().draw_with(key, "filled box", |out| {
            shapes::emit_filled_box(out, min, max, color)
        });
    }

    /// Highlight the block at `location`, fading with distance to the viewer.
    pub fn draw_waypoint_filled(&mut self, location: DVec3, color: [f32; 4], style: &WaypointStyle) {
        let config = &self.renderer.config;
        let minimum = style.minimum_alpha.unwrap_or(config.minimum_alpha);
        let alpha = config.alpha.scale(
            self.viewer.distance_squared(location),
            0.0,
            f64::INFINITY,
            minimum,
            1.0,
            style.inverse_alpha,
        );

        let aabb = Aabb::new(
            location - DVec3::new(style.extra_size, style.extra_size_bottom, style.extra_size),
            location + DVec3::ONE + DVec3::new(style.extra_size, style.extra_size_top, style.extra_size),
        )
        .inflate(DVec3::splat(BLOCK_INFLATE));

        self.draw_filled_box(
            aabb,
            color,
            alpha,
            Placement::World,
            DepthMode::from_see_through(style.see_through),
        );
    }

    /// Color the block at `location`; `alpha` defaults to the distance ramp.
    pub fn draw_color(&mut self, location: DVec3, color: [f32; 4], alpha: Option<f32>, depth: DepthMode) {
        let alpha = alpha.unwrap_or_else(|| {
            let config = &self.renderer.config;
            config.alpha.scale(
                self.viewer.distance_squared(location),
                0.0,
                f64::INFINITY,
                config.minimum_alpha,
                1.0,
                false,
            )
        });
        self.draw_filled_box(Aabb::block(location), color, alpha, Placement::World, depth);
    }

    /// Square pyramid with apex `top`.
    pub fn draw_pyramid(
        &mut self,
        top: DVec3,
        base_center: DVec3,
        base_edge: DVec3,
        color: [f32; 4],
        depth: DepthMode,
    ) {
        if !self.enabled() {
            return;
        }
        let pyramid = Pyramid {
            top,
            base_center,
            base_edge,
            color,
            depth,
        };
        match self.phase {
            FramePhase::Deferring => self.defer(DeferredPrimitive::Pyramid(pyramid)),
            FramePhase::Immediate => self.draw_pyramid_now(&pyramid),
        }
    }

    fn draw_pyramid_now(&mut self, pyramid: &Pyramid) {
        let top = self.viewer.to_local(pyramid.top);
        let base_center = self.viewer.to_local(pyramid.base_center);
        let base_edge = self.viewer.to_local(pyramid.base_edge);
        let key = PipelineKey::fixed(PipelineKind::Triangles, pyramid.depth);
        let color = pyramid.color;
        self.target().draw_with(key, "pyramid", |out| {
            shapes::emit_pyramid(out, top, base_center, base_edge, color)
        });
    }

    /// Text label anchored at `location`.
    pub fn draw_label(&mut self, location: DVec3, text: impl Into<String>, style: &LabelStyle) {
        if !self.enabled() {
            return;
        }
        let label = Label {
            location,
            text: text.into(),
            color: style.color,
            scale: style.scale.unwrap_or(self.renderer.config.label_scale),
            shadow: style.shadow,
            y_offset: style.y_offset,
            background: style.background,
            depth: DepthMode::from_see_through(style.see_through),
        };
        match self.phase {
            FramePhase::Deferring => self.defer(DeferredPrimitive::Label(label)),
            FramePhase::Immediate => self.draw_label_now(&label),
        }
    }

    fn draw_label_now(&mut self, label: &Label) {
        let scale = label.scale * LABEL_UNIT;
        let lift = DVec3::new(0.0, label.y_offset as f64 * scale, 0.0);
        let text = TextDraw {
            text: &label.text,
            origin: self.viewer.to_local(label.location + lift),
            scale: scale as f32,
            color: label.color,
            background: label.background,
            shadow: label.shadow,
        };
        let key = PipelineKey::fixed(PipelineKind::Text, label.depth);
        self.target().draw_text(key, text);
    }

    /// Label that stays readable at any distance.
    ///
    /// Hidden when closer than `options.hide_closer_than`; beyond 50 units it
    /// stops growing and is drawn pulled in toward the viewer.
    pub fn draw_dynamic_label(&mut self, location: DVec3, text: &str, y_offset: f32, options: &DynamicLabelOptions) {
        let Some(placed) = DynamicLabel::place(location, self.viewer.position, options) else {
            return;
        };
        let style = LabelStyle {
            see_through: options.see_through,
            color: None,
            scale: Some(placed.scale),
            shadow: true,
            y_offset,
            background: [0.0; 4],
        };
        self.draw_label(placed.location, text, &style);
    }

    // ------------------------------------------------------------------
    // Lines (always immediate)
    // ------------------------------------------------------------------

    /// Run a line batching session.
    ///
    /// Every segment added in `draws` is rebased against this frame's viewer
    /// and drawn with the `(width, depth)` line pipeline; the session is
    /// flushed when `draws` returns.
    pub fn lines(&mut self, width: f32, depth: DepthMode, draws: impl FnOnce(&mut LineBatcher<'_, B>)) {
        if !self.enabled() {
            return;
        }
        let viewer = self.viewer;
        let curve_segments = self.renderer.config.curve_segments;
        let mut batch = LineBatcher::new(self.target(), viewer, width, depth, curve_segments);
        draws(&mut batch);
    }

    pub fn draw_line(&mut self, p1: DVec3, p2: DVec3, color: [f32; 4], width: f32, depth: DepthMode) {
        self.lines(width, depth, |batch| batch.draw_line(p1, p2, color));
    }

    /// Waypoint path; `pull_in < 0` draws sharp corners.
    pub fn draw_path(&mut self, waypoints: &[DVec3], color: [f32; 4], width: f32, depth: DepthMode, pull_in: f64) {
        self.lines(width, depth, |batch| batch.draw_path(waypoints, color, pull_in));
    }

    /// Wireframe box.
    pub fn draw_edges(&mut self, aabb: &Aabb, color: [f32; 4], width: f32, depth: DepthMode) {
        self.lines(width, depth, |batch| batch.draw_edges(aabb, color));
    }

    /// Hitbox outline: the top and bottom faces, then the four uprights.
    pub fn draw_hitbox(&mut self, aabb: &Aabb, color: [f32; 4], width: f32, depth: DepthMode) {
        let top = aabb.corners_at_height(aabb.max.y);
        let bottom = aabb.corners_at_height(aabb.min.y);
        self.lines(width, depth, |batch| {
            for i in 0..4 {
                batch.draw_line(top[i], top[(i + 1) % 4], color);
                batch.draw_line(bottom[i], bottom[(i + 1) % 4], color);
            }
            for i in 0..4 {
                batch.draw_line(bottom[i], top[i], color);
            }
        });
    }

    /// Outline of a box's top face.
    pub fn outline_top_face(&mut self, aabb: &Aabb, color: [f32; 4], width: f32, depth: DepthMode) {
        let corners = aabb.corners_at_height(aabb.max.y);
        self.lines(width, depth, |batch| {
            for i in 0..4 {
                batch.draw_line(corners[i], corners[(i + 1) % 4], color);
            }
        });
    }

    /// Line from two units ahead of the viewer's eye to `location`.
    ///
    /// Starts at the eye itself when the snapshot carries no look direction.
    pub fn draw_line_to_eye(&mut self, location: DVec3, color: [f32; 4], width: f32, depth: DepthMode) {
        let start = self.viewer.position + self.viewer.look * EYE_LINE_OFFSET;
        self.draw_line(start, location, color, width, depth);
    }

    /// Horizontal circle outline around `center`.
    pub fn draw_circle_wireframe(&mut self, center: DVec3, radius: f64, color: [f32; 4], width: f32, depth: DepthMode) {
        self.lines(width, depth, |batch| {
            batch.draw_circle(center, radius, CIRCLE_SEGMENTS, color)
        });
    }

    /// Filled horizontal disc.
    pub fn draw_circle_filled(&mut self, center: DVec3, radius: f32, color: [f32; 4], depth: DepthMode, segments: u32) {
        if !self.enabled() {
            return;
        }
        let local = self.viewer.to_local(center);
        let key = PipelineKey::fixed(PipelineKind::TriangleFan, depth);
        self.target().draw_with(key, "filled circle", |out| {
            shapes::emit_circle_fan(out, local, radius, segments, color)
        });
    }

    /// Latitude/longitude wireframe sphere, one line session per ring.
    pub fn draw_sphere_wireframe(
        &mut self,
        center: DVec3,
        radius: f64,
        color: [f32; 4],
        width: f32,
        depth: DepthMode,
        segments: u32,
    ) {
        for phi in 0..segments {
            self.lines(width, depth, |batch| {
                for theta in 0..segments * 2 {
                    let cell = shapes::sphere_cell(center, radius, phi, theta, segments);
                    batch.draw_path(&cell, color, -1.0);
                }
            });
        }
    }

    /// Solid sphere.
    pub fn draw_sphere(&mut self, center: DVec3, radius: f32, color: [f32; 4], depth: DepthMode, segments: u32) {
        if !self.enabled() {
            return;
        }
        let local = self.viewer.to_local(center);
        let key = PipelineKey::fixed(PipelineKind::Filled, depth);
        self.target().draw_with(key, "sphere", |out| {
            shapes::emit_sphere(out, local, radius, segments, color)
        });
    }

    /// Solid upright cylinder standing on `base`, with both caps.
    pub fn draw_cylinder(&mut self, base: DVec3, radius: f32, height: f32, color: [f32; 4], depth: DepthMode) {
        if !self.enabled() {
            return;
        }
        let local = self.viewer.to_local(base);
        let key = PipelineKey::fixed(PipelineKind::Filled, depth);
        self.target().draw_with(key, "cylinder", |out| {
            shapes::emit_cylinder_sides(out, local, radius, height, CIRCLE_SEGMENTS, color)
        });
        self.draw_circle_filled(base, radius, color, depth, CIRCLE_SEGMENTS);
        let top = base + DVec3::new(0.0, height as f64, 0.0);
        self.draw_circle_filled(top, radius, color, depth, CIRCLE_SEGMENTS);
    }

    /// Path through block-centered nodes, with optional names and end marker.
    pub fn draw_path_with_waypoints(&mut self, nodes: &[PathNode], style: &PathStyle) {
        if nodes.is_empty() {
            return;
        }
        let config = &self.renderer.config;
        let color = style.color.unwrap_or(config.path_color);
        let width = style.width.unwrap_or(config.line_width);
        let pull_in = style.pull_in.unwrap_or(config.path_pull_in);

        let points: Vec<DVec3> = style
            .start
            .into_iter()
            .chain(nodes.iter().map(|n| n.position + DVec3::splat(0.5)))
            .collect();
        self.draw_path(&points, color, width, style.depth, pull_in);

        if style.show_names {
            let options = DynamicLabelOptions {
                scale_multiplier: style.name_scale,
                ..Default::default()
            };
            for node in nodes {
                if let Some(name) = node.name.as_deref().filter(|n| !n.is_empty()) {
                    self.draw_dynamic_label(node.position, name, 0.0, &options);
                }
            }
        }

        if let (Some(marker), Some(last)) = (style.mark_last, nodes.last()) {
            let marker_style = WaypointStyle {
                see_through: true,
                ..Default::default()
            };
            self.draw_waypoint_filled(last.position, marker, &marker_style);
        }
    }
}

impl<B: OverlayBackend> Drop for OverlayFrame<'_, B> {
    fn drop(&mut self) {
        if !self.flushed {
            self.flush_deferred();
        }
    }
}

type Handler<B> = Box<dyn FnMut(&mut OverlayFrame<'_, B>)>;

enum Slot<B: OverlayBackend> {
    Host(Handler<B>),
    DeferredFlush,
}

/// Frame-phase callbacks run in priority order (lowest first).
///
/// The deferred flush is built in at [`DEFERRED_FLUSH_PRIORITY`], so
/// anything deferred by lower-priority handlers is drawn this frame. Ties
/// run in registration order, after the flush when they tie with it.
pub struct FrameHandlers<B: OverlayBackend> {
    slots: Vec<(i32, Slot<B>)>,
}

impl<B: OverlayBackend> FrameHandlers<B> {
    pub fn new() -> Self {
        Self {
            slots: vec![(DEFERRED_FLUSH_PRIORITY, Slot::DeferredFlush)],
        }
    }

    /// Add a handler at `priority`.
    pub fn register(&mut self, priority: i32, handler: impl FnMut(&mut OverlayFrame<'_, B>) + 'static) {
        let at = self.slots.partition_point(|(p, _)| *p <= priority);
        self.slots.insert(at, (priority, Slot::Host(Box::new(handler))));
    }

    /// Number of host handlers.
    pub fn len(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every handler against `frame`.
    pub fn dispatch(&mut self, frame: &mut OverlayFrame<'_, B>) {
        for (_, slot) in &mut self.slots {
            match slot {
                Slot::Host(handler) => handler(frame),
                Slot::DeferredFlush => frame.flush_deferred(),
            }
        }
    }

    /// Begin a frame, dispatch all handlers, and end it.
    pub fn run_frame(&mut self, renderer: &mut OverlayRenderer<B>, viewer: ViewerSnapshot) -> FrameStats {
        let mut frame = renderer.begin_frame(viewer);
        self.dispatch(&mut frame);
        frame.end()
    }
}

impl<B: OverlayBackend> Default for FrameHandlers<B> {
    fn default() -> Self {
        Self::new()
    }
}
