//! Contiguity-aware line batching.
//!
//! Segments are buffered while each one starts exactly where the previous
//! one ended. The first segment that breaks the chain flushes the buffer as
//! one line-list draw and starts a new one. Dropping the batcher flushes
//! whatever is left, so a session never loses segments.

use glam::DVec3;

use crate::backend::{DepthMode, OverlayBackend};
use crate::curve;
use crate::pipeline_cache::PipelineKey;
use crate::renderer::DrawTarget;
use crate::shapes::{self, Aabb};
use crate::vertex::OverlayVertex;
use crate::viewer::ViewerSnapshot;

/// A buffered line segment, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueuedLine {
    p1: DVec3,
    p2: DVec3,
    color: [f32; 4],
    normal: DVec3,
}

impl QueuedLine {
    pub fn new(p1: DVec3, p2: DVec3, color: [f32; 4]) -> Self {
        Self {
            p1,
            p2,
            color,
            normal: (p2 - p1).normalize_or_zero(),
        }
    }

    pub fn p1(&self) -> DVec3 {
        self.p1
    }

    pub fn p2(&self) -> DVec3 {
        self.p2
    }

    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    /// Unit direction from `p1` to `p2`; zero for degenerate segments.
    pub fn normal(&self) -> DVec3 {
        self.normal
    }
}

/// A line batching session for one stroke width and depth mode.
///
/// Obtain via [`OverlayFrame::lines`](crate::OverlayFrame::lines).
pub struct LineBatcher<'a, B: OverlayBackend> {
    target: DrawTarget<'a, B>,
    viewer: ViewerSnapshot,
    key: PipelineKey,
    curve_segments: u32,
    lines: Vec<QueuedLine>,
}

impl<'a, B: OverlayBackend> LineBatcher<'a, B> {
    pub(crate) fn new(
        target: DrawTarget<'a, B>,
        viewer: ViewerSnapshot,
        width: f32,
        depth: DepthMode,
        curve_segments: u32,
    ) -> Self {
        Self {
            target,
            viewer,
            key: PipelineKey::lines(width, depth),
            curve_segments,
            lines: Vec::new(),
        }
    }

    /// Quantized stroke width and depth mode of this session.
    pub fn key(&self) -> PipelineKey {
        self.key
    }

    /// Segments buffered since the last flush.
    pub fn pending(&self) -> &[QueuedLine] {
        &self.lines
    }

    /// Buffer a segment, flushing first if it doesn't continue the chain.
    ///
    /// Contiguity is exact equality of `p1` with the previous segment's `p2`.
    pub fn add_segment(&mut self, p1: DVec3, p2: DVec3, color: [f32; 4]) {
        if let Some(last) = self.lines.last() {
            if last.p2 != p1 {
                self.flush();
            }
        }
        self.lines.push(QueuedLine::new(p1, p2, color));
    }

    /// Draw everything buffered as one call and empty the buffer.
    pub fn flush(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        let viewer = self.viewer;
        let lines = &self.lines;
        self.target.draw_with(self.key, "line batch", |out| {
            out.reserve(lines.len() * 2);
            for line in lines {
                let normal = line.normal.as_vec3();
                out.push(OverlayVertex::new(viewer.to_local(line.p1), line.color).with_normal(normal));
                out.push(OverlayVertex::new(viewer.to_local(line.p2), line.color).with_normal(normal));
            }
        });
        self.target.stats.line_batches += 1;
        self.lines.clear();
    }

    pub fn draw_line(&mut self, p1: DVec3, p2: DVec3, color: [f32; 4]) {
        self.add_segment(p1, p2, color);
    }

    /// Quadratic curve from `p1` to `p3` with control point `p2`.
    pub fn draw_bezier(&mut self, p1: DVec3, p2: DVec3, p3: DVec3, color: [f32; 4], segments: u32) {
        for (a, b) in curve::tessellate_quadratic(p1, p2, p3, segments) {
            self.add_segment(a, b, color);
        }
    }

    /// Waypoint path; `pull_in < 0` disables corner rounding.
    pub fn draw_path(&mut self, waypoints: &[DVec3], color: [f32; 4], pull_in: f64) {
        for (a, b) in curve::path_segments(waypoints, pull_in, self.curve_segments) {
            self.add_segment(a, b, color);
        }
    }

    /// The twelve edges of a box.
    pub fn draw_edges(&mut self, aabb: &Aabb, color: [f32; 4]) {
        for (a, b) in aabb.edges() {
            self.add_segment(a, b, color);
        }
    }

    /// Horizontal circle outline.
    pub fn draw_circle(&mut self, center: DVec3, radius: f64, segments: u32, color: [f32; 4]) {
        let points = shapes::circle_points(center, radius, segments);
        for w in points.windows(2) {
            self.add_segment(w[0], w[1], color);
        }
    }
}

impl<B: OverlayBackend> Drop for LineBatcher<'_, B> {
    fn drop(&mut self) {
        self.flush();
    }
}
