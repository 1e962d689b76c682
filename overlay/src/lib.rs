//! Per-frame overlay geometry for RedLilium Engine.
//!
//! Lets any call site request transient overlay primitives (highlighted
//! boxes, pyramids, circles, labels, waypoint paths) without knowing whether
//! the render pass is open, which pipeline is bound, or how far the viewer is
//! from the world origin.
//!
//! # Architecture
//!
//! - [`OverlayRenderer`]: owns the backend, the [`PipelineCache`] and the
//!   deferred queue (create once)
//! - [`OverlayFrame`]: one frame of drawing, in a deferring then immediate phase
//! - [`FrameHandlers`]: priority-ordered frame callbacks with the deferred
//!   flush built in at [`DEFERRED_FLUSH_PRIORITY`]
//! - [`LineBatcher`]: coalesces contiguous segments into single draws
//! - [`ViewerSnapshot`]: per-frame viewer position; the only world-to-local conversion
//!
//! # Usage
//!
//! ```ignore
//! let mut renderer = OverlayRenderer::new(backend, OverlayConfig::default());
//! let mut handlers = FrameHandlers::new();
//!
//! // Runs before the deferred flush: boxes are queued, then replayed.
//! handlers.register(0, |frame| {
//!     frame.draw_color(block, [1.0, 0.0, 0.0, 1.0], None, DepthMode::SeeThrough);
//! });
//! // Runs after it: everything draws immediately.
//! handlers.register(1000, |frame| {
//!     frame.lines(3.0, DepthMode::Occluded, |lines| {
//!         lines.draw_path(&waypoints, [1.0; 4], 1.0);
//!     });
//! });
//!
//! // Each frame:
//! let viewer = ViewerSnapshot::interpolated(prev_eye, eye, partial_tick);
//! let stats = handlers.run_frame(&mut renderer, viewer);
//! ```

pub mod backend;
pub mod config;
pub mod curve;
pub mod deferred;
pub mod distance;
pub mod error;
mod frame;
pub mod lines;
pub mod pipeline_cache;
mod renderer;
pub mod shapes;
pub mod vertex;
pub mod viewer;

pub use backend::{DepthMode, DummyBackend, OverlayBackend, PipelineDescriptor, PipelineHandle, PipelineKind};
pub use config::OverlayConfig;
pub use deferred::{DeferredPrimitive, DeferredQueue, FilledBox, Label, OverlayFrameState, Pyramid};
pub use error::{BackendError, BackendResult, OverlayError, OverlayResult};
pub use frame::{
    FrameHandlers, FramePhase, LabelStyle, OverlayFrame, PathNode, PathStyle, WaypointStyle,
    DEFERRED_FLUSH_PRIORITY,
};
pub use lines::{LineBatcher, QueuedLine};
pub use pipeline_cache::{LineWidthKey, OverlayPipeline, PipelineCache, PipelineKey};
pub use renderer::{FrameStats, OverlayRenderer};
pub use shapes::Aabb;
pub use vertex::OverlayVertex;
pub use viewer::{Placement, ViewerSnapshot};
