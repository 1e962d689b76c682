//! Dummy overlay backend for testing and headless use.
//!
//! This backend doesn't touch a GPU. It hands out pipeline handles, records
//! every draw it receives, and can be told to fail so error paths can be
//! exercised.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use glam::Vec3;

use crate::error::{BackendError, BackendResult};
use crate::vertex::OverlayVertex;

use super::{OverlayBackend, PipelineDescriptor, PipelineHandle, TextDraw};

/// One `draw_indexed` call as seen by the [`DummyBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub pass_label: String,
    pub pipeline: PipelineHandle,
    pub vertices: Vec<OverlayVertex>,
    pub index_count: u32,
}

impl DrawRecord {
    /// Component-wise minimum and maximum of the recorded positions.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut positions = self.vertices.iter().map(|v| Vec3::from(v.position));
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}

/// One `draw_text` call as seen by the [`DummyBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextRecord {
    pub pipeline: PipelineHandle,
    pub text: String,
    pub origin: Vec3,
    pub scale: f32,
    pub color: Option<[f32; 4]>,
    pub background: [f32; 4],
    pub shadow: bool,
}

/// Dummy overlay backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_pipeline: AtomicU64,
    pipelines_created: AtomicU64,
    fail_pipelines: AtomicBool,
    failing_draws: usize,
    pass_label: Option<String>,
    bound: Option<PipelineHandle>,
    staged: Vec<OverlayVertex>,
    draws: Vec<DrawRecord>,
    texts: Vec<TextRecord>,
    passes: usize,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws recorded so far, in submission order.
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Labels recorded so far, in submission order.
    pub fn texts(&self) -> &[TextRecord] {
        &self.texts
    }

    /// Number of passes opened.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Number of successful `create_pipeline` calls.
    pub fn pipelines_created(&self) -> u64 {
        self.pipelines_created.load(Ordering::Acquire)
    }

    /// Forget recorded draws and labels.
    pub fn clear_records(&mut self) {
        self.draws.clear();
        self.texts.clear();
        self.passes = 0;
    }

    /// Make every following `create_pipeline` call fail (or succeed again).
    pub fn set_fail_pipelines(&self, fail: bool) {
        self.fail_pipelines.store(fail, Ordering::Release);
    }

    /// Make the next `count` draw submissions (geometry or text) fail.
    pub fn fail_next_draws(&mut self, count: usize) {
        self.failing_draws = count;
    }

    fn take_failure(&mut self) -> bool {
        if self.failing_draws > 0 {
            self.failing_draws -= 1;
            true
        } else {
            false
        }
    }
}

impl OverlayBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn create_pipeline(&self, descriptor: &PipelineDescriptor) -> BackendResult<PipelineHandle> {
        if self.fail_pipelines.load(Ordering::Acquire) {
            return Err(BackendError::PipelineCreationFailed(format!(
                "{} rejected by dummy backend",
                descriptor.label
            )));
        }
        let handle = PipelineHandle(self.next_pipeline.fetch_add(1, Ordering::AcqRel));
        self.pipelines_created.fetch_add(1, Ordering::AcqRel);
        log::trace!(
            "DummyBackend: creating pipeline {} -> {:?}",
            descriptor.label,
            handle
        );
        Ok(handle)
    }

    fn begin_pass(&mut self, label: &str) -> BackendResult<()> {
        log::trace!("DummyBackend: begin pass {label}");
        self.pass_label = Some(label.to_string());
        self.passes += 1;
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        self.bound = Some(pipeline);
    }

    fn set_vertex_buffer(&mut self, vertices: &[OverlayVertex]) -> BackendResult<()> {
        log::trace!(
            "DummyBackend: set_vertex_buffer {} vertices ({} bytes)",
            vertices.len(),
            bytemuck::cast_slice::<OverlayVertex, u8>(vertices).len()
        );
        self.staged.clear();
        self.staged.extend_from_slice(vertices);
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32) -> BackendResult<()> {
        if self.take_failure() {
            return Err(BackendError::SubmissionFailed(
                "injected draw failure".to_string(),
            ));
        }
        let Some(pipeline) = self.bound else {
            return Err(BackendError::SubmissionFailed(
                "no pipeline bound".to_string(),
            ));
        };
        log::trace!("DummyBackend: draw_indexed {index_count} with {pipeline:?}");
        self.draws.push(DrawRecord {
            pass_label: self.pass_label.clone().unwrap_or_default(),
            pipeline,
            vertices: std::mem::take(&mut self.staged),
            index_count,
        });
        Ok(())
    }

    fn draw_text(&mut self, text: &TextDraw<'_>) -> BackendResult<()> {
        if self.take_failure() {
            return Err(BackendError::SubmissionFailed(
                "injected text failure".to_string(),
            ));
        }
        let Some(pipeline) = self.bound else {
            return Err(BackendError::SubmissionFailed(
                "no pipeline bound".to_string(),
            ));
        };
        log::trace!("DummyBackend: draw_text {:?} at {}", text.text, text.origin);
        self.texts.push(TextRecord {
            pipeline,
            text: text.text.to_string(),
            origin: text.origin,
            scale: text.scale,
            color: text.color,
            background: text.background,
            shadow: text.shadow,
        });
        Ok(())
    }

    fn end_pass(&mut self) {
        log::trace!("DummyBackend: end pass");
        self.pass_label = None;
        self.bound = None;
        self.staged.clear();
    }
}
