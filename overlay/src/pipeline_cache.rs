//! Lazily built pipeline objects, shared across draw paths.
//!
//! Line pipelines are parameterized by a floating-point stroke width. Widths
//! are quantized to hundredths of a pixel before they are used as a key, so
//! two widths that are meant to be equal always land on the same entry and
//! two widths that differ by at least 0.01 never share one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::{DepthMode, PipelineDescriptor, PipelineHandle, PipelineKind};
use crate::error::{OverlayError, OverlayResult};

/// Stroke-width steps per pixel.
const WIDTH_STEPS_PER_PIXEL: f32 = 100.0;

/// Stroke width quantized to `1 / 100` pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineWidthKey(u32);

impl LineWidthKey {
    /// Key for pipelines that have no stroke width.
    pub const NONE: Self = Self(0);

    /// Quantize a width. Negative and NaN widths map to zero.
    pub fn from_width(width: f32) -> Self {
        let steps = (width * WIDTH_STEPS_PER_PIXEL).round();
        if steps.is_nan() || steps <= 0.0 {
            Self(0)
        } else {
            // `as` saturates for widths beyond u32::MAX steps.
            Self(steps as u32)
        }
    }

    /// The width this key stands for.
    pub fn width(self) -> f32 {
        self.0 as f32 / WIDTH_STEPS_PER_PIXEL
    }
}

/// Cache key for one pipeline object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub kind: PipelineKind,
    pub depth: DepthMode,
    pub width: LineWidthKey,
}

impl PipelineKey {
    /// Key for a line pipeline of the given stroke width.
    pub fn lines(width: f32, depth: DepthMode) -> Self {
        Self {
            kind: PipelineKind::Lines,
            depth,
            width: LineWidthKey::from_width(width),
        }
    }

    /// Key for a fixed-function pipeline with no width parameter.
    pub fn fixed(kind: PipelineKind, depth: DepthMode) -> Self {
        Self {
            kind,
            depth,
            width: LineWidthKey::NONE,
        }
    }

    /// Descriptor the backend builds this key's pipeline from.
    pub fn descriptor(&self) -> PipelineDescriptor {
        let line_width = (self.kind == PipelineKind::Lines).then(|| self.width.width());
        PipelineDescriptor::new(self.kind, self.depth, line_width)
    }
}

/// A cached pipeline object.
#[derive(Debug)]
pub struct OverlayPipeline {
    pub key: PipelineKey,
    pub handle: PipelineHandle,
    pub label: String,
}

/// Read-through cache of pipeline objects.
///
/// Occluded and see-through pipelines live in separate partitions. Entries
/// are never evicted: the key space is bounded by the handful of stroke
/// widths a user can configure.
#[derive(Debug, Default)]
pub struct PipelineCache {
    partitions: [RwLock<HashMap<PipelineKey, Arc<OverlayPipeline>>>; 2],
}

impl PipelineCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the pipeline for `key`, building it with `construct` on a miss.
    ///
    /// Construction runs under the partition's write lock, so concurrent
    /// misses for the same key build exactly one object. A failed
    /// construction stores nothing and is retried on the next request.
    pub fn get_or_create<F>(&self, key: PipelineKey, construct: F) -> OverlayResult<Arc<OverlayPipeline>>
    where
        F: FnOnce(&PipelineDescriptor) -> crate::error::BackendResult<PipelineHandle>,
    {
        let partition = &self.partitions[key.depth.index()];

        // Fast path: read lock
        if let Some(pipeline) = partition.read().get(&key) {
            return Ok(Arc::clone(pipeline));
        }

        // Slow path: write lock
        let mut entries = partition.write();
        if let Some(pipeline) = entries.get(&key) {
            return Ok(Arc::clone(pipeline));
        }

        let descriptor = key.descriptor();
        let handle = construct(&descriptor)
            .map_err(|e| OverlayError::backend(format!("pipeline {}", descriptor.label), e))?;
        log::debug!("Created overlay pipeline {} ({:?})", descriptor.label, handle);

        let pipeline = Arc::new(OverlayPipeline {
            key,
            handle,
            label: descriptor.label,
        });
        entries.insert(key, Arc::clone(&pipeline));
        Ok(pipeline)
    }

    /// Whether a pipeline for `key` has been built.
    pub fn contains(&self, key: &PipelineKey) -> bool {
        self.partitions[key.depth.index()].read().contains_key(key)
    }

    /// Number of cached pipelines across both partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
