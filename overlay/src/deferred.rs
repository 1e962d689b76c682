//! Deferred primitives and the per-frame deferred queue.
//!
//! Some requests arrive while the frame cannot accept draws yet. They are
//! parked in one of six lists (three primitive kinds, two depth modes) and
//! replayed once, late in the frame, through the same draw path an
//! immediate request takes.

use glam::DVec3;

use crate::backend::DepthMode;
use crate::shapes::Aabb;
use crate::viewer::Placement;

/// A filled, translucent box.
#[derive(Debug, Clone, PartialEq)]
pub struct FilledBox {
    pub aabb: Aabb,
    pub placement: Placement,
    pub color: [f32; 4],
    pub alpha_multiplier: f32,
    pub depth: DepthMode,
}

/// A square pyramid given by its apex, base center and one base corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Pyramid {
    pub top: DVec3,
    pub base_center: DVec3,
    pub base_edge: DVec3,
    pub color: [f32; 4],
    pub depth: DepthMode,
}

/// A text label anchored at a world position.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub location: DVec3,
    pub text: String,
    /// `None` draws with the backend's default text color.
    pub color: Option<[f32; 4]>,
    pub scale: f64,
    pub shadow: bool,
    /// Vertical offset in glyph units.
    pub y_offset: f32,
    pub background: [f32; 4],
    pub depth: DepthMode,
}

/// Default label scale, in glyph units per world unit / 0.05.
pub const DEFAULT_LABEL_SCALE: f64 = 0.533_333_33;

/// Default label background: black at a quarter opacity.
pub const DEFAULT_LABEL_BACKGROUND: [f32; 4] = [0.0, 0.0, 0.0, 63.0 / 255.0];

impl Label {
    pub fn new(location: DVec3, text: impl Into<String>) -> Self {
        Self {
            location,
            text: text.into(),
            color: None,
            scale: DEFAULT_LABEL_SCALE,
            shadow: false,
            y_offset: 0.0,
            background: DEFAULT_LABEL_BACKGROUND,
            depth: DepthMode::Occluded,
        }
    }
}

/// The three kinds of primitive that can be deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    FilledBox,
    Pyramid,
    Label,
}

impl PrimitiveKind {
    /// Position in the replay order.
    fn index(self) -> usize {
        match self {
            Self::FilledBox => 0,
            Self::Pyramid => 1,
            Self::Label => 2,
        }
    }
}

/// A draw request parked until the deferred flush.
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredPrimitive {
    FilledBox(FilledBox),
    Pyramid(Pyramid),
    Label(Label),
}

impl DeferredPrimitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::FilledBox(_) => PrimitiveKind::FilledBox,
            Self::Pyramid(_) => PrimitiveKind::Pyramid,
            Self::Label(_) => PrimitiveKind::Label,
        }
    }

    pub fn depth(&self) -> DepthMode {
        match self {
            Self::FilledBox(b) => b.depth,
            Self::Pyramid(p) => p.depth,
            Self::Label(l) => l.depth,
        }
    }
}

const LIST_COUNT: usize = 6;

fn list_index(kind: PrimitiveKind, depth: DepthMode) -> usize {
    kind.index() * 2 + depth.index()
}

/// Six append-only lists of deferred primitives.
///
/// List order is kind-major (boxes, pyramids, labels) and see-through before
/// occluded within a kind; that is also the replay order.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    lists: [Vec<DeferredPrimitive>; LIST_COUNT],
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a primitive in the list matching its kind and depth mode.
    pub fn defer(&mut self, primitive: DeferredPrimitive) {
        let index = list_index(primitive.kind(), primitive.depth());
        self.lists[index].push(primitive);
    }

    /// Move every list out of the queue, leaving it empty.
    ///
    /// Anything deferred after this call lands in the queue for the next
    /// flush, never in the returned batch.
    pub fn take(&mut self) -> DeferredBatch {
        DeferredBatch {
            lists: std::mem::take(&mut self.lists),
        }
    }

    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty)
    }

    /// Number of primitives waiting in one list.
    pub fn len_of(&self, kind: PrimitiveKind, depth: DepthMode) -> usize {
        self.lists[list_index(kind, depth)].len()
    }
}

/// The contents of a [`DeferredQueue`] at flush time.
#[derive(Debug, Default)]
pub struct DeferredBatch {
    lists: [Vec<DeferredPrimitive>; LIST_COUNT],
}

impl DeferredBatch {
    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoIterator for DeferredBatch {
    type Item = DeferredPrimitive;
    type IntoIter = std::iter::Flatten<std::array::IntoIter<Vec<DeferredPrimitive>, LIST_COUNT>>;

    /// Primitives in replay order, FIFO within each list.
    fn into_iter(self) -> Self::IntoIter {
        self.lists.into_iter().flatten()
    }
}

/// Per-frame overlay state owned by the renderer.
///
/// Created once with the renderer; the deferred queue is drained by the
/// frame's deferred flush and never carries primitives past a flush.
#[derive(Debug, Default)]
pub struct OverlayFrameState {
    pub(crate) queue: DeferredQueue,
    pub(crate) frame_index: u64,
}

impl OverlayFrameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self) -> &DeferredQueue {
        &self.queue
    }

    /// Number of frames begun so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}
