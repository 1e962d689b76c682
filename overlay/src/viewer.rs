//! Viewer snapshot and viewer-relative rebasing.
//!
//! World positions are kept in `f64` ([`DVec3`]) everywhere on the CPU side.
//! The only way to obtain a GPU-facing `f32` position is
//! [`ViewerSnapshot::to_local`], which subtracts the viewer position. Since a
//! [`Vec3`] cannot be fed back into `to_local`, a position can never be
//! rebased twice.

use glam::{DVec3, Vec3};

/// The viewer's position for one rendered frame.
///
/// Built once per frame by the host and passed to
/// [`OverlayRenderer::begin_frame`](crate::OverlayRenderer::begin_frame).
/// Immutable for the lifetime of that frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerSnapshot {
    /// Absolute world position of the viewer (camera eye).
    pub position: DVec3,
    /// Partial-tick interpolation factor in `[0, 1]`.
    pub interpolation: f32,
    /// Unit look direction; zero when the host doesn't provide one.
    pub look: DVec3,
}

impl ViewerSnapshot {
    pub fn new(position: DVec3, interpolation: f32) -> Self {
        Self {
            position,
            interpolation,
            look: DVec3::ZERO,
        }
    }

    /// Set the look direction. Normalized; a zero vector stays zero.
    pub fn with_look(mut self, look: DVec3) -> Self {
        self.look = look.normalize_or_zero();
        self
    }

    /// Snapshot for a viewer that moved from `previous` to `current` during
    /// the last tick, evaluated at the partial tick `interpolation`.
    pub fn interpolated(previous: DVec3, current: DVec3, interpolation: f32) -> Self {
        Self::new(
            interpolate(previous, current, interpolation),
            interpolation,
        )
    }

    /// Rebase a world position into viewer-relative `f32` coordinates.
    #[inline]
    pub fn to_local(&self, world: DVec3) -> Vec3 {
        (world - self.position).as_vec3()
    }

    /// Resolve a placed position into viewer-relative coordinates.
    #[inline]
    pub fn resolve(&self, position: DVec3, placement: Placement) -> Vec3 {
        match placement {
            Placement::World => self.to_local(position),
            Placement::CameraRelative => position.as_vec3(),
        }
    }

    /// Squared distance from the viewer to a world position.
    #[inline]
    pub fn distance_squared(&self, world: DVec3) -> f64 {
        world.distance_squared(self.position)
    }
}

impl Default for ViewerSnapshot {
    fn default() -> Self {
        Self::new(DVec3::ZERO, 1.0)
    }
}

/// Coordinate space a request was expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Absolute world coordinates; rebased against the viewer when drawn.
    #[default]
    World,
    /// Already relative to the viewer; drawn as-is.
    CameraRelative,
}

/// Linear interpolation between the previous and current tick position.
#[inline]
pub fn interpolate(previous: DVec3, current: DVec3, interpolation: f32) -> DVec3 {
    previous + (current - previous) * interpolation as f64
}
