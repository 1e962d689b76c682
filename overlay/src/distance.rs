//! Distance-driven alpha and scale for overlay elements.

use glam::DVec3;
use serde::Deserialize;

/// Linear alpha ramp over squared distance.
///
/// Normal ramps start faint and become opaque with distance (so nearby
/// highlights don't hide what they mark); inverted ramps fade out with
/// distance.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DistanceRamp {
    /// Value at distance zero for a normal ramp.
    pub offset: f32,
    /// Value at distance zero for an inverted ramp.
    pub inverted_offset: f32,
    /// Change in value per squared world unit.
    pub slope: f32,
}

impl Default for DistanceRamp {
    fn default() -> Self {
        Self {
            offset: 0.1,
            inverted_offset: 1.0,
            slope: 0.005,
        }
    }
}

impl DistanceRamp {
    /// Evaluate the ramp.
    ///
    /// `distance_sq` is first clamped into `[near, far]`; the ramp value is
    /// then clamped into `[min, max]`. `invert` selects the falling ramp.
    pub fn scale(
        &self,
        distance_sq: f64,
        near: f64,
        far: f64,
        min: f32,
        max: f32,
        invert: bool,
    ) -> f32 {
        let d = distance_sq.max(near).min(far) as f32;
        let value = if invert {
            self.inverted_offset - self.slope * d
        } else {
            self.offset + self.slope * d
        };
        value.max(min).min(max)
    }
}

/// [`DistanceRamp::scale`] with the default ramp.
pub fn scale(distance_sq: f64, near: f64, far: f64, min: f32, max: f32, invert: bool) -> f32 {
    DistanceRamp::default().scale(distance_sq, near, far, min, max, invert)
}

/// Tuning for labels that keep a readable size at any distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicLabelOptions {
    pub scale_multiplier: f64,
    /// Labels closer than this are hidden.
    pub hide_closer_than: f64,
    /// Distances below this are treated as this.
    pub smallest_distance: f64,
    /// Occluded labels farther than this are hidden.
    pub max_distance: Option<f64>,
    pub see_through: bool,
    /// Place the label at `location.y` scaled by distance instead of
    /// lifting it toward the viewer's eye line.
    pub ignore_y: bool,
}

impl Default for DynamicLabelOptions {
    fn default() -> Self {
        Self {
            scale_multiplier: 1.0,
            hide_closer_than: 4.5,
            smallest_distance: 5.0,
            max_distance: None,
            see_through: true,
            ignore_y: false,
        }
    }
}

/// Distance past which dynamic labels stop growing and are pulled in.
const MAX_RENDER_DISTANCE: f64 = 50.0;

/// Where and how large a dynamic label is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicLabel {
    pub location: DVec3,
    pub scale: f64,
}

impl DynamicLabel {
    /// Place a label for `location` (a block corner) as seen from `eye`.
    ///
    /// Returns `None` when the label should not be drawn.
    pub fn place(location: DVec3, eye: DVec3, options: &DynamicLabelOptions) -> Option<Self> {
        let distance = location
            .distance(eye)
            .max(options.smallest_distance);

        if distance < options.hide_closer_than {
            return None;
        }
        if let Some(max) = options.max_distance {
            if !options.see_through && distance > max {
                return None;
            }
        }

        let render_distance = distance.min(MAX_RENDER_DISTANCE);
        if render_distance <= 0.0 {
            return None;
        }
        let pull = distance / render_distance;
        let scale = render_distance / 12.0 * options.scale_multiplier;

        let x = eye.x + (location.x + 0.5 - eye.x) / pull;
        let z = eye.z + (location.z + 0.5 - eye.z) / pull;
        let y = if options.ignore_y {
            location.y * distance / render_distance
        } else {
            eye.y + (location.y + 20.0 * distance / 300.0 - eye.y) / pull
        };

        Some(Self {
            location: DVec3::new(x, y, z),
            scale,
        })
    }
}
