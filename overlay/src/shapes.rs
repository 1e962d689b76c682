//! World-space shapes and their vertex emitters.
//!
//! Emitters take viewer-relative positions only; rebasing happens before
//! they are called (see [`ViewerSnapshot::to_local`](crate::ViewerSnapshot::to_local)).

use glam::{DVec3, Vec3};

use crate::vertex::OverlayVertex;

/// Axis-aligned box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Box spanning two corners in any order.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The unit block whose minimum corner is `location`.
    pub fn block(location: DVec3) -> Self {
        Self::new(location, location + DVec3::ONE)
    }

    /// Grow the box by `amount` on every side (shrink for negative amounts).
    pub fn inflate(&self, amount: DVec3) -> Self {
        Self::new(self.min - amount, self.max + amount)
    }

    /// The four corners of the horizontal slice at height `y`, in winding order.
    pub fn corners_at_height(&self, y: f64) -> [DVec3; 4] {
        [
            DVec3::new(self.min.x, y, self.min.z),
            DVec3::new(self.min.x, y, self.max.z),
            DVec3::new(self.max.x, y, self.max.z),
            DVec3::new(self.max.x, y, self.min.z),
        ]
    }

    /// The twelve edges, bottom ring, top ring, then verticals.
    pub fn edges(&self) -> [(DVec3, DVec3); 12] {
        let bottom = self.corners_at_height(self.min.y);
        let top = self.corners_at_height(self.max.y);
        let mut edges = [(DVec3::ZERO, DVec3::ZERO); 12];
        for i in 0..4 {
            edges[i] = (bottom[i], bottom[(i + 1) % 4]);
            edges[4 + i] = (top[i], top[(i + 1) % 4]);
            edges[8 + i] = (bottom[i], top[i]);
        }
        edges
    }
}

/// Scale RGB of a filled-box color the way solid overlays are shaded, and
/// apply an alpha multiplier.
pub fn shade_filled(color: [f32; 4], alpha_multiplier: f32) -> [f32; 4] {
    [
        color[0] * 0.9,
        color[1] * 0.9,
        color[2] * 0.9,
        color[3] * alpha_multiplier,
    ]
}

/// Emit a filled box as a triangle list (6 faces, 36 vertices).
pub fn emit_filled_box(out: &mut Vec<OverlayVertex>, min: Vec3, max: Vec3, color: [f32; 4]) {
    let c = [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(max.x, max.y, max.z),
        Vec3::new(min.x, max.y, max.z),
    ];
    const FACES: [[usize; 4]; 6] = [
        [0, 3, 2, 1], // -Z
        [4, 5, 6, 7], // +Z
        [0, 4, 7, 3], // -X
        [1, 2, 6, 5], // +X
        [0, 1, 5, 4], // -Y
        [3, 7, 6, 2], // +Y
    ];
    out.reserve(36);
    for [a, b, d, e] in FACES {
        for i in [a, b, d, a, d, e] {
            out.push(OverlayVertex::new(c[i], color));
        }
    }
}

/// Emit a square pyramid as a triangle list (4 sides + 2 base triangles).
///
/// The base is the square centered on `base_center` that has `base_edge` as
/// one of its corners, lying in the plane perpendicular to the apex axis.
pub fn emit_pyramid(
    out: &mut Vec<OverlayVertex>,
    top: Vec3,
    base_center: Vec3,
    base_edge: Vec3,
    color: [f32; 4],
) {
    let edge = base_edge - base_center;
    let axis = (top - base_center).normalize_or_zero();
    let corner1 = base_edge;
    let corner2 = axis.cross(edge).normalize_or_zero() * edge.length() + base_center;
    let corner3 = base_center - edge;
    let corner4 = edge.cross(axis).normalize_or_zero() * edge.length() + base_center;

    let triangles = [
        [top, corner1, corner2],
        [top, corner2, corner3],
        [top, corner3, corner4],
        [top, corner4, corner1],
        [corner1, corner2, corner3],
        [corner1, corner3, corner4],
    ];
    out.reserve(18);
    for tri in triangles {
        out.extend(tri.iter().map(|p| OverlayVertex::new(*p, color)));
    }
}

/// Emit a horizontal filled circle as a triangle fan.
pub fn emit_circle_fan(
    out: &mut Vec<OverlayVertex>,
    center: Vec3,
    radius: f32,
    segments: u32,
    color: [f32; 4],
) {
    if segments == 0 {
        return;
    }
    out.reserve(segments as usize + 2);
    out.push(OverlayVertex::new(center, color));
    for i in 0..=segments {
        let angle = i as f32 * std::f32::consts::TAU / segments as f32;
        let (sin, cos) = angle.sin_cos();
        out.push(OverlayVertex::new(
            center + Vec3::new(radius * cos, 0.0, radius * sin),
            color,
        ));
    }
}

/// Points of a horizontal circle outline in world space, closed (first == last).
pub fn circle_points(center: DVec3, radius: f64, segments: u32) -> Vec<DVec3> {
    (0..=segments)
        .map(|i| {
            let theta = std::f64::consts::TAU * (i % segments.max(1)) as f64 / segments.max(1) as f64;
            center + DVec3::new(radius * theta.cos(), 0.0, radius * theta.sin())
        })
        .collect()
}

/// Corners of one cell of a sphere's latitude/longitude grid.
///
/// `phi` counts rings from the top pole (`segments` of them) and `theta`
/// counts meridians (`2 * segments` of them). The corners wind ring `phi`,
/// ring `phi + 1`, then back, so the last corner of cell `theta` is the
/// first corner of cell `theta + 1`.
pub fn sphere_cell(center: DVec3, radius: f64, phi: u32, theta: u32, segments: u32) -> [DVec3; 4] {
    let point = |phi: u32, theta: u32| {
        let polar = std::f64::consts::PI * phi as f64 / segments as f64;
        let azimuth = 2.0 * std::f64::consts::PI * theta as f64 / (segments * 2) as f64;
        center
            + DVec3::new(
                radius * polar.sin() * azimuth.cos(),
                radius * polar.cos(),
                radius * polar.sin() * azimuth.sin(),
            )
    };
    [
        point(phi, theta),
        point(phi + 1, theta),
        point(phi + 1, theta + 1),
        point(phi, theta + 1),
    ]
}

/// Emit a solid sphere as a triangle list, two triangles per grid cell.
pub fn emit_sphere(out: &mut Vec<OverlayVertex>, center: Vec3, radius: f32, segments: u32, color: [f32; 4]) {
    if segments == 0 {
        return;
    }
    let center = center.as_dvec3();
    out.reserve((segments * segments * 2 * 6) as usize);
    for phi in 0..segments {
        for theta in 0..segments * 2 {
            let [a, b, c, d] = sphere_cell(center, radius as f64, phi, theta, segments);
            for p in [a, b, c, a, c, d] {
                out.push(OverlayVertex::new(p.as_vec3(), color));
            }
        }
    }
}

/// Emit the side wall of an upright cylinder as a triangle list.
///
/// Caps are not included; draw them as circle fans.
pub fn emit_cylinder_sides(
    out: &mut Vec<OverlayVertex>,
    base: Vec3,
    radius: f32,
    height: f32,
    segments: u32,
    color: [f32; 4],
) {
    if segments == 0 {
        return;
    }
    let rim = |i: u32| {
        let angle = (i % segments) as f32 * std::f32::consts::TAU / segments as f32;
        let (sin, cos) = angle.sin_cos();
        base + Vec3::new(radius * cos, 0.0, radius * sin)
    };
    let up = Vec3::new(0.0, height, 0.0);
    out.reserve(segments as usize * 6);
    for i in 0..segments {
        let (a, b) = (rim(i), rim(i + 1));
        for p in [a, a + up, b + up, a, b + up, b] {
            out.push(OverlayVertex::new(p, color));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_edges() {
        let aabb = Aabb::new(DVec3::ONE, DVec3::ZERO);
        assert_eq!(aabb.min, DVec3::ZERO);
        let edges = aabb.edges();
        assert_eq!(edges.len(), 12);
        for (a, b) in edges {
            // Every edge is axis-aligned with unit length.
            assert_eq!(a.distance(b), 1.0);
        }
    }

    #[test]
    fn test_filled_box_vertices() {
        let mut out = Vec::new();
        emit_filled_box(&mut out, Vec3::ZERO, Vec3::ONE, [1.0; 4]);
        assert_eq!(out.len(), 36);
        assert!(out
            .iter()
            .all(|v| v.position.iter().all(|c| *c == 0.0 || *c == 1.0)));
    }

    #[test]
    fn test_pyramid_base_is_square() {
        let mut out = Vec::new();
        emit_pyramid(
            &mut out,
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            [1.0; 4],
        );
        assert_eq!(out.len(), 18);
        // Base triangles lie in the y = 0 plane.
        assert!(out[12..].iter().all(|v| v.position[1] == 0.0));
    }

    #[test]
    fn test_circle_points_are_closed() {
        let points = circle_points(DVec3::new(5.0, 1.0, 5.0), 2.0, 64);
        assert_eq!(points.len(), 65);
        assert_eq!(points[0], points[64]);
    }

    #[test]
    fn test_shade_filled() {
        assert_eq!(shade_filled([1.0, 0.0, 0.5, 0.8], 0.5), [0.9, 0.0, 0.45, 0.4]);
    }

    #[test]
    fn test_sphere_cells_chain() {
        let center = DVec3::new(10.0, 64.0, -3.0);
        for theta in 0..7 {
            let cell = sphere_cell(center, 2.0, 1, theta, 4);
            let next = sphere_cell(center, 2.0, 1, theta + 1, 4);
            assert_eq!(cell[3], next[0]);
        }
        let pole = sphere_cell(center, 2.0, 0, 0, 4)[0];
        assert_eq!(pole, center + DVec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_sphere_vertices_on_surface() {
        let mut out = Vec::new();
        emit_sphere(&mut out, Vec3::new(1.0, 2.0, 3.0), 1.5, 4, [1.0; 4]);
        assert_eq!(out.len(), 4 * 8 * 6);
        for v in &out {
            let r = Vec3::from(v.position).distance(Vec3::new(1.0, 2.0, 3.0));
            assert!((r - 1.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_cylinder_sides_span_height() {
        let mut out = Vec::new();
        emit_cylinder_sides(&mut out, Vec3::ZERO, 1.0, 3.0, 16, [1.0; 4]);
        assert_eq!(out.len(), 16 * 6);
        assert!(out.iter().all(|v| v.position[1] == 0.0 || v.position[1] == 3.0));
    }
}
