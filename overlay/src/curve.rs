//! Quadratic Bezier tessellation and rounded-corner paths.

use glam::DVec3;

/// Segments per quadratic curve unless the caller asks otherwise.
pub const DEFAULT_CURVE_SEGMENTS: u32 = 30;

/// Pull-in distance used by path drawing unless configured otherwise.
pub const DEFAULT_PULL_IN: f64 = 1.0;

/// A straight piece of tessellated geometry, in world space.
pub type Segment = (DVec3, DVec3);

/// Evaluate `B(t) = (1-t)²·p1 + 2(1-t)t·p2 + t²·p3`.
#[inline]
pub fn quadratic_point(t: f64, p1: DVec3, p2: DVec3, p3: DVec3) -> DVec3 {
    let u = 1.0 - t;
    p1 * (u * u) + p2 * (2.0 * u * t) + p3 * (t * t)
}

/// Split a quadratic curve into `segments` straight pieces.
///
/// The first piece starts exactly at `p1`, the last ends exactly at `p3`, and
/// every piece starts where the previous one ended. Zero segments produce
/// nothing.
pub fn tessellate_quadratic(p1: DVec3, p2: DVec3, p3: DVec3, segments: u32) -> Vec<Segment> {
    if segments == 0 {
        return Vec::new();
    }
    let n = segments as f64;
    let points: Vec<DVec3> = (0..=segments)
        .map(|i| quadratic_point(i as f64 / n, p1, p2, p3))
        .collect();
    points.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Line geometry for a waypoint path.
///
/// With `pull_in < 0` the waypoints are joined by straight segments. With
/// `pull_in >= 0` every straight segment is shortened by `pull_in` at each
/// interior end and each interior waypoint gets a quadratic corner from the
/// pulled-in point before it, through the waypoint, to the pulled-in point
/// after it. All straight segments come first, then the corners.
///
/// `pull_in` is not clamped: values above half a segment's length make the
/// shortened segment flip direction.
pub fn path_segments(waypoints: &[DVec3], pull_in: f64, curve_segments: u32) -> Vec<Segment> {
    if waypoints.len() < 2 {
        return Vec::new();
    }

    if pull_in < 0.0 {
        return waypoints.windows(2).map(|w| (w[0], w[1])).collect();
    }

    let last = waypoints.len() - 2;
    let mut segments: Vec<Segment> = waypoints
        .windows(2)
        .enumerate()
        .map(|(index, w)| {
            let reduce = (w[1] - w[0]).normalize_or_zero() * pull_in;
            let start = if index != 0 { w[0] + reduce } else { w[0] };
            let end = if index != last { w[1] - reduce } else { w[1] };
            (start, end)
        })
        .collect();

    for w in waypoints.windows(3) {
        let corner = w[1];
        let before = corner - (corner - w[0]).normalize_or_zero() * pull_in;
        let after = corner - (corner - w[2]).normalize_or_zero() * pull_in;
        segments.extend(tessellate_quadratic(before, corner, after, curve_segments));
    }

    segments
}
