//! Planar tests on the floor's ground plane (X/Z, Y up)

use glam::{Vec2, Vec3};

/// Distance below which two lines count as parallel.
const PARALLEL_EPSILON: f32 = 1e-6;

fn ground(p: Vec3) -> Vec2 {
    Vec2::new(p.x, p.z)
}

/// Whether `p` lies on triangle `abc` seen from above, allowing `tolerance`
/// units outside its boundary. Points on an edge or a corner are inside.
pub fn point_in_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3, tolerance: f32) -> bool {
    let (p, a, b, c) = (ground(p), ground(a), ground(b), ground(c));
    let d1 = (b - a).perp_dot(p - a);
    let d2 = (c - b).perp_dot(p - b);
    let d3 = (a - c).perp_dot(p - c);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    if !(has_neg && has_pos) {
        return true;
    }
    let residual = segment_distance(p, a, b)
        .min(segment_distance(p, b, c))
        .min(segment_distance(p, c, a));
    residual <= tolerance
}

fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Parameters `(t, u)` where the lines through `a`-`b` and `c`-`d` meet,
/// `a + t(b - a) == c + u(d - c)`.
fn line_intersection(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> Option<(f32, f32)> {
    let r = b - a;
    let s = d - c;
    let denom = r.perp_dot(s);
    if denom.abs() < PARALLEL_EPSILON * r.length().max(1.0) * s.length().max(1.0) {
        return None;
    }
    let ac = c - a;
    Some((ac.perp_dot(s) / denom, ac.perp_dot(r) / denom))
}

fn strictly_inside(t: f32) -> bool {
    t > 0.0 && t < 1.0
}

/// Whether segment `a`-`b` crosses edge `p`-`q`: the lines meet at a point
/// strictly inside both.
pub fn segment_crosses_edge(a: Vec3, b: Vec3, p: Vec3, q: Vec3) -> bool {
    let (a, b, p, q) = (ground(a), ground(b), ground(p), ground(q));
    match line_intersection(a, b, p, q) {
        Some((t, u)) => strictly_inside(t) && strictly_inside(u),
        None => false,
    }
}

/// Unit normal of triangle `abc` (counter-clockwise front face).
pub fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}
