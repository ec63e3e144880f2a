//! Small 2D geometry helpers shared by the index and the solver.

use glam::Vec2;

/// 2D cross product (determinant of the 2×2 matrix `[a b]`).
///
/// Positive when `b` is a counter-clockwise turn from `a`.  This is the
/// orientation test underlying every half-plane check in the solver.
#[inline(always)]
pub fn det(a: Vec2, b: Vec2) -> f32 {
    a.x.mul_add(b.y, -(a.y * b.x))
}

/// Rotate `v` counter-clockwise by `angle` radians.
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Scale `v` down to length `max` if it is longer; shorter vectors pass
/// through unchanged.  Zero vectors stay zero.
#[inline]
pub fn clamp_magnitude(v: Vec2, max: f32) -> Vec2 {
    let len_sq = v.length_squared();
    if len_sq > max * max && len_sq > 0.0 {
        v * (max / len_sq.sqrt())
    } else {
        v
    }
}

/// Signed angle of `v` relative to `reference`, in `(-PI, PI]`.
#[inline]
pub fn signed_angle(reference: Vec2, v: Vec2) -> f32 {
    det(reference, v).atan2(reference.dot(v))
}
