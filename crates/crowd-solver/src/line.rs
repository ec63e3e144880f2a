//! Half-plane constraint in velocity space.

use glam::Vec2;

use crowd_core::det;

/// A directed line in velocity space; the feasible region is the half-plane
/// to the right of `direction` (looking along it).
///
/// A velocity `v` satisfies the constraint when
/// `det(direction, point - v) <= 0`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Line {
    /// A point on the boundary.
    pub point: Vec2,
    /// Unit direction along the boundary.
    pub direction: Vec2,
}

impl Line {
    /// Signed penetration of `velocity` into the infeasible half-plane.
    ///
    /// Zero on the boundary, positive inside the forbidden region.  Because
    /// `direction` is unit length this is a plain distance.
    #[inline]
    pub fn violation(&self, velocity: Vec2) -> f32 {
        det(self.direction, self.point - velocity)
    }

    /// `true` if `velocity` lies in the feasible half-plane (boundary included).
    #[inline]
    pub fn permits(&self, velocity: Vec2) -> bool {
        self.violation(velocity) <= 0.0
    }
}
