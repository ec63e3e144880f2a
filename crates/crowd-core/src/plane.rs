//! Movement-plane abstraction.
//!
//! # Design
//!
//! The whole solver runs in a 2D "plane space": every 3D world position is
//! projected to a `Vec2` plus a scalar elevation.  The same geometry code
//! then serves flat-2D games (XY), standard 3D games (XZ with Y up), and
//! arbitrarily rotated surfaces (e.g. agents walking on a spherical world or
//! a tilted platform) — only the projection differs.
//!
//! Elevation is *not* folded into plane coordinates: agents on different
//! vertical levels must never avoid each other, so elevation is compared as
//! a separate band-overlap test during neighbor filtering.

use glam::{Quat, Vec2, Vec3};

/// Projects world positions into the 2D coordinate system an agent moves in.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovementPlane {
    /// 2D world: X/Y are the plane, Z is elevation.
    XY,
    /// 3D world with Y up: X/Z are the plane, Y is elevation.
    #[default]
    XZ,
    /// Arbitrary plane: `rotation` maps world space to a frame whose X/Z
    /// span the plane and whose Y is elevation.
    Rotated(Quat),
}

impl MovementPlane {
    /// Project a world position onto the plane.
    #[inline]
    pub fn to_plane(self, p: Vec3) -> Vec2 {
        match self {
            MovementPlane::XY => Vec2::new(p.x, p.y),
            MovementPlane::XZ => Vec2::new(p.x, p.z),
            MovementPlane::Rotated(rotation) => {
                let local = rotation * p;
                Vec2::new(local.x, local.z)
            }
        }
    }

    /// Elevation of a world position above the plane.
    #[inline]
    pub fn elevation(self, p: Vec3) -> f32 {
        match self {
            MovementPlane::XY => p.z,
            MovementPlane::XZ => p.y,
            MovementPlane::Rotated(rotation) => (rotation * p).y,
        }
    }

    /// Project both at once; cheaper than two calls for the rotated case.
    #[inline]
    pub fn to_plane_with_elevation(self, p: Vec3) -> (Vec2, f32) {
        match self {
            MovementPlane::XY => (Vec2::new(p.x, p.y), p.z),
            MovementPlane::XZ => (Vec2::new(p.x, p.z), p.y),
            MovementPlane::Rotated(rotation) => {
                let local = rotation * p;
                (Vec2::new(local.x, local.z), local.y)
            }
        }
    }

    /// Map a plane-space point (plus elevation) back to world space.
    ///
    /// Inverse of [`to_plane_with_elevation`](Self::to_plane_with_elevation).
    #[inline]
    pub fn to_world(self, xy: Vec2, elevation: f32) -> Vec3 {
        match self {
            MovementPlane::XY => Vec3::new(xy.x, xy.y, elevation),
            MovementPlane::XZ => Vec3::new(xy.x, elevation, xy.y),
            MovementPlane::Rotated(rotation) => {
                rotation.inverse() * Vec3::new(xy.x, elevation, xy.y)
            }
        }
    }
}
