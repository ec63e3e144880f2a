//! Unit tests for crowd-core.

#[cfg(test)]
mod math {
    use glam::Vec2;

    use crate::math::{clamp_magnitude, det, rotate, signed_angle};

    #[test]
    fn det_orientation() {
        // Counter-clockwise turn → positive determinant.
        assert!(det(Vec2::X, Vec2::Y) > 0.0);
        assert!(det(Vec2::Y, Vec2::X) < 0.0);
        assert_eq!(det(Vec2::X, Vec2::X), 0.0);
    }

    #[test]
    fn rotate_quarter_turn() {
        let r = rotate(Vec2::X, std::f32::consts::FRAC_PI_2);
        assert!((r - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn clamp_magnitude_behaviour() {
        let long = Vec2::new(10.0, 0.0);
        assert!((clamp_magnitude(long, 3.0).length() - 3.0).abs() < 1e-6);
        let short = Vec2::new(1.0, 1.0);
        assert_eq!(clamp_magnitude(short, 3.0), short);
        assert_eq!(clamp_magnitude(Vec2::ZERO, 3.0), Vec2::ZERO);
    }

    #[test]
    fn signed_angle_sign_convention() {
        assert!(signed_angle(Vec2::X, Vec2::Y) > 0.0);
        assert!(signed_angle(Vec2::X, -Vec2::Y) < 0.0);
        assert!((signed_angle(Vec2::X, Vec2::X)).abs() < 1e-6);
    }
}

#[cfg(test)]
mod plane {
    use glam::{Quat, Vec3};

    use crate::plane::MovementPlane;

    #[test]
    fn xz_round_trip() {
        let plane = MovementPlane::XZ;
        let p = Vec3::new(1.0, 5.0, -2.0);
        let (xy, elev) = plane.to_plane_with_elevation(p);
        assert_eq!(xy.x, 1.0);
        assert_eq!(xy.y, -2.0);
        assert_eq!(elev, 5.0);
        assert!((plane.to_world(xy, elev) - p).length() < 1e-6);
    }

    #[test]
    fn xy_round_trip() {
        let plane = MovementPlane::XY;
        let p = Vec3::new(3.0, 4.0, 7.0);
        let (xy, elev) = plane.to_plane_with_elevation(p);
        assert_eq!((xy.x, xy.y, elev), (3.0, 4.0, 7.0));
        assert!((plane.to_world(xy, elev) - p).length() < 1e-6);
    }

    #[test]
    fn rotated_round_trip() {
        // A plane tilted 30° around X.
        let plane = MovementPlane::Rotated(Quat::from_rotation_x(0.5236));
        let p = Vec3::new(-2.0, 1.0, 4.0);
        let (xy, elev) = plane.to_plane_with_elevation(p);
        let back = plane.to_world(xy, elev);
        assert!((back - p).length() < 1e-5, "round trip drifted: {back:?}");
    }

    #[test]
    fn rotated_identity_matches_xz() {
        let rotated = MovementPlane::Rotated(Quat::IDENTITY);
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(rotated.to_plane(p), MovementPlane::XZ.to_plane(p));
        assert_eq!(rotated.elevation(p), MovementPlane::XZ.elevation(p));
    }
}

#[cfg(test)]
mod handles {
    use crate::handle::AgentHandle;
    use crate::ids::AgentIndex;
    use crate::reached::ReachedState;

    #[test]
    fn invalid_sentinel() {
        assert!(!AgentIndex::INVALID.is_valid());
        assert!(AgentIndex(0).is_valid());
        assert_eq!(AgentIndex::default(), AgentIndex::INVALID);
    }

    #[test]
    fn handles_with_different_generations_differ() {
        let a = AgentHandle::new(AgentIndex(3), 0);
        let b = AgentHandle::new(AgentIndex(3), 1);
        assert_ne!(a, b);
    }

    #[test]
    fn reached_state_promote_is_monotonic() {
        let mut s = ReachedState::NotReached;
        s.promote(ReachedState::Reached);
        assert_eq!(s, ReachedState::Reached);
        s.promote(ReachedState::ReachedSoon);
        assert_eq!(s, ReachedState::Reached, "promote must never regress");
    }
}
