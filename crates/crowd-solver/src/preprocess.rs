//! Per-agent velocity estimation, run before everything else each tick.
//!
//! The current velocity is deliberately reconstructed from the *previous
//! tick's output* (chosen target point and speed) rather than measured from
//! positions.  Measured velocity feeds the solver's own output back into
//! itself one tick later and oscillates; the reconstruction is what the
//! agent was told to do, which is stable.

use glam::Vec2;

/// One agent's preprocessor inputs, projected into its movement plane.
#[derive(Copy, Clone, Debug)]
pub struct PreprocessInput {
    pub position: Vec2,
    /// Where the agent wants to go this tick.
    pub target_point: Vec2,
    pub desired_speed: f32,
    /// Last tick's chosen target point.
    pub previous_target_point: Vec2,
    /// Last tick's chosen speed.
    pub previous_speed: f32,
    pub locked: bool,
    pub manually_controlled: bool,
    pub manual_velocity: Vec2,
    /// Plane-projected surface normal from external physics, `Vec2::ZERO`
    /// when unset this tick.
    pub collision_normal: Vec2,
}

/// Estimated velocities feeding the rest of the pipeline.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Velocities {
    pub current: Vec2,
    pub desired: Vec2,
}

/// Estimate current and desired velocity for one agent.
pub fn preprocess(input: &PreprocessInput) -> Velocities {
    // Manual control wins over locked.
    if input.manually_controlled {
        return Velocities {
            current: input.manual_velocity,
            desired: input.manual_velocity,
        };
    }
    if input.locked {
        return Velocities::default();
    }

    let desired =
        (input.target_point - input.position).normalize_or_zero() * input.desired_speed;
    let mut current = (input.previous_target_point - input.position).normalize_or_zero()
        * input.previous_speed;

    // Slide along externally reported surfaces instead of pushing into them.
    let normal = input.collision_normal.normalize_or_zero();
    let inward = current.dot(normal);
    if inward < 0.0 {
        current -= normal * inward;
    }

    Velocities { current, desired }
}
