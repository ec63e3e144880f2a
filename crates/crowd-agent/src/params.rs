//! Tunable per-agent parameters.

use crowd_core::MovementPlane;

/// Everything about an agent that the embedding tunes and the solver only
/// reads.  Scattered into SoA arrays by [`AgentStore::add`](crate::AgentStore::add);
/// the struct exists so callers can set up an agent in one expression.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentParams {
    /// Body radius in world units.
    pub radius: f32,
    /// Body height; used only for the elevation-overlap neighbor filter.
    pub height: f32,
    /// Hard cap on the solved speed.
    pub max_speed: f32,
    /// Speed the agent tries to travel at (clamped to `max_speed`).
    pub desired_speed: f32,
    /// Look-ahead horizon (seconds) for agent-agent avoidance.
    pub agent_time_horizon: f32,
    /// Look-ahead horizon (seconds) for static-obstacle avoidance.
    pub obstacle_time_horizon: f32,
    /// At most this many neighbors are considered per tick.
    pub max_neighbours: usize,
    /// Avoidance priority, ≥ 0.  Pairs split avoidance effort as
    /// `other / (self + other)`; a zero-priority agent yields fully to a
    /// positive-priority one.
    pub priority: f32,
    /// Bitmask naming the layer(s) this agent occupies.
    pub layer: u32,
    /// Bitmask of layers this agent avoids (bitwise-AND test).
    pub collides_with: u32,
    /// Locked agents are stationary hard obstacles: they never move and
    /// never yield, but others route around them.
    pub locked: bool,
    /// Coordinate frame the agent moves in.
    pub plane: MovementPlane,
    /// How strongly the agent prefers to keep its current heading when
    /// yielding, in `[0, 1]`.  0 = free to turn anywhere.
    pub flow_following_strength: f32,
    /// Permitted deviation (radians, half-angle) of the solved velocity
    /// direction from the desired direction.  `PI` means unrestricted.
    pub max_deviation_angle: f32,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 2.0,
            max_speed: 2.0,
            desired_speed: 1.0,
            agent_time_horizon: 2.0,
            obstacle_time_horizon: 0.5,
            max_neighbours: 10,
            priority: 0.5,
            layer: 1,
            collides_with: u32::MAX,
            locked: false,
            plane: MovementPlane::XZ,
            flow_following_strength: 0.0,
            max_deviation_angle: std::f32::consts::PI,
        }
    }
}
