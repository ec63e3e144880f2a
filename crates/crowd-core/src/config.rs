//! Engine-wide tunable constants.
//!
//! Several of these values encode playtested behavior rather than derivable
//! optima (the damping factor, the one-degree horizon margin, the
//! symmetry-breaking bias).  They are fields, not hard-coded literals, so an
//! embedding can override them — but the defaults should be changed only
//! with care.

/// Top-level simulation configuration.
///
/// Typically constructed via `SimulationConfig::default()` and tweaked
/// field-by-field; passed to the simulator builder once at startup.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationConfig {
    /// Rotation (radians, clockwise) applied to an agent's desired velocity
    /// when it already lies inside a velocity obstacle.  Breaks the perfect
    /// symmetry of head-on encounters so two mirror-image agents diverge
    /// instead of deadlocking.
    pub symmetry_breaking_bias: f32,

    /// Scale on the hard-overlap separation velocity.  1.0 resolves overlap
    /// in a single tick but visibly pops agents apart; lower values spread
    /// the correction over a few ticks.
    pub hard_collision_damping: f32,

    /// Extra half-angle (radians) added to every locked-neighbor wedge in
    /// the horizon-avoidance pass.
    pub horizon_margin: f32,

    /// Lower clamp on `delta_time` — prevents division by zero in the
    /// hard-collision velocity scaling.
    pub min_delta_time: f32,

    /// Quadtree leaves hold at most this many agents before splitting.
    pub quadtree_leaf_size: usize,

    /// Maximum quadtree depth; degenerate inputs (all agents at one point)
    /// stop splitting here.
    pub quadtree_max_depth: u32,

    /// Floor on the combined-radius shrink applied to far-future agent
    /// interactions (fraction of the full combined radius at the end of the
    /// time horizon).
    pub time_horizon_radius_floor: f32,

    /// Floor on the time-horizon shrink for far-future interactions.
    pub time_horizon_floor: f32,

    /// Worker thread count passed to Rayon.  `None` uses all logical cores.
    /// Ignored when the `parallel` feature is off.
    pub num_threads: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            symmetry_breaking_bias: 0.1,
            hard_collision_damping: 0.8,
            horizon_margin: 1.0_f32.to_radians(),
            min_delta_time: 1e-4,
            quadtree_leaf_size: 16,
            quadtree_max_depth: 10,
            time_horizon_radius_floor: 0.25,
            time_horizon_floor: 0.5,
            num_threads: None,
        }
    }
}
