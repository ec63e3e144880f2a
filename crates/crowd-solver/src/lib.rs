//! `crowd-solver` — the avoidance math.
//!
//! Everything here is pure plane-space geometry over borrowed snapshots; no
//! storage, no locking, no threads.  The orchestrator in `crowd-sim` wires
//! SoA columns into these functions once per agent per tick.
//!
//! | Module                 | Contents                                         |
//! |------------------------|--------------------------------------------------|
//! | [`line`]               | `Line` — half-plane constraint in velocity space |
//! | [`lp`]                 | incremental 2D LP + penetration-minimizing fallback |
//! | [`agent_avoidance`]    | per-neighbor ORCA constraint, solve entry point  |
//! | [`obstacle_avoidance`] | truncated-cone VO for static obstacle edges      |
//! | [`preprocess`]         | desired/current velocity estimation              |
//! | [`horizon`]            | locked-agent angular-interval detours            |
//! | [`collision`]          | hard-overlap separation offset                   |
//! | [`reached`]            | congestion-aware arrival analysis                |

pub mod agent_avoidance;
pub mod collision;
pub mod horizon;
pub mod line;
pub mod lp;
pub mod obstacle_avoidance;
pub mod preprocess;
pub mod reached;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use agent_avoidance::{
    AgentConstraint, AgentSnapshot, NeighbourSnapshot, SolveOutcome, build_agent_constraints,
    forward_clearance, record_blocking, solve,
};
pub use lp::solve_velocity;
pub use collision::{OverlapNeighbour, separation_velocity};
pub use horizon::{HorizonDecision, HorizonNeighbour, detour_rotation, merge_blocked_interval};
pub use line::Line;
pub use obstacle_avoidance::{ObstacleEdgeLocal, edge_clearance, obstacle_line};
pub use preprocess::{PreprocessInput, Velocities, preprocess};
pub use reached::{ReachedInputs, analyze_reached};
