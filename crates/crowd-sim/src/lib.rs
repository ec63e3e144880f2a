//! `crowd-sim` — the simulation orchestrator.
//!
//! Owns all state (agent store, obstacle cache, per-tick scratch buffers)
//! and drives the solve pipeline once per [`Simulator::tick`]:
//!
//! 1. project world positions into each agent's movement plane;
//! 2. estimate current and desired velocities;
//! 3. rebuild the agent quadtree and gather k-nearest neighbors;
//! 4. plan detours around locked neighbors (two phases, side consensus);
//! 5. compute hard-overlap separation velocities;
//! 6. per-agent ORCA solve — the only stage that parallelizes;
//! 7. publish outputs, then run the congestion-aware arrival analysis.
//!
//! Embeddings hold a [`Simulator`] behind `&self`: all mutation goes through
//! an internal `RwLock`.  `tick` and the agent/obstacle mutators take the
//! write lock; output getters and density queries take the read lock, so
//! rendering threads can read freely between ticks.
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `parallel` | Rayon-parallel solve stage (`num_threads` in the config) |
//! | `serde`    | Serde derives on the re-exported public types            |

pub mod builder;
pub mod sim;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use builder::SimulatorBuilder;
pub use sim::{AgentOutput, Simulator, TickStats};

// Everything an embedding needs, so it can depend on this crate alone.
pub use crowd_agent::{AgentParams, MAX_BLOCKING_AGENTS, NO_END_OF_PATH};
pub use crowd_core::{
    AgentHandle, AgentIndex, CrowdError, CrowdResult, MovementPlane, ObstacleSetId, ReachedState,
    SimulationConfig,
};
pub use crowd_spatial::BorderEdge;
