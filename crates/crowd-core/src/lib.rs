//! `crowd-core` — foundational types for the `rust_crowd` avoidance engine.
//!
//! This crate is a dependency of every other `crowd-*` crate.  It intentionally
//! has no `crowd-*` dependencies and minimal external ones (only `glam` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                |
//! |-------------|---------------------------------------------------------|
//! | [`ids`]     | `AgentIndex`, `ObstacleSetId`                           |
//! | [`handle`]  | `AgentHandle` — generation-checked external handle      |
//! | [`plane`]   | `MovementPlane` — world ↔ plane-space projection        |
//! | [`math`]    | 2D determinant, rotation, magnitude clamp               |
//! | [`reached`] | `ReachedState` tri-state arrival status                 |
//! | [`config`]  | `SimulationConfig` — all tunable constants              |
//! | [`error`]   | `CrowdError`, `CrowdResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod handle;
pub mod ids;
pub mod math;
pub mod plane;
pub mod reached;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::SimulationConfig;
pub use error::{CrowdError, CrowdResult};
pub use handle::AgentHandle;
pub use ids::{AgentIndex, ObstacleSetId};
pub use math::{clamp_magnitude, det, rotate, signed_angle};
pub use plane::MovementPlane;
pub use reached::ReachedState;
