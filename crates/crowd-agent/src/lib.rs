//! `crowd-agent` — Structure-of-Arrays agent storage.
//!
//! One [`AgentStore`] holds all per-agent state for the whole simulation:
//! tunable parameters, per-tick inputs written by the embedding, and
//! per-tick outputs written by the solver.  Slots are recycled through a
//! free list and guarded by a generation counter so external
//! [`AgentHandle`](crowd_core::AgentHandle)s can never silently alias a
//! reused slot.

pub mod params;
pub mod store;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use params::AgentParams;
pub use store::{AgentOutputs, AgentStore, MAX_BLOCKING_AGENTS, NO_END_OF_PATH};
