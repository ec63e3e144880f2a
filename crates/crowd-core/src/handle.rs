//! Generation-checked agent handle.
//!
//! Agent slots are recycled: removing an agent frees its dense index for the
//! next `add_agent` call.  A bare index would therefore silently alias a new
//! agent after its original owner was removed.  `AgentHandle` pairs the slot
//! index with the slot's generation counter at creation time; every public
//! operation validates the generation before touching the slot and rejects a
//! stale handle with [`CrowdError::StaleHandle`](crate::CrowdError).

use std::fmt;

use crate::ids::AgentIndex;

/// External reference to one agent.
///
/// Cheap to copy and safe to hold across ticks.  Becomes permanently invalid
/// when the agent is removed; a reused slot bumps the generation so the old
/// handle can never resolve again.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentHandle {
    /// Dense slot index into the agent store.
    pub index: AgentIndex,
    /// Generation of the slot at handle creation.  Incremented on removal.
    pub generation: u32,
}

impl AgentHandle {
    #[inline]
    pub fn new(index: AgentIndex, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent({}v{})", self.index.0, self.generation)
    }
}
