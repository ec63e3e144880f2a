//! Engine error type.
//!
//! Sub-crates may define their own error enums and convert them into
//! `CrowdError` via `From` impls, or keep them separate and wrap `CrowdError`
//! as one variant.  Both patterns are acceptable; prefer whichever keeps
//! error sites clean.

use thiserror::Error;

use crate::handle::AgentHandle;
use crate::ids::ObstacleSetId;

/// The top-level error type for `crowd-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CrowdError {
    /// The handle's generation no longer matches its slot: the agent was
    /// removed (and the slot possibly reused).  No state was mutated.
    #[error("stale handle {0}: agent was removed")]
    StaleHandle(AgentHandle),

    #[error("obstacle set {0} not found")]
    ObstacleSetNotFound(ObstacleSetId),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for all `crowd-*` crates.
pub type CrowdResult<T> = Result<T, CrowdError>;
