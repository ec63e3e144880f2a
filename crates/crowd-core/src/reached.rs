//! Tri-state congestion-aware arrival status.

use std::fmt;

/// Whether an agent has functionally arrived at its end of path.
///
/// Distinct from pure geometric distance-to-target: an agent wedged in a
/// crowd converging on the same doorway is `Reached` even while metres away,
/// because no further progress is possible or useful.
///
/// The variants are ordered (`NotReached < ReachedSoon < Reached`); the
/// destination analyzer only ever upgrades the value within one tick.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReachedState {
    /// Still travelling.
    #[default]
    NotReached,
    /// Blocked by agents sharing the destination; arrival is imminent.
    ReachedSoon,
    /// At the destination, or as close as the crowd permits.
    Reached,
}

impl ReachedState {
    /// Upgrade to `other` if it is stronger; never regresses.
    #[inline]
    pub fn promote(&mut self, other: ReachedState) {
        if other > *self {
            *self = other;
        }
    }
}

impl fmt::Display for ReachedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReachedState::NotReached => "not-reached",
            ReachedState::ReachedSoon => "reached-soon",
            ReachedState::Reached => "reached",
        };
        f.write_str(s)
    }
}
