//! Detours around locked and manually-controlled neighbors.
//!
//! ORCA alone handles moving agents well but produces timid, oscillating
//! paths around stationary ones: every agent independently tries to squeeze
//! through the nearest gap and re-decides each tick.  This pass instead
//! treats locked neighbors as angular intervals blocking the desired
//! heading and commits to a detour side.
//!
//! Two phases per tick.  Phase 1 computes, per agent, the merged blocked
//! interval straddling its desired heading (or finds it clear).  Phase 2
//! picks the detour side — and because it sums the phase-1 bias of
//! *neighbors* too, nearby agents facing the same blockage pick the same
//! side, which is what produces coordinated flow around an obstacle instead
//! of a 50/50 split colliding head-on behind it.  Phase 2 therefore cannot
//! start until phase 1 has finished for every agent.

use glam::Vec2;

use crowd_core::signed_angle;

/// Wedge half-angle used when the agent already touches the neighbor, where
/// the arcsine formula degenerates.  Just shy of a half-plane.
const CONTACT_HALF_ANGLE: f32 = std::f32::consts::FRAC_PI_2 * 0.99;

/// One locked or manually-controlled neighbor, in the agent's plane.
#[derive(Copy, Clone, Debug)]
pub struct HorizonNeighbour {
    pub position: Vec2,
    pub radius: f32,
}

/// Phase-1 output for one agent.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum HorizonDecision {
    /// No locked neighbor blocks the desired heading.
    Clear,
    /// The merged interval `[start, end]` (radians relative to the desired
    /// heading, `start <= 0 <= end`) is blocked; a side must be chosen in
    /// phase 2.  `bias` is the summed angular position of the blockers,
    /// shared with neighbors for side agreement.
    NeedSide { start: f32, end: f32, bias: f32 },
}

impl HorizonDecision {
    /// The side-agreement term this agent contributes to its neighbors.
    #[inline]
    pub fn bias(&self) -> f32 {
        match *self {
            HorizonDecision::Clear => 0.0,
            HorizonDecision::NeedSide { bias, .. } => bias,
        }
    }
}

// ── Phase 1 ───────────────────────────────────────────────────────────────────

/// Merge the angular intervals blocked by `neighbours` and find the one
/// straddling the desired heading (angle zero).
///
/// `neighbours` must already be filtered to locked/manually-controlled
/// agents; `margin` widens every wedge (one degree by default).
pub fn merge_blocked_interval(
    desired_direction: Vec2,
    position: Vec2,
    radius: f32,
    neighbours: &[HorizonNeighbour],
    margin: f32,
) -> HorizonDecision {
    if neighbours.is_empty() || desired_direction.length_squared() < 1e-10 {
        return HorizonDecision::Clear;
    }

    // Events: interval start = +1, interval end = -1.  Each interval is
    // duplicated one full turn down and up so a merged run crossing the
    // ±PI seam still registers as containing angle zero.
    let mut events: Vec<(f32, i32)> = Vec::with_capacity(neighbours.len() * 6);
    let mut bias = 0.0;

    for n in neighbours {
        let rel = n.position - position;
        let dist = rel.length();
        let combined = radius + n.radius;
        let center = signed_angle(desired_direction, rel);
        bias += center;

        let half = if dist <= combined {
            CONTACT_HALF_ANGLE
        } else {
            (combined / dist).clamp(-1.0, 1.0).asin() + margin
        };

        for turn in [-std::f32::consts::TAU, 0.0, std::f32::consts::TAU] {
            events.push((center - half + turn, 1));
            events.push((center + half + turn, -1));
        }
    }

    events.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(b.1.cmp(&a.1)));

    // Sweep: a merged run is the span between depth 0 -> 1 and back to 0.
    let mut depth = 0;
    let mut run_start = 0.0;
    for (angle, delta) in events {
        if depth == 0 && delta == 1 {
            run_start = angle;
        }
        depth += delta;
        if depth == 0 && run_start <= 0.0 && angle >= 0.0 {
            return HorizonDecision::NeedSide { start: run_start, end: angle, bias };
        }
        if depth == 0 && run_start > 0.0 {
            // Runs are visited in ascending order; past zero means no run
            // can straddle it anymore.
            break;
        }
    }
    HorizonDecision::Clear
}

// ── Phase 2 ───────────────────────────────────────────────────────────────────

/// Choose the detour side and return the rotation (radians) to apply to the
/// desired velocity, or `None` when the heading was clear.
///
/// `neighbour_bias` is the summed phase-1 [`HorizonDecision::bias`] of the
/// agent's neighbors; including it makes nearby agents agree on a side.
/// Positive total bias means the blockers sit mostly counter-clockwise of
/// the heading, so the cheaper detour is clockwise (to the interval start).
pub fn detour_rotation(decision: HorizonDecision, neighbour_bias: f32) -> Option<f32> {
    match decision {
        HorizonDecision::Clear => None,
        HorizonDecision::NeedSide { start, end, bias } => {
            if bias + neighbour_bias > 0.0 {
                Some(start)
            } else {
                Some(end)
            }
        }
    }
}
