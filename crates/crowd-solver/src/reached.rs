//! Congestion-aware arrival analysis, run after the solve each tick.
//!
//! Pure geometric distance-to-target fails for crowds: thirty agents sent
//! to one doorway can never all stand on it, yet every one of them is done
//! travelling once the pack around the door stops moving.  This pass
//! detects that situation through the blocking lists the solver recorded —
//! first directly (mutual blocking near a shared destination), then by
//! propagating arrival backwards through the inverse blocking graph with a
//! worklist, so a whole queue collapses to `Reached` in a single tick.
//!
//! Within one pass states only ever upgrade.

use glam::Vec3;

use crowd_core::{AgentIndex, ReachedState};

/// Fraction of the radius within which an agent is geometrically arrived.
const ARRIVE_RADIUS_FRACTION: f32 = 0.5;

/// Speed below this fraction of desired speed counts as "barely moving".
const SLOW_SPEED_FRACTION: f32 = 0.1;

/// Forward clearance below this many radii counts as obstructed.
const OBSTRUCTED_CLEARANCE_RADII: f32 = 2.0;

/// Per-slot inputs to the analyzer.  All slices have one entry per slot;
/// dead slots are skipped via `alive`.  `N` is the blocking-list capacity.
pub struct ReachedInputs<'a, const N: usize> {
    pub alive: &'a [bool],
    pub position: &'a [Vec3],
    /// End-of-path points; entries without one are non-finite and exempt
    /// from the whole analysis.
    pub end_of_path: &'a [Vec3],
    /// Plane-space horizontal distance to the end of path (`INFINITY` when
    /// no end of path is set).
    pub horizontal_dist_to_end: &'a [f32],
    /// Elevation difference to the end of path.
    pub vertical_dist_to_end: &'a [f32],
    pub radius: &'a [f32],
    pub height: &'a [f32],
    /// Chosen speed this tick.
    pub speed: &'a [f32],
    pub desired_speed: &'a [f32],
    pub forward_clearance: &'a [f32],
    /// Blocking lists from the solver, `AgentIndex::INVALID`-terminated.
    pub blocked_by: &'a [[AgentIndex; N]],
}

impl<const N: usize> ReachedInputs<'_, N> {
    fn blockers(&self, slot: usize) -> impl Iterator<Item = usize> + '_ {
        self.blocked_by[slot]
            .iter()
            .take_while(|b| b.is_valid())
            .map(|b| b.index())
    }

    fn blocks(&self, a: usize, b: usize) -> bool {
        self.blockers(a).any(|x| x == b)
    }

    /// Nearly stopped and with something right in front.
    fn stalled(&self, slot: usize) -> bool {
        self.speed[slot] <= SLOW_SPEED_FRACTION * self.desired_speed[slot]
            && self.forward_clearance[slot] <= OBSTRUCTED_CLEARANCE_RADII * self.radius[slot]
    }

    /// Both destinations lie within the circle spanning the two agents.
    fn shared_destination(&self, a: usize, b: usize) -> bool {
        if !self.end_of_path[a].is_finite() || !self.end_of_path[b].is_finite() {
            return false;
        }
        let center = 0.5 * (self.position[a] + self.position[b]);
        let span = 0.5 * self.position[a].distance(self.position[b])
            + self.radius[a]
            + self.radius[b];
        self.end_of_path[a].distance(center) <= span && self.end_of_path[b].distance(center) <= span
    }
}

/// Update `reached` in place.  Never downgrades an entry.
pub fn analyze_reached<const N: usize>(inputs: &ReachedInputs<'_, N>, reached: &mut [ReachedState]) {
    let slots = inputs.alive.len();
    let mut worklist: Vec<usize> = Vec::new();

    // Inverse blocking lists: blocked_of[b] = agents that b blocks.
    let mut blocked_of: Vec<Vec<usize>> = vec![Vec::new(); slots];
    for i in 0..slots {
        if !inputs.alive[i] {
            continue;
        }
        for b in inputs.blockers(i) {
            if b < slots && inputs.alive[b] {
                blocked_of[b].push(i);
            }
        }
    }

    for i in 0..slots {
        if !inputs.alive[i] || !inputs.end_of_path[i].is_finite() {
            continue;
        }

        // Geometric arrival.
        if inputs.horizontal_dist_to_end[i] <= ARRIVE_RADIUS_FRACTION * inputs.radius[i]
            && inputs.vertical_dist_to_end[i] <= inputs.height[i]
        {
            reached[i].promote(ReachedState::Reached);
            worklist.push(i);
            continue;
        }

        // Mutual blocking near a shared destination.
        for b in inputs.blockers(i) {
            if b >= slots || !inputs.alive[b] {
                continue;
            }
            if inputs.blocks(b, i) && inputs.shared_destination(i, b) {
                if inputs.stalled(i) && inputs.stalled(b) {
                    reached[i].promote(ReachedState::Reached);
                    worklist.push(i);
                } else {
                    reached[i].promote(ReachedState::ReachedSoon);
                }
                break;
            }
        }
    }

    // Propagate backwards: an agent stalled behind a Reached agent headed
    // to (nearly) the same place is itself done.  The worklist keeps going
    // as far as the chain does.
    while let Some(done) = worklist.pop() {
        for &i in &blocked_of[done] {
            if reached[i] == ReachedState::Reached || !inputs.end_of_path[i].is_finite() {
                continue;
            }
            let ends_close = inputs.end_of_path[i].distance(inputs.end_of_path[done])
                <= inputs.radius[i] + inputs.radius[done];
            if !ends_close {
                continue;
            }
            if inputs.stalled(i) {
                reached[i].promote(ReachedState::Reached);
                worklist.push(i);
            } else {
                reached[i].promote(ReachedState::ReachedSoon);
            }
        }
    }
}
