//! Hard-overlap correction.
//!
//! ORCA assumes agents are disjoint; it has no good answer once discs
//! already interpenetrate (spawned on top of each other, teleported, pushed
//! by external physics).  This pass computes a separation *velocity offset*
//! that is added to the optimizer's result afterwards — it is deliberately
//! not a constraint inside the LP, where it would destabilize dense groups.

use glam::Vec2;

/// One neighbor candidate for the overlap pass.
#[derive(Copy, Clone, Debug)]
pub struct OverlapNeighbour {
    /// Neighbor position minus agent position, in the agent's plane.
    pub offset: Vec2,
    /// Sum of both radii.
    pub combined_radius: f32,
    pub locked: bool,
}

/// Weighted separation velocity pushing the agent out of all current
/// overlaps; `Vec2::ZERO` when nothing overlaps.
///
/// Deeper overlaps dominate (weights are the overlap amounts themselves).
/// Locked neighbors are skipped — locked agents neither push nor get
/// pushed, the caller must not run this pass for a locked agent at all.
/// `delta_time` must already be clamped above zero.
pub fn separation_velocity(
    neighbours: &[OverlapNeighbour],
    damping: f32,
    delta_time: f32,
) -> Vec2 {
    let mut weighted = Vec2::ZERO;
    let mut total_weight = 0.0_f32;

    for n in neighbours {
        if n.locked {
            continue;
        }
        let dist = n.offset.length();
        if dist >= n.combined_radius {
            continue;
        }
        let overlap = n.combined_radius - dist;
        // Exactly coincident centers have no separation direction; fall
        // back to a fixed one.  The orchestrator perturbs coincident pairs
        // by slot order so the two sides receive opposite pushes.
        let away = if dist > 1e-6 { -n.offset / dist } else { Vec2::X };
        weighted += away * (overlap * overlap);
        total_weight += overlap;
    }

    if total_weight <= 0.0 {
        return Vec2::ZERO;
    }
    weighted / total_weight * damping / delta_time
}
