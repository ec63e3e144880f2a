//! Per-neighbor ORCA constraint construction and the solve entry point.
//!
//! Everything operates in the querying agent's movement plane.  The
//! orchestrator projects world positions before calling in and lifts the
//! chosen velocity back out afterwards.
//!
//! Departures from textbook ORCA, all tuned for crowd feel rather than
//! optimality:
//! - avoidance effort is split by relative priority instead of 50/50;
//! - a neighbor's assumed velocity blends its current and desired velocity,
//!   so low-priority agents yield *proactively* to high-priority ones;
//! - combined radius and time horizon shrink smoothly once the estimated
//!   time to collision passes half the horizon, trading conservatism for a
//!   less hesitant stopping curve on far-future interactions;
//! - locked neighbors the agent will never get close enough to touch before
//!   its own end of path are ignored entirely.

use glam::Vec2;

use crowd_core::{AgentIndex, SimulationConfig, det, rotate, signed_angle};

use crate::line::Line;

/// Velocities below this are treated as zero when normalizing.
const EPSILON: f32 = 1e-5;

/// Max distance (m/s) from a constraint boundary for the chosen velocity to
/// count as resting on it.
const BLOCKING_EPSILON: f32 = 1e-3;

// ── Snapshots ─────────────────────────────────────────────────────────────────

/// The solving agent's state, projected into its movement plane.
#[derive(Copy, Clone, Debug)]
pub struct AgentSnapshot {
    pub position: Vec2,
    /// Estimated current velocity (preprocessor output).
    pub velocity: Vec2,
    /// Desired velocity, after horizon avoidance adjusted it.
    pub desired_velocity: Vec2,
    pub radius: f32,
    pub max_speed: f32,
    pub priority: f32,
    pub time_horizon: f32,
    /// Plane-space distance to the agent's end of path, `f32::INFINITY`
    /// when no end of path is set.
    pub dist_to_end_of_path: f32,
}

/// One neighbor, projected into the solving agent's movement plane.
#[derive(Copy, Clone, Debug)]
pub struct NeighbourSnapshot {
    pub index: AgentIndex,
    pub position: Vec2,
    pub velocity: Vec2,
    pub desired_velocity: Vec2,
    pub radius: f32,
    pub priority: f32,
    pub locked: bool,
}

/// A half-plane constraint tagged with the neighbor that produced it.
#[derive(Copy, Clone, Debug)]
pub struct AgentConstraint {
    pub line: Line,
    pub neighbour: AgentIndex,
}

// ── Constraint construction ───────────────────────────────────────────────────

/// Build one ORCA constraint per relevant neighbor into `out`.
///
/// Returns `true` if the agent's *desired* velocity is on a predicted
/// collision course with any considered neighbor (at any future time, not
/// just within the horizon).  The caller uses this both to suppress the
/// direct-path shortcut and to apply the symmetry-breaking bias.
pub fn build_agent_constraints(
    agent: &AgentSnapshot,
    neighbours: &[NeighbourSnapshot],
    config: &SimulationConfig,
    out: &mut Vec<AgentConstraint>,
) -> bool {
    out.clear();
    let mut collision_course = false;

    for n in neighbours {
        let rel_pos = n.position - agent.position;
        let dist_sq = rel_pos.length_squared();
        let combined_radius = agent.radius + n.radius;

        if dist_sq <= combined_radius * combined_radius {
            // Already overlapping: the hard-collision pass owns this regime.
            // Emergency constraints here collapse dense groups to a standstill.
            collision_course = true;
            continue;
        }
        let dist = dist_sq.sqrt();

        if n.locked && agent.dist_to_end_of_path < dist - combined_radius {
            // The agent stops (end of path) before it could ever touch this
            // parked neighbor; no point shying away from it.
            continue;
        }

        // Share of the avoidance effort this agent absorbs.
        let strength = if n.locked {
            1.0
        } else {
            let total = agent.priority + n.priority;
            if total <= 0.0 { 0.5 } else { n.priority / total }
        };

        // High-strength neighbors are assumed to act on their intent.
        let assumed_velocity = if n.locked {
            Vec2::ZERO
        } else {
            n.velocity.lerp(n.desired_velocity, strength)
        };

        if time_to_collision(rel_pos, agent.desired_velocity - assumed_velocity, combined_radius)
            .is_finite()
        {
            collision_course = true;
        }

        // Urgency scaling: interactions whose estimated time to collision
        // lies past half the horizon get a smaller radius and horizon.
        let ttc = time_to_collision(rel_pos, agent.velocity - assumed_velocity, combined_radius);
        let half_horizon = 0.5 * agent.time_horizon;
        let urgency_falloff = if ttc.is_finite() {
            ((ttc - half_horizon) / half_horizon).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let eff_radius =
            combined_radius * lerp_f(1.0, config.time_horizon_radius_floor, urgency_falloff);
        let eff_horizon =
            agent.time_horizon * lerp_f(1.0, config.time_horizon_floor, urgency_falloff);

        if let Some(line) = orca_line(
            agent.velocity,
            rel_pos,
            agent.velocity - assumed_velocity,
            eff_radius.min(dist - EPSILON),
            1.0 / eff_horizon,
            strength,
        ) {
            out.push(AgentConstraint { line, neighbour: n.index });
        }
    }

    collision_course
}

/// Smallest non-negative time at which two discs with relative position
/// `rel_pos`, closing velocity `rel_vel` and summed radius `combined_radius`
/// touch; `INFINITY` when they never do.
fn time_to_collision(rel_pos: Vec2, rel_vel: Vec2, combined_radius: f32) -> f32 {
    let c = rel_pos.length_squared() - combined_radius * combined_radius;
    if c <= 0.0 {
        return 0.0;
    }
    let a = rel_vel.length_squared();
    let b = rel_pos.dot(rel_vel);
    if b <= 0.0 || a < EPSILON * EPSILON {
        // Not closing (or not moving relative to each other).
        return f32::INFINITY;
    }
    let discriminant = b.mul_add(b, -(a * c));
    if discriminant < 0.0 {
        return f32::INFINITY;
    }
    (b - discriminant.sqrt()) / a
}

/// The ORCA half-plane for one non-overlapping neighbor.
///
/// `rel_vel` is this agent's velocity relative to the neighbor's assumed
/// velocity; `strength` is the fraction of the correction `u` this agent
/// applies to itself.  Caller guarantees `|rel_pos| > combined_radius`.
fn orca_line(
    velocity: Vec2,
    rel_pos: Vec2,
    rel_vel: Vec2,
    combined_radius: f32,
    inv_horizon: f32,
    strength: f32,
) -> Option<Line> {
    let dist_sq = rel_pos.length_squared();
    let combined_radius_sq = combined_radius * combined_radius;

    let w = rel_vel - inv_horizon * rel_pos;
    let w_length_sq = w.length_squared();
    let dot = w.dot(rel_pos);

    if dot < 0.0 && dot * dot > combined_radius_sq * w_length_sq {
        // Closest point of the VO boundary is on the cutoff arc.
        let w_length = w_length_sq.sqrt();
        if w_length < EPSILON {
            return None;
        }
        let unit_w = w / w_length;
        let u = combined_radius.mul_add(inv_horizon, -w_length) * unit_w;
        Some(Line {
            point: velocity + strength * u,
            direction: Vec2::new(unit_w.y, -unit_w.x),
        })
    } else {
        // Closest point is on one of the legs.
        let leg = (dist_sq - combined_radius_sq).sqrt();
        let direction = if det(rel_pos, w) > 0.0 {
            Vec2::new(
                rel_pos.x.mul_add(leg, -(rel_pos.y * combined_radius)),
                rel_pos.x.mul_add(combined_radius, rel_pos.y * leg),
            ) / dist_sq
        } else {
            -Vec2::new(
                rel_pos.x.mul_add(leg, rel_pos.y * combined_radius),
                (-rel_pos.x).mul_add(combined_radius, rel_pos.y * leg),
            ) / dist_sq
        };
        let u = rel_vel.dot(direction) * direction - rel_vel;
        Some(Line {
            point: velocity + strength * u,
            direction,
        })
    }
}

// ── Solve ─────────────────────────────────────────────────────────────────────

/// Result of one agent's solve.
#[derive(Copy, Clone, Debug)]
pub struct SolveOutcome {
    /// Chosen velocity in plane space.
    pub velocity: Vec2,
    /// The LP solution before the deviation-arc clamp.  Blocking attribution
    /// tests against this one: the clamp can lift `velocity` off the very
    /// constraint boundaries it was resting on.
    pub unclamped_velocity: Vec2,
    /// The desired velocity was feasible and collision-free as supplied.
    /// The caller should forward the agent's original target point verbatim
    /// instead of re-deriving one from the velocity, avoiding precision
    /// loss right next to the target.
    pub shortcut: bool,
}

/// Find the best velocity subject to all obstacle and agent constraints.
///
/// `max_deviation_angle` restricts how far (radians) the chosen direction
/// may deviate from the desired one; `PI` disables the restriction.
pub fn solve(
    desired: Vec2,
    max_speed: f32,
    max_deviation_angle: f32,
    collision_course: bool,
    obstacle_lines: &[Line],
    constraints: &[AgentConstraint],
    config: &SimulationConfig,
    scratch: &mut Vec<Line>,
) -> SolveOutcome {
    scratch.clear();
    scratch.extend_from_slice(obstacle_lines);
    scratch.extend(constraints.iter().map(|c| c.line));

    let feasible = desired.length_squared() <= max_speed * max_speed * (1.0 + EPSILON)
        && scratch.iter().all(|l| l.permits(desired));
    if feasible && !collision_course {
        return SolveOutcome {
            velocity: desired,
            unclamped_velocity: desired,
            shortcut: true,
        };
    }

    // A dead-on collision course between mirror-image agents yields mirrored
    // constraint sets and a deadlock; a small clockwise nudge of the optimum
    // breaks the tie the same way for everyone.
    let opt = if collision_course {
        rotate(desired, -config.symmetry_breaking_bias)
    } else {
        desired
    };

    let unclamped = crate::lp::solve_velocity(scratch, obstacle_lines.len(), opt, max_speed);
    SolveOutcome {
        velocity: clamp_direction(unclamped, desired, max_deviation_angle),
        unclamped_velocity: unclamped,
        shortcut: false,
    }
}

/// Rotate `velocity` back to the edge of the allowed deviation arc around
/// `reference` if it strayed outside.
fn clamp_direction(velocity: Vec2, reference: Vec2, max_deviation_angle: f32) -> Vec2 {
    if max_deviation_angle >= std::f32::consts::PI
        || velocity.length_squared() < EPSILON * EPSILON
        || reference.length_squared() < EPSILON * EPSILON
    {
        return velocity;
    }
    let angle = signed_angle(reference, velocity);
    if angle > max_deviation_angle {
        rotate(velocity, max_deviation_angle - angle)
    } else if angle < -max_deviation_angle {
        rotate(velocity, -max_deviation_angle - angle)
    } else {
        velocity
    }
}

// ── Outputs derived from the solution ─────────────────────────────────────────

/// Record the neighbors whose constraint boundaries `velocity` rests on, in
/// construction order, until `out` is full.
///
/// Callers pass [`SolveOutcome::unclamped_velocity`]: the arc-clamped
/// velocity may sit on no boundary at all even when the agent is wedged.
///
/// `out` should be pre-filled with `AgentIndex::INVALID`; entries past the
/// last written one act as the list terminator.
pub fn record_blocking(constraints: &[AgentConstraint], velocity: Vec2, out: &mut [AgentIndex]) {
    let mut written = 0;
    for c in constraints {
        if written == out.len() {
            break;
        }
        if c.line.violation(velocity).abs() < BLOCKING_EPSILON {
            out[written] = c.neighbour;
            written += 1;
        }
    }
}

/// Free distance along `direction` (unit) before the agent's disc first
/// touches a neighbor's, `INFINITY` when the ray is clear.
pub fn forward_clearance(
    agent: &AgentSnapshot,
    neighbours: &[NeighbourSnapshot],
    direction: Vec2,
) -> f32 {
    let mut clearance = f32::INFINITY;
    for n in neighbours {
        let rel = n.position - agent.position;
        let along = rel.dot(direction);
        if along <= 0.0 {
            continue;
        }
        let combined = agent.radius + n.radius;
        let lateral_sq = rel.length_squared() - along * along;
        if lateral_sq >= combined * combined {
            continue;
        }
        let hit = along - (combined * combined - lateral_sq).sqrt();
        clearance = clearance.min(hit.max(0.0));
    }
    clearance
}

#[inline]
fn lerp_f(a: f32, b: f32, t: f32) -> f32 {
    (b - a).mul_add(t, a)
}
