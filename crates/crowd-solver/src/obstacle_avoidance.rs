//! Truncated-cone velocity obstacles for static obstacle edges.
//!
//! One constraint per nearby edge, built in the agent's movement plane.
//! Edge winding puts solid space on the left, so back-facing edges are
//! culled outright.  Corner handling is the subtle part: the "shadow" (leg)
//! a vertex casts is replaced by the adjacent edge's direction whenever that
//! edge covers it, deferring the constraint to the neighbor edge and keeping
//! concave corners from generating contradictory half-planes.
//!
//! Unlike agent constraints these are *hard*: the penetration-minimizing
//! fallback in the LP never relaxes them.

use glam::Vec2;

use crowd_core::det;

use crate::line::Line;

/// Two constraint boundaries within this of each other count as one cover.
const EDGE_COVER_EPSILON: f32 = 1e-5;

/// One obstacle edge projected into an agent's movement plane, with the
/// adjacent contour vertices attached for convexity and shadow deferral.
#[derive(Copy, Clone, Debug)]
pub struct ObstacleEdgeLocal {
    /// First endpoint (solid space to the left of `left -> right`).
    pub left: Vec2,
    /// Second endpoint.
    pub right: Vec2,
    /// Contour vertex before `left`, if any.
    pub left_left: Option<Vec2>,
    /// Contour vertex after `right`, if any.
    pub right_right: Option<Vec2>,
}

#[derive(Copy, Clone)]
struct EdgeVertex {
    point: Vec2,
    convex: bool,
}

/// The half-plane constraint `edge` imposes on an agent at `position`
/// moving at `velocity`, or `None` when the edge is back-facing, already
/// covered by `existing` constraints, or deferred to an adjacent edge.
pub fn obstacle_line(
    position: Vec2,
    velocity: Vec2,
    radius: f32,
    time_horizon: f32,
    edge: &ObstacleEdgeLocal,
    existing: &[Line],
) -> Option<Line> {
    // A contour vertex is convex when the outgoing edge turns right (or
    // continues straight) relative to the incoming one; chain endpoints
    // count as convex.
    let mut left_vertex = EdgeVertex {
        point: edge.left,
        convex: edge
            .left_left
            .is_none_or(|ll| det(edge.right - edge.left, ll - edge.left) >= 0.0),
    };
    let mut right_vertex = EdgeVertex {
        point: edge.right,
        convex: edge
            .right_right
            .is_none_or(|rr| det(rr - edge.right, edge.left - edge.right) >= 0.0),
    };
    let mut left_left = edge.left_left;
    let mut right_right = edge.right_right;

    let relative_left = left_vertex.point - position;
    let relative_right = right_vertex.point - position;
    let edge_vector = right_vertex.point - left_vertex.point;
    if edge_vector.length_squared() < EDGE_COVER_EPSILON * EDGE_COVER_EPSILON {
        return None;
    }

    // Agent on the solid side: this is a back face.  Either a front-facing
    // edge elsewhere supplies the constraint, or the agent is inside the
    // obstacle and constraining it would pin it there.
    if det(-relative_left, edge_vector) < 0.0 {
        return None;
    }

    // Both endpoints already deep inside an existing constraint's forbidden
    // half-plane: the edge cannot be reached, skip it.
    let covered = existing.iter().any(|line| {
        det(relative_left / time_horizon - line.point, line.direction)
            >= radius / time_horizon - EDGE_COVER_EPSILON
            && det(relative_right / time_horizon - line.point, line.direction)
                >= radius / time_horizon - EDGE_COVER_EPSILON
    });
    if covered {
        return None;
    }

    let edge_unit = edge_vector.normalize();
    let dist_left_sq = relative_left.length_squared();
    let dist_right_sq = relative_right.length_squared();
    let radius_sq = radius * radius;

    let edge_t = (-relative_left).dot(edge_vector) / edge_vector.length_squared();
    let dist_to_line_sq = (edge_t * edge_vector).distance_squared(-relative_left);

    // Currently colliding with the edge or one of its endpoints: forbid
    // velocities that deepen the penetration.
    if edge_t < 0.0 && dist_left_sq <= radius_sq {
        // Past the left endpoint.  A concave corner gets a constraint
        // parallel to this edge so the agent cannot trade penetration of
        // one edge for the other.
        let direction = if left_vertex.convex {
            relative_left.perp().normalize()
        } else {
            -edge_unit
        };
        return Some(Line { point: Vec2::ZERO, direction });
    } else if edge_t > 1.0 && dist_right_sq <= radius_sq {
        if !right_vertex.convex {
            return Some(Line { point: Vec2::ZERO, direction: -edge_unit });
        }
        // If the next edge bends away to the right it faces the agent and
        // will produce this corner's constraint itself.
        if let Some(rr) = right_right {
            if det(relative_right, rr - right_vertex.point) < 0.0 {
                return None;
            }
        }
        return Some(Line {
            point: Vec2::ZERO,
            direction: relative_right.perp().normalize(),
        });
    } else if (0.0..=1.0).contains(&edge_t) && dist_to_line_sq <= radius_sq {
        return Some(Line { point: Vec2::ZERO, direction: -edge_unit });
    }

    // Not colliding: build the truncated cone.  First the shadow (leg)
    // directions cast by the endpoints.
    let mut left_shadow;
    let mut right_shadow;

    if edge_t < 0.0 && dist_to_line_sq <= radius_sq {
        // The whole edge hides behind the left vertex's shadow.
        if !left_vertex.convex {
            return None;
        }
        right_right = Some(right_vertex.point);
        right_vertex = left_vertex;

        let tangent_leg = (dist_left_sq - radius_sq).sqrt();
        left_shadow =
            (relative_left * tangent_leg + relative_left.perp() * radius) / dist_left_sq;
        right_shadow =
            (relative_left * tangent_leg - relative_left.perp() * radius) / dist_left_sq;
    } else if edge_t > 1.0 && dist_to_line_sq <= radius_sq {
        // The whole edge hides behind the right vertex's shadow.
        if !right_vertex.convex {
            return None;
        }
        left_left = Some(left_vertex.point);
        left_vertex = right_vertex;

        let tangent_leg = (dist_right_sq - radius_sq).sqrt();
        left_shadow =
            (relative_right * tangent_leg + relative_right.perp() * radius) / dist_right_sq;
        right_shadow =
            (relative_right * tangent_leg - relative_right.perp() * radius) / dist_right_sq;
    } else {
        if left_vertex.convex {
            let tangent_leg = (dist_left_sq - radius_sq).sqrt();
            left_shadow =
                (relative_left * tangent_leg + relative_left.perp() * radius) / dist_left_sq;
        } else {
            // Concave corner: extend the edge itself so both meeting edges
            // agree on the shadow and velocities project onto the corner.
            left_shadow = -edge_unit;
        }
        if right_vertex.convex {
            let tangent_leg = (dist_right_sq - radius_sq).sqrt();
            right_shadow =
                (relative_right * tangent_leg - relative_right.perp() * radius) / dist_right_sq;
        } else {
            right_shadow = edge_unit;
        }
    }

    // A convex vertex's shadow may be covered by the adjacent edge; defer
    // the constraint to that edge when the velocity projects there.
    let mut left_shadow_covered = false;
    let mut right_shadow_covered = false;

    if left_vertex.convex {
        if let Some(ll) = left_left {
            let adjacent = ll - left_vertex.point;
            if det(left_shadow, adjacent) >= 0.0 {
                left_shadow = adjacent.normalize();
                left_shadow_covered = true;
            }
        }
    }
    if right_vertex.convex {
        if let Some(rr) = right_right {
            let adjacent = rr - right_vertex.point;
            if det(right_shadow, adjacent) <= 0.0 {
                right_shadow = adjacent.normalize();
                right_shadow_covered = true;
            }
        }
    }

    // Vertices may have been swapped above; recompute relative geometry at
    // cutoff scale.
    let left_cutoff = (left_vertex.point - position) / time_horizon;
    let right_cutoff = (right_vertex.point - position) / time_horizon;
    let cutoff_vector = right_cutoff - left_cutoff;
    let degenerate = left_vertex.point == right_vertex.point;

    // Project the *current velocity* (not zero) onto the VO boundary; this
    // matches RVO2 and keeps agents from sticking to corners.
    let t_cutoff = if degenerate {
        0.5
    } else {
        (velocity - left_cutoff).dot(cutoff_vector) / cutoff_vector.length_squared()
    };
    let t_left = (velocity - left_cutoff).dot(left_shadow);
    let t_right = (velocity - right_cutoff).dot(right_shadow);

    if (t_cutoff < 0.0 && t_left < 0.0) || (degenerate && t_left < 0.0 && t_right < 0.0) {
        // Velocity projects onto the left cutoff arc.
        let from_cutoff = (velocity - left_cutoff).normalize();
        return Some(Line {
            direction: -from_cutoff.perp(),
            point: left_cutoff + radius / time_horizon * from_cutoff,
        });
    }
    if t_cutoff > 1.0 && t_right < 0.0 {
        let from_cutoff = (velocity - right_cutoff).normalize();
        return Some(Line {
            direction: -from_cutoff.perp(),
            point: right_cutoff + radius / time_horizon * from_cutoff,
        });
    }

    // Closest of: cutoff line, left shadow, right shadow.
    let dist_cutoff_sq = if !(0.0..=1.0).contains(&t_cutoff) || degenerate {
        f32::INFINITY
    } else {
        (velocity - (left_cutoff + t_cutoff * cutoff_vector)).length_squared()
    };
    let dist_left_shadow_sq = if t_left < 0.0 {
        f32::INFINITY
    } else {
        (velocity - (left_cutoff + t_left * left_shadow)).length_squared()
    };
    let dist_right_shadow_sq = if t_right < 0.0 {
        f32::INFINITY
    } else {
        (velocity - (right_cutoff + t_right * right_shadow)).length_squared()
    };

    if dist_cutoff_sq <= dist_left_shadow_sq && dist_cutoff_sq <= dist_right_shadow_sq {
        let direction = -cutoff_vector.normalize();
        Some(Line {
            direction,
            point: left_cutoff + radius / time_horizon * direction.perp(),
        })
    } else if dist_left_shadow_sq <= dist_right_shadow_sq {
        if left_shadow_covered {
            None
        } else {
            Some(Line {
                direction: left_shadow,
                point: left_cutoff + radius / time_horizon * left_shadow.perp(),
            })
        }
    } else if right_shadow_covered {
        None
    } else {
        Some(Line {
            direction: -right_shadow,
            point: right_cutoff - radius / time_horizon * right_shadow.perp(),
        })
    }
}

/// Free distance along `direction` (unit) before a disc of `radius` at
/// `position` first touches `edge`, `INFINITY` when the ray is clear.
///
/// Feeds the forward-clearance output together with the neighbor-disc ray
/// test, so an agent stalled against a wall reports zero instead of open
/// space.
pub fn edge_clearance(
    position: Vec2,
    radius: f32,
    direction: Vec2,
    edge: &ObstacleEdgeLocal,
) -> f32 {
    let mut clearance = vertex_clearance(position, radius, direction, edge.left)
        .min(vertex_clearance(position, radius, direction, edge.right));

    let edge_vector = edge.right - edge.left;
    let length = edge_vector.length();
    if length < EDGE_COVER_EPSILON {
        return clearance;
    }
    let tangent = edge_vector / length;
    let normal = tangent.perp();
    let offset = (position - edge.left).dot(normal);
    let closing = direction.dot(normal);

    if offset.abs() <= radius {
        // Already within the edge's band; touching when the foot of the
        // perpendicular lands on the segment.  The vertex tests above own
        // the corners.
        let foot = (position - edge.left).dot(tangent);
        if (0.0..=length).contains(&foot) {
            return 0.0;
        }
    } else if closing.abs() > EDGE_COVER_EPSILON {
        let t = (radius.copysign(offset) - offset) / closing;
        if t >= 0.0 {
            let foot = (position + t * direction - edge.left).dot(tangent);
            if (0.0..=length).contains(&foot) {
                clearance = clearance.min(t);
            }
        }
    }
    clearance
}

fn vertex_clearance(position: Vec2, radius: f32, direction: Vec2, vertex: Vec2) -> f32 {
    let rel = vertex - position;
    let along = rel.dot(direction);
    if along <= 0.0 {
        return f32::INFINITY;
    }
    let lateral_sq = rel.length_squared() - along * along;
    if lateral_sq >= radius * radius {
        return f32::INFINITY;
    }
    (along - (radius * radius - lateral_sq).sqrt()).max(0.0)
}
