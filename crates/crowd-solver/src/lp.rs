//! Incremental 2D linear programming over half-plane constraints.
//!
//! The solver follows the classic randomized-LP structure of RVO2, minus the
//! randomization: constraints are processed in the order they were added, so
//! results are deterministic.  When the feasible region is empty a fallback
//! pass finds the velocity minimizing the worst constraint penetration
//! instead of failing — extreme crowding must always yield *some* answer.

use glam::Vec2;

use crowd_core::{clamp_magnitude, det};

use crate::line::Line;

/// Best velocity within the `max_speed` disk subject to `lines`.
///
/// The first `fixed_count` lines are treated as immovable (static-obstacle
/// constraints): the penetration-minimizing fallback keeps them verbatim and
/// only relaxes the remaining (agent) constraints.
pub fn solve_velocity(lines: &[Line], fixed_count: usize, desired: Vec2, max_speed: f32) -> Vec2 {
    let (mut result, fail) = lp2(lines, desired, max_speed, false);
    if fail < lines.len() {
        result = lp3(lines, fixed_count, fail, result, max_speed);
    }
    result
}

/// 1D optimization along `lines[index]`, clipped by the speed disk and all
/// prior constraints.  `None` when the admissible segment is empty.
///
/// With `direction_opt`, `opt` is a unit direction to maximize along rather
/// than a velocity to stay close to.
fn lp1(lines: &[Line], index: usize, opt: Vec2, max_speed: f32, direction_opt: bool) -> Option<Vec2> {
    let line = &lines[index];
    let dot = line.point.dot(line.direction);
    let discriminant = dot.mul_add(dot, max_speed.mul_add(max_speed, -line.point.length_squared()));
    if discriminant < 0.0 {
        // The speed disk misses this constraint line entirely.
        return None;
    }

    let sqrt_discriminant = discriminant.sqrt();
    let mut t_left = -dot - sqrt_discriminant;
    let mut t_right = -dot + sqrt_discriminant;

    for prior in &lines[..index] {
        let denominator = det(line.direction, prior.direction);
        let numerator = det(prior.direction, line.point - prior.point);

        if denominator.abs() <= f32::EPSILON {
            // Near-parallel: either redundant or contradictory.
            if numerator < 0.0 {
                return None;
            }
            continue;
        }

        let t = numerator / denominator;
        if denominator >= 0.0 {
            t_right = t_right.min(t);
        } else {
            t_left = t_left.max(t);
        }
        if t_left > t_right {
            return None;
        }
    }

    let t_opt = if direction_opt {
        line.direction.dot(opt)
    } else {
        line.direction.dot(opt - line.point)
    };
    Some(line.point + t_opt.clamp(t_left, t_right) * line.direction)
}

/// Incremental 2D program.  Returns the solution plus the index of the first
/// infeasible constraint (`lines.len()` when fully feasible).
fn lp2(lines: &[Line], opt: Vec2, max_speed: f32, direction_opt: bool) -> (Vec2, usize) {
    let mut result = if direction_opt {
        opt.normalize_or_zero() * max_speed
    } else {
        clamp_magnitude(opt, max_speed)
    };

    for (i, line) in lines.iter().enumerate() {
        if det(line.direction, line.point - result) > 0.0 {
            // Current optimum violates constraint i; re-optimize on its boundary.
            match lp1(lines, i, opt, max_speed, direction_opt) {
                Some(projected) => result = projected,
                None => return (result, i),
            }
        }
    }
    (result, lines.len())
}

/// Penetration-minimizing fallback for an infeasible program.
///
/// For each constraint past the failure point that is violated deeper than
/// the running worst distance, re-solve on its boundary with every earlier
/// agent constraint projected into the boundary's frame.  The first
/// `fixed_count` (obstacle) lines are carried over unchanged: static
/// geometry never yields.
fn lp3(lines: &[Line], fixed_count: usize, fail: usize, current: Vec2, max_speed: f32) -> Vec2 {
    let mut result = current;
    let mut distance = 0.0_f32;
    let mut projected: Vec<Line> = Vec::with_capacity(lines.len());

    for i in fail.max(fixed_count)..lines.len() {
        if det(lines[i].direction, lines[i].point - result) <= distance {
            continue;
        }

        projected.clear();
        projected.extend_from_slice(&lines[..fixed_count]);

        for j in fixed_count..i {
            let determinant = det(lines[i].direction, lines[j].direction);
            if determinant.abs() <= f32::EPSILON {
                if lines[i].direction.dot(lines[j].direction) > 0.0 {
                    // Same direction: line j is redundant here.
                    continue;
                }
                projected.push(Line {
                    point: 0.5 * (lines[i].point + lines[j].point),
                    direction: (lines[j].direction - lines[i].direction).normalize_or_zero(),
                });
            } else {
                projected.push(Line {
                    point: lines[i].point
                        + (det(lines[j].direction, lines[i].point - lines[j].point) / determinant)
                            * lines[i].direction,
                    direction: (lines[j].direction - lines[i].direction).normalize_or_zero(),
                });
            }
        }

        let opt_direction = Vec2::new(-lines[i].direction.y, lines[i].direction.x);
        let (candidate, _) = lp2(&projected, opt_direction, max_speed, true);
        if det(lines[i].direction, lines[i].point - candidate) > distance {
            result = candidate;
        }
        distance = det(lines[i].direction, lines[i].point - result);
    }

    result
}

#[cfg(test)]
pub(crate) fn lp2_for_tests(lines: &[Line], opt: Vec2, max_speed: f32) -> (Vec2, usize) {
    lp2(lines, opt, max_speed, false)
}
