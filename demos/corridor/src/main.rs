//! Two groups of walkers cross a walled corridor head-on.
//!
//! Each group spawns at one end and targets the opposite one, so every agent
//! meets eight oncoming ones in a 4-unit-wide corridor.  Prints a progress
//! line every simulated second; run with `cargo run -p corridor`.

use glam::Vec3;

use crowd_sim::{
    AgentHandle, AgentParams, BorderEdge, CrowdResult, MovementPlane, ReachedState, Simulator,
};

const DT: f32 = 0.05;
const MAX_STEPS: usize = 1200;

struct Walker {
    handle: AgentHandle,
    position: Vec3,
    goal: Vec3,
}

fn main() -> CrowdResult<()> {
    let sim = Simulator::new();

    // Corridor walls along x, solid space to the left of each directed edge.
    sim.rebuild_obstacles(&[
        BorderEdge {
            from: Vec3::new(-12.0, 0.0, 2.0),
            to: Vec3::new(12.0, 0.0, 2.0),
            from_id: 1,
            to_id: 2,
        },
        BorderEdge {
            from: Vec3::new(12.0, 0.0, -2.0),
            to: Vec3::new(-12.0, 0.0, -2.0),
            from_id: 3,
            to_id: 4,
        },
    ]);

    let params = AgentParams {
        radius: 0.4,
        max_speed: 1.6,
        desired_speed: 1.4,
        ..AgentParams::default()
    };

    let mut walkers = Vec::new();
    for lane in 0..8 {
        let z = -1.4 + 0.4 * lane as f32;
        let left = Vec3::new(-10.0, 0.0, z);
        let right = Vec3::new(10.0, 0.0, -z);
        walkers.push(Walker {
            handle: sim.add_agent(left, params.clone()),
            position: left,
            goal: right,
        });
        walkers.push(Walker {
            handle: sim.add_agent(right, params.clone()),
            position: right,
            goal: left,
        });
    }

    for step in 0..MAX_STEPS {
        for w in &walkers {
            sim.set_target(w.handle, w.goal, params.desired_speed, params.max_speed, Some(w.goal))?;
        }
        sim.tick(DT);

        // Apply the movement the embedding normally would.
        for w in &mut walkers {
            let out = sim.output(w.handle)?;
            let to_target = out.target_point - w.position;
            let dist = to_target.length();
            if dist > f32::EPSILON {
                w.position += to_target / dist * (out.speed * DT).min(dist);
            }
            sim.set_position(w.handle, w.position)?;
        }

        let time = (step + 1) as f32 * DT;
        if step % 20 == 19 {
            report(&sim, &walkers, time)?;
        }

        let mut all_arrived = true;
        for w in &walkers {
            if sim.output(w.handle)?.reached != ReachedState::Reached {
                all_arrived = false;
                break;
            }
        }
        if all_arrived {
            println!("all {} walkers arrived after {time:.1}s", walkers.len());
            return Ok(());
        }
    }

    println!("time limit hit before everyone arrived");
    Ok(())
}

fn report(sim: &Simulator, walkers: &[Walker], time: f32) -> CrowdResult<()> {
    let mut arrived = 0;
    for w in walkers {
        if sim.output(w.handle)?.reached != ReachedState::NotReached {
            arrived += 1;
        }
    }
    let density = sim.query_area_density(Vec3::ZERO, 3.0, MovementPlane::XZ);
    println!(
        "t = {time:5.1}s  arrived {arrived:2}/{}  center density {density:.2}",
        walkers.len()
    );
    Ok(())
}
