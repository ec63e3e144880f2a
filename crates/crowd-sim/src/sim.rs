//! The simulator: storage, locking, and the per-tick pipeline.
//!
//! All heavy lifting lives in `crowd-solver`; this module only projects SoA
//! columns into the solver's plane-space inputs, sequences the stages, and
//! lifts results back into world space.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use glam::{Vec2, Vec3};

use crowd_agent::{AgentParams, AgentStore, MAX_BLOCKING_AGENTS, NO_END_OF_PATH};
use crowd_core::{
    AgentHandle, AgentIndex, CrowdError, CrowdResult, MovementPlane, ObstacleSetId, ReachedState,
    SimulationConfig, rotate,
};
use crowd_solver::{
    AgentConstraint, AgentSnapshot, HorizonDecision, HorizonNeighbour, Line, NeighbourSnapshot,
    ObstacleEdgeLocal, OverlapNeighbour, PreprocessInput, ReachedInputs, Velocities,
    analyze_reached, build_agent_constraints, detour_rotation, edge_clearance, forward_clearance,
    merge_blocked_interval, obstacle_line, preprocess, record_blocking, separation_velocity, solve,
};
use crowd_spatial::{
    BorderEdge, NeighbourBuffer, NeighbourQuery, ObstacleStore, QuadTree, TreeAgents,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// ── Public result types ───────────────────────────────────────────────────────

/// Summary of one completed tick.
#[derive(Copy, Clone, Debug)]
pub struct TickStats {
    /// Live agents processed.
    pub live_agents: usize,
    /// Agents indexed by this tick's quadtree rebuild.
    pub tree_agents: usize,
    /// Delta time actually used (the input, clamped up to
    /// `SimulationConfig::min_delta_time`).
    pub delta_time: f32,
}

/// Read-back snapshot of one agent's solver outputs.
///
/// The embedding applies movement itself: step toward `target_point` at
/// `speed`, clamping to not overshoot.  `speed` may exceed `max_speed` when
/// a hard-overlap correction is active.
#[derive(Copy, Clone, Debug)]
pub struct AgentOutput {
    pub target_point: Vec3,
    pub speed: f32,
    pub neighbour_count: u32,
    /// Agents whose constraint the chosen velocity rests on, terminated
    /// early by `AgentIndex::INVALID`.
    pub blocked_by: [AgentIndex; MAX_BLOCKING_AGENTS],
    pub forward_clearance: f32,
    pub reached: ReachedState,
}

// ── Simulator ─────────────────────────────────────────────────────────────────

/// The top-level simulation object.  Cheap to share by reference across
/// threads; see the crate docs for the locking discipline.
pub struct Simulator {
    world: RwLock<World>,
    /// Dedicated Rayon pool; `None` uses the global one.
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl Simulator {
    /// A simulator with the default [`SimulationConfig`].
    pub fn new() -> Self {
        Self {
            world: RwLock::new(World::new(SimulationConfig::default())),
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    pub(crate) fn from_config(config: SimulationConfig) -> CrowdResult<Self> {
        #[cfg(feature = "parallel")]
        let pool = match config.num_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| CrowdError::Config(format!("thread pool: {e}")))?,
            ),
            None => None,
        };
        Ok(Self {
            world: RwLock::new(World::new(config)),
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    // A poisoned lock means a solver panic mid-tick; the state is still
    // structurally sound (stages write whole buffers), so keep serving.
    fn read(&self) -> RwLockReadGuard<'_, World> {
        self.world.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, World> {
        self.world.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Agent management ──────────────────────────────────────────────────

    pub fn add_agent(&self, position: Vec3, params: AgentParams) -> AgentHandle {
        self.write().agents.add(position, params)
    }

    pub fn remove_agent(&self, handle: AgentHandle) -> CrowdResult<()> {
        self.write().agents.remove(handle)
    }

    pub fn set_params(&self, handle: AgentHandle, params: AgentParams) -> CrowdResult<()> {
        self.write().agents.set_params(handle, params)
    }

    pub fn params(&self, handle: AgentHandle) -> CrowdResult<AgentParams> {
        self.read().agents.params(handle)
    }

    /// Number of live agents.
    pub fn live_agents(&self) -> usize {
        self.read().agents.live_count()
    }

    pub fn config(&self) -> SimulationConfig {
        self.read().config.clone()
    }

    // ── Per-tick agent input ──────────────────────────────────────────────

    /// Update an agent's world position.  Called by the embedding every
    /// tick after it applied movement (the simulator never moves agents).
    pub fn set_position(&self, handle: AgentHandle, position: Vec3) -> CrowdResult<()> {
        let mut w = self.write();
        let i = w.agents.resolve(handle)?;
        w.agents.position[i] = position;
        Ok(())
    }

    pub fn position(&self, handle: AgentHandle) -> CrowdResult<Vec3> {
        let w = self.read();
        let i = w.agents.resolve(handle)?;
        Ok(w.agents.position[i])
    }

    /// Steer an agent toward `target_point` (the next path corner, not the
    /// final destination) at `desired_speed`, clamped into `[0, max_speed]`.
    ///
    /// `end_of_path` is the final destination when known; it feeds the
    /// arrival analysis and the locked-neighbor relevance filter.  Resets
    /// the agent's reached state.
    pub fn set_target(
        &self,
        handle: AgentHandle,
        target_point: Vec3,
        desired_speed: f32,
        max_speed: f32,
        end_of_path: Option<Vec3>,
    ) -> CrowdResult<()> {
        let mut w = self.write();
        let i = w.agents.resolve(handle)?;
        let max = max_speed.max(0.0);
        w.agents.target_point[i] = target_point;
        w.agents.max_speed[i] = max;
        w.agents.desired_speed[i] = desired_speed.clamp(0.0, max);
        w.agents.end_of_path[i] = end_of_path.unwrap_or(NO_END_OF_PATH);
        w.agents.output.reached[i] = ReachedState::NotReached;
        Ok(())
    }

    /// Override the agent's velocity for the next tick only.  Wins over
    /// `locked`; avoidance is bypassed, but other agents still see and
    /// avoid the agent at the forced velocity.
    pub fn force_set_velocity(&self, handle: AgentHandle, velocity: Vec3) -> CrowdResult<()> {
        let mut w = self.write();
        let i = w.agents.resolve(handle)?;
        let plane = w.agents.plane[i];
        w.agents.manual_velocity[i] = plane.to_plane(velocity);
        w.agents.manually_controlled[i] = true;
        Ok(())
    }

    /// Report a surface the external physics clamped this agent against;
    /// the velocity estimate slides along it instead of pushing in.
    /// Cleared automatically at the end of the next tick.
    pub fn set_collision_normal(&self, handle: AgentHandle, normal: Vec3) -> CrowdResult<()> {
        let mut w = self.write();
        let i = w.agents.resolve(handle)?;
        w.agents.collision_normal[i] = normal;
        Ok(())
    }

    // ── Outputs ───────────────────────────────────────────────────────────

    pub fn output(&self, handle: AgentHandle) -> CrowdResult<AgentOutput> {
        let w = self.read();
        let i = w.agents.resolve(handle)?;
        let out = &w.agents.output;
        Ok(AgentOutput {
            target_point: out.target_point[i],
            speed: out.speed[i],
            neighbour_count: out.neighbour_count[i],
            blocked_by: out.blocked_by[i],
            forward_clearance: out.forward_clearance[i],
            reached: out.reached[i],
        })
    }

    /// Fraction of the circle at `position` covered by agent cross-section,
    /// using the last tick's quadtree.  Zero before the first tick.
    pub fn query_area_density(&self, position: Vec3, radius: f32, plane: MovementPlane) -> f32 {
        if radius <= 0.0 {
            return 0.0;
        }
        let w = self.read();
        let covered = w.tree.query_area(w.tree_view(), plane.to_plane(position), radius);
        covered / (std::f32::consts::PI * radius * radius)
    }

    // ── Obstacles ─────────────────────────────────────────────────────────

    /// Trace a bag of border edges into contours and register them as a new
    /// obstacle set.
    pub fn rebuild_obstacles(&self, edges: &[BorderEdge]) -> ObstacleSetId {
        self.write().obstacles.rebuild(edges)
    }

    pub fn remove_obstacles(&self, id: ObstacleSetId) -> CrowdResult<()> {
        if self.write().obstacles.remove(id) {
            Ok(())
        } else {
            Err(CrowdError::ObstacleSetNotFound(id))
        }
    }

    // ── Tick ──────────────────────────────────────────────────────────────

    /// Run one simulation step.  Holds the write lock for the duration.
    pub fn tick(&self, delta_time: f32) -> TickStats {
        let mut guard = self.write();
        let world: &mut World = &mut guard;
        #[cfg(feature = "parallel")]
        if let Some(pool) = &self.pool {
            return pool.install(|| world.tick(delta_time));
        }
        world.tick(delta_time)
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

// ── World ─────────────────────────────────────────────────────────────────────

/// Everything behind the lock: stores plus per-tick scratch.
///
/// Scratch buffers are slot-indexed like the store's SoA columns and persist
/// between ticks, both to avoid reallocation and so the read-lock density
/// query can reuse the last tick's projections.
struct World {
    config: SimulationConfig,
    agents: AgentStore,
    obstacles: ObstacleStore,
    tree: QuadTree,

    plane_position: Vec<Vec2>,
    elevation: Vec<f32>,
    current_speed: Vec<f32>,
    velocities: Vec<Velocities>,
    neighbours: Vec<Vec<u32>>,
    decisions: Vec<HorizonDecision>,
    horizon_adjusted: Vec<bool>,
    separation: Vec<Vec2>,
}

impl World {
    fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            agents: AgentStore::new(),
            obstacles: ObstacleStore::new(),
            tree: QuadTree::empty(),
            plane_position: Vec::new(),
            elevation: Vec::new(),
            current_speed: Vec::new(),
            velocities: Vec::new(),
            neighbours: Vec::new(),
            decisions: Vec::new(),
            horizon_adjusted: Vec::new(),
            separation: Vec::new(),
        }
    }

    fn tick(&mut self, delta_time: f32) -> TickStats {
        let dt = delta_time.max(self.config.min_delta_time);
        self.resize_scratch(self.agents.slot_count());

        self.project_and_preprocess();
        self.build_tree();
        self.gather_neighbours();
        self.plan_detours();
        self.resolve_overlaps(dt);
        let results = self.solve_agents();
        self.publish(&results);
        self.analyze_arrivals();
        self.end_of_tick_cleanup();

        TickStats {
            live_agents: self.agents.live_count(),
            tree_agents: self.tree.len(),
            delta_time: dt,
        }
    }

    fn resize_scratch(&mut self, slots: usize) {
        self.plane_position.resize(slots, Vec2::ZERO);
        self.elevation.resize(slots, 0.0);
        self.current_speed.resize(slots, 0.0);
        self.velocities.resize(slots, Velocities::default());
        self.neighbours.resize_with(slots, Vec::new);
        self.decisions.resize(slots, HorizonDecision::Clear);
        self.horizon_adjusted.resize(slots, false);
        self.separation.resize(slots, Vec2::ZERO);
    }

    fn tree_view(&self) -> TreeAgents<'_> {
        TreeAgents {
            position: &self.plane_position,
            elevation: &self.elevation,
            height: &self.agents.height,
            radius: &self.agents.radius,
            speed: &self.current_speed,
            layer: &self.agents.layer,
            live: &self.agents.alive,
        }
    }

    // ── Stage 1: projection + velocity estimation ─────────────────────────

    fn project_and_preprocess(&mut self) {
        for i in 0..self.agents.slot_count() {
            if !self.agents.alive[i] {
                self.velocities[i] = Velocities::default();
                self.current_speed[i] = 0.0;
                continue;
            }
            let plane = self.agents.plane[i];
            let (position, elevation) = plane.to_plane_with_elevation(self.agents.position[i]);
            self.plane_position[i] = position;
            self.elevation[i] = elevation;

            let mut v = preprocess(&PreprocessInput {
                position,
                target_point: plane.to_plane(self.agents.target_point[i]),
                desired_speed: self.agents.desired_speed[i],
                previous_target_point: plane.to_plane(self.agents.output.target_point[i]),
                previous_speed: self.agents.output.speed[i],
                locked: self.agents.locked[i],
                manually_controlled: self.agents.manually_controlled[i],
                manual_velocity: self.agents.manual_velocity[i],
                collision_normal: plane.to_plane(self.agents.collision_normal[i]),
            });

            // Flow following: pull the desired heading toward the current
            // one, damping sharp turn requests.  Only once actually moving —
            // a standing agent must still be able to start in any direction.
            let strength = self.agents.flow_following_strength[i];
            if strength > 0.0 && v.current.length_squared() > 1e-6 {
                let kept = v.current.normalize_or_zero() * v.desired.length();
                v.desired = v.desired.lerp(kept, strength);
            }

            self.velocities[i] = v;
            self.current_speed[i] = v.current.length();
        }
    }

    // ── Stage 2: spatial index + neighbor gathering ───────────────────────

    fn build_tree(&mut self) {
        self.tree = QuadTree::build(
            self.tree_view(),
            self.config.quadtree_leaf_size,
            self.config.quadtree_max_depth,
        );
    }

    fn gather_neighbours(&mut self) {
        let agents = &self.agents;
        let view = TreeAgents {
            position: &self.plane_position,
            elevation: &self.elevation,
            height: &agents.height,
            radius: &agents.radius,
            speed: &self.current_speed,
            layer: &agents.layer,
            live: &agents.alive,
        };
        for (i, list) in self.neighbours.iter_mut().enumerate() {
            list.clear();
            if !agents.alive[i] {
                continue;
            }
            let mut buffer = NeighbourBuffer::new(agents.max_neighbours[i], f32::INFINITY);
            self.tree.query_k_nearest(
                view,
                &NeighbourQuery {
                    position: self.plane_position[i],
                    speed: self.current_speed[i],
                    time_horizon: agents.agent_time_horizon[i],
                    layer_mask: agents.collides_with[i],
                    elevation_min: self.elevation[i],
                    elevation_max: self.elevation[i] + agents.height[i],
                    exclude: i,
                },
                &mut buffer,
            );
            list.extend_from_slice(&buffer.ids);
        }
    }

    // ── Stage 3: locked-neighbor detours ──────────────────────────────────

    fn plan_detours(&mut self) {
        let slots = self.agents.slot_count();

        // Phase 1: per-agent merged blocked interval.
        let mut blockers: Vec<HorizonNeighbour> = Vec::new();
        for i in 0..slots {
            self.decisions[i] = HorizonDecision::Clear;
            self.horizon_adjusted[i] = false;
            if !self.agents.alive[i]
                || self.agents.locked[i]
                || self.agents.manually_controlled[i]
            {
                continue;
            }
            let plane = self.agents.plane[i];
            blockers.clear();
            for &n in &self.neighbours[i] {
                let n = n as usize;
                if self.agents.locked[n] || self.agents.manually_controlled[n] {
                    blockers.push(HorizonNeighbour {
                        position: plane.to_plane(self.agents.position[n]),
                        radius: self.agents.radius[n],
                    });
                }
            }
            self.decisions[i] = merge_blocked_interval(
                self.velocities[i].desired,
                self.plane_position[i],
                self.agents.radius[i],
                &blockers,
                self.config.horizon_margin,
            );
        }

        // Phase 2: pick a side.  Summing the neighbors' phase-1 bias makes
        // nearby agents facing the same blockage agree on a side, so it
        // cannot start until phase 1 has finished for every agent.
        for i in 0..slots {
            if !self.agents.alive[i] {
                continue;
            }
            let neighbour_bias: f32 = self.neighbours[i]
                .iter()
                .map(|&n| self.decisions[n as usize].bias())
                .sum();
            if let Some(rotation) = detour_rotation(self.decisions[i], neighbour_bias) {
                self.velocities[i].desired = rotate(self.velocities[i].desired, rotation);
                self.horizon_adjusted[i] = true;
            }
        }
    }

    // ── Stage 4: hard-overlap separation ──────────────────────────────────

    fn resolve_overlaps(&mut self, dt: f32) {
        let mut overlaps: Vec<OverlapNeighbour> = Vec::new();
        for i in 0..self.agents.slot_count() {
            self.separation[i] = Vec2::ZERO;
            if !self.agents.alive[i]
                || self.agents.locked[i]
                || self.agents.manually_controlled[i]
            {
                continue;
            }
            let plane = self.agents.plane[i];
            let position = self.plane_position[i];
            overlaps.clear();
            for &n in &self.neighbours[i] {
                let n = n as usize;
                let mut offset = plane.to_plane(self.agents.position[n]) - position;
                // Exactly coincident centers: perturb by slot order so the
                // two agents receive opposite pushes instead of identical
                // ones.
                if offset.length_squared() <= 1e-12 {
                    offset = Vec2::X * if n > i { 1e-5 } else { -1e-5 };
                }
                overlaps.push(OverlapNeighbour {
                    offset,
                    combined_radius: self.agents.radius[i] + self.agents.radius[n],
                    locked: self.agents.locked[n] && !self.agents.manually_controlled[n],
                });
            }
            self.separation[i] =
                separation_velocity(&overlaps, self.config.hard_collision_damping, dt);
        }
    }

    // ── Stage 5: per-agent solve ──────────────────────────────────────────

    fn solve_agents(&self) -> Vec<AgentResult> {
        let slots = self.agents.slot_count();

        #[cfg(not(feature = "parallel"))]
        {
            let mut scratch = SolveScratch::default();
            (0..slots).map(|i| solve_agent(self, i, &mut scratch)).collect()
        }

        #[cfg(feature = "parallel")]
        {
            (0..slots)
                .into_par_iter()
                .map_init(SolveScratch::default, |scratch, i| {
                    solve_agent(self, i, scratch)
                })
                .collect()
        }
    }

    // ── Stage 6: publish + arrival analysis + cleanup ─────────────────────

    fn publish(&mut self, results: &[AgentResult]) {
        for i in 0..self.agents.slot_count() {
            if !self.agents.alive[i] {
                continue;
            }
            let r = &results[i];
            let out = &mut self.agents.output;
            out.target_point[i] = r.target_point;
            out.speed[i] = r.speed;
            out.neighbour_count[i] = self.neighbours[i].len() as u32;
            out.blocked_by[i] = r.blocked_by;
            out.forward_clearance[i] = r.forward_clearance;
        }
    }

    fn analyze_arrivals(&mut self) {
        let slots = self.agents.slot_count();
        let mut horizontal = vec![f32::INFINITY; slots];
        let mut vertical = vec![f32::INFINITY; slots];
        for i in 0..slots {
            if !self.agents.alive[i] || !self.agents.has_end_of_path(i) {
                continue;
            }
            let plane = self.agents.plane[i];
            let (end, end_elevation) = plane.to_plane_with_elevation(self.agents.end_of_path[i]);
            horizontal[i] = end.distance(self.plane_position[i]);
            vertical[i] = (end_elevation - self.elevation[i]).abs();
        }

        let store = &mut self.agents;
        let inputs = ReachedInputs {
            alive: &store.alive,
            position: &store.position,
            end_of_path: &store.end_of_path,
            horizontal_dist_to_end: &horizontal,
            vertical_dist_to_end: &vertical,
            radius: &store.radius,
            height: &store.height,
            speed: &store.output.speed,
            desired_speed: &store.desired_speed,
            forward_clearance: &store.output.forward_clearance,
            blocked_by: &store.output.blocked_by,
        };
        analyze_reached(&inputs, &mut store.output.reached);
    }

    fn end_of_tick_cleanup(&mut self) {
        self.agents.collision_normal.fill(Vec3::ZERO);
        self.agents.manually_controlled.fill(false);
        self.agents.manual_velocity.fill(Vec2::ZERO);
    }
}

// ── Per-agent solve ───────────────────────────────────────────────────────────

/// One agent's published result, produced by [`solve_agent`].
#[derive(Copy, Clone)]
struct AgentResult {
    target_point: Vec3,
    speed: f32,
    blocked_by: [AgentIndex; MAX_BLOCKING_AGENTS],
    forward_clearance: f32,
}

impl AgentResult {
    fn stationary(position: Vec3) -> Self {
        Self {
            target_point: position,
            speed: 0.0,
            blocked_by: [AgentIndex::INVALID; MAX_BLOCKING_AGENTS],
            forward_clearance: f32::INFINITY,
        }
    }
}

/// Reusable allocations for the solve stage (one per worker thread).
#[derive(Default)]
struct SolveScratch {
    neighbours: Vec<NeighbourSnapshot>,
    edges: Vec<ObstacleEdgeLocal>,
    obstacle_lines: Vec<Line>,
    constraints: Vec<AgentConstraint>,
    lines: Vec<Line>,
}

fn solve_agent(world: &World, i: usize, scratch: &mut SolveScratch) -> AgentResult {
    let store = &world.agents;
    if !store.alive[i] {
        return AgentResult::stationary(Vec3::ZERO);
    }
    let plane = store.plane[i];
    let position = world.plane_position[i];
    let elevation = world.elevation[i];

    if store.manually_controlled[i] {
        let v = store.manual_velocity[i];
        let mut result = AgentResult::stationary(store.position[i]);
        result.target_point = plane.to_world(position + v, elevation);
        result.speed = v.length();
        return result;
    }
    if store.locked[i] {
        return AgentResult::stationary(store.position[i]);
    }

    let Velocities { current, desired } = world.velocities[i];

    let dist_to_end = if store.has_end_of_path(i) {
        plane.to_plane(store.end_of_path[i]).distance(position)
    } else {
        f32::INFINITY
    };
    let agent = AgentSnapshot {
        position,
        velocity: current,
        desired_velocity: desired,
        radius: store.radius[i],
        max_speed: store.max_speed[i],
        priority: store.priority[i],
        time_horizon: store.agent_time_horizon[i],
        dist_to_end_of_path: dist_to_end,
    };

    scratch.neighbours.clear();
    for &n in &world.neighbours[i] {
        let slot = n as usize;
        scratch.neighbours.push(NeighbourSnapshot {
            index: AgentIndex(n),
            position: plane.to_plane(store.position[slot]),
            velocity: world.velocities[slot].current,
            desired_velocity: world.velocities[slot].desired,
            radius: store.radius[slot],
            priority: store.priority[slot],
            locked: store.locked[slot] && !store.manually_controlled[slot],
        });
    }

    // Obstacle constraints from every edge reachable within the horizon.
    scratch.edges.clear();
    scratch.obstacle_lines.clear();
    let horizon = store.obstacle_time_horizon[i];
    let range = horizon * store.max_speed[i] + store.radius[i];
    for edge in world.obstacles.edges_near(store.position[i], range) {
        let lo = plane.elevation(edge.a).min(plane.elevation(edge.b));
        let hi = plane.elevation(edge.a).max(plane.elevation(edge.b));
        if lo > elevation + store.height[i] || hi < elevation {
            continue;
        }
        let local = ObstacleEdgeLocal {
            left: plane.to_plane(edge.a),
            right: plane.to_plane(edge.b),
            left_left: edge.prev.map(|p| plane.to_plane(p)),
            right_right: edge.next.map(|p| plane.to_plane(p)),
        };
        scratch.edges.push(local);
        if let Some(line) = obstacle_line(
            position,
            current,
            store.radius[i],
            horizon,
            &local,
            &scratch.obstacle_lines,
        ) {
            scratch.obstacle_lines.push(line);
        }
    }

    let collision_course = build_agent_constraints(
        &agent,
        &scratch.neighbours,
        &world.config,
        &mut scratch.constraints,
    );

    let outcome = solve(
        desired,
        store.max_speed[i],
        store.max_deviation_angle[i],
        collision_course,
        &scratch.obstacle_lines,
        &scratch.constraints,
        &world.config,
        &mut scratch.lines,
    );

    let mut blocked_by = [AgentIndex::INVALID; MAX_BLOCKING_AGENTS];
    record_blocking(&scratch.constraints, outcome.unclamped_velocity, &mut blocked_by);

    let separation = world.separation[i];
    let velocity = outcome.velocity + separation;

    let direction = velocity.normalize_or_zero();
    let clearance = if direction == Vec2::ZERO {
        f32::INFINITY
    } else {
        scratch.edges.iter().fold(
            forward_clearance(&agent, &scratch.neighbours, direction),
            |c, edge| c.min(edge_clearance(position, store.radius[i], direction, edge)),
        )
    };

    if outcome.shortcut && separation == Vec2::ZERO && !world.horizon_adjusted[i] {
        // Nothing altered the desired velocity: forward the embedding's
        // target point untouched.  Re-deriving it from the velocity loses
        // precision right next to the goal.
        AgentResult {
            target_point: store.target_point[i],
            speed: desired.length(),
            blocked_by,
            forward_clearance: clearance,
        }
    } else {
        AgentResult {
            target_point: plane.to_world(position + velocity, elevation),
            speed: velocity.length(),
            blocked_by,
            forward_clearance: clearance,
        }
    }
}
