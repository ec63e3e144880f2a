//! Core agent storage: generation-checked SoA slots.
//!
//! Every `Vec` field has exactly `slot_count()` elements; a slot index is
//! the index into all of them:
//!
//! ```ignore
//! let pos = store.position[handle.index.index()];  // O(1), cache-friendly
//! ```
//!
//! Removed slots stay in place (marked dead, generation bumped) and are
//! recycled by the next `add`.  Solver loops iterate `0..slot_count()` and
//! skip dead slots via the `alive` mask — the arrays never shift, so bare
//! `AgentIndex` values stored in neighbor/blocking lists stay meaningful
//! for the tick they were produced in.

use glam::{Vec2, Vec3};

use crowd_core::{AgentHandle, AgentIndex, CrowdError, CrowdResult, MovementPlane, ReachedState};

use crate::params::AgentParams;

/// Cap on the per-agent "blocking agents" output list.
pub const MAX_BLOCKING_AGENTS: usize = 7;

/// Sentinel for "no end-of-path": disables the crowd-convergence heuristic.
pub const NO_END_OF_PATH: Vec3 = Vec3::INFINITY;

// ── AgentOutputs ──────────────────────────────────────────────────────────────

/// Solver results, published once per tick.
///
/// Written in one pass at the end of the pipeline from that tick's scratch
/// buffers; readers holding the read lock between ticks always see a
/// consistent snapshot.
#[derive(Default)]
pub struct AgentOutputs {
    /// Point the agent should move toward this tick (world space).
    pub target_point: Vec<Vec3>,
    /// Speed to move at, in `[0, max_speed]`.
    pub speed: Vec<f32>,
    /// Number of neighbors considered by the solver.
    pub neighbour_count: Vec<u32>,
    /// Agents whose constraint the chosen velocity rests on, terminated
    /// early by `AgentIndex::INVALID`.
    pub blocked_by: Vec<[AgentIndex; MAX_BLOCKING_AGENTS]>,
    /// Free distance along the chosen direction before the nearest
    /// considered constraint, `f32::INFINITY` if unobstructed.
    pub forward_clearance: Vec<f32>,
    /// Congestion-aware arrival status.
    pub reached: Vec<ReachedState>,
}

impl AgentOutputs {
    fn push_default(&mut self) {
        self.target_point.push(Vec3::ZERO);
        self.speed.push(0.0);
        self.neighbour_count.push(0);
        self.blocked_by.push([AgentIndex::INVALID; MAX_BLOCKING_AGENTS]);
        self.forward_clearance.push(f32::INFINITY);
        self.reached.push(ReachedState::NotReached);
    }

    fn reset_slot(&mut self, i: usize) {
        self.target_point[i] = Vec3::ZERO;
        self.speed[i] = 0.0;
        self.neighbour_count[i] = 0;
        self.blocked_by[i] = [AgentIndex::INVALID; MAX_BLOCKING_AGENTS];
        self.forward_clearance[i] = f32::INFINITY;
        self.reached[i] = ReachedState::NotReached;
    }
}

// ── AgentStore ────────────────────────────────────────────────────────────────

/// Structure-of-Arrays storage for all agent state.
///
/// All data fields are `pub` for direct indexed access on hot paths; slot
/// bookkeeping (free list, live count) is private so the generation
/// invariant cannot be broken from outside.
pub struct AgentStore {
    // ── Slot bookkeeping ──────────────────────────────────────────────────
    /// Current generation of each slot.  Bumped on removal.
    pub generation: Vec<u32>,
    /// Live mask.  Dead slots are skipped by every solver loop.
    pub alive: Vec<bool>,
    free: Vec<u32>,
    live_count: usize,

    // ── Tunables (see `AgentParams` for field docs) ───────────────────────
    pub radius: Vec<f32>,
    pub height: Vec<f32>,
    pub max_speed: Vec<f32>,
    pub desired_speed: Vec<f32>,
    pub agent_time_horizon: Vec<f32>,
    pub obstacle_time_horizon: Vec<f32>,
    pub max_neighbours: Vec<usize>,
    pub priority: Vec<f32>,
    pub layer: Vec<u32>,
    pub collides_with: Vec<u32>,
    pub locked: Vec<bool>,
    pub plane: Vec<MovementPlane>,
    pub flow_following_strength: Vec<f32>,
    pub max_deviation_angle: Vec<f32>,

    // ── Per-tick input ────────────────────────────────────────────────────
    /// World position, written by the embedding every tick.
    pub position: Vec<Vec3>,
    /// Point the agent wants to reach this tick (from path following).
    pub target_point: Vec<Vec3>,
    /// Final path destination, or [`NO_END_OF_PATH`].
    pub end_of_path: Vec<Vec3>,
    /// Surface normal from external physics clamping; `Vec3::ZERO` when
    /// unset.  Cleared automatically at the end of each tick.
    pub collision_normal: Vec<Vec3>,
    /// Velocity override while `manually_controlled` is set.
    pub manual_velocity: Vec<Vec2>,
    /// One-tick manual-control flag set by `force_set_velocity`.  Overrides
    /// `locked`; cleared at the end of each tick.
    pub manually_controlled: Vec<bool>,

    // ── Per-tick output ───────────────────────────────────────────────────
    pub output: AgentOutputs,
}

impl AgentStore {
    pub fn new() -> Self {
        Self {
            generation: Vec::new(),
            alive: Vec::new(),
            free: Vec::new(),
            live_count: 0,

            radius: Vec::new(),
            height: Vec::new(),
            max_speed: Vec::new(),
            desired_speed: Vec::new(),
            agent_time_horizon: Vec::new(),
            obstacle_time_horizon: Vec::new(),
            max_neighbours: Vec::new(),
            priority: Vec::new(),
            layer: Vec::new(),
            collides_with: Vec::new(),
            locked: Vec::new(),
            plane: Vec::new(),
            flow_following_strength: Vec::new(),
            max_deviation_angle: Vec::new(),

            position: Vec::new(),
            target_point: Vec::new(),
            end_of_path: Vec::new(),
            collision_normal: Vec::new(),
            manual_velocity: Vec::new(),
            manually_controlled: Vec::new(),

            output: AgentOutputs::default(),
        }
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    /// Total slots, live and dead.  Length of every SoA `Vec`.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.alive.len()
    }

    /// Number of live agents.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Iterator over the slot indices of all live agents, ascending.
    pub fn live_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|&(_, &a)| a)
            .map(|(i, _)| i)
    }

    // ── Handle validation ─────────────────────────────────────────────────

    /// Resolve a handle to its slot index, rejecting stale handles.
    #[inline]
    pub fn resolve(&self, handle: AgentHandle) -> CrowdResult<usize> {
        let i = handle.index.index();
        if i < self.slot_count() && self.alive[i] && self.generation[i] == handle.generation {
            Ok(i)
        } else {
            Err(CrowdError::StaleHandle(handle))
        }
    }

    /// The current handle for a live slot.
    #[inline]
    pub fn handle_for(&self, slot: usize) -> AgentHandle {
        debug_assert!(self.alive[slot]);
        AgentHandle::new(AgentIndex(slot as u32), self.generation[slot])
    }

    // ── Add / remove ──────────────────────────────────────────────────────

    /// Add an agent at `position`, recycling a dead slot if one is free.
    pub fn add(&mut self, position: Vec3, params: AgentParams) -> AgentHandle {
        let slot = match self.free.pop() {
            Some(slot) => {
                let i = slot as usize;
                self.alive[i] = true;
                self.write_params(i, &params);
                self.position[i] = position;
                self.target_point[i] = position;
                self.end_of_path[i] = NO_END_OF_PATH;
                self.collision_normal[i] = Vec3::ZERO;
                self.manual_velocity[i] = Vec2::ZERO;
                self.manually_controlled[i] = false;
                self.output.reset_slot(i);
                i
            }
            None => {
                let i = self.slot_count();
                self.generation.push(0);
                self.alive.push(true);
                self.push_params(&params);
                self.position.push(position);
                self.target_point.push(position);
                self.end_of_path.push(NO_END_OF_PATH);
                self.collision_normal.push(Vec3::ZERO);
                self.manual_velocity.push(Vec2::ZERO);
                self.manually_controlled.push(false);
                self.output.push_default();
                i
            }
        };
        // New agents should not drift: target themselves at zero speed.
        self.output.target_point[slot] = position;
        self.live_count += 1;
        AgentHandle::new(AgentIndex(slot as u32), self.generation[slot])
    }

    /// Remove an agent.  The slot's generation is bumped immediately, so the
    /// handle (and any copy of it) fails all subsequent operations.
    pub fn remove(&mut self, handle: AgentHandle) -> CrowdResult<()> {
        let i = self.resolve(handle)?;
        self.alive[i] = false;
        self.generation[i] = self.generation[i].wrapping_add(1);
        self.free.push(i as u32);
        self.live_count -= 1;
        Ok(())
    }

    /// Overwrite a live agent's tunable parameters.
    pub fn set_params(&mut self, handle: AgentHandle, params: AgentParams) -> CrowdResult<()> {
        let i = self.resolve(handle)?;
        self.write_params(i, &params);
        Ok(())
    }

    /// Read back a live agent's tunable parameters.
    pub fn params(&self, handle: AgentHandle) -> CrowdResult<AgentParams> {
        let i = self.resolve(handle)?;
        Ok(AgentParams {
            radius: self.radius[i],
            height: self.height[i],
            max_speed: self.max_speed[i],
            desired_speed: self.desired_speed[i],
            agent_time_horizon: self.agent_time_horizon[i],
            obstacle_time_horizon: self.obstacle_time_horizon[i],
            max_neighbours: self.max_neighbours[i],
            priority: self.priority[i],
            layer: self.layer[i],
            collides_with: self.collides_with[i],
            locked: self.locked[i],
            plane: self.plane[i],
            flow_following_strength: self.flow_following_strength[i],
            max_deviation_angle: self.max_deviation_angle[i],
        })
    }

    // ── End-of-path helper ────────────────────────────────────────────────

    /// `true` if the slot has a defined end-of-path point.
    #[inline]
    pub fn has_end_of_path(&self, slot: usize) -> bool {
        self.end_of_path[slot].is_finite()
    }

    // ── Internal SoA plumbing ─────────────────────────────────────────────

    fn write_params(&mut self, i: usize, p: &AgentParams) {
        self.radius[i] = p.radius;
        self.height[i] = p.height;
        self.max_speed[i] = p.max_speed;
        self.desired_speed[i] = p.desired_speed.clamp(0.0, p.max_speed);
        self.agent_time_horizon[i] = p.agent_time_horizon;
        self.obstacle_time_horizon[i] = p.obstacle_time_horizon;
        self.max_neighbours[i] = p.max_neighbours;
        self.priority[i] = p.priority.max(0.0);
        self.layer[i] = p.layer;
        self.collides_with[i] = p.collides_with;
        self.locked[i] = p.locked;
        self.plane[i] = p.plane;
        self.flow_following_strength[i] = p.flow_following_strength.clamp(0.0, 1.0);
        self.max_deviation_angle[i] = p.max_deviation_angle;
    }

    fn push_params(&mut self, p: &AgentParams) {
        self.radius.push(p.radius);
        self.height.push(p.height);
        self.max_speed.push(p.max_speed);
        self.desired_speed.push(p.desired_speed.clamp(0.0, p.max_speed));
        self.agent_time_horizon.push(p.agent_time_horizon);
        self.obstacle_time_horizon.push(p.obstacle_time_horizon);
        self.max_neighbours.push(p.max_neighbours);
        self.priority.push(p.priority.max(0.0));
        self.layer.push(p.layer);
        self.collides_with.push(p.collides_with);
        self.locked.push(p.locked);
        self.plane.push(p.plane);
        self.flow_following_strength
            .push(p.flow_following_strength.clamp(0.0, 1.0));
        self.max_deviation_angle.push(p.max_deviation_angle);
    }
}

impl Default for AgentStore {
    fn default() -> Self {
        Self::new()
    }
}
