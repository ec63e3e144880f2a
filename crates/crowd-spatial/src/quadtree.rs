//! Per-tick agent quadtree.
//!
//! # Data layout
//!
//! The tree is two flat `Vec`s: `nodes` (tagged [`NodeKind`] plus cached
//! aggregates) and `order` (agent slot indices, reordered so every leaf owns
//! a contiguous range).  Inner nodes always allocate their four children
//! consecutively, so a single child index addresses all of them.
//!
//! # Aggregates and pruning
//!
//! Each node caches the maximum speed, maximum radius, and summed
//! cross-sectional area of its subtree, computed bottom-up during the build.
//! A k-nearest query prunes a subtree when even the fastest agent inside it
//! could not come within the querying agent's reach over its time horizon:
//!
//! ```text
//! reach = search_radius + node.max_radius
//!       + time_horizon * (node.max_speed + query.speed)
//! ```
//!
//! The area aggregate answers density queries without visiting leaves that
//! are fully covered by the query circle.
//!
//! # Lifecycle
//!
//! Built fresh each tick from the live agent set; never mutated.

use glam::Vec2;

// ── Input view ────────────────────────────────────────────────────────────────

/// Borrowed SoA columns the tree reads during build and query.
///
/// All slices are indexed by agent slot; dead slots are excluded by the
/// `live` mask at build time and never enter the tree.
#[derive(Copy, Clone)]
pub struct TreeAgents<'a> {
    /// Plane-space position per slot.
    pub position: &'a [Vec2],
    /// Elevation of the agent's base above its movement plane.
    pub elevation: &'a [f32],
    pub height: &'a [f32],
    pub radius: &'a [f32],
    /// Current speed (plane space).
    pub speed: &'a [f32],
    /// Layer bitmask the agent occupies.
    pub layer: &'a [u32],
    pub live: &'a [bool],
}

// ── Node storage ──────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
enum NodeKind {
    /// Children occupy `nodes[children .. children + 4]`, ordered
    /// (-x,-y), (-x,+y), (+x,-y), (+x,+y).
    Inner { children: u32 },
    /// Agents occupy `order[start .. end]`.
    Leaf { start: u32, end: u32 },
}

#[derive(Copy, Clone, Debug)]
struct Node {
    kind: NodeKind,
    max_speed: f32,
    max_radius: f32,
    /// Total agent cross-section (Σ π r²) in this subtree.
    area: f32,
}

// ── QuadTree ──────────────────────────────────────────────────────────────────

pub struct QuadTree {
    nodes: Vec<Node>,
    order: Vec<u32>,
    min: Vec2,
    max: Vec2,
    leaf_size: usize,
    max_depth: u32,
}

impl QuadTree {
    /// An empty tree; all queries return nothing.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            order: Vec::new(),
            min: Vec2::ZERO,
            max: Vec2::ZERO,
            leaf_size: 16,
            max_depth: 10,
        }
    }

    /// Build the tree over all live agents.
    ///
    /// `leaf_size` and `max_depth` bound the recursion; degenerate inputs
    /// (every agent at one point) bottom out at `max_depth`.
    pub fn build(agents: TreeAgents<'_>, leaf_size: usize, max_depth: u32) -> Self {
        let mut order: Vec<u32> = (0..agents.position.len() as u32)
            .filter(|&i| agents.live[i as usize])
            .collect();

        if order.is_empty() {
            return Self::empty();
        }

        // Bounding box of the live set.
        let mut min = agents.position[order[0] as usize];
        let mut max = min;
        for &i in &order {
            let p = agents.position[i as usize];
            min = min.min(p);
            max = max.max(p);
        }

        let mut tree = Self {
            nodes: Vec::with_capacity(order.len() / leaf_size.max(1) * 2 + 1),
            order: Vec::new(),
            min,
            max,
            leaf_size: leaf_size.max(1),
            max_depth,
        };
        // Root is node 0.
        tree.nodes.push(Node {
            kind: NodeKind::Leaf { start: 0, end: 0 },
            max_speed: 0.0,
            max_radius: 0.0,
            area: 0.0,
        });
        tree.build_node(0, &mut order, 0, min, max, 0, agents);
        tree.order = order;
        tree
    }

    /// `true` if the tree holds no agents.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    // ── Build ─────────────────────────────────────────────────────────────

    /// Fill in `nodes[node]` for the agents in `order`, whose offset within
    /// the global order array is `base`.  Returns the node's aggregates.
    fn build_node(
        &mut self,
        node: usize,
        order: &mut [u32],
        base: usize,
        min: Vec2,
        max: Vec2,
        depth: u32,
        agents: TreeAgents<'_>,
    ) -> (f32, f32, f32) {
        if order.len() <= self.leaf_size || depth >= self.max_depth {
            let (max_speed, max_radius, area) = leaf_aggregates(order, agents);
            self.nodes[node] = Node {
                kind: NodeKind::Leaf {
                    start: base as u32,
                    end: (base + order.len()) as u32,
                },
                max_speed,
                max_radius,
                area,
            };
            return (max_speed, max_radius, area);
        }

        let center = (min + max) * 0.5;

        // Partition agents into the four quadrants: first split by x, then
        // split each half by y.  `order` ends up grouped as
        // [-x-y | -x+y | +x-y | +x+y] — the same recursive split the query
        // descends with.
        let split_x = partition(order, |p| agents.position[p as usize].x < center.x);
        let (left, right) = order.split_at_mut(split_x);
        let split_ly = partition(left, |p| agents.position[p as usize].y < center.y);
        let split_ry = partition(right, |p| agents.position[p as usize].y < center.y);

        // Allocate four consecutive children, then recurse into each.
        let children = self.nodes.len() as u32;
        self.nodes[node].kind = NodeKind::Inner { children };
        for _ in 0..4 {
            self.nodes.push(Node {
                kind: NodeKind::Leaf { start: 0, end: 0 },
                max_speed: 0.0,
                max_radius: 0.0,
                area: 0.0,
            });
        }

        let quads: [(usize, usize); 4] = [
            (0, split_ly),                          // -x -y
            (split_ly, split_x),                    // -x +y
            (split_x, split_x + split_ry),          // +x -y
            (split_x + split_ry, order.len()),      // +x +y
        ];
        let bounds = child_bounds(min, max, center);

        let mut max_speed = 0.0_f32;
        let mut max_radius = 0.0_f32;
        let mut area = 0.0_f32;
        for (q, &(s, e)) in quads.iter().enumerate() {
            let child = (children as usize) + q;
            let (cmin, cmax) = bounds[q];
            let (ms, mr, a) =
                self.build_node(child, &mut order[s..e], base + s, cmin, cmax, depth + 1, agents);
            max_speed = max_speed.max(ms);
            max_radius = max_radius.max(mr);
            area += a;
        }

        self.nodes[node].max_speed = max_speed;
        self.nodes[node].max_radius = max_radius;
        self.nodes[node].area = area;
        (max_speed, max_radius, area)
    }

    // ── k-nearest query ───────────────────────────────────────────────────

    /// Collect the closest live agents around `query.position` into `out`,
    /// subject to the layer-mask and elevation filters.  Results are sorted
    /// ascending by plane-space center distance; at most `out.capacity()`
    /// survive.
    pub fn query_k_nearest(
        &self,
        agents: TreeAgents<'_>,
        query: &NeighbourQuery,
        out: &mut NeighbourBuffer,
    ) {
        out.clear();
        if self.nodes.is_empty() {
            return;
        }
        self.query_node(0, self.min, self.max, agents, query, out);
    }

    fn query_node(
        &self,
        node: usize,
        min: Vec2,
        max: Vec2,
        agents: TreeAgents<'_>,
        query: &NeighbourQuery,
        out: &mut NeighbourBuffer,
    ) {
        let n = self.nodes[node];

        // Prune subtrees that cannot matter within the time horizon even if
        // their fastest agent drove straight at the query point.
        let reach = out.search_radius()
            + n.max_radius
            + query.time_horizon * (n.max_speed + query.speed);
        if rect_distance_sq(query.position, min, max) > reach * reach {
            return;
        }

        match n.kind {
            NodeKind::Leaf { start, end } => {
                for &slot in &self.order[start as usize..end as usize] {
                    let i = slot as usize;
                    if i == query.exclude {
                        continue;
                    }
                    if query.layer_mask & agents.layer[i] == 0 {
                        continue;
                    }
                    // Agents on disjoint vertical bands never interact.
                    let other_lo = agents.elevation[i];
                    let other_hi = other_lo + agents.height[i];
                    if other_lo > query.elevation_max || other_hi < query.elevation_min {
                        continue;
                    }
                    let d_sq = (agents.position[i] - query.position).length_squared();
                    out.insert(slot, d_sq);
                }
            }
            NodeKind::Inner { children } => {
                let center = (min + max) * 0.5;
                let bounds = child_bounds(min, max, center);
                // Descend into the quadrant containing the query point first
                // so the search radius tightens as early as possible.
                let home = quadrant(query.position, center);
                let (hmin, hmax) = bounds[home];
                self.query_node(children as usize + home, hmin, hmax, agents, query, out);
                for q in 0..4 {
                    if q == home {
                        continue;
                    }
                    let (cmin, cmax) = bounds[q];
                    self.query_node(children as usize + q, cmin, cmax, agents, query, out);
                }
            }
        }
    }

    // ── Area query ────────────────────────────────────────────────────────

    /// Approximate total agent cross-sectional area (Σ π r²) within the
    /// circle at `center` of `radius`.
    ///
    /// Nodes entirely covered by the circle contribute their cached area
    /// aggregate without visiting leaves; partially covered nodes descend.
    pub fn query_area(&self, agents: TreeAgents<'_>, center: Vec2, radius: f32) -> f32 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.area_node(0, self.min, self.max, agents, center, radius)
    }

    fn area_node(
        &self,
        node: usize,
        min: Vec2,
        max: Vec2,
        agents: TreeAgents<'_>,
        center: Vec2,
        radius: f32,
    ) -> f32 {
        let n = self.nodes[node];
        if rect_distance_sq(center, min, max) > radius * radius {
            return 0.0;
        }
        if rect_inside_circle(min, max, center, radius) {
            return n.area;
        }
        match n.kind {
            NodeKind::Leaf { start, end } => {
                let mut area = 0.0;
                for &slot in &self.order[start as usize..end as usize] {
                    let i = slot as usize;
                    if (agents.position[i] - center).length_squared() <= radius * radius {
                        let r = agents.radius[i];
                        area += std::f32::consts::PI * r * r;
                    }
                }
                area
            }
            NodeKind::Inner { children } => {
                let c = (min + max) * 0.5;
                let bounds = child_bounds(min, max, c);
                let mut area = 0.0;
                for q in 0..4 {
                    let (cmin, cmax) = bounds[q];
                    area += self.area_node(children as usize + q, cmin, cmax, agents, center, radius);
                }
                area
            }
        }
    }
}

// ── Query types ───────────────────────────────────────────────────────────────

/// Parameters of one k-nearest query.
pub struct NeighbourQuery {
    /// Query point in plane space.
    pub position: Vec2,
    /// The querying agent's own speed (widens the pruning reach).
    pub speed: f32,
    /// The querying agent's agent-agent time horizon.
    pub time_horizon: f32,
    /// Layers the querying agent avoids.
    pub layer_mask: u32,
    /// Querying agent's vertical band (base elevation .. base + height).
    pub elevation_min: f32,
    pub elevation_max: f32,
    /// Slot index of the querying agent itself (excluded from results);
    /// `usize::MAX` for a detached query.
    pub exclude: usize,
}

/// Fixed-capacity sorted result buffer.
///
/// Insertion sort is fine: the capacity is an agent's neighbor cap (tens at
/// most).  When full, the worst kept distance becomes the active search
/// radius, shrinking the remaining traversal.
pub struct NeighbourBuffer {
    capacity: usize,
    initial_radius: f32,
    /// Slot ids, ascending by `dist_sq`.
    pub ids: Vec<u32>,
    pub dist_sq: Vec<f32>,
}

impl NeighbourBuffer {
    /// `initial_radius` bounds the search before the buffer fills (usually
    /// `f32::INFINITY`; pass a finite value to cap the interaction range).
    pub fn new(capacity: usize, initial_radius: f32) -> Self {
        Self {
            capacity,
            initial_radius,
            ids: Vec::with_capacity(capacity),
            dist_sq: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.dist_sq.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current search radius: the worst kept distance once full, otherwise
    /// the initial radius.
    #[inline]
    pub fn search_radius(&self) -> f32 {
        if self.ids.len() == self.capacity {
            self.dist_sq.last().map_or(self.initial_radius, |d| d.sqrt())
        } else {
            self.initial_radius
        }
    }

    /// Insert `(id, dist_sq)` keeping ascending order; drops the worst
    /// entry when over capacity.  Equal distances keep insertion order.
    pub fn insert(&mut self, id: u32, dist_sq: f32) {
        if self.capacity == 0 {
            return;
        }
        let r = self.search_radius();
        if dist_sq > r * r {
            return;
        }
        // Stable position: after all entries strictly closer or equal.
        let pos = self.dist_sq.partition_point(|&d| d <= dist_sq);
        if pos == self.capacity {
            return;
        }
        self.ids.insert(pos, id);
        self.dist_sq.insert(pos, dist_sq);
        if self.ids.len() > self.capacity {
            self.ids.pop();
            self.dist_sq.pop();
        }
    }
}

// ── Geometry helpers ──────────────────────────────────────────────────────────

/// Squared distance from `p` to the axis-aligned rectangle `[min, max]`.
#[inline]
fn rect_distance_sq(p: Vec2, min: Vec2, max: Vec2) -> f32 {
    let dx = (min.x - p.x).max(0.0).max(p.x - max.x);
    let dy = (min.y - p.y).max(0.0).max(p.y - max.y);
    dx * dx + dy * dy
}

/// `true` if the whole rectangle lies inside the circle.
#[inline]
fn rect_inside_circle(min: Vec2, max: Vec2, center: Vec2, radius: f32) -> bool {
    // The farthest rectangle corner decides.
    let fx = (center.x - min.x).abs().max((center.x - max.x).abs());
    let fy = (center.y - min.y).abs().max((center.y - max.y).abs());
    fx * fx + fy * fy <= radius * radius
}

/// Quadrant index of `p` relative to `center`, matching the build partition:
/// 0 = (-x,-y), 1 = (-x,+y), 2 = (+x,-y), 3 = (+x,+y).
#[inline]
fn quadrant(p: Vec2, center: Vec2) -> usize {
    let x = usize::from(p.x >= center.x);
    let y = usize::from(p.y >= center.y);
    x * 2 + y
}

/// Bounds of the four children, indexed like [`quadrant`].
#[inline]
fn child_bounds(min: Vec2, max: Vec2, center: Vec2) -> [(Vec2, Vec2); 4] {
    [
        (min, center),
        (Vec2::new(min.x, center.y), Vec2::new(center.x, max.y)),
        (Vec2::new(center.x, min.y), Vec2::new(max.x, center.y)),
        (center, max),
    ]
}

/// In-place stable-enough partition: moves elements satisfying `pred` to the
/// front, returns the split index.  Order within each side is not preserved,
/// which is fine — leaves sort nothing.
fn partition<F: Fn(u32) -> bool>(slice: &mut [u32], pred: F) -> usize {
    let mut split = 0;
    for i in 0..slice.len() {
        if pred(slice[i]) {
            slice.swap(split, i);
            split += 1;
        }
    }
    split
}

fn leaf_aggregates(members: &[u32], agents: TreeAgents<'_>) -> (f32, f32, f32) {
    let mut max_speed = 0.0_f32;
    let mut max_radius = 0.0_f32;
    let mut area = 0.0_f32;
    for &slot in members {
        let i = slot as usize;
        max_speed = max_speed.max(agents.speed[i]);
        max_radius = max_radius.max(agents.radius[i]);
        area += std::f32::consts::PI * agents.radius[i] * agents.radius[i];
    }
    (max_speed, max_radius, area)
}
