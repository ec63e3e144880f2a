//! Static-obstacle cache.
//!
//! # Input
//!
//! The navmesh (or any border extractor) hands over an unordered bag of
//! directed edges with *stable per-vertex identifiers*.  Winding is
//! guaranteed consistent by the producer: solid space lies to the left of
//! every edge, walkable space to the right.  Adjacency is implicit — the edge after `(a → b)` is the one
//! whose `from_id == b_id` — so tracing is two hash lookups per edge with no
//! explicit adjacency structure.
//!
//! # Output
//!
//! [`trace_contours`] stitches the bag into [`Obstacle`] polylines: closed
//! loops where the walk returns to its start, open chains where a start
//! vertex has no incoming edge.  Collinear interior vertices are merged.
//! Tracing is deterministic under input permutation: chains start at
//! in-degree-zero vertices, loops are canonicalized to start at their
//! smallest vertex id.
//!
//! An [`ObstacleSet`] additionally indexes every traced edge in an R-tree so
//! the solver can fetch candidate edges near an agent in O(log n).

use glam::Vec3;
use rstar::{AABB, RTree, RTreeObject};
use rustc_hash::{FxHashMap, FxHashSet};

use crowd_core::ObstacleSetId;

/// Edges shorter than this are dropped as degenerate before tracing.
const MIN_EDGE_LENGTH: f32 = 1e-5;

/// Collinearity threshold for vertex simplification (squared sine of the
/// corner angle).
const COLLINEAR_EPSILON: f32 = 1e-6;

// ── Input edge ────────────────────────────────────────────────────────────────

/// One directed border edge as supplied by the navmesh boundary extractor.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BorderEdge {
    pub from: Vec3,
    pub to: Vec3,
    /// Stable id of `from`, shared by every edge meeting at that vertex.
    pub from_id: u64,
    /// Stable id of `to`.
    pub to_id: u64,
}

// ── Traced obstacle ───────────────────────────────────────────────────────────

/// A traced, simplified polyline: closed loop or open chain.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    /// Ordered vertices.  For closed obstacles the last vertex connects
    /// back to the first; the connecting edge is implicit.
    pub vertices: Vec<Vec3>,
    pub closed: bool,
    pub min: Vec3,
    pub max: Vec3,
}

impl Obstacle {
    fn from_vertices(vertices: Vec<Vec3>, closed: bool) -> Self {
        let mut min = vertices[0];
        let mut max = vertices[0];
        for &v in &vertices[1..] {
            min = min.min(v);
            max = max.max(v);
        }
        Self { vertices, closed, min, max }
    }

    /// Number of solid edges (loops wrap around, chains do not).
    pub fn edge_count(&self) -> usize {
        if self.closed {
            self.vertices.len()
        } else {
            self.vertices.len().saturating_sub(1)
        }
    }
}

// ── Contour tracing ───────────────────────────────────────────────────────────

/// Stitch an unordered bag of consistently-wound directed edges into
/// obstacle polylines.
///
/// Degenerate (near-zero-length) edges are dropped.  Vertices where three or
/// more edges meet follow the first outgoing edge by insertion into the
/// adjacency map after sorting, which is deterministic for a fixed edge set.
pub fn trace_contours(edges: &[BorderEdge]) -> Vec<Obstacle> {
    // Sort a copy by from_id so map insertion order (and therefore which
    // outgoing edge wins at a junction) does not depend on input order.
    let mut sorted: Vec<BorderEdge> = edges
        .iter()
        .copied()
        .filter(|e| (e.to - e.from).length_squared() > MIN_EDGE_LENGTH * MIN_EDGE_LENGTH)
        .collect();
    sorted.sort_unstable_by_key(|e| (e.from_id, e.to_id));
    sorted.dedup_by_key(|e| (e.from_id, e.to_id));

    let mut out_edge: FxHashMap<u64, usize> = FxHashMap::default();
    let mut has_incoming: FxHashSet<u64> = FxHashSet::default();
    for (i, e) in sorted.iter().enumerate() {
        out_edge.entry(e.from_id).or_insert(i);
        has_incoming.insert(e.to_id);
    }

    let mut visited = vec![false; sorted.len()];
    let mut obstacles = Vec::new();

    // Open chains first: walk forward from every in-degree-zero vertex.
    for start in 0..sorted.len() {
        if visited[start] || has_incoming.contains(&sorted[start].from_id) {
            continue;
        }
        let vertices = walk(&sorted, &out_edge, &mut visited, start);
        obstacles.push(Obstacle::from_vertices(simplify(vertices, false), false));
    }

    // Remaining unvisited edges belong to loops.  `sorted` order makes the
    // smallest from_id in each loop the entry point, so the starting vertex
    // is canonical regardless of input order.
    for start in 0..sorted.len() {
        if visited[start] {
            continue;
        }
        let mut vertices = walk(&sorted, &out_edge, &mut visited, start);
        // The walk re-reaches the start vertex; drop the duplicate.
        if vertices.len() > 1 && vertices[0] == *vertices.last().unwrap() {
            vertices.pop();
        }
        if vertices.len() >= 3 {
            obstacles.push(Obstacle::from_vertices(simplify(vertices, true), true));
        }
    }

    obstacles
}

/// Follow `out_edge` links from `sorted[start]` until the trail ends or
/// closes.  Marks every consumed edge visited.
fn walk(
    sorted: &[BorderEdge],
    out_edge: &FxHashMap<u64, usize>,
    visited: &mut [bool],
    start: usize,
) -> Vec<Vec3> {
    let mut vertices = vec![sorted[start].from];
    let mut current = start;
    loop {
        visited[current] = true;
        vertices.push(sorted[current].to);
        match out_edge.get(&sorted[current].to_id) {
            Some(&next) if !visited[next] => current = next,
            _ => break,
        }
    }
    vertices
}

/// Drop interior vertices whose adjacent edges are collinear and co-directed.
fn simplify(vertices: Vec<Vec3>, closed: bool) -> Vec<Vec3> {
    let n = vertices.len();
    if n < 3 {
        return vertices;
    }
    let keep = |prev: Vec3, v: Vec3, next: Vec3| -> bool {
        let a = v - prev;
        let b = next - v;
        let cross = a.cross(b).length_squared();
        let scale = a.length_squared() * b.length_squared();
        // Reversals (dot < 0) are corners even when collinear.
        cross > COLLINEAR_EPSILON * scale || a.dot(b) < 0.0
    };
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let is_interior = closed || (i > 0 && i < n - 1);
        if !is_interior {
            out.push(vertices[i]);
            continue;
        }
        let prev = vertices[(i + n - 1) % n];
        let next = vertices[(i + 1) % n];
        if keep(prev, vertices[i], next) {
            out.push(vertices[i]);
        }
    }
    // Over-aggressive simplification of a tiny loop could leave < 3 points.
    if closed && out.len() < 3 { vertices } else { out }
}

// ── R-tree edge index ─────────────────────────────────────────────────────────

/// One solid edge of a traced obstacle, with its neighbor vertices attached
/// so the solver can resolve convexity in the agent's own movement plane.
#[derive(Clone, Debug)]
pub struct ObstacleEdge {
    /// First endpoint (solid space to the left, per winding).
    pub a: Vec3,
    /// Second endpoint.
    pub b: Vec3,
    /// Vertex before `a` along the contour, if any.
    pub prev: Option<Vec3>,
    /// Vertex after `b` along the contour, if any.
    pub next: Option<Vec3>,
}

impl RTreeObject for ObstacleEdge {
    type Envelope = AABB<[f32; 3]>;
    fn envelope(&self) -> Self::Envelope {
        let min = self.a.min(self.b);
        let max = self.a.max(self.b);
        AABB::from_corners(min.into(), max.into())
    }
}

/// Traced obstacles plus an R-tree over their individual edges.
pub struct ObstacleSet {
    pub id: ObstacleSetId,
    pub obstacles: Vec<Obstacle>,
    rtree: RTree<ObstacleEdge>,
}

impl ObstacleSet {
    pub fn new(id: ObstacleSetId, obstacles: Vec<Obstacle>) -> Self {
        let mut entries = Vec::new();
        for obstacle in &obstacles {
            let verts = &obstacle.vertices;
            let n = verts.len();
            for e in 0..obstacle.edge_count() {
                let a = verts[e];
                let b = verts[(e + 1) % n];
                let prev = if obstacle.closed {
                    Some(verts[(e + n - 1) % n])
                } else {
                    (e > 0).then(|| verts[e - 1])
                };
                let next = if obstacle.closed {
                    Some(verts[(e + 2) % n])
                } else {
                    (e + 2 < n).then(|| verts[e + 2])
                };
                entries.push(ObstacleEdge { a, b, prev, next });
            }
        }
        Self {
            id,
            obstacles,
            rtree: RTree::bulk_load(entries),
        }
    }

    /// All edges whose bounding box intersects the cube of `radius` around
    /// `position`.
    pub fn edges_near(
        &self,
        position: Vec3,
        radius: f32,
    ) -> impl Iterator<Item = &ObstacleEdge> {
        let envelope = AABB::from_corners(
            (position - Vec3::splat(radius)).into(),
            (position + Vec3::splat(radius)).into(),
        );
        self.rtree.locate_in_envelope_intersecting(&envelope)
    }

    pub fn edge_count(&self) -> usize {
        self.rtree.size()
    }
}

// ── ObstacleStore ─────────────────────────────────────────────────────────────

/// All obstacle sets currently active in the simulation.
#[derive(Default)]
pub struct ObstacleStore {
    sets: Vec<ObstacleSet>,
    next_id: u32,
}

impl ObstacleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trace `edges` into a fresh obstacle set and register it.
    pub fn rebuild(&mut self, edges: &[BorderEdge]) -> ObstacleSetId {
        let id = ObstacleSetId(self.next_id);
        self.next_id += 1;
        self.sets.push(ObstacleSet::new(id, trace_contours(edges)));
        id
    }

    /// Drop a set.  Returns `false` if the id was unknown (already removed).
    pub fn remove(&mut self, id: ObstacleSetId) -> bool {
        let before = self.sets.len();
        self.sets.retain(|s| s.id != id);
        self.sets.len() != before
    }

    pub fn get(&self, id: ObstacleSetId) -> Option<&ObstacleSet> {
        self.sets.iter().find(|s| s.id == id)
    }

    pub fn sets(&self) -> &[ObstacleSet] {
        &self.sets
    }

    /// Edges near `position` across every registered set.
    pub fn edges_near(
        &self,
        position: Vec3,
        radius: f32,
    ) -> impl Iterator<Item = &ObstacleEdge> {
        self.sets
            .iter()
            .flat_map(move |s| s.edges_near(position, radius))
    }
}
