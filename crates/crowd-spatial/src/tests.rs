//! Unit tests for crowd-spatial.
//!
//! The quadtree tests validate against a brute-force O(n) scan on randomized
//! agent sets with fixed seeds, so failures are reproducible.

#[cfg(test)]
mod helpers {
    use glam::Vec2;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    /// A generated agent population, in SoA columns matching `TreeAgents`.
    pub struct Population {
        pub position: Vec<Vec2>,
        pub elevation: Vec<f32>,
        pub height: Vec<f32>,
        pub radius: Vec<f32>,
        pub speed: Vec<f32>,
        pub layer: Vec<u32>,
        pub live: Vec<bool>,
    }

    impl Population {
        pub fn random(count: usize, seed: u64) -> Self {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut p = Self::empty();
            for i in 0..count {
                p.position
                    .push(Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)));
                p.elevation.push(rng.gen_range(-1.0..1.0));
                p.height.push(2.0);
                p.radius.push(rng.gen_range(0.3..0.8));
                p.speed.push(rng.gen_range(0.0..3.0));
                p.layer.push(1 << (i % 3));
                p.live.push(true);
            }
            p
        }

        pub fn empty() -> Self {
            Self {
                position: vec![],
                elevation: vec![],
                height: vec![],
                radius: vec![],
                speed: vec![],
                layer: vec![],
                live: vec![],
            }
        }

        pub fn view(&self) -> crate::TreeAgents<'_> {
            crate::TreeAgents {
                position: &self.position,
                elevation: &self.elevation,
                height: &self.height,
                radius: &self.radius,
                speed: &self.speed,
                layer: &self.layer,
                live: &self.live,
            }
        }
    }
}

// ── Quadtree: k-nearest ───────────────────────────────────────────────────────

#[cfg(test)]
mod knearest {
    use glam::Vec2;

    use super::helpers::Population;
    use crate::{NeighbourBuffer, NeighbourQuery, QuadTree};

    fn query_for(pop: &Population, from: usize, k: usize) -> Vec<u32> {
        let tree = QuadTree::build(pop.view(), 4, 10);
        let mut buf = NeighbourBuffer::new(k, f32::INFINITY);
        let q = NeighbourQuery {
            position: pop.position[from],
            speed: pop.speed[from],
            time_horizon: 2.0,
            layer_mask: u32::MAX,
            elevation_min: pop.elevation[from],
            elevation_max: pop.elevation[from] + pop.height[from],
            exclude: from,
        };
        tree.query_k_nearest(pop.view(), &q, &mut buf);
        buf.ids.clone()
    }

    /// Brute force restricted to the same filters.
    fn brute_force(pop: &Population, from: usize, k: usize) -> Vec<u32> {
        let e_min = pop.elevation[from];
        let e_max = e_min + pop.height[from];
        let mut candidates: Vec<(f32, u32)> = (0..pop.position.len())
            .filter(|&i| i != from && pop.live[i])
            .filter(|&i| {
                let lo = pop.elevation[i];
                lo <= e_max && lo + pop.height[i] >= e_min
            })
            .map(|i| {
                (
                    (pop.position[i] - pop.position[from]).length_squared(),
                    i as u32,
                )
            })
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        candidates.truncate(k);
        candidates.into_iter().map(|(_, i)| i).collect()
    }

    #[test]
    fn matches_brute_force_on_random_sets() {
        for seed in 0..8 {
            let pop = Population::random(200, seed);
            for from in [0, 17, 99, 150] {
                let fast = query_for(&pop, from, 10);
                let slow = brute_force(&pop, from, 10);
                // Compare as sets: equidistant candidates may tie-break
                // differently between the two scans.
                let mut fast_sorted = fast.clone();
                fast_sorted.sort_unstable();
                let mut slow_sorted = slow.clone();
                slow_sorted.sort_unstable();
                assert_eq!(
                    fast_sorted, slow_sorted,
                    "seed={seed} from={from}: tree and brute force disagree"
                );
            }
        }
    }

    #[test]
    fn respects_layer_mask() {
        let pop = Population::random(60, 3);
        let tree = QuadTree::build(pop.view(), 4, 10);
        let mut buf = NeighbourBuffer::new(60, f32::INFINITY);
        let q = NeighbourQuery {
            position: Vec2::ZERO,
            speed: 0.0,
            time_horizon: 2.0,
            layer_mask: 0b001,
            elevation_min: -100.0,
            elevation_max: 100.0,
            exclude: usize::MAX,
        };
        tree.query_k_nearest(pop.view(), &q, &mut buf);
        assert!(!buf.is_empty());
        for &id in &buf.ids {
            assert_eq!(pop.layer[id as usize] & 0b001, 0b001);
        }
    }

    #[test]
    fn elevation_bands_do_not_interact() {
        let mut pop = Population::empty();
        // Two agents at the same plane position, 10 units apart vertically.
        for elev in [0.0, 10.0] {
            pop.position.push(Vec2::ZERO);
            pop.elevation.push(elev);
            pop.height.push(2.0);
            pop.radius.push(0.5);
            pop.speed.push(1.0);
            pop.layer.push(1);
            pop.live.push(true);
        }
        let tree = QuadTree::build(pop.view(), 4, 10);
        let mut buf = NeighbourBuffer::new(4, f32::INFINITY);
        let q = NeighbourQuery {
            position: Vec2::ZERO,
            speed: 1.0,
            time_horizon: 2.0,
            layer_mask: u32::MAX,
            elevation_min: 0.0,
            elevation_max: 2.0,
            exclude: 0,
        };
        tree.query_k_nearest(pop.view(), &q, &mut buf);
        assert!(buf.is_empty(), "agent 10 units above must be filtered out");
    }

    #[test]
    fn results_sorted_by_distance() {
        let pop = Population::random(120, 5);
        let ids = query_for(&pop, 0, 15);
        let dists: Vec<f32> = ids
            .iter()
            .map(|&i| (pop.position[i as usize] - pop.position[0]).length_squared())
            .collect();
        for w in dists.windows(2) {
            assert!(w[0] <= w[1], "results must be ascending by distance");
        }
    }

    #[test]
    fn empty_tree_returns_nothing() {
        let pop = Population::empty();
        let tree = QuadTree::build(pop.view(), 4, 10);
        assert!(tree.is_empty());
        let mut buf = NeighbourBuffer::new(4, f32::INFINITY);
        let q = NeighbourQuery {
            position: Vec2::ZERO,
            speed: 0.0,
            time_horizon: 2.0,
            layer_mask: u32::MAX,
            elevation_min: 0.0,
            elevation_max: 1.0,
            exclude: usize::MAX,
        };
        tree.query_k_nearest(pop.view(), &q, &mut buf);
        assert!(buf.is_empty());
        assert_eq!(tree.query_area(pop.view(), Vec2::ZERO, 100.0), 0.0);
    }

    #[test]
    fn dead_slots_never_appear() {
        let mut pop = Population::random(50, 7);
        for i in (0..50).step_by(2) {
            pop.live[i] = false;
        }
        let ids = query_for(&pop, 1, 50);
        for &id in &ids {
            assert!(pop.live[id as usize], "dead slot {id} leaked into results");
        }
    }

    #[test]
    fn identical_positions_bottom_out_at_max_depth() {
        let mut pop = Population::empty();
        for _ in 0..100 {
            pop.position.push(Vec2::new(1.0, 1.0));
            pop.elevation.push(0.0);
            pop.height.push(2.0);
            pop.radius.push(0.5);
            pop.speed.push(1.0);
            pop.layer.push(1);
            pop.live.push(true);
        }
        // Must terminate despite the unsplittable point cloud.
        let tree = QuadTree::build(pop.view(), 4, 6);
        assert_eq!(tree.len(), 100);
        let ids = query_for(&pop, 0, 10);
        assert_eq!(ids.len(), 10);
    }
}

// ── Quadtree: area query ──────────────────────────────────────────────────────

#[cfg(test)]
mod area {
    use glam::Vec2;

    use super::helpers::Population;
    use crate::QuadTree;

    #[test]
    fn matches_brute_force_sum() {
        let pop = Population::random(300, 11);
        let tree = QuadTree::build(pop.view(), 8, 10);

        for (center, radius) in [
            (Vec2::ZERO, 20.0),
            (Vec2::new(25.0, -25.0), 40.0),
            (Vec2::new(-10.0, 5.0), 5.0),
        ] {
            let expected: f32 = (0..300)
                .filter(|&i| (pop.position[i] - center).length_squared() <= radius * radius)
                .map(|i| std::f32::consts::PI * pop.radius[i] * pop.radius[i])
                .sum();
            let got = tree.query_area(pop.view(), center, radius);
            assert!(
                (got - expected).abs() < 1e-3 * expected.max(1.0),
                "center={center:?} radius={radius}: got {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn covering_circle_counts_everything() {
        let pop = Population::random(100, 13);
        let tree = QuadTree::build(pop.view(), 8, 10);
        let total: f32 = pop
            .radius
            .iter()
            .map(|r| std::f32::consts::PI * r * r)
            .sum();
        let got = tree.query_area(pop.view(), Vec2::ZERO, 1000.0);
        assert!((got - total).abs() < 1e-3 * total);
    }
}

// ── Neighbour buffer ──────────────────────────────────────────────────────────

#[cfg(test)]
mod buffer {
    use crate::NeighbourBuffer;

    #[test]
    fn keeps_k_closest() {
        let mut buf = NeighbourBuffer::new(3, f32::INFINITY);
        for (id, d) in [(0, 9.0), (1, 1.0), (2, 4.0), (3, 16.0), (4, 2.0)] {
            buf.insert(id, d);
        }
        assert_eq!(buf.ids, vec![1, 4, 2]);
        assert_eq!(buf.dist_sq, vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn radius_shrinks_when_full() {
        let mut buf = NeighbourBuffer::new(2, f32::INFINITY);
        assert_eq!(buf.search_radius(), f32::INFINITY);
        buf.insert(0, 4.0);
        buf.insert(1, 9.0);
        assert_eq!(buf.search_radius(), 3.0);
        // Anything beyond the worst kept distance is rejected outright.
        buf.insert(2, 25.0);
        assert_eq!(buf.ids, vec![0, 1]);
    }

    #[test]
    fn equal_distances_keep_insertion_order() {
        let mut buf = NeighbourBuffer::new(4, f32::INFINITY);
        buf.insert(7, 1.0);
        buf.insert(3, 1.0);
        buf.insert(9, 1.0);
        assert_eq!(buf.ids, vec![7, 3, 9]);
    }

    #[test]
    fn finite_initial_radius_caps_results() {
        let mut buf = NeighbourBuffer::new(8, 2.0);
        buf.insert(0, 1.0); // dist 1 < 2  → kept
        buf.insert(1, 9.0); // dist 3 > 2  → rejected
        assert_eq!(buf.ids, vec![0]);
    }
}

// ── Obstacle tracing ──────────────────────────────────────────────────────────

#[cfg(test)]
mod contours {
    use glam::Vec3;

    use crate::{BorderEdge, ObstacleStore, trace_contours};

    fn edge(from: (f32, f32), to: (f32, f32), from_id: u64, to_id: u64) -> BorderEdge {
        BorderEdge {
            from: Vec3::new(from.0, 0.0, from.1),
            to: Vec3::new(to.0, 0.0, to.1),
            from_id,
            to_id,
        }
    }

    /// A unit square loop: 0→1→2→3→0.
    fn square() -> Vec<BorderEdge> {
        vec![
            edge((0.0, 0.0), (1.0, 0.0), 0, 1),
            edge((1.0, 0.0), (1.0, 1.0), 1, 2),
            edge((1.0, 1.0), (0.0, 1.0), 2, 3),
            edge((0.0, 1.0), (0.0, 0.0), 3, 0),
        ]
    }

    #[test]
    fn traces_closed_loop() {
        let obstacles = trace_contours(&square());
        assert_eq!(obstacles.len(), 1);
        let o = &obstacles[0];
        assert!(o.closed);
        assert_eq!(o.vertices.len(), 4);
        assert_eq!(o.edge_count(), 4);
    }

    #[test]
    fn traces_open_chain() {
        // 10→11→12, no edge back to 10.
        let edges = vec![
            edge((0.0, 0.0), (1.0, 1.0), 10, 11),
            edge((1.0, 1.0), (2.0, 0.0), 11, 12),
        ];
        let obstacles = trace_contours(&edges);
        assert_eq!(obstacles.len(), 1);
        let o = &obstacles[0];
        assert!(!o.closed);
        assert_eq!(o.vertices.len(), 3);
        assert_eq!(o.edge_count(), 2);
    }

    #[test]
    fn tracing_is_order_independent() {
        let forward = trace_contours(&square());
        let mut shuffled = square();
        shuffled.rotate_left(2);
        shuffled.swap(0, 1);
        let reordered = trace_contours(&shuffled);
        assert_eq!(forward, reordered, "input permutation changed the trace");
    }

    #[test]
    fn collinear_vertices_merged() {
        // A straight wall split into three segments plus a corner.
        let edges = vec![
            edge((0.0, 0.0), (1.0, 0.0), 0, 1),
            edge((1.0, 0.0), (2.0, 0.0), 1, 2),
            edge((2.0, 0.0), (3.0, 0.0), 2, 3),
            edge((3.0, 0.0), (3.0, 1.0), 3, 4),
        ];
        let obstacles = trace_contours(&edges);
        assert_eq!(obstacles.len(), 1);
        // (0,0) → (3,0) → (3,1): interior collinear vertices removed.
        assert_eq!(obstacles[0].vertices.len(), 3);
    }

    #[test]
    fn degenerate_edges_dropped() {
        let mut edges = square();
        edges.push(edge((5.0, 5.0), (5.0, 5.0), 20, 21)); // zero length
        let obstacles = trace_contours(&edges);
        assert_eq!(obstacles.len(), 1, "degenerate edge must not form an obstacle");
    }

    #[test]
    fn two_disjoint_loops() {
        let mut edges = square();
        edges.extend([
            edge((10.0, 10.0), (11.0, 10.0), 100, 101),
            edge((11.0, 10.0), (11.0, 11.0), 101, 102),
            edge((11.0, 11.0), (10.0, 10.0), 102, 100),
        ]);
        let obstacles = trace_contours(&edges);
        assert_eq!(obstacles.len(), 2);
        assert!(obstacles.iter().all(|o| o.closed));
    }

    #[test]
    fn store_edge_query_finds_nearby_edges() {
        let mut store = ObstacleStore::new();
        let id = store.rebuild(&square());
        assert!(store.get(id).is_some());

        let near: Vec<_> = store.edges_near(Vec3::new(0.5, 0.0, -0.1), 0.5).collect();
        assert!(!near.is_empty(), "bottom edge of the square should be found");
        let far: Vec<_> = store.edges_near(Vec3::new(50.0, 0.0, 50.0), 1.0).collect();
        assert!(far.is_empty());

        assert!(store.remove(id));
        assert!(!store.remove(id), "second removal must report unknown id");
    }

    #[test]
    fn edge_neighbors_wrap_on_loops() {
        let mut store = ObstacleStore::new();
        store.rebuild(&square());
        for e in store.edges_near(Vec3::new(0.5, 0.0, 0.5), 2.0) {
            assert!(e.prev.is_some() && e.next.is_some(), "loop edges always have neighbors");
        }
    }
}
