//! `crowd-spatial` — spatial acceleration structures.
//!
//! Two independent structures live here:
//!
//! | Module       | Contents                                                 |
//! |--------------|----------------------------------------------------------|
//! | [`quadtree`] | Per-tick agent quadtree: k-nearest and area queries      |
//! | [`obstacle`] | Static-obstacle cache: contour tracing + R-tree lookup   |
//!
//! The quadtree is rebuilt from scratch every tick (never mutated
//! incrementally); the obstacle cache persists until the embedding rebuilds
//! it from fresh border geometry.

pub mod obstacle;
pub mod quadtree;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use obstacle::{BorderEdge, Obstacle, ObstacleEdge, ObstacleSet, ObstacleStore, trace_contours};
pub use quadtree::{NeighbourBuffer, NeighbourQuery, QuadTree, TreeAgents};
