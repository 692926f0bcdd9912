// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! k-d tree backend built on kiddo's immutable tree.
//!
//! kiddo returns *a* nearest neighbour but makes no promise about which one
//! when several points are equidistant. Ties are resolved here with a radius
//! query around the best distance, keeping the lowest insertion index.

use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::{NearestNeighbour, SquaredEuclidean};

use crate::{check_points, check_query, Neighbor, Point3, SpatialError, SpatialIndex, SpatialResult};

type Tree = ImmutableKdTree<f64, u64, 3, 32>;

/// Balanced, immutable k-d tree over a point set
pub struct KdIndex {
    tree: Option<Tree>,
    len: usize,
}

impl std::fmt::Debug for KdIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KdIndex").field("len", &self.len).finish()
    }
}

impl KdIndex {
    /// Build a tree over `points`. Item ids are insertion indices.
    pub fn build(points: &[Point3]) -> SpatialResult<Self> {
        check_points(points)?;
        let tree = if points.is_empty() {
            None
        } else {
            Some(Tree::new_from_slice(points))
        };
        Ok(Self {
            tree,
            len: points.len(),
        })
    }

    fn tree(&self) -> SpatialResult<&Tree> {
        self.tree.as_ref().ok_or(SpatialError::EmptyIndex)
    }

    /// All points whose squared distance equals `best_d2`, lowest index first.
    fn ties_at(tree: &Tree, query: &Point3, best_d2: f64) -> Vec<NearestNeighbour<f64, u64>> {
        // Pad the radius so an inclusive/exclusive boundary in the tree can't drop the tie itself
        let radius = best_d2 + best_d2.abs() * 1e-12 + f64::MIN_POSITIVE;
        let mut ties: Vec<_> = tree
            .within_unsorted::<SquaredEuclidean>(query, radius)
            .into_iter()
            .filter(|n| n.distance <= best_d2)
            .collect();
        ties.sort_by_key(|n| n.item);
        ties
    }
}

fn to_neighbor(n: &NearestNeighbour<f64, u64>) -> Neighbor {
    Neighbor {
        index: n.item as usize,
        distance: n.distance.sqrt(),
    }
}

impl SpatialIndex for KdIndex {
    fn len(&self) -> usize {
        self.len
    }

    fn nearest(&self, query: &Point3) -> SpatialResult<Neighbor> {
        check_query(query)?;
        let tree = self.tree()?;

        let closest = tree.nearest_n::<SquaredEuclidean>(query, 2);
        let best = match closest.as_slice() {
            [] => return Err(SpatialError::EmptyIndex),
            [only] => return Ok(to_neighbor(only)),
            [first, second, ..] if second.distance > first.distance => {
                return Ok(to_neighbor(first))
            }
            [first, ..] => to_neighbor(first),
        };

        Ok(Self::ties_at(tree, query, closest[0].distance)
            .first()
            .map(to_neighbor)
            .unwrap_or(best))
    }

    fn k_nearest(&self, query: &Point3, k: usize) -> SpatialResult<Vec<Neighbor>> {
        check_query(query)?;
        let tree = self.tree()?;
        let k = k.min(self.len);
        if k == 0 {
            return Ok(Vec::new());
        }

        let found = tree.nearest_n::<SquaredEuclidean>(query, k);
        let Some(kth) = found.last() else {
            return Ok(Vec::new());
        };

        // Re-collect everything up to the k-th distance so boundary ties are ordered by index
        let radius = kth.distance + kth.distance.abs() * 1e-12 + f64::MIN_POSITIVE;
        let mut candidates: Vec<_> = tree
            .within_unsorted::<SquaredEuclidean>(query, radius)
            .into_iter()
            .filter(|n| n.distance <= kth.distance)
            .collect();
        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.item.cmp(&b.item)));
        candidates.truncate(k);
        Ok(candidates.iter().map(to_neighbor).collect())
    }
}
