// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Neuromorph Spatial

Nearest-neighbour queries over 3D point sets.

Every backend honours the same contract:
- `nearest` returns the closest point under Euclidean distance
- ties are broken by the lowest insertion index
- `k_nearest` returns up to `k` points sorted by `(distance, index)`

Two backends are provided:
- [`KdIndex`]: immutable k-d tree (kiddo), the default for real neurons
- [`BruteForceIndex`]: linear scan, useful for tiny clouds and as a reference
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod brute_force;
mod error;
mod kdtree;

pub use brute_force::BruteForceIndex;
pub use error::{SpatialError, SpatialResult};
pub use kdtree::KdIndex;

use serde::{Deserialize, Serialize};

/// A point in 3D space (x, y, z)
pub type Point3 = [f64; 3];

/// Result of a nearest-neighbour query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion index of the point in the indexed set
    pub index: usize,
    /// Euclidean distance to the query point
    pub distance: f64,
}

/// Nearest-neighbour collaborator used by scoring and dot-cloud construction.
pub trait SpatialIndex: Send + Sync {
    /// Number of indexed points
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closest indexed point to `query`; ties go to the lowest index.
    fn nearest(&self, query: &Point3) -> SpatialResult<Neighbor>;

    /// Up to `k` closest points, sorted by `(distance, index)`.
    fn k_nearest(&self, query: &Point3, k: usize) -> SpatialResult<Vec<Neighbor>>;
}

/// Which index implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    #[default]
    KdTree,
    BruteForce,
}

impl std::str::FromStr for IndexBackend {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kdtree" | "kd_tree" | "kd-tree" => Ok(IndexBackend::KdTree),
            "brute_force" | "brute-force" | "bruteforce" => Ok(IndexBackend::BruteForce),
            other => Err(SpatialError::UnknownBackend(other.to_string())),
        }
    }
}

/// Build an index over `points` with the requested backend
pub fn build_index(
    points: &[Point3],
    backend: IndexBackend,
) -> SpatialResult<Box<dyn SpatialIndex>> {
    tracing::trace!(
        target: "neuromorph-spatial",
        "Building {:?} index over {} points",
        backend,
        points.len()
    );
    match backend {
        IndexBackend::KdTree => Ok(Box::new(KdIndex::build(points)?)),
        IndexBackend::BruteForce => Ok(Box::new(BruteForceIndex::build(points)?)),
    }
}

/// Squared Euclidean distance between two points
#[inline]
pub fn squared_distance(a: &Point3, b: &Point3) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

pub(crate) fn check_points(points: &[Point3]) -> SpatialResult<()> {
    match points
        .iter()
        .position(|p| !p.iter().all(|c| c.is_finite()))
    {
        Some(index) => Err(SpatialError::NonFinitePoint { index }),
        None => Ok(()),
    }
}

pub(crate) fn check_query(query: &Point3) -> SpatialResult<()> {
    if query.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(SpatialError::NonFiniteQuery(*query))
    }
}
