// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Dot-cloud ("dotprops") representation of a neuron.

Each point carries a position and a unit tangent vector describing the local
direction of the neurite. Tangents come either from skeleton edges or from the
principal component of each point's k nearest neighbours, in which case a
per-point `alpha` (local linearity) is recorded as well.

A `Dotprops` is immutable after construction. Its spatial index is built on
first use and shared read-only afterwards.
*/

use std::sync::{Arc, OnceLock};

use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use neuromorph_spatial::{build_index, IndexBackend, KdIndex, Point3, SpatialIndex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geometry::{is_finite, midpoint, norm, normalize, sub, BoundingBox};
use crate::mesh::MeshNeuron;
use crate::skeleton::TreeNeuron;
use crate::{StructureError, StructureResult};

/// Default neighbourhood size for tangent estimation
pub const DEFAULT_K: usize = 20;

/// Allowed deviation of a tangent's norm from 1
pub const UNIT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DotpropsRecord {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    points: Vec<Point3>,
    vectors: Vec<Point3>,
    #[serde(default)]
    alpha: Option<Vec<f64>>,
    #[serde(default)]
    k: Option<usize>,
    #[serde(default)]
    backend: IndexBackend,
}

/// Point cloud with per-point tangent vectors
#[derive(Serialize, Deserialize)]
#[serde(try_from = "DotpropsRecord", into = "DotpropsRecord")]
pub struct Dotprops {
    id: u64,
    name: Option<String>,
    points: Vec<Point3>,
    vectors: Vec<Point3>,
    alpha: Option<Vec<f64>>,
    k: Option<usize>,
    backend: IndexBackend,
    index: OnceLock<Arc<dyn SpatialIndex>>,
}

impl Clone for Dotprops {
    fn clone(&self) -> Self {
        let index = OnceLock::new();
        if let Some(built) = self.index.get() {
            let _ = index.set(Arc::clone(built));
        }
        Self {
            id: self.id,
            name: self.name.clone(),
            points: self.points.clone(),
            vectors: self.vectors.clone(),
            alpha: self.alpha.clone(),
            k: self.k,
            backend: self.backend,
            index,
        }
    }
}

impl std::fmt::Debug for Dotprops {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dotprops")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("n_points", &self.points.len())
            .field("k", &self.k)
            .field("has_alpha", &self.alpha.is_some())
            .field("backend", &self.backend)
            .finish()
    }
}

impl TryFrom<DotpropsRecord> for Dotprops {
    type Error = StructureError;

    fn try_from(record: DotpropsRecord) -> Result<Self, Self::Error> {
        let mut dots = Dotprops::new(record.id, record.points, record.vectors, record.alpha)?;
        dots.name = record.name;
        dots.k = record.k;
        dots.backend = record.backend;
        Ok(dots)
    }
}

impl From<Dotprops> for DotpropsRecord {
    fn from(dots: Dotprops) -> Self {
        DotpropsRecord {
            id: dots.id,
            name: dots.name,
            points: dots.points,
            vectors: dots.vectors,
            alpha: dots.alpha,
            k: dots.k,
            backend: dots.backend,
        }
    }
}

impl Dotprops {
    /// Build a dot cloud from explicit points and unit tangents.
    ///
    /// # Errors
    /// - `LengthMismatch` if `vectors` (or `alpha`) differ in length from `points`
    /// - `NonFinite` for NaN/inf coordinates
    /// - `NotUnitVector` if a tangent's norm deviates from 1 by more than [`UNIT_TOLERANCE`]
    /// - `InvalidParameter` if an alpha value lies outside `[0, 1]`
    pub fn new(
        id: u64,
        points: Vec<Point3>,
        vectors: Vec<Point3>,
        alpha: Option<Vec<f64>>,
    ) -> StructureResult<Self> {
        if vectors.len() != points.len() {
            return Err(StructureError::LengthMismatch {
                what: "dotprops vectors",
                expected: points.len(),
                actual: vectors.len(),
            });
        }
        if let Some(index) = points.iter().position(|p| !is_finite(p)) {
            return Err(StructureError::NonFinite {
                what: "dotprops point",
                index,
            });
        }
        for (index, v) in vectors.iter().enumerate() {
            let n = norm(v);
            if !n.is_finite() || (n - 1.0).abs() > UNIT_TOLERANCE {
                return Err(StructureError::NotUnitVector { index, norm: n });
            }
        }
        if let Some(alpha) = &alpha {
            if alpha.len() != points.len() {
                return Err(StructureError::LengthMismatch {
                    what: "dotprops alpha",
                    expected: points.len(),
                    actual: alpha.len(),
                });
            }
            if let Some(index) = alpha.iter().position(|a| !a.is_finite()) {
                return Err(StructureError::NonFinite {
                    what: "dotprops alpha",
                    index,
                });
            }
            if let Some(index) = alpha.iter().position(|a| !(0.0..=1.0).contains(a)) {
                return Err(StructureError::InvalidParameter(format!(
                    "alpha {} at index {} is outside [0, 1]",
                    alpha[index], index
                )));
            }
        }

        Ok(Self {
            id,
            name: None,
            points,
            vectors,
            alpha,
            k: None,
            backend: IndexBackend::default(),
            index: OnceLock::new(),
        })
    }

    /// Estimate tangents from the `k` nearest neighbours of every point.
    ///
    /// The tangent is the principal eigenvector of the neighbourhood covariance
    /// (the point itself included); alpha is `(λ1 - λ2) / (λ1 + λ2 + λ3)`.
    /// `k` is clamped to the number of points. An empty input yields an
    /// empty cloud.
    pub fn from_points(id: u64, points: Vec<Point3>, k: usize) -> StructureResult<Self> {
        if k < 2 {
            return Err(StructureError::InvalidParameter(format!(
                "k must be at least 2 to estimate tangents, got {}",
                k
            )));
        }
        if points.is_empty() {
            let mut dots = Dotprops::new(id, Vec::new(), Vec::new(), Some(Vec::new()))?;
            dots.k = Some(k);
            return Ok(dots);
        }
        if points.len() < 2 {
            return Err(StructureError::InvalidParameter(
                "at least 2 points are needed to estimate tangents".to_string(),
            ));
        }

        let index = KdIndex::build(&points)?;
        let k_eff = k.min(points.len());

        let estimates: Vec<(Point3, f64)> = points
            .par_iter()
            .enumerate()
            .map(|(i, p)| {
                let neighbors = index.k_nearest(p, k_eff)?;
                let coords: Vec<Point3> = neighbors.iter().map(|n| points[n.index]).collect();
                principal_direction(&coords)
                    .ok_or(StructureError::DegenerateNeighborhood { index: i })
            })
            .collect::<StructureResult<_>>()?;

        let (vectors, alpha): (Vec<Point3>, Vec<f64>) = estimates.into_iter().unzip();
        tracing::debug!(
            target: "neuromorph-structures",
            "Estimated {} tangents for neuron {} (k={})",
            vectors.len(),
            id,
            k_eff
        );

        let mut dots = Dotprops::new(id, points, vectors, Some(alpha))?;
        dots.k = Some(k);
        let shared: Arc<dyn SpatialIndex> = Arc::new(index);
        let _ = dots.index.set(shared);
        Ok(dots)
    }

    /// Dot cloud from a skeleton.
    ///
    /// With `k = None` there is one point per child-parent edge, placed at the
    /// edge midpoint with the tangent along the edge (no alpha). Zero-length
    /// edges are skipped. With `Some(k)` the node positions go through
    /// [`Dotprops::from_points`].
    pub fn from_skeleton(skeleton: &TreeNeuron, k: Option<usize>) -> StructureResult<Self> {
        let mut dots = match k {
            Some(k) => Dotprops::from_points(skeleton.id(), skeleton.positions(), k)?,
            None => {
                let nodes = skeleton.nodes();
                let mut points = Vec::new();
                let mut vectors = Vec::new();
                for (child, parent) in skeleton.edges() {
                    let c = &nodes[child].position;
                    let p = &nodes[parent].position;
                    if let Some(v) = normalize(&sub(c, p)) {
                        points.push(midpoint(c, p));
                        vectors.push(v);
                    }
                }
                Dotprops::new(skeleton.id(), points, vectors, None)?
            }
        };
        dots.name = skeleton.name().map(str::to_string);
        Ok(dots)
    }

    /// Dot cloud from mesh vertices
    pub fn from_mesh(mesh: &MeshNeuron, k: usize) -> StructureResult<Self> {
        let mut dots = Dotprops::from_points(mesh.id(), mesh.vertices().to_vec(), k)?;
        dots.name = mesh.name().map(str::to_string);
        Ok(dots)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Choose the spatial backend used for nearest-neighbour queries against this cloud
    pub fn with_index_backend(mut self, backend: IndexBackend) -> Self {
        if backend != self.backend {
            self.backend = backend;
            self.index = OnceLock::new();
        }
        self
    }

    /// Same id, name, alpha and k with new geometry
    pub fn with_geometry(&self, points: Vec<Point3>, vectors: Vec<Point3>) -> StructureResult<Self> {
        let mut out = Dotprops::new(self.id, points, vectors, self.alpha.clone())?;
        out.name = self.name.clone();
        out.k = self.k;
        out.backend = self.backend;
        Ok(out)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn vectors(&self) -> &[Point3] {
        &self.vectors
    }

    pub fn alpha(&self) -> Option<&[f64]> {
        self.alpha.as_deref()
    }

    /// Neighbourhood size used for tangent estimation, if any
    pub fn k(&self) -> Option<usize> {
        self.k
    }

    pub fn index_backend(&self) -> IndexBackend {
        self.backend
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }

    /// Spatial index over the points, built on first call
    pub fn spatial_index(&self) -> StructureResult<&dyn SpatialIndex> {
        if let Some(index) = self.index.get() {
            return Ok(index.as_ref());
        }
        let built: Arc<dyn SpatialIndex> = Arc::from(build_index(&self.points, self.backend)?);
        Ok(self.index.get_or_init(|| built).as_ref())
    }
}

/// Principal direction and linearity of a neighbourhood.
///
/// Returns `None` when all points coincide.
fn principal_direction(points: &[Point3]) -> Option<(Point3, f64)> {
    let n = points.len() as f64;
    let mut centroid = [0.0; 3];
    for p in points {
        for axis in 0..3 {
            centroid[axis] += p[axis] / n;
        }
    }

    let mut cov = Matrix3::<f64>::zeros();
    for p in points {
        let d = Vector3::new(p[0] - centroid[0], p[1] - centroid[1], p[2] - centroid[2]);
        cov += d * d.transpose();
    }
    cov /= n;

    let eig = SymmetricEigen::new(cov);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));
    let lambda = order.map(|i| eig.eigenvalues[i].max(0.0));
    let total: f64 = lambda.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let column = eig.eigenvectors.column(order[0]);
    let direction = normalize(&[column[0], column[1], column[2]])?;
    Some((canonical_sign(direction), (lambda[0] - lambda[1]) / total))
}

/// Eigenvector sign is arbitrary; pin it so results are reproducible
fn canonical_sign(v: Point3) -> Point3 {
    match v.iter().find(|c| c.abs() > 1e-12) {
        Some(&c) if c < 0.0 => [-v[0], -v[1], -v[2]],
        _ => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::SkeletonNode;
    use approx::assert_relative_eq;

    fn helix(n: usize) -> Vec<Point3> {
        (0..n)
            .map(|i| {
                let t = i as f64 * 0.2;
                [t.cos() * 5.0, t.sin() * 5.0, t * 2.0]
            })
            .collect()
    }

    #[test]
    fn test_straight_line_tangents() {
        let points: Vec<Point3> = (0..30).map(|i| [0.0, i as f64, 0.0]).collect();
        let dots = Dotprops::from_points(1, points, 5).unwrap();
        assert_eq!(dots.len(), 30);
        for v in dots.vectors() {
            assert_relative_eq!(v[1], 1.0, epsilon = 1e-9);
        }
        for a in dots.alpha().unwrap() {
            assert_relative_eq!(*a, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_vectors_are_unit_length() {
        let dots = Dotprops::from_points(2, helix(100), DEFAULT_K).unwrap();
        for v in dots.vectors() {
            assert_relative_eq!(norm(v), 1.0, epsilon = 1e-9);
        }
        for a in dots.alpha().unwrap() {
            assert!((0.0..=1.0).contains(a));
        }
    }

    #[test]
    fn test_k_validation_and_empty() {
        assert!(matches!(
            Dotprops::from_points(1, helix(10), 1),
            Err(StructureError::InvalidParameter(_))
        ));
        assert!(Dotprops::from_points(1, Vec::new(), 5).unwrap().is_empty());
        assert!(Dotprops::from_points(1, vec![[0.0; 3]], 5).is_err());
        assert!(matches!(
            Dotprops::from_points(1, vec![[1.0; 3]; 4], 3),
            Err(StructureError::DegenerateNeighborhood { .. })
        ));
    }

    #[test]
    fn test_new_rejects_non_unit_vectors() {
        let err = Dotprops::new(1, vec![[0.0; 3]], vec![[2.0, 0.0, 0.0]], None).unwrap_err();
        assert!(matches!(err, StructureError::NotUnitVector { index: 0, .. }));
        assert!(Dotprops::new(1, vec![[0.0; 3]], vec![], None).is_err());
        assert!(Dotprops::new(1, vec![[0.0; 3]], vec![[1.0, 0.0, 0.0]], Some(vec![])).is_err());
    }

    #[test]
    fn test_from_skeleton_edges() {
        let skeleton = TreeNeuron::new(
            9,
            vec![
                SkeletonNode::new(1, None, [0.0, 0.0, 0.0]),
                SkeletonNode::new(2, Some(1), [0.0, 0.0, 4.0]),
                SkeletonNode::new(3, Some(2), [0.0, 0.0, 4.0]),
                SkeletonNode::new(4, Some(3), [2.0, 0.0, 4.0]),
            ],
        )
        .unwrap()
        .with_name("n9");
        let dots = Dotprops::from_skeleton(&skeleton, None).unwrap();
        // The zero-length edge 3->2 is dropped
        assert_eq!(dots.len(), 2);
        assert_eq!(dots.points()[0], [0.0, 0.0, 2.0]);
        assert_eq!(dots.vectors()[0], [0.0, 0.0, 1.0]);
        assert_eq!(dots.points()[1], [1.0, 0.0, 4.0]);
        assert_eq!(dots.vectors()[1], [1.0, 0.0, 0.0]);
        assert!(dots.alpha().is_none());
        assert_eq!(dots.name(), Some("n9"));
        assert_eq!(dots.id(), 9);
    }

    #[test]
    fn test_spatial_index_is_cached_and_shared_by_clone() {
        let dots = Dotprops::new(
            3,
            vec![[0.0; 3], [1.0, 0.0, 0.0]],
            vec![[1.0, 0.0, 0.0]; 2],
            None,
        )
        .unwrap()
        .with_index_backend(IndexBackend::BruteForce);
        let first = dots.spatial_index().unwrap() as *const dyn SpatialIndex as *const u8;
        let second = dots.spatial_index().unwrap() as *const dyn SpatialIndex as *const u8;
        assert_eq!(first, second);
        let copy = dots.clone();
        let third = copy.spatial_index().unwrap() as *const dyn SpatialIndex as *const u8;
        assert_eq!(first, third);
        assert_eq!(dots.spatial_index().unwrap().nearest(&[0.9, 0.0, 0.0]).unwrap().index, 1);
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let dots = Dotprops::from_points(4, helix(20), 5).unwrap().with_name("helix");
        let json = serde_json::to_string(&dots).unwrap();
        let back: Dotprops = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 20);
        assert_eq!(back.k(), Some(5));
        assert_eq!(back.name(), Some("helix"));

        let bad = r#"{"id": 1, "points": [[0,0,0]], "vectors": [[0,0,3]]}"#;
        assert!(serde_json::from_str::<Dotprops>(bad).is_err());
    }

    #[test]
    fn test_serde_keeps_index_backend() {
        let dots = Dotprops::from_points(5, helix(10), 4)
            .unwrap()
            .with_index_backend(IndexBackend::BruteForce);
        let json = serde_json::to_string(&dots).unwrap();
        let back: Dotprops = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index_backend(), IndexBackend::BruteForce);

        let legacy = r#"{"id": 1, "points": [[0,0,0]], "vectors": [[0,0,1]]}"#;
        let back: Dotprops = serde_json::from_str(legacy).unwrap();
        assert_eq!(back.index_backend(), IndexBackend::KdTree);
    }

    #[test]
    fn test_new_rejects_alpha_outside_unit_interval() {
        let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let vectors = vec![[1.0, 0.0, 0.0]; 2];
        for alpha in [vec![-0.5, 0.5], vec![0.5, 1.5]] {
            assert!(matches!(
                Dotprops::new(1, points.clone(), vectors.clone(), Some(alpha)),
                Err(StructureError::InvalidParameter(_))
            ));
        }
        assert!(Dotprops::new(1, points, vectors, Some(vec![0.0, 1.0])).is_ok());
    }
}
