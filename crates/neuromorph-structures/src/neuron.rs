// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Tagged neuron representation and the capability interface shared by all
representations.
*/

use neuromorph_spatial::Point3;
use serde::{Deserialize, Serialize};

use crate::dotprops::{Dotprops, DEFAULT_K};
use crate::geometry::BoundingBox;
use crate::mesh::MeshNeuron;
use crate::skeleton::TreeNeuron;
use crate::StructureResult;

/// Which representation a [`Neuron`] holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeuronKind {
    Skeleton,
    Mesh,
    Dotprops,
}

impl std::fmt::Display for NeuronKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NeuronKind::Skeleton => write!(f, "skeleton"),
            NeuronKind::Mesh => write!(f, "mesh"),
            NeuronKind::Dotprops => write!(f, "dotprops"),
        }
    }
}

/// Capabilities every neuron representation provides
pub trait Morphology {
    fn id(&self) -> u64;

    fn name(&self) -> Option<&str>;

    fn kind(&self) -> NeuronKind;

    /// Number of sampled points (nodes, vertices or dots)
    fn n_points(&self) -> usize;

    /// Sampled positions (nodes, vertices or dots)
    fn sample_points(&self) -> Vec<Point3>;

    fn bounding_box(&self) -> Option<BoundingBox>;

    /// Representation-specific size: cable length for skeletons, surface
    /// area for meshes, point count for dot clouds.
    fn size_metric(&self) -> f64;
}

impl Morphology for TreeNeuron {
    fn id(&self) -> u64 {
        TreeNeuron::id(self)
    }

    fn name(&self) -> Option<&str> {
        TreeNeuron::name(self)
    }

    fn kind(&self) -> NeuronKind {
        NeuronKind::Skeleton
    }

    fn n_points(&self) -> usize {
        self.n_nodes()
    }

    fn sample_points(&self) -> Vec<Point3> {
        self.positions()
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        TreeNeuron::bounding_box(self)
    }

    fn size_metric(&self) -> f64 {
        self.cable_length()
    }
}

impl Morphology for MeshNeuron {
    fn id(&self) -> u64 {
        MeshNeuron::id(self)
    }

    fn name(&self) -> Option<&str> {
        MeshNeuron::name(self)
    }

    fn kind(&self) -> NeuronKind {
        NeuronKind::Mesh
    }

    fn n_points(&self) -> usize {
        self.n_vertices()
    }

    fn sample_points(&self) -> Vec<Point3> {
        self.vertices().to_vec()
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        MeshNeuron::bounding_box(self)
    }

    fn size_metric(&self) -> f64 {
        self.surface_area()
    }
}

impl Morphology for Dotprops {
    fn id(&self) -> u64 {
        Dotprops::id(self)
    }

    fn name(&self) -> Option<&str> {
        Dotprops::name(self)
    }

    fn kind(&self) -> NeuronKind {
        NeuronKind::Dotprops
    }

    fn n_points(&self) -> usize {
        self.len()
    }

    fn sample_points(&self) -> Vec<Point3> {
        self.points().to_vec()
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        Dotprops::bounding_box(self)
    }

    fn size_metric(&self) -> f64 {
        self.len() as f64
    }
}

/// A neuron in any of the supported representations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Neuron {
    Skeleton(TreeNeuron),
    Mesh(MeshNeuron),
    Dotprops(Dotprops),
}

impl Neuron {
    fn as_morphology(&self) -> &dyn Morphology {
        match self {
            Neuron::Skeleton(n) => n,
            Neuron::Mesh(n) => n,
            Neuron::Dotprops(n) => n,
        }
    }

    /// Convert to a dot cloud.
    ///
    /// Skeletons honour `k` as in [`Dotprops::from_skeleton`]; meshes use
    /// `k` or [`DEFAULT_K`]; dot clouds are returned as-is.
    pub fn to_dotprops(&self, k: Option<usize>) -> StructureResult<Dotprops> {
        match self {
            Neuron::Skeleton(n) => Dotprops::from_skeleton(n, k),
            Neuron::Mesh(n) => Dotprops::from_mesh(n, k.unwrap_or(DEFAULT_K)),
            Neuron::Dotprops(n) => Ok(n.clone()),
        }
    }

    pub fn as_skeleton(&self) -> Option<&TreeNeuron> {
        match self {
            Neuron::Skeleton(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshNeuron> {
        match self {
            Neuron::Mesh(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_dotprops(&self) -> Option<&Dotprops> {
        match self {
            Neuron::Dotprops(n) => Some(n),
            _ => None,
        }
    }
}

impl Morphology for Neuron {
    fn id(&self) -> u64 {
        self.as_morphology().id()
    }

    fn name(&self) -> Option<&str> {
        self.as_morphology().name()
    }

    fn kind(&self) -> NeuronKind {
        self.as_morphology().kind()
    }

    fn n_points(&self) -> usize {
        self.as_morphology().n_points()
    }

    fn sample_points(&self) -> Vec<Point3> {
        self.as_morphology().sample_points()
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        self.as_morphology().bounding_box()
    }

    fn size_metric(&self) -> f64 {
        self.as_morphology().size_metric()
    }
}

impl From<TreeNeuron> for Neuron {
    fn from(n: TreeNeuron) -> Self {
        Neuron::Skeleton(n)
    }
}

impl From<MeshNeuron> for Neuron {
    fn from(n: MeshNeuron) -> Self {
        Neuron::Mesh(n)
    }
}

impl From<Dotprops> for Neuron {
    fn from(n: Dotprops) -> Self {
        Neuron::Dotprops(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::SkeletonNode;
    use approx::assert_relative_eq;

    #[test]
    fn test_dispatch_by_kind() {
        let skeleton: Neuron = TreeNeuron::new(
            1,
            vec![
                SkeletonNode::new(1, None, [0.0; 3]),
                SkeletonNode::new(2, Some(1), [0.0, 3.0, 4.0]),
            ],
        )
        .unwrap()
        .into();
        assert_eq!(skeleton.kind(), NeuronKind::Skeleton);
        assert_relative_eq!(skeleton.size_metric(), 5.0);
        assert_eq!(skeleton.n_points(), 2);

        let dots = skeleton.to_dotprops(None).unwrap();
        assert_eq!(dots.len(), 1);
        let dots: Neuron = dots.into();
        assert_eq!(dots.kind(), NeuronKind::Dotprops);
        assert_eq!(dots.id(), 1);
        assert_eq!(dots.sample_points(), vec![[0.0, 1.5, 2.0]]);
    }

    #[test]
    fn test_mesh_to_dotprops_uses_vertices() {
        let vertices: Vec<Point3> = (0..40).map(|i| [i as f64, (i % 2) as f64 * 0.1, 0.0]).collect();
        let mesh: Neuron = MeshNeuron::new(5, vertices, vec![[0, 1, 2]]).unwrap().into();
        let dots = mesh.to_dotprops(Some(6)).unwrap();
        assert_eq!(dots.len(), 40);
        assert_eq!(dots.k(), Some(6));
        assert!(mesh.as_mesh().is_some());
        assert!(mesh.as_skeleton().is_none());
    }
}
