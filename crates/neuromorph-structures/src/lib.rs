// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Neuromorph Structures

Core neuron morphology types:
- [`TreeNeuron`]: skeleton (node table with parent links)
- [`MeshNeuron`]: triangle mesh
- [`Dotprops`]: dot cloud (points + unit tangents), the input to similarity scoring
- [`Neuron`]: tagged variant over the three, with the shared [`Morphology`] capabilities
- [`NeuronList`]: ordered collection with explicit batch-apply
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod dotprops;
mod error;
pub mod geometry;
pub mod mesh;
pub mod neuron;
pub mod neuron_list;
pub mod skeleton;

pub use dotprops::{Dotprops, DEFAULT_K, UNIT_TOLERANCE};
pub use error::{StructureError, StructureResult};
pub use geometry::BoundingBox;
pub use mesh::MeshNeuron;
pub use neuron::{Morphology, Neuron, NeuronKind};
pub use neuron_list::NeuronList;
pub use skeleton::{SkeletonNode, TreeNeuron};

// Re-export spatial types that appear in this crate's public API
pub use neuromorph_spatial::{IndexBackend, Point3};
