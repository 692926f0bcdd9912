// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use neuromorph_spatial::SpatialError;

/// Result type for morphology operations
pub type StructureResult<T> = Result<T, StructureError>;

/// Errors raised while constructing or converting neuron representations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructureError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Non-finite value in {what} at index {index}")]
    NonFinite { what: &'static str, index: usize },

    #[error("Tangent vector {index} is not unit length (norm {norm})")]
    NotUnitVector { index: usize, norm: f64 },

    #[error("Duplicate node id {0}")]
    DuplicateNodeId(u64),

    #[error("Node {node} references missing parent {parent}")]
    MissingParent { node: u64, parent: u64 },

    #[error("Skeleton contains a cycle through node {0}")]
    Cycle(u64),

    #[error("Face {face} references vertex {vertex} but mesh has {n_vertices} vertices")]
    FaceIndexOutOfRange {
        face: usize,
        vertex: u32,
        n_vertices: usize,
    },

    #[error("Neighbourhood of point {index} is degenerate (all neighbours coincide)")]
    DegenerateNeighborhood { index: usize },

    #[error("Spatial index error: {0}")]
    Spatial(#[from] SpatialError),
}
