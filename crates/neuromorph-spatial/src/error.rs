// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::Point3;

/// Result type for spatial index operations
pub type SpatialResult<T> = Result<T, SpatialError>;

/// Errors raised while building or querying a spatial index
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpatialError {
    #[error("Spatial index is empty")]
    EmptyIndex,

    #[error("Non-finite coordinate in point {index}")]
    NonFinitePoint { index: usize },

    #[error("Non-finite query point: {0:?}")]
    NonFiniteQuery(Point3),

    #[error("Unknown index backend: {0}")]
    UnknownBackend(String),
}
