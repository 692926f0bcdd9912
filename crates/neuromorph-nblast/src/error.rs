// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use neuromorph_spatial::SpatialError;
use neuromorph_structures::StructureError;

/// Result type for similarity scoring
pub type NblastResult<T> = Result<T, NblastError>;

/// Errors that can occur while scoring or building score tables
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NblastError {
    #[error("Query dot cloud {id} is empty")]
    EmptyQuery { id: u64 },

    #[error("Target dot cloud {id} is empty")]
    EmptyTarget { id: u64 },

    #[error("Self-score of dot cloud {id} is zero, cannot normalize")]
    ZeroSelfScore { id: u64 },

    #[error("Invalid score table: {0}")]
    InvalidTable(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Nearest-neighbour query failed: {0}")]
    Spatial(#[from] SpatialError),

    #[error("Morphology error: {0}")]
    Structure(#[from] StructureError),
}
