// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use neuromorph_structures::StructureError;

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("Transform is not invertible: {0}")]
    NotInvertible(String),

    #[error("At least {required} landmarks required, got {actual}")]
    InsufficientLandmarks { required: usize, actual: usize },

    #[error("Landmark count mismatch: {source_count} source vs {target_count} target")]
    LandmarkMismatch {
        source_count: usize,
        target_count: usize,
    },

    #[error("Non-finite {what} at index {index}")]
    NonFinite { what: &'static str, index: usize },

    #[error("Linear system could not be solved: {0}")]
    SingularSystem(String),

    #[error("Transformed morphology is invalid: {0}")]
    Structure(#[from] StructureError),
}
