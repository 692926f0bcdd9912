// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{Point3, TransformError, TransformResult};

/// Paired source/target landmarks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmarks {
    pub source: Vec<Point3>,
    pub target: Vec<Point3>,
}

impl Landmarks {
    pub fn new(source: Vec<Point3>, target: Vec<Point3>) -> Self {
        Self { source, target }
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Same landmarks with source and target swapped
    pub fn swapped(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }

    pub(crate) fn validate(&self, required: usize) -> TransformResult<()> {
        if self.source.len() != self.target.len() {
            return Err(TransformError::LandmarkMismatch {
                source_count: self.source.len(),
                target_count: self.target.len(),
            });
        }
        if self.source.len() < required {
            return Err(TransformError::InsufficientLandmarks {
                required,
                actual: self.source.len(),
            });
        }
        for (what, points) in [("source landmark", &self.source), ("target landmark", &self.target)] {
            if let Some(index) = points.iter().position(|p| p.iter().any(|c| !c.is_finite())) {
                return Err(TransformError::NonFinite { what, index });
            }
        }
        Ok(())
    }
}
