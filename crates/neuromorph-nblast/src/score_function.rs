// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-point scoring of `(distance, |dot|)` pairs

use serde::{Deserialize, Serialize};

use crate::{NblastError, NblastResult};

/// Maps a nearest-neighbour distance and absolute tangent dot product to a
/// score contribution. Implementations are read-only and shared across
/// worker threads.
pub trait ScoreFunction: Send + Sync {
    fn score(&self, distance: f64, dot: f64) -> f64;
}

impl<F: ScoreFunction + ?Sized> ScoreFunction for std::sync::Arc<F> {
    fn score(&self, distance: f64, dot: f64) -> f64 {
        (**self).score(distance, dot)
    }
}

impl<F: ScoreFunction + ?Sized> ScoreFunction for &F {
    fn score(&self, distance: f64, dot: f64) -> f64 {
        (**self).score(distance, dot)
    }
}

/// `|dot| * exp(-d² / 2σ²)`, for when no reference table is available
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianDotScore {
    sigma: f64,
}

impl GaussianDotScore {
    pub fn new(sigma: f64) -> NblastResult<Self> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(NblastError::InvalidParameter(format!(
                "sigma must be positive and finite, got {}",
                sigma
            )));
        }
        Ok(Self { sigma })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl ScoreFunction for GaussianDotScore {
    fn score(&self, distance: f64, dot: f64) -> f64 {
        dot * (-(distance * distance) / (2.0 * self.sigma * self.sigma)).exp()
    }
}
