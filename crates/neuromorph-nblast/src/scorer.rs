// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Directional query→target scoring

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use neuromorph_structures::geometry::dot;
use neuromorph_structures::Dotprops;
use serde::{Deserialize, Serialize};

use crate::score_function::ScoreFunction;
use crate::{NblastError, NblastResult};

/// How a pair score is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// Sum of per-point contributions
    Raw,
    /// Raw score divided by the query's self-score
    #[default]
    Normalized,
    /// Average of the forward and reverse normalized scores
    Mean,
}

impl fmt::Display for ScoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScoreMode::Raw => "raw",
            ScoreMode::Normalized => "normalized",
            ScoreMode::Mean => "mean",
        };
        f.write_str(s)
    }
}

impl FromStr for ScoreMode {
    type Err = NblastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(ScoreMode::Raw),
            "normalized" | "normalised" => Ok(ScoreMode::Normalized),
            "mean" => Ok(ScoreMode::Mean),
            other => Err(NblastError::InvalidParameter(format!(
                "unknown score mode '{}'",
                other
            ))),
        }
    }
}

/// Scoring and batch-execution options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NblastOptions {
    pub mode: ScoreMode,
    /// Weight each dot product by `sqrt(alpha_q * alpha_t)` when both clouds carry alpha
    pub use_alpha: bool,
    /// Run batch scoring on the rayon pool
    pub parallel: bool,
    /// Size of a dedicated pool for batch scoring; 0 uses the global pool
    pub max_threads: usize,
}

impl Default for NblastOptions {
    fn default() -> Self {
        Self {
            mode: ScoreMode::Normalized,
            use_alpha: false,
            parallel: true,
            max_threads: 0,
        }
    }
}

/// Visit every query point with `(distance, |dot|)` to its nearest target point.
///
/// With `use_alpha` and alpha on both clouds, `|dot|` is weighted by
/// `sqrt(alpha_q * alpha_t)`. Empty clouds are rejected before any lookup.
pub(crate) fn visit_nearest<F>(
    query: &Dotprops,
    target: &Dotprops,
    use_alpha: bool,
    mut visit: F,
) -> NblastResult<()>
where
    F: FnMut(f64, f64),
{
    if query.is_empty() {
        return Err(NblastError::EmptyQuery { id: query.id() });
    }
    if target.is_empty() {
        return Err(NblastError::EmptyTarget { id: target.id() });
    }

    let index = target.spatial_index()?;
    let weights = if use_alpha {
        query.alpha().zip(target.alpha())
    } else {
        None
    };
    let target_vectors = target.vectors();

    for (i, (point, vector)) in query.points().iter().zip(query.vectors()).enumerate() {
        let nn = index.nearest(point)?;
        let mut d = dot(vector, &target_vectors[nn.index]).abs();
        if let Some((qa, ta)) = weights {
            d *= (qa[i] * ta[nn.index]).sqrt();
        }
        visit(nn.distance, d);
    }
    Ok(())
}

/// Raw directional score: for every query point, find the nearest target
/// point and sum `score_fn(distance, |dot|)`.
pub fn raw_score(
    query: &Dotprops,
    target: &Dotprops,
    score_fn: &dyn ScoreFunction,
    use_alpha: bool,
) -> NblastResult<f64> {
    let mut total = 0.0;
    visit_nearest(query, target, use_alpha, |distance, d| {
        total += score_fn.score(distance, d);
    })?;
    Ok(total)
}

/// Raw score of a cloud against itself
pub fn self_score(
    cloud: &Dotprops,
    score_fn: &dyn ScoreFunction,
    use_alpha: bool,
) -> NblastResult<f64> {
    raw_score(cloud, cloud, score_fn, use_alpha)
}

/// Divide a raw score by the query's self-score
pub(crate) fn normalize(raw: f64, self_score: f64, query_id: u64) -> NblastResult<f64> {
    if self_score == 0.0 {
        return Err(NblastError::ZeroSelfScore { id: query_id });
    }
    Ok(raw / self_score)
}

/// Single-pair score with the given normalization
pub fn score(
    query: &Dotprops,
    target: &Dotprops,
    score_fn: &dyn ScoreFunction,
    normalized: bool,
) -> NblastResult<f64> {
    let raw = raw_score(query, target, score_fn, false)?;
    if !normalized {
        return Ok(raw);
    }
    normalize(raw, self_score(query, score_fn, false)?, query.id())
}

/// Reusable scorer holding a shared score function and options
#[derive(Clone)]
pub struct NblastScorer {
    score_fn: Arc<dyn ScoreFunction>,
    options: NblastOptions,
}

impl NblastScorer {
    pub fn new(score_fn: Arc<dyn ScoreFunction>, options: NblastOptions) -> Self {
        Self { score_fn, options }
    }

    pub fn with_mode(mut self, mode: ScoreMode) -> Self {
        self.options.mode = mode;
        self
    }

    pub fn options(&self) -> &NblastOptions {
        &self.options
    }

    pub fn mode(&self) -> ScoreMode {
        self.options.mode
    }

    pub fn score_function(&self) -> &dyn ScoreFunction {
        self.score_fn.as_ref()
    }

    pub fn raw(&self, query: &Dotprops, target: &Dotprops) -> NblastResult<f64> {
        raw_score(query, target, self.score_fn.as_ref(), self.options.use_alpha)
    }

    pub fn self_score(&self, cloud: &Dotprops) -> NblastResult<f64> {
        self.raw(cloud, cloud)
    }

    /// Score `query` against `target` according to the configured mode
    pub fn score(&self, query: &Dotprops, target: &Dotprops) -> NblastResult<f64> {
        match self.options.mode {
            ScoreMode::Raw => self.raw(query, target),
            ScoreMode::Normalized => self.normalized(query, target),
            ScoreMode::Mean => {
                let forward = self.normalized(query, target)?;
                let reverse = self.normalized(target, query)?;
                Ok(0.5 * (forward + reverse))
            }
        }
    }

    fn normalized(&self, query: &Dotprops, target: &Dotprops) -> NblastResult<f64> {
        let raw = self.raw(query, target)?;
        normalize(raw, self.self_score(query)?, query.id())
    }
}

impl fmt::Debug for NblastScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NblastScorer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
