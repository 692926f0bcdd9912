// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Binned `(distance, |dot|)` lookup table

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::score_function::ScoreFunction;
use crate::{NblastError, NblastResult};

/// Distance bin edges for tables built without explicit boundaries (µm)
pub const DEFAULT_DISTANCE_BOUNDARIES: [f64; 22] = [
    0.0, 0.75, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 12.0, 14.0, 16.0,
    20.0, 25.0, 30.0, 40.0, 500.0,
];

/// Dot-product bin edges for tables built without explicit boundaries
pub const DEFAULT_DOT_BOUNDARIES: [f64; 11] =
    [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Score lookup table over distance rows and dot-product columns.
///
/// Values below the first boundary fall in the first bin and values at or
/// above the last boundary fall in the last bin, so every lookup succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScoreTableRecord", into = "ScoreTableRecord")]
pub struct ScoreTable {
    dist_boundaries: Vec<f64>,
    dot_boundaries: Vec<f64>,
    cells: Array2<f64>,
}

impl ScoreTable {
    /// Create a table; `cells` must be `(dist_boundaries.len() - 1, dot_boundaries.len() - 1)`.
    ///
    /// Structural problems are errors. Cells that are not monotone (non-increasing
    /// with distance, non-decreasing with dot) are accepted with a warning.
    pub fn new(
        dist_boundaries: Vec<f64>,
        dot_boundaries: Vec<f64>,
        cells: Array2<f64>,
    ) -> NblastResult<Self> {
        validate_boundaries("distance", &dist_boundaries)?;
        validate_boundaries("dot", &dot_boundaries)?;

        let expected = (dist_boundaries.len() - 1, dot_boundaries.len() - 1);
        if cells.dim() != expected {
            return Err(NblastError::InvalidTable(format!(
                "cell grid is {:?}, boundaries require {:?}",
                cells.dim(),
                expected
            )));
        }
        if let Some(((r, c), v)) = cells.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(NblastError::InvalidTable(format!(
                "cell ({}, {}) is not finite: {}",
                r, c, v
            )));
        }

        let table = Self {
            dist_boundaries,
            dot_boundaries,
            cells,
        };
        let violations = table.monotonic_violations();
        if violations > 0 {
            tracing::warn!(
                target: "neuromorph-nblast",
                "Score table has {} non-monotone cell pairs",
                violations
            );
        }
        Ok(table)
    }

    /// Fill each cell by evaluating `f` at the bin midpoint
    pub fn from_fn<F>(dist_boundaries: Vec<f64>, dot_boundaries: Vec<f64>, f: F) -> NblastResult<Self>
    where
        F: Fn(f64, f64) -> f64,
    {
        validate_boundaries("distance", &dist_boundaries)?;
        validate_boundaries("dot", &dot_boundaries)?;
        let shape = (dist_boundaries.len() - 1, dot_boundaries.len() - 1);
        let cells = Array2::from_shape_fn(shape, |(r, c)| {
            let d = 0.5 * (dist_boundaries[r] + dist_boundaries[r + 1]);
            let t = 0.5 * (dot_boundaries[c] + dot_boundaries[c + 1]);
            f(d, t)
        });
        Self::new(dist_boundaries, dot_boundaries, cells)
    }

    pub fn dist_boundaries(&self) -> &[f64] {
        &self.dist_boundaries
    }

    pub fn dot_boundaries(&self) -> &[f64] {
        &self.dot_boundaries
    }

    pub fn cells(&self) -> &Array2<f64> {
        &self.cells
    }

    /// `(distance bins, dot bins)`
    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn dist_bin(&self, distance: f64) -> usize {
        digitize(&self.dist_boundaries, distance)
    }

    pub fn dot_bin(&self, dot: f64) -> usize {
        digitize(&self.dot_boundaries, dot)
    }

    pub fn lookup(&self, distance: f64, dot: f64) -> f64 {
        self.cells[[self.dist_bin(distance), self.dot_bin(dot)]]
    }

    /// True when scores never rise with distance and never fall with dot
    pub fn check_monotonic(&self) -> bool {
        self.monotonic_violations() == 0
    }

    fn monotonic_violations(&self) -> usize {
        let (rows, cols) = self.cells.dim();
        let mut violations = 0;
        for r in 0..rows {
            for c in 0..cols {
                let v = self.cells[[r, c]];
                if r + 1 < rows && self.cells[[r + 1, c]] > v {
                    violations += 1;
                }
                if c + 1 < cols && self.cells[[r, c + 1]] < v {
                    violations += 1;
                }
            }
        }
        violations
    }
}

impl ScoreFunction for ScoreTable {
    fn score(&self, distance: f64, dot: f64) -> f64 {
        self.lookup(distance, dot)
    }
}

/// Bin index of `value` with clamping to the outer bins
pub(crate) fn digitize(boundaries: &[f64], value: f64) -> usize {
    let n_bins = boundaries.len() - 1;
    let above = boundaries.partition_point(|&b| b <= value);
    above.saturating_sub(1).min(n_bins - 1)
}

pub(crate) fn validate_boundaries(axis: &str, boundaries: &[f64]) -> NblastResult<()> {
    if boundaries.len() < 2 {
        return Err(NblastError::InvalidTable(format!(
            "{} axis needs at least 2 boundaries, got {}",
            axis,
            boundaries.len()
        )));
    }
    if boundaries.iter().any(|b| !b.is_finite()) {
        return Err(NblastError::InvalidTable(format!(
            "{} boundaries must be finite",
            axis
        )));
    }
    if let Some(i) = boundaries.windows(2).position(|w| w[1] <= w[0]) {
        return Err(NblastError::InvalidTable(format!(
            "{} boundaries not strictly increasing at position {}",
            axis,
            i + 1
        )));
    }
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct ScoreTableRecord {
    dist_boundaries: Vec<f64>,
    dot_boundaries: Vec<f64>,
    cells: Vec<Vec<f64>>,
}

impl TryFrom<ScoreTableRecord> for ScoreTable {
    type Error = NblastError;

    fn try_from(record: ScoreTableRecord) -> NblastResult<Self> {
        let rows = record.cells.len();
        let cols = record.cells.first().map_or(0, |r| r.len());
        if record.cells.iter().any(|r| r.len() != cols) {
            return Err(NblastError::InvalidTable("ragged cell rows".to_string()));
        }
        let flat: Vec<f64> = record.cells.into_iter().flatten().collect();
        let cells = Array2::from_shape_vec((rows, cols), flat)
            .map_err(|e| NblastError::InvalidTable(e.to_string()))?;
        Self::new(record.dist_boundaries, record.dot_boundaries, cells)
    }
}

impl From<ScoreTable> for ScoreTableRecord {
    fn from(table: ScoreTable) -> Self {
        Self {
            cells: table.cells.rows().into_iter().map(|r| r.to_vec()).collect(),
            dist_boundaries: table.dist_boundaries,
            dot_boundaries: table.dot_boundaries,
        }
    }
}
