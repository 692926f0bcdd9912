// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Batch scoring: all-by-all and query×target matrices
//!
//! Every cell is computed independently. A cell that cannot be scored is
//! stored as NaN and its error is recorded in [`ScoreMatrix::failures`]; the
//! rest of the matrix is unaffected.

use std::time::Instant;

use ndarray::Array2;
use neuromorph_structures::Dotprops;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::scorer::{normalize, NblastScorer, ScoreMode};
use crate::{NblastError, NblastResult};

/// A cell that failed to score
#[derive(Debug, Clone, PartialEq)]
pub struct CellFailure {
    pub row: usize,
    pub col: usize,
    pub error: NblastError,
}

/// Query-by-target score matrix. Rows follow the query order, columns the
/// target order.
#[derive(Debug, Clone, Serialize)]
#[serde(into = "ScoreMatrixReport")]
pub struct ScoreMatrix {
    query_ids: Vec<u64>,
    target_ids: Vec<u64>,
    mode: ScoreMode,
    scores: Array2<f64>,
    failures: Vec<CellFailure>,
}

impl ScoreMatrix {
    fn from_cells(
        query_ids: Vec<u64>,
        target_ids: Vec<u64>,
        mode: ScoreMode,
        cells: Vec<Vec<NblastResult<f64>>>,
    ) -> Self {
        let mut scores = Array2::from_elem((query_ids.len(), target_ids.len()), f64::NAN);
        let mut failures = Vec::new();
        for (row, row_cells) in cells.into_iter().enumerate() {
            for (col, cell) in row_cells.into_iter().enumerate() {
                match cell {
                    Ok(v) => scores[[row, col]] = v,
                    Err(error) => failures.push(CellFailure { row, col, error }),
                }
            }
        }
        Self {
            query_ids,
            target_ids,
            mode,
            scores,
            failures,
        }
    }

    pub fn query_ids(&self) -> &[u64] {
        &self.query_ids
    }

    pub fn target_ids(&self) -> &[u64] {
        &self.target_ids
    }

    pub fn mode(&self) -> ScoreMode {
        self.mode
    }

    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    pub fn shape(&self) -> (usize, usize) {
        self.scores.dim()
    }

    pub fn failures(&self) -> &[CellFailure] {
        &self.failures
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Score at `(row, col)`; `None` for out-of-range or failed cells
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.scores.get([row, col]).copied().filter(|v| !v.is_nan())
    }

    /// The failure recorded for `(row, col)`, if any
    pub fn error_at(&self, row: usize, col: usize) -> Option<&NblastError> {
        self.failures
            .iter()
            .find(|f| f.row == row && f.col == col)
            .map(|f| &f.error)
    }

    pub fn get_by_id(&self, query_id: u64, target_id: u64) -> Option<f64> {
        let row = self.query_ids.iter().position(|&id| id == query_id)?;
        let col = self.target_ids.iter().position(|&id| id == target_id)?;
        self.get(row, col)
    }

    /// Best-scoring targets for one query row, highest first, failed cells skipped
    pub fn top_matches(&self, row: usize, n: usize) -> Vec<(u64, f64)> {
        if row >= self.query_ids.len() {
            return Vec::new();
        }
        let mut hits: Vec<(u64, f64)> = self
            .scores
            .row(row)
            .iter()
            .zip(&self.target_ids)
            .filter(|(v, _)| !v.is_nan())
            .map(|(&v, &id)| (id, v))
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1));
        hits.truncate(n);
        hits
    }

    /// Serializable snapshot; failed cells become `null`
    pub fn report(&self) -> ScoreMatrixReport {
        ScoreMatrixReport {
            mode: self.mode,
            query_ids: self.query_ids.clone(),
            target_ids: self.target_ids.clone(),
            scores: self
                .scores
                .rows()
                .into_iter()
                .map(|r| r.iter().map(|v| (!v.is_nan()).then_some(*v)).collect())
                .collect(),
            failures: self
                .failures
                .iter()
                .map(|f| FailureReport {
                    query_id: self.query_ids[f.row],
                    target_id: self.target_ids[f.col],
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// JSON-friendly form of a [`ScoreMatrix`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMatrixReport {
    pub mode: ScoreMode,
    pub query_ids: Vec<u64>,
    pub target_ids: Vec<u64>,
    pub scores: Vec<Vec<Option<f64>>>,
    pub failures: Vec<FailureReport>,
}

impl From<ScoreMatrix> for ScoreMatrixReport {
    fn from(matrix: ScoreMatrix) -> Self {
        matrix.report()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub query_id: u64,
    pub target_id: u64,
    pub error: String,
}

impl NblastScorer {
    /// Score every cloud against every cloud (including itself)
    pub fn all_by_all(&self, clouds: &[Dotprops]) -> NblastResult<ScoreMatrix> {
        let start = Instant::now();
        let raw = self.run(|| self.raw_grid(clouds, clouds))?;

        let cells = match self.mode() {
            ScoreMode::Raw => raw,
            ScoreMode::Normalized | ScoreMode::Mean => {
                // The diagonal is each cloud's self-score
                let self_scores: Vec<NblastResult<f64>> =
                    (0..clouds.len()).map(|i| raw[i][i].clone()).collect();
                let normalized = normalize_grid(&raw, &self_scores, clouds);
                if self.mode() == ScoreMode::Mean {
                    mean_grid(&normalized, &normalized)
                } else {
                    normalized
                }
            }
        };

        let matrix = ScoreMatrix::from_cells(ids(clouds), ids(clouds), self.mode(), cells);
        log_batch("all-by-all", &matrix, start);
        Ok(matrix)
    }

    /// Score every query against every target
    pub fn query_target(&self, queries: &[Dotprops], targets: &[Dotprops]) -> NblastResult<ScoreMatrix> {
        let start = Instant::now();
        let cells = self.run(|| match self.mode() {
            ScoreMode::Raw => self.raw_grid(queries, targets),
            ScoreMode::Normalized => {
                let forward = self.raw_grid(queries, targets);
                let query_self = self.self_scores(queries);
                normalize_grid(&forward, &query_self, queries)
            }
            ScoreMode::Mean => {
                let forward = self.raw_grid(queries, targets);
                let reverse = self.raw_grid(targets, queries);
                let query_self = self.self_scores(queries);
                let target_self = self.self_scores(targets);
                mean_grid(
                    &normalize_grid(&forward, &query_self, queries),
                    &normalize_grid(&reverse, &target_self, targets),
                )
            }
        })?;

        let matrix = ScoreMatrix::from_cells(ids(queries), ids(targets), self.mode(), cells);
        log_batch("query-target", &matrix, start);
        Ok(matrix)
    }

    /// Run `op` on a dedicated pool when `max_threads` is set
    fn run<T, F>(&self, op: F) -> NblastResult<T>
    where
        F: FnOnce() -> T + Send,
        T: Send,
    {
        let threads = self.options().max_threads;
        if !self.options().parallel || threads == 0 {
            return Ok(op());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("nblast-worker-{}", i))
            .build()
            .map_err(|e| NblastError::ThreadPool(e.to_string()))?;
        Ok(pool.install(op))
    }

    fn raw_grid(&self, queries: &[Dotprops], targets: &[Dotprops]) -> Vec<Vec<NblastResult<f64>>> {
        let row = |q: &Dotprops| -> Vec<NblastResult<f64>> {
            targets.iter().map(|t| self.raw(q, t)).collect()
        };
        if self.options().parallel {
            queries.par_iter().map(row).collect()
        } else {
            queries.iter().map(row).collect()
        }
    }

    fn self_scores(&self, clouds: &[Dotprops]) -> Vec<NblastResult<f64>> {
        if self.options().parallel {
            clouds.par_iter().map(|c| self.self_score(c)).collect()
        } else {
            clouds.iter().map(|c| self.self_score(c)).collect()
        }
    }
}

fn ids(clouds: &[Dotprops]) -> Vec<u64> {
    clouds.iter().map(|c| c.id()).collect()
}

/// Divide each row by its query's self-score; a failed self-score fails the row
fn normalize_grid(
    raw: &[Vec<NblastResult<f64>>],
    self_scores: &[NblastResult<f64>],
    queries: &[Dotprops],
) -> Vec<Vec<NblastResult<f64>>> {
    raw.iter()
        .zip(self_scores)
        .zip(queries)
        .map(|((row, own), query)| {
            row.iter()
                .map(|cell| {
                    let value = cell.clone()?;
                    let own = own.clone()?;
                    normalize(value, own, query.id())
                })
                .collect()
        })
        .collect()
}

/// Average `forward[r][c]` with `reverse[c][r]`
fn mean_grid(
    forward: &[Vec<NblastResult<f64>>],
    reverse: &[Vec<NblastResult<f64>>],
) -> Vec<Vec<NblastResult<f64>>> {
    forward
        .iter()
        .enumerate()
        .map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(|(c, cell)| {
                    let a = cell.clone()?;
                    let b = reverse[c][r].clone()?;
                    Ok(0.5 * (a + b))
                })
                .collect()
        })
        .collect()
}

fn log_batch(kind: &str, matrix: &ScoreMatrix, start: Instant) {
    let (rows, cols) = matrix.shape();
    tracing::info!(
        target: "neuromorph-nblast",
        "{} scoring finished: {}x{} cells ({} failed) in {:.1}ms",
        kind,
        rows,
        cols,
        matrix.failures().len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score_function::GaussianDotScore;
    use crate::scorer::NblastOptions;
    use std::sync::Arc;

    fn cloud(id: u64, n: usize, y: f64) -> Dotprops {
        let points = (0..n).map(|i| [i as f64, y, 0.0]).collect();
        Dotprops::new(id, points, vec![[1.0, 0.0, 0.0]; n], None).unwrap()
    }

    fn scorer(mode: ScoreMode, parallel: bool) -> NblastScorer {
        NblastScorer::new(
            Arc::new(GaussianDotScore::new(2.0).unwrap()),
            NblastOptions {
                mode,
                parallel,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_failed_cells_are_isolated() {
        let clouds = vec![cloud(1, 5, 0.0), Dotprops::new(2, vec![], vec![], None).unwrap(), cloud(3, 3, 1.0)];
        let m = scorer(ScoreMode::Raw, false).all_by_all(&clouds).unwrap();

        assert_eq!(m.shape(), (3, 3));
        // row 1 fails as a query, column 1 fails as a target
        assert_eq!(m.failures().len(), 5);
        assert_eq!(m.error_at(1, 0), Some(&NblastError::EmptyQuery { id: 2 }));
        assert_eq!(m.error_at(0, 1), Some(&NblastError::EmptyTarget { id: 2 }));
        assert!(m.get(1, 1).is_none());
        assert!(m.get(0, 2).is_some());
        assert!(m.get(2, 0).is_some());
        assert!(!m.is_complete());

        let report = m.report();
        assert_eq!(report.scores[0][1], None);
        assert_eq!(report.failures.len(), 5);
        assert_eq!(report.failures[0].query_id, 1);
        assert_eq!(report.failures[0].target_id, 2);

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["mode"], "raw");
        assert!(json["scores"][1][1].is_null());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let clouds: Vec<Dotprops> = (0..6).map(|i| cloud(i, 4 + i as usize, i as f64 * 0.5)).collect();
        for mode in [ScoreMode::Raw, ScoreMode::Normalized, ScoreMode::Mean] {
            let seq = scorer(mode, false).all_by_all(&clouds).unwrap();
            let par = scorer(mode, true).all_by_all(&clouds).unwrap();
            assert_eq!(seq.scores(), par.scores());
        }
    }

    #[test]
    fn test_dedicated_pool() {
        let clouds: Vec<Dotprops> = (0..3).map(|i| cloud(i, 5, i as f64)).collect();
        let options = NblastOptions {
            max_threads: 2,
            ..Default::default()
        };
        let s = NblastScorer::new(Arc::new(GaussianDotScore::new(2.0).unwrap()), options);
        let m = s.all_by_all(&clouds).unwrap();
        assert!(m.is_complete());
        for i in 0..3 {
            assert_eq!(m.get(i, i), Some(1.0));
        }
    }

    #[test]
    fn test_top_matches() {
        let clouds = vec![cloud(10, 5, 0.0), cloud(11, 5, 5.0), cloud(12, 5, 1.0)];
        let m = scorer(ScoreMode::Normalized, true).all_by_all(&clouds).unwrap();
        let top = m.top_matches(0, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, 10);
        assert_eq!(top[1].0, 12);
        assert!(m.top_matches(7, 2).is_empty());
        assert_eq!(m.get_by_id(10, 12), m.get(0, 2));
    }
}
