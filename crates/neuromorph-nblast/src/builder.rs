// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Log-odds score table construction from reference pairs.
//!
//! Each pair contributes one `(distance, |dot|)` sample per query point.
//! Matching and non-matching samples are histogrammed over the same bins,
//! each histogram is normalised to probabilities, and every cell becomes
//! `log2((p_match + ε) / (p_nonmatch + ε))`.

use ndarray::Array2;
use neuromorph_structures::Dotprops;
use rayon::prelude::*;

use crate::score_table::{digitize, validate_boundaries, ScoreTable};
use crate::scorer::visit_nearest;
use crate::{NblastError, NblastResult};

/// Default pseudo-probability added to both histograms
pub const DEFAULT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct ScoreTableBuilder {
    dist_boundaries: Vec<f64>,
    dot_boundaries: Vec<f64>,
    epsilon: f64,
    use_alpha: bool,
}

impl ScoreTableBuilder {
    pub fn new(dist_boundaries: Vec<f64>, dot_boundaries: Vec<f64>) -> NblastResult<Self> {
        validate_boundaries("distance", &dist_boundaries)?;
        validate_boundaries("dot", &dot_boundaries)?;
        Ok(Self {
            dist_boundaries,
            dot_boundaries,
            epsilon: DEFAULT_EPSILON,
            use_alpha: false,
        })
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> NblastResult<Self> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(NblastError::InvalidParameter(format!(
                "epsilon must be positive and finite, got {}",
                epsilon
            )));
        }
        self.epsilon = epsilon;
        Ok(self)
    }

    pub fn with_alpha(mut self, use_alpha: bool) -> Self {
        self.use_alpha = use_alpha;
        self
    }

    /// Build a table from index pairs `(query, target)` into `clouds`
    pub fn build(
        &self,
        clouds: &[Dotprops],
        matching: &[(usize, usize)],
        nonmatching: &[(usize, usize)],
    ) -> NblastResult<ScoreTable> {
        if matching.is_empty() {
            return Err(NblastError::InvalidParameter(
                "no matching pairs given".to_string(),
            ));
        }
        if nonmatching.is_empty() {
            return Err(NblastError::InvalidParameter(
                "no non-matching pairs given".to_string(),
            ));
        }

        let matched = self.histogram(clouds, matching)?;
        let unmatched = self.histogram(clouds, nonmatching)?;
        tracing::debug!(
            target: "neuromorph-nblast",
            "Table histograms: {} matching samples from {} pairs, {} non-matching from {} pairs",
            matched.sum(),
            matching.len(),
            unmatched.sum(),
            nonmatching.len()
        );

        let p_match = to_probabilities(matched)?;
        let p_nonmatch = to_probabilities(unmatched)?;
        let eps = self.epsilon;
        let cells = ndarray::Zip::from(&p_match)
            .and(&p_nonmatch)
            .map_collect(|&m, &n| ((m + eps) / (n + eps)).log2());

        ScoreTable::new(self.dist_boundaries.clone(), self.dot_boundaries.clone(), cells)
    }

    /// Sample counts over all pairs, accumulated per pair in parallel
    pub fn histogram(&self, clouds: &[Dotprops], pairs: &[(usize, usize)]) -> NblastResult<Array2<f64>> {
        let shape = (self.dist_boundaries.len() - 1, self.dot_boundaries.len() - 1);
        pairs
            .par_iter()
            .map(|&(q, t)| {
                let query = cloud_at(clouds, q)?;
                let target = cloud_at(clouds, t)?;
                self.pair_counts(query, target, shape)
            })
            .try_reduce(|| Array2::zeros(shape), |a, b| Ok(a + b))
    }

    fn pair_counts(
        &self,
        query: &Dotprops,
        target: &Dotprops,
        shape: (usize, usize),
    ) -> NblastResult<Array2<f64>> {
        let mut counts = Array2::zeros(shape);
        visit_nearest(query, target, self.use_alpha, |distance, d| {
            let cell = [
                digitize(&self.dist_boundaries, distance),
                digitize(&self.dot_boundaries, d),
            ];
            counts[cell] += 1.0;
        })?;
        Ok(counts)
    }
}

fn cloud_at(clouds: &[Dotprops], idx: usize) -> NblastResult<&Dotprops> {
    clouds.get(idx).ok_or_else(|| {
        NblastError::InvalidParameter(format!(
            "pair index {} out of range for {} clouds",
            idx,
            clouds.len()
        ))
    })
}

fn to_probabilities(counts: Array2<f64>) -> NblastResult<Array2<f64>> {
    let total = counts.sum();
    if total <= 0.0 {
        return Err(NblastError::InvalidParameter(
            "histogram has no samples".to_string(),
        ));
    }
    Ok(counts / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(id: u64, n: usize, y: f64, dir: [f64; 3]) -> Dotprops {
        let points = (0..n).map(|i| [i as f64, y, 0.0]).collect();
        Dotprops::new(id, points, vec![dir; n], None).unwrap()
    }

    fn clouds() -> Vec<Dotprops> {
        vec![
            line(0, 10, 0.0, [1.0, 0.0, 0.0]),
            line(1, 10, 0.5, [1.0, 0.0, 0.0]),
            line(2, 10, 8.0, [0.0, 1.0, 0.0]),
        ]
    }

    fn builder() -> ScoreTableBuilder {
        ScoreTableBuilder::new(vec![0.0, 1.0, 5.0, 10.0], vec![0.0, 0.5, 1.0]).unwrap()
    }

    #[test]
    fn test_histogram_counts() {
        let h = builder().histogram(&clouds(), &[(0, 1), (1, 0)]).unwrap();
        assert_eq!(h.sum(), 20.0);
        // distance 0.5, parallel tangents
        assert_eq!(h[[0, 1]], 20.0);

        let h = builder().histogram(&clouds(), &[(0, 2)]).unwrap();
        // distance 8 to the nearest point, perpendicular tangents
        assert_eq!(h[[2, 0]], 10.0);
    }

    #[test]
    fn test_build_log_odds() {
        let table = builder()
            .build(&clouds(), &[(0, 1), (1, 0)], &[(0, 2), (2, 0)])
            .unwrap();
        let eps = DEFAULT_EPSILON;
        assert_relative_eq!(table.cells()[[0, 1]], ((1.0 + eps) / eps).log2());
        assert_relative_eq!(table.cells()[[2, 0]], (eps / (1.0 + eps)).log2());
        assert_relative_eq!(table.cells()[[1, 0]], 0.0);
        assert!(table.lookup(0.5, 1.0) > table.lookup(8.0, 0.0));
    }

    #[test]
    fn test_histogram_agrees_with_raw_score() {
        let points: Vec<[f64; 3]> = (0..12).map(|i| [i as f64 * 0.7, (i % 3) as f64, 0.0]).collect();
        let diag = std::f64::consts::FRAC_1_SQRT_2;
        let vectors = (0..12)
            .map(|i| if i % 2 == 0 { [1.0, 0.0, 0.0] } else { [diag, diag, 0.0] })
            .collect();
        let alpha = (0..12).map(|i| 0.2 + 0.05 * i as f64).collect();
        let query = Dotprops::new(9, points, vectors, Some(alpha)).unwrap();
        let target = line(10, 10, 1.3, [1.0, 0.0, 0.0]);
        let target = Dotprops::new(
            10,
            target.points().to_vec(),
            target.vectors().to_vec(),
            Some(vec![0.6; 10]),
        )
        .unwrap();
        let pair = vec![query, target];

        let table = ScoreTable::from_fn(vec![0.0, 1.0, 5.0, 10.0], vec![0.0, 0.5, 1.0], |d, t| {
            3.0 * t - 0.4 * d
        })
        .unwrap();
        for use_alpha in [false, true] {
            let counts = builder().with_alpha(use_alpha).histogram(&pair, &[(0, 1)]).unwrap();
            let from_counts: f64 = (&counts * table.cells()).sum();
            let raw = crate::raw_score(&pair[0], &pair[1], &table, use_alpha).unwrap();
            assert_relative_eq!(raw, from_counts, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_build_errors() {
        let b = builder();
        let c = clouds();
        assert!(b.build(&c, &[], &[(0, 2)]).is_err());
        assert!(b.build(&c, &[(0, 1)], &[]).is_err());
        assert!(matches!(
            b.build(&c, &[(0, 7)], &[(0, 2)]),
            Err(NblastError::InvalidParameter(_))
        ));
        assert!(builder().with_epsilon(0.0).is_err());
        assert!(ScoreTableBuilder::new(vec![1.0], vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_empty_cloud_in_pairs() {
        let mut c = clouds();
        c.push(Dotprops::new(3, vec![], vec![], None).unwrap());
        assert_eq!(
            builder().build(&c, &[(3, 0)], &[(0, 2)]),
            Err(NblastError::EmptyQuery { id: 3 })
        );
    }
}
