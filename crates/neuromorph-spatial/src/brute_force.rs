// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Linear-scan nearest-neighbour index

use crate::{
    check_points, check_query, squared_distance, Neighbor, Point3, SpatialError, SpatialIndex,
    SpatialResult,
};

/// Exhaustive search over all points.
///
/// O(n) per query. Scans in insertion order and only replaces the current
/// best on a strictly smaller distance, so ties resolve to the lowest index.
#[derive(Debug, Clone)]
pub struct BruteForceIndex {
    points: Vec<Point3>,
}

impl BruteForceIndex {
    pub fn build(points: &[Point3]) -> SpatialResult<Self> {
        check_points(points)?;
        Ok(Self {
            points: points.to_vec(),
        })
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }
}

impl SpatialIndex for BruteForceIndex {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn nearest(&self, query: &Point3) -> SpatialResult<Neighbor> {
        check_query(query)?;
        let mut best: Option<(usize, f64)> = None;
        for (index, point) in self.points.iter().enumerate() {
            let d2 = squared_distance(query, point);
            match best {
                Some((_, best_d2)) if d2 >= best_d2 => {}
                _ => best = Some((index, d2)),
            }
        }
        best.map(|(index, d2)| Neighbor {
            index,
            distance: d2.sqrt(),
        })
        .ok_or(SpatialError::EmptyIndex)
    }

    fn k_nearest(&self, query: &Point3, k: usize) -> SpatialResult<Vec<Neighbor>> {
        check_query(query)?;
        if self.points.is_empty() {
            return Err(SpatialError::EmptyIndex);
        }
        let mut all: Vec<(usize, f64)> = self
            .points
            .iter()
            .enumerate()
            .map(|(index, point)| (index, squared_distance(query, point)))
            .collect();
        all.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        all.truncate(k);
        Ok(all
            .into_iter()
            .map(|(index, d2)| Neighbor {
                index,
                distance: d2.sqrt(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_nearest_simple() {
        let index =
            BruteForceIndex::build(&[[0.0, 0.0, 0.0], [3.0, 4.0, 0.0], [10.0, 0.0, 0.0]]).unwrap();
        let n = index.nearest(&[3.0, 3.0, 0.0]).unwrap();
        assert_eq!(n.index, 1);
        assert_relative_eq!(n.distance, 1.0);
    }

    #[test]
    fn test_tie_goes_to_first_inserted() {
        let index = BruteForceIndex::build(&[[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]]).unwrap();
        assert_eq!(index.nearest(&[0.0, 0.0, 0.0]).unwrap().index, 0);
    }

    #[test]
    fn test_empty_index() {
        let index = BruteForceIndex::build(&[]).unwrap();
        assert_eq!(index.nearest(&[0.0; 3]), Err(SpatialError::EmptyIndex));
        assert!(index.k_nearest(&[0.0; 3], 3).is_err());
    }

    #[test]
    fn test_k_nearest_sorted_and_clamped() {
        let index = BruteForceIndex::build(&[
            [5.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
        ])
        .unwrap();
        let result = index.k_nearest(&[0.0; 3], 10).unwrap();
        let order: Vec<usize> = result.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
    }
}
