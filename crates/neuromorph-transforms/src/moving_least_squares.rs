// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Affine moving-least-squares deformation (Schaefer et al. 2006).
//!
//! For each point `v`, landmarks are weighted by `1 / |p_i - v|²` and the
//! best affine map of weighted source to weighted target landmarks is
//! applied to `v`.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::landmarks::Landmarks;
use crate::{Point3, Transform, TransformError, TransformResult};

pub const MIN_MLS_LANDMARKS: usize = 4;

/// Moment matrices whose smallest singular value is below this fraction of
/// the largest are singular
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Landmarks", into = "Landmarks")]
pub struct MovingLeastSquares {
    landmarks: Landmarks,
}

impl MovingLeastSquares {
    pub fn new(source: Vec<Point3>, target: Vec<Point3>) -> TransformResult<Self> {
        Self::from_landmarks(Landmarks::new(source, target))
    }

    pub fn from_landmarks(landmarks: Landmarks) -> TransformResult<Self> {
        landmarks.validate(MIN_MLS_LANDMARKS)?;
        Ok(Self { landmarks })
    }

    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    fn map_point(&self, index: usize, v: &Point3) -> TransformResult<Point3> {
        let source = &self.landmarks.source;
        let target = &self.landmarks.target;
        let v = Vector3::from(*v);

        let mut weights = Vec::with_capacity(source.len());
        for (i, p) in source.iter().enumerate() {
            let d2 = (Vector3::from(*p) - v).norm_squared();
            if d2 == 0.0 {
                return Ok(target[i]);
            }
            weights.push(1.0 / d2);
        }

        let total: f64 = weights.iter().sum();
        let mut p_star = Vector3::zeros();
        let mut q_star = Vector3::zeros();
        for ((w, p), q) in weights.iter().zip(source).zip(target) {
            p_star += Vector3::from(*p) * *w;
            q_star += Vector3::from(*q) * *w;
        }
        p_star /= total;
        q_star /= total;

        let mut pp = Matrix3::zeros();
        let mut pq = Matrix3::zeros();
        for ((w, p), q) in weights.iter().zip(source).zip(target) {
            let p_hat = Vector3::from(*p) - p_star;
            let q_hat = Vector3::from(*q) - q_star;
            pp += p_hat * p_hat.transpose() * *w;
            pq += p_hat * q_hat.transpose() * *w;
        }

        // Coplanar landmarks give a moment matrix that is singular up to
        // rounding, so the determinant alone cannot be trusted
        let singular = || {
            TransformError::SingularSystem(format!(
                "moving least squares moment matrix is singular at point {}",
                index
            ))
        };
        let sv = pp.svd(false, false).singular_values;
        let largest = sv.max();
        if largest.is_nan() || largest <= 0.0 || sv.min() <= largest * RANK_TOLERANCE {
            return Err(singular());
        }
        let m = pp.try_inverse().ok_or_else(singular)? * pq;
        let out = m.transpose() * (v - p_star) + q_star;
        Ok([out[0], out[1], out[2]])
    }
}

impl Transform for MovingLeastSquares {
    fn xform(&self, points: &[Point3]) -> TransformResult<Vec<Point3>> {
        points
            .iter()
            .enumerate()
            .map(|(index, p)| {
                if p.iter().any(|c| !c.is_finite()) {
                    return Err(TransformError::NonFinite { what: "point", index });
                }
                self.map_point(index, p)
            })
            .collect()
    }

    fn inverse(&self) -> TransformResult<Box<dyn Transform>> {
        Ok(Box::new(Self {
            landmarks: self.landmarks.swapped(),
        }))
    }
}

impl TryFrom<Landmarks> for MovingLeastSquares {
    type Error = TransformError;

    fn try_from(landmarks: Landmarks) -> TransformResult<Self> {
        Self::from_landmarks(landmarks)
    }
}

impl From<MovingLeastSquares> for Landmarks {
    fn from(mls: MovingLeastSquares) -> Self {
        mls.landmarks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn source() -> Vec<Point3> {
        vec![
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [0.0, 10.0, 0.0],
            [0.0, 0.0, 10.0],
            [7.0, 8.0, 9.0],
        ]
    }

    #[test]
    fn test_landmarks_map_exactly() {
        let trg = vec![
            [1.0, 15.0, 5.0],
            [9.0, 18.0, 21.0],
            [80.0, 99.0, 120.0],
            [5.0, 10.0, 80.0],
            [3.0, 3.0, 3.0],
        ];
        let mls = MovingLeastSquares::new(source(), trg.clone()).unwrap();
        assert_eq!(mls.xform(&source()).unwrap(), trg);
    }

    #[test]
    fn test_global_affine_is_reproduced() {
        // x' = 2y + 1, y' = -x, z' = 3z - 4
        let affine = |p: &Point3| [2.0 * p[1] + 1.0, -p[0], 3.0 * p[2] - 4.0];
        let trg: Vec<Point3> = source().iter().map(affine).collect();
        let mls = MovingLeastSquares::new(source(), trg).unwrap();

        for p in [[1.0, 2.0, 3.0], [-5.0, 20.0, 0.5], [4.0, 4.0, 4.0]] {
            let out = mls.xform_point(&p).unwrap();
            let expected = affine(&p);
            for axis in 0..3 {
                assert_relative_eq!(out[axis], expected[axis], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_inverse_swaps_landmarks() {
        let trg: Vec<Point3> = source().iter().map(|p| [p[0] + 1.0, p[1] * 2.0, p[2]]).collect();
        let mls = MovingLeastSquares::new(source(), trg.clone()).unwrap();
        let inv = mls.inverse().unwrap();
        assert_eq!(inv.xform(&trg).unwrap(), source());
    }

    #[test]
    fn test_coplanar_landmarks_singular_off_landmark() {
        let flat = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
        let mls = MovingLeastSquares::new(flat.clone(), flat).unwrap();
        assert!(matches!(
            mls.xform(&[[0.5, 0.5, 1.0]]),
            Err(TransformError::SingularSystem(_))
        ));
        assert!(MovingLeastSquares::new(vec![[0.0; 3]], vec![[0.0; 3]]).is_err());
    }

    #[test]
    fn test_nearly_singular_moment_matrix_is_rejected() {
        // Three collinear landmarks plus one: coplanar, so the moment matrix
        // is only singular up to rounding
        let src = vec![
            [0.0, 0.0, 0.0],
            [10.0, 10.0, 10.0],
            [100.0, 100.0, 100.0],
            [80.0, 10.0, 30.0],
        ];
        let trg = vec![
            [1.0, 15.0, 5.0],
            [9.0, 18.0, 21.0],
            [80.0, 99.0, 120.0],
            [5.0, 10.0, 80.0],
        ];
        let mls = MovingLeastSquares::new(src, trg).unwrap();

        assert_eq!(mls.xform_point(&[0.0, 0.0, 0.0]).unwrap(), [1.0, 15.0, 5.0]);
        assert!(matches!(
            mls.xform_point(&[50.0, 50.0, 50.0]),
            Err(TransformError::SingularSystem(_))
        ));
    }
}
