// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Thin-plate spline warp between paired landmarks.
//!
//! With kernel `U(r) = r` and affine basis `[1, x, y, z]`, the coefficients
//! solve
//!
//! ```text
//! | K   P | | W |   | Y |
//! | Pᵀ  0 | | A | = | 0 |
//! ```
//!
//! where `K[i][j] = |s_i - s_j|`, `P[i] = [1, s_i]` and `Y` are the target
//! landmarks. A point `v` maps to `[1, v]·A + Σ_j |v - s_j| W_j`.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::landmarks::Landmarks;
use crate::{Point3, Transform, TransformError, TransformResult};

/// Smallest landmark count that determines the affine part in 3D
pub const MIN_TPS_LANDMARKS: usize = 4;

/// Singular values below this fraction of the largest are treated as zero
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Landmarks", into = "Landmarks")]
pub struct ThinPlateSpline {
    landmarks: Landmarks,
    /// `n x 3` kernel weights
    weights: DMatrix<f64>,
    /// `4 x 3` affine coefficients
    affine: DMatrix<f64>,
}

impl ThinPlateSpline {
    pub fn new(source: Vec<Point3>, target: Vec<Point3>) -> TransformResult<Self> {
        Self::from_landmarks(Landmarks::new(source, target))
    }

    pub fn from_landmarks(landmarks: Landmarks) -> TransformResult<Self> {
        landmarks.validate(MIN_TPS_LANDMARKS)?;
        let n = landmarks.len();
        let src = &landmarks.source;

        let size = n + 4;
        let mut system = DMatrix::<f64>::zeros(size, size);
        let mut rhs = DMatrix::<f64>::zeros(size, 3);
        for i in 0..n {
            for j in (i + 1)..n {
                let r = distance(&src[i], &src[j]);
                system[(i, j)] = r;
                system[(j, i)] = r;
            }
            let basis = [1.0, src[i][0], src[i][1], src[i][2]];
            for (k, b) in basis.iter().enumerate() {
                system[(i, n + k)] = *b;
                system[(n + k, i)] = *b;
            }
            for axis in 0..3 {
                rhs[(i, axis)] = landmarks.target[i][axis];
            }
        }

        // Minimum-norm solve: coplanar landmarks leave the affine part
        // underdetermined off their plane but still interpolate exactly
        let svd = system.svd(true, true);
        let tol = svd.singular_values.max() * RANK_TOLERANCE;
        let rank = svd.rank(tol);
        if rank < size {
            tracing::warn!(
                target: "neuromorph-transforms",
                "Thin-plate spline system is rank deficient ({} of {}), landmarks may be coplanar",
                rank,
                size
            );
        }
        let solution = svd
            .solve(&rhs, tol)
            .map_err(|e| TransformError::SingularSystem(e.to_string()))?;
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(TransformError::SingularSystem(
                "thin-plate spline coefficients are not finite".to_string(),
            ));
        }

        tracing::debug!(target: "neuromorph-transforms", "Fitted thin-plate spline on {} landmarks", n);
        Ok(Self {
            weights: solution.rows(0, n).into_owned(),
            affine: solution.rows(n, 4).into_owned(),
            landmarks,
        })
    }

    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    fn map_point(&self, v: &Point3) -> Point3 {
        let basis = [1.0, v[0], v[1], v[2]];
        let mut out = [0.0; 3];
        for (axis, o) in out.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, b) in basis.iter().enumerate() {
                acc += b * self.affine[(k, axis)];
            }
            for (j, s) in self.landmarks.source.iter().enumerate() {
                acc += distance(v, s) * self.weights[(j, axis)];
            }
            *o = acc;
        }
        out
    }
}

impl Transform for ThinPlateSpline {
    fn xform(&self, points: &[Point3]) -> TransformResult<Vec<Point3>> {
        if let Some(index) = points.iter().position(|p| p.iter().any(|c| !c.is_finite())) {
            return Err(TransformError::NonFinite { what: "point", index });
        }
        Ok(points.iter().map(|p| self.map_point(p)).collect())
    }

    fn inverse(&self) -> TransformResult<Box<dyn Transform>> {
        Ok(Box::new(Self::from_landmarks(self.landmarks.swapped())?))
    }
}

impl TryFrom<Landmarks> for ThinPlateSpline {
    type Error = TransformError;

    fn try_from(landmarks: Landmarks) -> TransformResult<Self> {
        Self::from_landmarks(landmarks)
    }
}

impl From<ThinPlateSpline> for Landmarks {
    fn from(tps: ThinPlateSpline) -> Self {
        tps.landmarks
    }
}

fn distance(a: &Point3, b: &Point3) -> f64 {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn landmarks() -> (Vec<Point3>, Vec<Point3>) {
        (
            vec![[0.0, 0.0, 0.0], [10.0, 10.0, 10.0], [100.0, 100.0, 100.0], [80.0, 10.0, 30.0]],
            vec![[1.0, 15.0, 5.0], [9.0, 18.0, 21.0], [80.0, 99.0, 120.0], [5.0, 10.0, 80.0]],
        )
    }

    #[test]
    fn test_reproduces_landmarks() {
        let (src, trg) = landmarks();
        let tps = ThinPlateSpline::new(src.clone(), trg.clone()).unwrap();
        let out = tps.xform(&src).unwrap();
        for (o, t) in out.iter().zip(&trg) {
            for axis in 0..3 {
                assert_relative_eq!(o[axis], t[axis], epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_known_interpolation() {
        let (src, trg) = landmarks();
        let tps = ThinPlateSpline::new(src, trg).unwrap();
        let out = tps.xform_point(&[50.0, 50.0, 50.0]).unwrap();
        assert_relative_eq!(out[0], 40.55555556, epsilon = 1e-6);
        assert_relative_eq!(out[1], 54.0, epsilon = 1e-6);
        assert_relative_eq!(out[2], 65.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inverse_maps_targets_back() {
        let (src, trg) = landmarks();
        let inv = ThinPlateSpline::new(src.clone(), trg.clone()).unwrap().inverse().unwrap();
        let out = inv.xform(&trg).unwrap();
        for (o, s) in out.iter().zip(&src) {
            for axis in 0..3 {
                assert_relative_eq!(o[axis], s[axis], epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_off_plane_point_stays_finite() {
        let (src, trg) = landmarks();
        let tps = ThinPlateSpline::new(src, trg).unwrap();
        let out = tps.xform_point(&[0.0, 100.0, 0.0]).unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_landmark_validation() {
        let (src, trg) = landmarks();
        assert_eq!(
            ThinPlateSpline::new(src[..3].to_vec(), trg[..3].to_vec()).unwrap_err(),
            TransformError::InsufficientLandmarks { required: 4, actual: 3 }
        );
        assert!(matches!(
            ThinPlateSpline::new(src, trg[..3].to_vec()),
            Err(TransformError::LandmarkMismatch { .. })
        ));
    }

    #[test]
    fn test_serde_refits() {
        let (src, trg) = landmarks();
        let tps = ThinPlateSpline::new(src, trg).unwrap();
        let json = serde_json::to_string(&tps).unwrap();
        let back: ThinPlateSpline = serde_json::from_str(&json).unwrap();
        assert_eq!(back.landmarks(), tps.landmarks());
        assert_eq!(
            back.xform_point(&[1.0, 2.0, 3.0]).unwrap(),
            tps.xform_point(&[1.0, 2.0, 3.0]).unwrap()
        );
    }
}
