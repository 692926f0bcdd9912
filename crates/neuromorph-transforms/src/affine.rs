// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};

use crate::{Point3, Transform, TransformError, TransformResult};

/// Homogeneous 4x4 transform, row-major, applied to column vectors `[x, y, z, 1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    matrix: [[f64; 4]; 4],
}

impl AffineTransform {
    pub fn new(matrix: [[f64; 4]; 4]) -> TransformResult<Self> {
        for (r, row) in matrix.iter().enumerate() {
            if row.iter().any(|v| !v.is_finite()) {
                return Err(TransformError::NonFinite {
                    what: "matrix row",
                    index: r,
                });
            }
        }
        Ok(Self { matrix })
    }

    pub fn identity() -> Self {
        Self {
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    pub fn translation(t: Point3) -> Self {
        let mut out = Self::identity();
        for axis in 0..3 {
            out.matrix[axis][3] = t[axis];
        }
        out
    }

    pub fn scaling(s: Point3) -> Self {
        let mut out = Self::identity();
        for axis in 0..3 {
            out.matrix[axis][axis] = s[axis];
        }
        out
    }

    /// Linear part plus translation
    pub fn from_parts(linear: [[f64; 3]; 3], translation: Point3) -> TransformResult<Self> {
        let mut m = Self::identity().matrix;
        for r in 0..3 {
            m[r][..3].copy_from_slice(&linear[r]);
            m[r][3] = translation[r];
        }
        Self::new(m)
    }

    pub fn matrix(&self) -> &[[f64; 4]; 4] {
        &self.matrix
    }

    /// `self` followed by `next`
    pub fn then(&self, next: &AffineTransform) -> AffineTransform {
        Self::from_na(&(next.to_na() * self.to_na()))
    }

    fn to_na(&self) -> Matrix4<f64> {
        Matrix4::from_fn(|r, c| self.matrix[r][c])
    }

    fn from_na(m: &Matrix4<f64>) -> Self {
        let mut matrix = [[0.0; 4]; 4];
        for (r, row) in matrix.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = m[(r, c)];
            }
        }
        Self { matrix }
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform for AffineTransform {
    fn xform(&self, points: &[Point3]) -> TransformResult<Vec<Point3>> {
        let m = self.to_na();
        points
            .iter()
            .enumerate()
            .map(|(index, p)| {
                let h = m * Vector4::new(p[0], p[1], p[2], 1.0);
                let w = h[3];
                if w == 0.0 || !w.is_finite() {
                    return Err(TransformError::NonFinite {
                        what: "homogeneous coordinate",
                        index,
                    });
                }
                Ok([h[0] / w, h[1] / w, h[2] / w])
            })
            .collect()
    }

    fn inverse(&self) -> TransformResult<Box<dyn Transform>> {
        let inv = self
            .to_na()
            .try_inverse()
            .ok_or_else(|| TransformError::NotInvertible("singular affine matrix".to_string()))?;
        Ok(Box::new(Self::from_na(&inv)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_translate_and_scale() {
        let t = AffineTransform::translation([1.0, 2.0, 3.0]);
        assert_eq!(t.xform(&[[0.0, 0.0, 0.0]]).unwrap(), vec![[1.0, 2.0, 3.0]]);

        let s = AffineTransform::scaling([2.0, 2.0, 0.5]).then(&t);
        assert_eq!(s.xform_point(&[1.0, 1.0, 4.0]).unwrap(), [3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_inverse_round_trip() {
        let a = AffineTransform::from_parts(
            [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 2.0]],
            [5.0, -3.0, 1.0],
        )
        .unwrap();
        let inv = a.inverse().unwrap();
        let pts = vec![[1.0, 2.0, 3.0], [-4.0, 0.5, 10.0]];
        let back = inv.xform(&a.xform(&pts).unwrap()).unwrap();
        for (p, q) in pts.iter().zip(&back) {
            for axis in 0..3 {
                assert_relative_eq!(p[axis], q[axis], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_singular_not_invertible() {
        let flat = AffineTransform::scaling([1.0, 1.0, 0.0]);
        assert!(matches!(flat.inverse(), Err(TransformError::NotInvertible(_))));
        assert!(AffineTransform::new([[f64::NAN; 4]; 4]).is_err());
    }
}
