// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Small vector helpers and axis-aligned bounding boxes

use neuromorph_spatial::Point3;
use serde::{Deserialize, Serialize};

#[inline]
pub fn sub(a: &Point3, b: &Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn dot(a: &Point3, b: &Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn norm(a: &Point3) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
pub fn cross(a: &Point3, b: &Point3) -> Point3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub fn midpoint(a: &Point3, b: &Point3) -> Point3 {
    [
        (a[0] + b[0]) * 0.5,
        (a[1] + b[1]) * 0.5,
        (a[2] + b[2]) * 0.5,
    ]
}

/// Scale `a` to unit length. Returns `None` for zero or non-finite vectors.
pub fn normalize(a: &Point3) -> Option<Point3> {
    let n = norm(a);
    if n > 0.0 && n.is_finite() {
        Some([a[0] / n, a[1] / n, a[2] / n])
    } else {
        None
    }
}

pub fn is_finite(p: &Point3) -> bool {
    p.iter().all(|c| c.is_finite())
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox {
    /// Tightest box around `points`, `None` when there are no points
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bbox = BoundingBox {
            min: first,
            max: first,
        };
        for p in iter {
            bbox.include(p);
        }
        Some(bbox)
    }

    pub fn include(&mut self, p: &Point3) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut out = *self;
        out.include(&other.min);
        out.include(&other.max);
        out
    }

    pub fn extent(&self) -> Point3 {
        sub(&self.max, &self.min)
    }

    pub fn diagonal(&self) -> f64 {
        norm(&self.extent())
    }

    pub fn contains(&self, p: &Point3) -> bool {
        (0..3).all(|axis| p[axis] >= self.min[axis] && p[axis] <= self.max[axis])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounding_box() {
        let points = [[0.0, 5.0, -1.0], [2.0, -3.0, 4.0], [1.0, 1.0, 1.0]];
        let bbox = BoundingBox::from_points(&points).unwrap();
        assert_eq!(bbox.min, [0.0, -3.0, -1.0]);
        assert_eq!(bbox.max, [2.0, 5.0, 4.0]);
        assert!(bbox.contains(&[1.0, 0.0, 0.0]));
        assert!(!bbox.contains(&[3.0, 0.0, 0.0]));
        assert_relative_eq!(bbox.diagonal(), (4.0f64 + 64.0 + 25.0).sqrt());
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_normalize() {
        let v = normalize(&[3.0, 0.0, 4.0]).unwrap();
        assert_relative_eq!(norm(&v), 1.0);
        assert!(normalize(&[0.0, 0.0, 0.0]).is_none());
        assert_eq!(cross(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
    }
}
