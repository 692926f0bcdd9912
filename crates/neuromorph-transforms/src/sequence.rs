// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{Point3, Transform, TransformResult};

/// Transforms applied in insertion order. An empty sequence is the identity.
#[derive(Debug, Default)]
pub struct TransformSequence {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transform: impl Transform + 'static) {
        self.transforms.push(Box::new(transform));
    }

    pub fn push_boxed(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl FromIterator<Box<dyn Transform>> for TransformSequence {
    fn from_iter<I: IntoIterator<Item = Box<dyn Transform>>>(iter: I) -> Self {
        Self {
            transforms: iter.into_iter().collect(),
        }
    }
}

impl Transform for TransformSequence {
    fn xform(&self, points: &[Point3]) -> TransformResult<Vec<Point3>> {
        let mut current = points.to_vec();
        for (step, t) in self.transforms.iter().enumerate() {
            current = t.xform(&current)?;
            tracing::trace!(target: "neuromorph-transforms", "Applied step {} of {}", step + 1, self.transforms.len());
        }
        Ok(current)
    }

    fn inverse(&self) -> TransformResult<Box<dyn Transform>> {
        let inverted = self
            .transforms
            .iter()
            .rev()
            .map(|t| t.inverse())
            .collect::<TransformResult<TransformSequence>>()?;
        Ok(Box::new(inverted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AffineTransform, TransformError};
    use approx::assert_relative_eq;

    #[test]
    fn test_order_and_inverse() {
        let mut seq = TransformSequence::new();
        seq.push(AffineTransform::scaling([2.0, 2.0, 2.0]));
        seq.push(AffineTransform::translation([1.0, 0.0, 0.0]));
        assert_eq!(seq.len(), 2);

        // scale first, then translate
        let out = seq.xform_point(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(out, [3.0, 2.0, 2.0]);

        let back = seq.inverse().unwrap().xform_point(&out).unwrap();
        for axis in 0..3 {
            assert_relative_eq!(back[axis], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_empty_is_identity() {
        let seq = TransformSequence::new();
        assert_eq!(seq.xform(&[[1.0, 2.0, 3.0]]).unwrap(), vec![[1.0, 2.0, 3.0]]);
        assert!(seq.inverse().is_ok());
    }

    #[test]
    fn test_non_invertible_step_fails_inverse() {
        let mut seq = TransformSequence::new();
        seq.push(AffineTransform::translation([1.0, 0.0, 0.0]));
        seq.push(AffineTransform::scaling([0.0, 1.0, 1.0]));
        assert!(matches!(seq.inverse(), Err(TransformError::NotInvertible(_))));
    }
}
