// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Neuromorph Transforms

Point transforms for moving neurons between coordinate spaces:
- [`AffineTransform`]: 4x4 homogeneous matrix
- [`ThinPlateSpline`]: landmark-based warp (kernel `U(r) = r`)
- [`MovingLeastSquares`]: landmark-based affine MLS deformation
- [`TransformSequence`]: ordered chain of transforms

[`xform_neuron`] applies any of them to a skeleton, mesh or dot cloud.
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod affine;
mod error;
mod landmarks;
pub mod moving_least_squares;
pub mod neuron;
pub mod sequence;
pub mod thinplate;

pub use affine::AffineTransform;
pub use error::{TransformError, TransformResult};
pub use landmarks::Landmarks;
pub use moving_least_squares::MovingLeastSquares;
pub use neuron::{xform_dotprops, xform_neuron};
pub use sequence::TransformSequence;
pub use thinplate::ThinPlateSpline;

pub use neuromorph_structures::Point3;

/// A mapping of 3D points from one space to another
pub trait Transform: Send + Sync + std::fmt::Debug {
    /// Transform points; output order matches input order
    fn xform(&self, points: &[Point3]) -> TransformResult<Vec<Point3>>;

    /// The transform mapping back to the source space
    fn inverse(&self) -> TransformResult<Box<dyn Transform>>;

    fn xform_point(&self, point: &Point3) -> TransformResult<Point3> {
        let mut out = self.xform(std::slice::from_ref(point))?;
        out.pop().ok_or_else(|| {
            TransformError::NonFinite {
                what: "transformed point",
                index: 0,
            }
        })
    }
}
