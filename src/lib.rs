// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neuromorph
//!
//! Neuron morphology toolkit: skeletons, meshes and dot clouds, NBLAST-style
//! morphological similarity scoring, and spatial transforms between
//! coordinate spaces.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! neuromorph = "0.1"
//! ```
//!
//! ```rust
//! use std::sync::Arc;
//! use neuromorph::prelude::*;
//!
//! let points: Vec<[f64; 3]> = (0..20).map(|i| [i as f64, 0.0, 0.0]).collect();
//! let cloud = Dotprops::from_points(1, points, 5)?;
//!
//! let scorer = NblastScorer::new(Arc::new(GaussianDotScore::new(3.0)?), NblastOptions::default());
//! let matrix = scorer.all_by_all(&[cloud])?;
//! assert_eq!(matrix.get(0, 0), Some(1.0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`transforms`** (default): affine, thin-plate spline and moving least
//!   squares transforms
//! - **`file-logging`** (default): JSON log files in timestamped run folders
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: neuromorph-spatial, neuromorph-structures  │
//! │  (k-d tree, skeletons, meshes, dot clouds)              │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Algorithms: neuromorph-nblast, neuromorph-transforms   │
//! │  (similarity scoring, coordinate transforms)            │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Infrastructure: neuromorph-config, -observability      │
//! │  (TOML configuration, logging)                          │
//! └─────────────────────────────────────────────────────────┘
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod setup;

// Re-export foundation
pub use neuromorph_spatial as spatial;
pub use neuromorph_structures as structures;

// Re-export algorithms
pub use neuromorph_nblast as nblast;

#[cfg(feature = "transforms")]
pub use neuromorph_transforms as transforms;

// Re-export infrastructure
pub use neuromorph_config as config;
pub use neuromorph_observability as observability;

pub use setup::{SetupError, SetupResult};

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::spatial::{IndexBackend, Neighbor, Point3, SpatialIndex};
    pub use crate::structures::{
        BoundingBox, Dotprops, MeshNeuron, Morphology, Neuron, NeuronKind, NeuronList,
        SkeletonNode, TreeNeuron,
    };

    pub use crate::nblast::{
        GaussianDotScore, NblastOptions, NblastScorer, ScoreFunction, ScoreMatrix, ScoreMode,
        ScoreTable, ScoreTableBuilder,
    };

    #[cfg(feature = "transforms")]
    pub use crate::transforms::{
        xform_neuron, AffineTransform, Landmarks, MovingLeastSquares, ThinPlateSpline, Transform,
        TransformSequence,
    };

    pub use crate::config::NeuromorphConfig;
    pub use crate::setup::scorer_from_config;
}
