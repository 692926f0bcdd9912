// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# Neuromorph NBLAST

Morphological similarity between neurons represented as dot clouds.

For every point of the query cloud the nearest point of the target cloud is
found; the distance and the absolute dot product of the two unit tangents
are mapped through a [`ScoreFunction`] (usually a binned [`ScoreTable`]) and
summed. The raw score can be normalised by the query's self-score or
averaged with the reverse direction ([`ScoreMode`]).

## Example

```rust
use std::sync::Arc;
use neuromorph_nblast::{GaussianDotScore, NblastOptions, NblastScorer};
use neuromorph_structures::Dotprops;

let points: Vec<[f64; 3]> = (0..10).map(|i| [i as f64, 0.0, 0.0]).collect();
let a = Dotprops::new(1, points.clone(), vec![[1.0, 0.0, 0.0]; 10], None).unwrap();

let scorer = NblastScorer::new(Arc::new(GaussianDotScore::new(3.0).unwrap()), NblastOptions::default());
assert_eq!(scorer.score(&a, &a).unwrap(), 1.0);
```
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod batch;
pub mod builder;
mod error;
pub mod score_function;
pub mod score_table;
pub mod scorer;

pub use batch::{CellFailure, FailureReport, ScoreMatrix, ScoreMatrixReport};
pub use builder::{ScoreTableBuilder, DEFAULT_EPSILON};
pub use error::{NblastError, NblastResult};
pub use score_function::{GaussianDotScore, ScoreFunction};
pub use score_table::{ScoreTable, DEFAULT_DISTANCE_BOUNDARIES, DEFAULT_DOT_BOUNDARIES};
pub use scorer::{raw_score, score, self_score, NblastOptions, NblastScorer, ScoreMode};
