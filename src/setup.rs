// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Turning a loaded [`NeuromorphConfig`] into ready-to-use components.
//!
//! The configuration crate keeps enumerated settings as strings so it has no
//! dependency on the algorithm crates; they are parsed here.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use neuromorph_config::{ConfigError, NeuromorphConfig};
use neuromorph_nblast::{
    GaussianDotScore, NblastError, NblastOptions, NblastScorer, ScoreFunction, ScoreMode,
    ScoreTable, ScoreTableBuilder,
};
use neuromorph_observability::{CrateDebugFlags, LogFormat, LogOptions};
use neuromorph_spatial::{IndexBackend, SpatialError};
use neuromorph_structures::{Dotprops, NeuronList, StructureError};

/// Errors raised while assembling components from configuration
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Nblast(#[from] NblastError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid logging setting: {0}")]
    Logging(String),
}

pub type SetupResult<T> = Result<T, SetupError>;

/// Scoring options from the `[nblast]` and `[system]` sections
pub fn nblast_options(config: &NeuromorphConfig) -> SetupResult<NblastOptions> {
    let mode: ScoreMode = config.nblast.score_mode.parse()?;
    Ok(NblastOptions {
        mode,
        use_alpha: config.nblast.use_alpha,
        parallel: config.nblast.parallel,
        max_threads: config.system.max_threads,
    })
}

pub fn index_backend(config: &NeuromorphConfig) -> SetupResult<IndexBackend> {
    Ok(config.nblast.index_backend.parse()?)
}

/// The configured score table, or a Gaussian score when no table path is set
pub fn score_function(config: &NeuromorphConfig) -> SetupResult<Arc<dyn ScoreFunction>> {
    match config.nblast.score_table.as_deref() {
        Some(path) if !path.is_empty() => {
            let table = load_score_table(Path::new(path))?;
            tracing::info!(
                target: "neuromorph",
                "Loaded {}x{} score table from {}",
                table.shape().0,
                table.shape().1,
                path
            );
            Ok(Arc::new(table))
        }
        _ => {
            tracing::debug!(
                target: "neuromorph",
                "No score table configured, using Gaussian score (sigma = {})",
                config.nblast.gaussian_sigma
            );
            Ok(Arc::new(GaussianDotScore::new(config.nblast.gaussian_sigma)?))
        }
    }
}

pub fn scorer_from_config(config: &NeuromorphConfig) -> SetupResult<NblastScorer> {
    Ok(NblastScorer::new(score_function(config)?, nblast_options(config)?))
}

/// Neighbourhood size for tangent estimation from the `[dotprops]` section
pub fn dotprops_k(config: &NeuromorphConfig) -> usize {
    config.dotprops.k_neighbors
}

/// Convert every neuron to a dot cloud with the configured `k` and index backend.
///
/// Skeletons are sampled at their nodes (not edge midpoints) so that `k`
/// applies to every kind of neuron.
pub fn neurons_to_dotprops(
    neurons: &NeuronList,
    config: &NeuromorphConfig,
) -> SetupResult<Vec<Dotprops>> {
    let backend = index_backend(config)?;
    let clouds = neurons.to_dotprops(Some(dotprops_k(config)))?;
    Ok(clouds
        .into_iter()
        .map(|c| c.with_index_backend(backend))
        .collect())
}

/// Table builder from the `[table_builder]` section
pub fn table_builder(config: &NeuromorphConfig) -> SetupResult<ScoreTableBuilder> {
    let builder = ScoreTableBuilder::new(
        config.table_builder.distance_boundaries.clone(),
        config.table_builder.dot_boundaries.clone(),
    )?
    .with_epsilon(config.table_builder.epsilon)?
    .with_alpha(config.nblast.use_alpha);
    Ok(builder)
}

/// Read a score table written as JSON
pub fn load_score_table(path: &Path) -> SetupResult<ScoreTable> {
    let raw = fs::read_to_string(path).map_err(|source| SetupError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SetupError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Logging options from the `[system]` and `[logging]` sections
pub fn log_options(config: &NeuromorphConfig) -> SetupResult<LogOptions> {
    let format: LogFormat = config
        .logging
        .format
        .parse()
        .map_err(|e: neuromorph_observability::ObservabilityError| {
            SetupError::Logging(e.to_string())
        })?;
    let log_dir = if config.logging.log_dir.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(&config.logging.log_dir))
    };
    Ok(LogOptions {
        level: config.system.log_level.to_lowercase(),
        format,
        log_dir,
        ..LogOptions::default()
    })
}

/// Debug flags from the configuration merged with command-line flags
pub fn debug_flags(config: &NeuromorphConfig, mut cli_flags: CrateDebugFlags) -> CrateDebugFlags {
    cli_flags.extend_from(&config.logging.debug_crates);
    cli_flags
}
