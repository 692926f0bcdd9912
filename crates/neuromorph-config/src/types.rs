// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to a section of `neuromorph_configuration.toml`. Every
//! field has a default, so a partial (or empty) file is valid.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NeuromorphConfig {
    pub system: SystemConfig,
    pub nblast: NblastConfig,
    pub dotprops: DotpropsConfig,
    pub table_builder: TableBuilderConfig,
    pub logging: LoggingConfig,
}

/// Process-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Worker threads for batch scoring (0 = rayon default)
    pub max_threads: usize,
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            max_threads: 0,
            log_level: "info".to_string(),
        }
    }
}

/// Similarity scoring configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NblastConfig {
    /// "raw", "normalized" or "mean"
    pub score_mode: String,
    pub use_alpha: bool,
    pub parallel: bool,
    /// "kd_tree" or "brute_force"
    pub index_backend: String,
    /// Width of the Gaussian score function used when no table is supplied
    pub gaussian_sigma: f64,
    /// Optional path to a JSON score table
    pub score_table: Option<String>,
}

impl Default for NblastConfig {
    fn default() -> Self {
        Self {
            score_mode: "normalized".to_string(),
            use_alpha: false,
            parallel: true,
            index_backend: "kd_tree".to_string(),
            gaussian_sigma: 3.0,
            score_table: None,
        }
    }
}

/// Dot cloud construction
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DotpropsConfig {
    pub k_neighbors: usize,
}

impl Default for DotpropsConfig {
    fn default() -> Self {
        Self { k_neighbors: 20 }
    }
}

/// Score table construction from reference pairs
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TableBuilderConfig {
    pub epsilon: f64,
    pub distance_boundaries: Vec<f64>,
    pub dot_boundaries: Vec<f64>,
}

impl Default for TableBuilderConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            distance_boundaries: vec![
                0.0, 0.75, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 12.0, 14.0,
                16.0, 20.0, 25.0, 30.0, 40.0, 500.0,
            ],
            dot_boundaries: vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// "text" or "json"
    pub format: String,
    /// Crates to log at debug level, e.g. `["neuromorph-nblast"]` or `["all"]`
    pub debug_crates: Vec<String>,
    /// Directory for log files; empty disables file logging
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            debug_crates: Vec::new(),
            log_dir: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: NeuromorphConfig = toml::from_str("").unwrap();
        assert_eq!(config, NeuromorphConfig::default());
    }

    #[test]
    fn test_partial_section() {
        let config: NeuromorphConfig = toml::from_str(
            r#"
            [nblast]
            score_mode = "mean"

            [table_builder]
            dot_boundaries = [0.0, 0.5, 1.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.nblast.score_mode, "mean");
        assert!(config.nblast.parallel);
        assert_eq!(config.table_builder.dot_boundaries, vec![0.0, 0.5, 1.0]);
        assert_eq!(config.table_builder.distance_boundaries.len(), 22);
    }

    #[test]
    fn test_json_round_trip() {
        let config = NeuromorphConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: NeuromorphConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
