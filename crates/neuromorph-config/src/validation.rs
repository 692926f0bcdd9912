// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! All problems are collected and reported together in one
//! `ConfigError::ValidationError`.

use crate::{ConfigError, ConfigResult, NeuromorphConfig};

const SCORE_MODES: [&str; 3] = ["raw", "normalized", "mean"];
const INDEX_BACKENDS: [&str; 2] = ["kd_tree", "brute_force"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidValue { field: String, reason: String },
    InvalidBoundaries { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::InvalidBoundaries { field, reason } => {
                write!(f, "Invalid bin boundaries in {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &NeuromorphConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_choices(config, &mut errors);
    validate_value_ranges(config, &mut errors);
    validate_boundaries(
        "table_builder.distance_boundaries",
        &config.table_builder.distance_boundaries,
        &mut errors,
    );
    validate_boundaries(
        "table_builder.dot_boundaries",
        &config.table_builder.dot_boundaries,
        &mut errors,
    );

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn check_choice(field: &str, value: &str, allowed: &[&str], errors: &mut Vec<ConfigValidationError>) {
    if !allowed.contains(&value.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{}' is not one of {}", value, allowed.join(", ")),
        });
    }
}

/// Validate enumerated string settings
fn validate_choices(config: &NeuromorphConfig, errors: &mut Vec<ConfigValidationError>) {
    check_choice("nblast.score_mode", &config.nblast.score_mode, &SCORE_MODES, errors);
    check_choice("nblast.index_backend", &config.nblast.index_backend, &INDEX_BACKENDS, errors);
    check_choice("logging.format", &config.logging.format, &LOG_FORMATS, errors);
    check_choice("system.log_level", &config.system.log_level, &LOG_LEVELS, errors);
}

/// Validate value ranges and constraints
fn validate_value_ranges(config: &NeuromorphConfig, errors: &mut Vec<ConfigValidationError>) {
    if !(config.nblast.gaussian_sigma.is_finite() && config.nblast.gaussian_sigma > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "nblast.gaussian_sigma".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    // A neighbourhood needs the point itself plus at least one neighbour
    if config.dotprops.k_neighbors < 2 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "dotprops.k_neighbors".to_string(),
            reason: "must be at least 2".to_string(),
        });
    }

    if !(config.table_builder.epsilon.is_finite() && config.table_builder.epsilon > 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "table_builder.epsilon".to_string(),
            reason: "must be positive".to_string(),
        });
    }
}

fn validate_boundaries(field: &str, boundaries: &[f64], errors: &mut Vec<ConfigValidationError>) {
    if boundaries.len() < 2 {
        errors.push(ConfigValidationError::InvalidBoundaries {
            field: field.to_string(),
            reason: format!("need at least 2 values, got {}", boundaries.len()),
        });
        return;
    }
    if boundaries.iter().any(|b| !b.is_finite()) {
        errors.push(ConfigValidationError::InvalidBoundaries {
            field: field.to_string(),
            reason: "values must be finite".to_string(),
        });
    }
    if boundaries.windows(2).any(|w| w[1] <= w[0]) {
        errors.push(ConfigValidationError::InvalidBoundaries {
            field: field.to_string(),
            reason: "values must be strictly increasing".to_string(),
        });
    }
}
