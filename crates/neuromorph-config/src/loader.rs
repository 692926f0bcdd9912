// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, NeuromorphConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "neuromorph_configuration.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "NEUROMORPH_CONFIG_PATH";

/// Find the neuromorph configuration file
///
/// Search order:
/// 1. `NEUROMORPH_CONFIG_PATH` environment variable
/// 2. Current working directory: `./neuromorph_configuration.toml`
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by {} not found: {}",
                CONFIG_PATH_ENV,
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<NeuromorphConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: NeuromorphConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Like [`load_config`], but starts from defaults when no file is found
pub fn load_config_or_default(
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<NeuromorphConfig> {
    match find_config_file() {
        Ok(path) => load_config(Some(&path), cli_args),
        Err(ConfigError::FileNotFound(_)) => {
            let mut config = NeuromorphConfig::default();
            apply_environment_overrides(&mut config);
            if let Some(cli) = cli_args {
                apply_cli_overrides(&mut config, cli);
            }
            Ok(config)
        }
        Err(e) => Err(e),
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `NEUROMORPH_MAX_THREADS` -> `system.max_threads`
/// - `NEUROMORPH_LOG_LEVEL` -> `system.log_level`
/// - `NEUROMORPH_SCORE_MODE` -> `nblast.score_mode`
/// - `NEUROMORPH_USE_ALPHA` -> `nblast.use_alpha`
/// - `NEUROMORPH_PARALLEL` -> `nblast.parallel`
/// - `NEUROMORPH_INDEX_BACKEND` -> `nblast.index_backend`
/// - `NEUROMORPH_GAUSSIAN_SIGMA` -> `nblast.gaussian_sigma`
/// - `NEUROMORPH_SCORE_TABLE` -> `nblast.score_table`
/// - `NEUROMORPH_K_NEIGHBORS` -> `dotprops.k_neighbors`
/// - `NEUROMORPH_TABLE_EPSILON` -> `table_builder.epsilon`
/// - `NEUROMORPH_LOG_FORMAT` -> `logging.format`
/// - `NEUROMORPH_LOG_DIR` -> `logging.log_dir`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut NeuromorphConfig) {
    // System settings
    if let Ok(value) = env::var("NEUROMORPH_MAX_THREADS") {
        if let Ok(threads) = value.parse::<usize>() {
            config.system.max_threads = threads;
        }
    }
    if let Ok(value) = env::var("NEUROMORPH_LOG_LEVEL") {
        config.system.log_level = value;
    }

    // Scoring settings
    if let Ok(value) = env::var("NEUROMORPH_SCORE_MODE") {
        config.nblast.score_mode = value;
    }
    if let Ok(value) = env::var("NEUROMORPH_USE_ALPHA") {
        config.nblast.use_alpha = parse_flag(&value);
    }
    if let Ok(value) = env::var("NEUROMORPH_PARALLEL") {
        config.nblast.parallel = parse_flag(&value);
    }
    if let Ok(value) = env::var("NEUROMORPH_INDEX_BACKEND") {
        config.nblast.index_backend = value;
    }
    if let Ok(value) = env::var("NEUROMORPH_GAUSSIAN_SIGMA") {
        if let Ok(sigma) = value.parse::<f64>() {
            config.nblast.gaussian_sigma = sigma;
        }
    }
    if let Ok(value) = env::var("NEUROMORPH_SCORE_TABLE") {
        config.nblast.score_table = Some(value);
    }

    // Dot clouds and table construction
    if let Ok(value) = env::var("NEUROMORPH_K_NEIGHBORS") {
        if let Ok(k) = value.parse::<usize>() {
            config.dotprops.k_neighbors = k;
        }
    }
    if let Ok(value) = env::var("NEUROMORPH_TABLE_EPSILON") {
        if let Ok(eps) = value.parse::<f64>() {
            config.table_builder.epsilon = eps;
        }
    }

    // Logging
    if let Ok(value) = env::var("NEUROMORPH_LOG_FORMAT") {
        config.logging.format = value;
    }
    if let Ok(value) = env::var("NEUROMORPH_LOG_DIR") {
        config.logging.log_dir = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"score_mode": "mean", "k_neighbors": "10"}`)
pub fn apply_cli_overrides(config: &mut NeuromorphConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("max_threads") {
        if let Ok(threads) = value.parse::<usize>() {
            config.system.max_threads = threads;
        }
    }
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }

    if let Some(value) = cli_args.get("score_mode") {
        config.nblast.score_mode = value.clone();
    }
    if let Some(value) = cli_args.get("use_alpha") {
        config.nblast.use_alpha = parse_flag(value);
    }
    if let Some(value) = cli_args.get("parallel") {
        config.nblast.parallel = parse_flag(value);
    }
    if let Some(value) = cli_args.get("index_backend") {
        config.nblast.index_backend = value.clone();
    }
    if let Some(value) = cli_args.get("gaussian_sigma") {
        if let Ok(sigma) = value.parse::<f64>() {
            config.nblast.gaussian_sigma = sigma;
        }
    }
    if let Some(value) = cli_args.get("score_table") {
        config.nblast.score_table = Some(value.clone());
    }

    if let Some(value) = cli_args.get("k_neighbors") {
        if let Ok(k) = value.parse::<usize>() {
            config.dotprops.k_neighbors = k;
        }
    }
    if let Some(value) = cli_args.get("epsilon") {
        if let Ok(eps) = value.parse::<f64>() {
            config.table_builder.epsilon = eps;
        }
    }

    if let Some(value) = cli_args.get("log_format") {
        config.logging.format = value.clone();
    }
    if let Some(value) = cli_args.get("debug_crates") {
        config.logging.debug_crates = value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

fn parse_flag(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower == "true" || lower == "1" || lower == "yes"
}
