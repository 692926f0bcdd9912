// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! All-by-all similarity scoring of a set of dot clouds.
//!
//! Reads a JSON array of dot clouds, scores every ordered pair with the
//! configured score function and mode, and writes the score matrix as JSON
//! (stdout unless `--output` is given). Logs go to stderr.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use neuromorph::config::{load_config, load_config_or_default, validate_config};
use neuromorph::observability::{debug_flags_help, init_logging, parse_debug_flags};
use neuromorph::setup;
use neuromorph::structures::Dotprops;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: nblast_allbyall <clouds.json> [--config <path>] [--output <path>] \
         [--set <key>=<value>]...\n\n\
         Options:\n\
         - --config: configuration file (default: search for neuromorph_configuration.toml)\n\
         - --output: write the score matrix here instead of stdout\n\
         - --set: override a configuration value, e.g. --set score_mode=mean\n\n\
         {}",
        debug_flags_help()
    );
    process::exit(2);
}

struct Args {
    input: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    overrides: HashMap<String, String>,
}

fn parse_args() -> Args {
    let mut input = None;
    let mut config = None;
    let mut output = None;
    let mut overrides = HashMap::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                config = Some(PathBuf::from(v));
            }
            "--output" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                output = Some(PathBuf::from(v));
            }
            "--set" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                let Some((key, value)) = v.split_once('=') else {
                    eprintln!("Expected key=value after --set, got: {v}");
                    usage_and_exit();
                };
                overrides.insert(key.trim().to_string(), value.trim().to_string());
            }
            "-h" | "--help" => usage_and_exit(),
            // consumed by parse_debug_flags
            other if other.starts_with("--debug-") => {}
            other if other.starts_with('-') => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
            other => {
                if input.is_some() {
                    eprintln!("Only one input file is accepted");
                    usage_and_exit();
                }
                input = Some(PathBuf::from(other));
            }
        }
    }

    let Some(input) = input else {
        usage_and_exit();
    };
    Args {
        input,
        config,
        output,
        overrides,
    }
}

fn main() -> Result<()> {
    let args = parse_args();

    let config = match &args.config {
        Some(path) => load_config(Some(path), Some(&args.overrides)),
        None => load_config_or_default(Some(&args.overrides)),
    }
    .context("Failed to load configuration")?;
    validate_config(&config)?;

    let flags = setup::debug_flags(&config, parse_debug_flags());
    let _log_guard = init_logging(&flags, &setup::log_options(&config)?)?;

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let clouds: Vec<Dotprops> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse dot clouds from {}", args.input.display()))?;

    let backend = setup::index_backend(&config)?;
    let clouds: Vec<Dotprops> = clouds
        .into_iter()
        .map(|c| c.with_index_backend(backend))
        .collect();

    let scorer = setup::scorer_from_config(&config)?;
    tracing::info!(
        target: "neuromorph",
        "Scoring {} dot clouds all-by-all ({} mode, {:?} index)",
        clouds.len(),
        scorer.mode(),
        backend
    );

    let matrix = scorer.all_by_all(&clouds)?;
    if !matrix.is_complete() {
        tracing::warn!(
            target: "neuromorph",
            "{} of {} cells failed",
            matrix.failures().len(),
            matrix.shape().0 * matrix.shape().1
        );
    }

    let json = serde_json::to_string_pretty(&matrix.report())?;
    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}
