// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # neuromorph-observability
//!
//! Logging setup shared by the neuromorph tools, with per-crate debug flag
//! support (`--debug-neuromorph-nblast`, `--debug-all`, `NEUROMORPH_DEBUG`).
//!
//! ## Features
//! - `file-logging`: JSON log files in a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known neuromorph crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "neuromorph",
    "neuromorph-spatial",
    "neuromorph-structures",
    "neuromorph-nblast",
    "neuromorph-transforms",
    "neuromorph-config",
];
