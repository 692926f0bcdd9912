// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-neuromorph-nblast` to raise one crate to
//! debug level, and `--debug-all` for every known crate.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Environment variable listing crates to debug (comma-separated, or `all`)
pub const DEBUG_ENV: &str = "NEUROMORPH_DEBUG";

/// Parse debug flags from command-line arguments
///
/// # Example
/// ```rust
/// use neuromorph_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-neuromorph-nblast".to_string()]);
/// assert!(flags.is_enabled("neuromorph-nblast"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Looks for arguments matching `--debug-{crate-name}`; `--debug-all`
    /// enables every known crate.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();
        for arg in args {
            if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enable(crate_name);
            }
        }
        flags
    }

    /// Enable a crate by name; `all` enables every known crate
    pub fn enable(&mut self, crate_name: &str) {
        if crate_name == "all" {
            self.enabled_crates
                .extend(KNOWN_CRATES.iter().map(|c| c.to_string()));
        } else if !crate_name.is_empty() {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    /// Enable every name in a list (as found in the `[logging]` config section)
    pub fn extend_from<'a, I>(&mut self, names: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for name in names {
            self.enable(name.trim());
        }
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `DEBUG` for enabled crates, `INFO` otherwise
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// `EnvFilter` directive string, e.g. `neuromorph-nblast=debug,warn`
    pub fn to_filter_string(&self, base_level: &str) -> String {
        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|c| format!("{}=debug", c))
            .collect();
        filters.push(base_level.to_string());
        filters.join(",")
    }
}

/// Debug flags from the process arguments plus `NEUROMORPH_DEBUG`
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(env_var) = env::var(DEBUG_ENV) {
        for crate_name in env_var.split(',') {
            flags.enable(crate_name.trim());
        }
    }
    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  {}={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  {}=all                               Enable debug for all crates
"#,
        KNOWN_CRATES.join(", "),
        DEBUG_ENV,
        DEBUG_ENV
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_crate_flag() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-neuromorph-nblast".to_string()]);
        assert!(flags.is_enabled("neuromorph-nblast"));
        assert!(!flags.is_enabled("neuromorph-spatial"));
    }

    #[test]
    fn test_non_flag_args_ignored() {
        let flags = CrateDebugFlags::from_args(vec![
            "nblast_allbyall".to_string(),
            "input.json".to_string(),
            "--debug-".to_string(),
        ]);
        assert!(!flags.any_enabled());
    }

    #[test]
    fn test_debug_all() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-all".to_string()]);
        for crate_name in KNOWN_CRATES {
            assert!(flags.is_enabled(crate_name), "{} should be enabled", crate_name);
        }
    }

    #[test]
    fn test_extend_from_config() {
        let mut flags = CrateDebugFlags::default();
        flags.extend_from(&vec![" neuromorph-spatial ".to_string()]);
        assert!(flags.is_enabled("neuromorph-spatial"));
    }

    #[test]
    fn test_filter_string() {
        let flags = CrateDebugFlags::from_args(vec![
            "--debug-neuromorph-spatial".to_string(),
            "--debug-neuromorph-nblast".to_string(),
        ]);
        assert_eq!(
            flags.to_filter_string("warn"),
            "neuromorph-nblast=debug,neuromorph-spatial=debug,warn"
        );
        assert_eq!(CrateDebugFlags::default().to_filter_string("info"), "info");
    }

    #[test]
    fn test_log_level() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-neuromorph-nblast".to_string()]);
        assert_eq!(flags.log_level("neuromorph-nblast"), tracing::Level::DEBUG);
        assert_eq!(flags.log_level("neuromorph-config"), tracing::Level::INFO);
    }
}
