// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Per-crate debug flags
//!
//! Crates named in the `TRACKER_DEBUG` environment variable (or passed by a
//! binary's own `--debug CRATE` option) are raised to `debug`.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Environment variable listing crates to debug (comma-separated or `all`)
pub const DEBUG_ENV_VAR: &str = "TRACKER_DEBUG";

/// Set of crates with debug logging enabled
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Flags for the given crate names
    ///
    /// `all` enables every known crate; blank names are skipped.
    pub fn from_crate_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = CrateDebugFlags::default();

        for name in names {
            let name = name.as_ref().trim();
            if name == "all" {
                flags.enable_all();
            } else {
                flags.enable(name);
            }
        }

        flags
    }

    /// Parse debug flags from a `TRACKER_DEBUG` style value
    pub fn from_env_value(value: &str) -> Self {
        Self::from_crate_names(value.split(','))
    }

    pub fn enable(&mut self, crate_name: &str) {
        let crate_name = crate_name.trim();
        if !crate_name.is_empty() {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    pub fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    /// Merge another set of flags into this one
    pub fn merge(&mut self, other: CrateDebugFlags) {
        self.enabled_crates.extend(other.enabled_crates);
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// Get log level for a crate
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Create a filter directive string for `EnvFilter`
    ///
    /// Crate names are converted to their tracing target form
    /// (`tracker-shmem` -> `tracker_shmem`).
    /// Format: "info,tracker_shmem=debug" or "info" if none enabled.
    pub fn to_filter_string(&self) -> String {
        let mut filters = vec!["info".to_string()];
        for crate_name in &self.enabled_crates {
            filters.push(format!("{}=debug", crate_name.replace('-', "_")));
        }
        filters.join(",")
    }
}

/// Debug flags from `TRACKER_DEBUG`
pub fn parse_debug_flags() -> CrateDebugFlags {
    match env::var(DEBUG_ENV_VAR) {
        Ok(value) => CrateDebugFlags::from_env_value(&value),
        Err(_) => CrateDebugFlags::default(),
    }
}
