// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::CrateDebugFlags;

/// Build the log filter
///
/// `RUST_LOG` wins when it is set and parses; otherwise the debug flags
/// decide.
pub fn build_filter(debug_flags: &CrateDebugFlags) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(debug_flags.to_filter_string()),
    }
}

/// Initialize console logging on stderr
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(debug_flags: &CrateDebugFlags) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(debug_flags))
        .with_writer(std::io::stderr)
        .with_target(debug_flags.any_enabled())
        .with_thread_names(true)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
