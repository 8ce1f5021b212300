// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! # tracker-observability
//!
//! Logging setup shared by Simple Tracker binaries.
//!
//! Logs are written to stderr so that stdout stays free for the operator
//! console. The filter is taken from `RUST_LOG` when set; otherwise every
//! crate logs at `info` and crates named in `TRACKER_DEBUG` log at `debug`.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

// Re-export commonly used items
pub use cli::*;
pub use init::*;

/// Known Simple Tracker crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "tracker-config",
    "tracker-shmem",
    "tracker-detector",
];
