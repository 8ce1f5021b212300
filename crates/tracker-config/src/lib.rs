// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! # Simple Tracker Configuration System
//!
//! Loads detector tunables from a TOML file. A configuration file holds any
//! number of named tables; a detector selects one of them with a key:
//!
//! ```toml
//! [green_led]
//! h_min = 40
//! h_max = 80
//! s_min = 100
//!
//! [detectors.motion]
//! intensity_threshold = 20
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tracker_config::{load_section, HsvConfig, Validate};
//!
//! let tunables: HsvConfig = load_section("tracker.toml".as_ref(), "green_led")?;
//! tunables.validate()?;
//! # Ok::<(), tracker_config::ConfigError>(())
//! ```
//!
//! Keys may be dotted (`detectors.motion`) to address nested tables.

use std::path::PathBuf;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{load_section, parse_section};
pub use types::*;
pub use validation::{ConfigValidationError, Validate, MAX_BLUR_SIGMA};

/// Re-export for convenience
pub use serde;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Configuration key '{key}' not found in {}", .file.display())]
    KeyNotFound { key: String, file: PathBuf },

    #[error("Invalid configuration value under '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
