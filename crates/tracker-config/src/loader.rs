// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading
//!
//! A tunables file is plain TOML. The detector addresses one table inside it
//! by key; everything else in the file is ignored, so several detectors can
//! share one file.

use crate::{ConfigError, ConfigResult};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use toml::{Table, Value};
use tracing::debug;

/// Load the table named `key` from the TOML file at `path`
///
/// # Errors
///
/// - `ConfigError::FileNotFound` if `path` does not exist
/// - `ConfigError::IoError` if the file cannot be read
/// - `ConfigError::ParseError` if the file is not valid TOML
/// - `ConfigError::KeyNotFound` if no table is stored under `key`
/// - `ConfigError::InvalidValue` if the table does not match `T`
pub fn load_section<T: DeserializeOwned>(path: &Path, key: &str) -> ConfigResult<T> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;

    let section = parse_section(&content, key).map_err(|err| match err {
        ConfigError::KeyNotFound { key, .. } => ConfigError::KeyNotFound {
            key,
            file: path.to_path_buf(),
        },
        other => other,
    })?;

    debug!("[CONFIG] Loaded section '{}' from {}", key, path.display());
    Ok(section)
}

/// Parse the table named `key` out of TOML text
///
/// `KeyNotFound` errors produced here carry an empty file path; `load_section`
/// fills it in.
pub fn parse_section<T: DeserializeOwned>(content: &str, key: &str) -> ConfigResult<T> {
    let root: Table = content.parse()?;

    let value = find_key(&root, key).ok_or_else(|| ConfigError::KeyNotFound {
        key: key.to_string(),
        file: Default::default(),
    })?;

    if !value.is_table() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("expected a table, found {}", value.type_str()),
        });
    }

    value
        .clone()
        .try_into::<T>()
        .map_err(|err| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: err.message().to_string(),
        })
}

/// Walk a dotted key (`a.b.c`) through nested tables
fn find_key<'a>(root: &'a Table, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let first = parts.next().filter(|part| !part.is_empty())?;
    let mut current = root.get(first)?;

    for part in parts {
        if part.is_empty() {
            return None;
        }
        current = current.as_table()?.get(part)?;
    }

    Some(current)
}
