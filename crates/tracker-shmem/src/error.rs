// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Transport error types

use std::path::PathBuf;

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The named channel has no slot in the namespace
    #[error("Channel '{0}' does not exist")]
    ChannelNotFound(String),

    #[error("Invalid channel name '{0}': use letters, digits, '.', '_' or '-', not starting with '.'")]
    InvalidChannelName(String),

    /// The slot file exists but is not a valid slot of the expected kind
    #[error("Invalid slot {}: {reason}", .path.display())]
    InvalidSlot { path: PathBuf, reason: String },

    #[error("Message too large: {size} bytes (max: {max_size})")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// No new record arrived in time
    #[error("Operation timed out")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
