// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Detector error types

use tracker_config::ConfigError;

/// Result type alias for detector operations
pub type DetectorResult<T> = Result<T, DetectorError>;

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    /// Tunables could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The frame source is not connected or produced no frame in time
    #[error("Source '{channel}' unavailable: {reason}")]
    SourceUnavailable { channel: String, reason: String },

    /// The position sink could not be created or written
    #[error("Sink '{channel}' unavailable: {reason}")]
    SinkUnavailable { channel: String, reason: String },

    /// The engine has been stopped; no further detection is possible
    #[error("Detector engine is stopped")]
    EngineStopped,

    #[error("Operation '{operation}' not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Invalid detector type {0} (expected 0 or 1)")]
    InvalidType(i32),

    #[error("Failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl DetectorError {
    /// Per-cycle channel failures the worker reports and retries
    pub fn is_channel_error(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::SinkUnavailable { .. }
        )
    }
}
