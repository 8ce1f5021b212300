// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Channel trait definitions
//!
//! The detector engine only talks to these traits, so the shared-memory
//! implementation can be replaced (or mocked in tests) without touching it.

use image::RgbImage;
use std::time::Duration;

use crate::{Frame, Position, TransportResult};

/// Source of camera frames
pub trait FrameSource: Send {
    /// Channel name
    fn name(&self) -> &str;

    /// Wait up to `timeout` for a frame newer than the last one returned
    ///
    /// Must not block longer than `timeout`.
    fn read_latest_frame(&mut self, timeout: Duration) -> TransportResult<Frame>;

    /// False once the producer is known to have gone away or restarted
    fn is_connected(&self) -> bool {
        true
    }
}

/// Destination for position estimates
pub trait PositionSink: Send {
    fn name(&self) -> &str;

    fn write_position(&mut self, position: &Position) -> TransportResult<()>;
}

/// Destination for rendered images (tuning overlays)
pub trait FrameSink: Send {
    fn name(&self) -> &str;

    fn write_frame(&mut self, image: &RgbImage, timestamp_ns: u64) -> TransportResult<()>;
}

/// Factory for named channels
pub trait ChannelProvider: Send + Sync {
    /// Connect to an existing frame channel
    ///
    /// Waits up to `timeout` for the channel to appear and fails with
    /// `TransportError::ChannelNotFound` if it does not.
    fn connect_source(&self, name: &str, timeout: Duration)
        -> TransportResult<Box<dyn FrameSource>>;

    /// Create a position channel owned by the caller
    fn create_sink(&self, name: &str) -> TransportResult<Box<dyn PositionSink>>;

    /// Create a frame channel able to carry `width` x `height` images
    fn create_frame_sink(
        &self,
        name: &str,
        width: u32,
        height: u32,
    ) -> TransportResult<Box<dyn FrameSink>>;
}
