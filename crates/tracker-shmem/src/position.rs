// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Position channels
//!
//! Positions travel as JSON inside a `STRKPOS1` slot.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::slot::{SlotData, SlotReader, SlotWriter};
use crate::traits::PositionSink;
use crate::TransportResult;

pub const POSITION_MAGIC: &[u8; 8] = b"STRKPOS1";
pub const POSITION_MAX_PAYLOAD: usize = 1024;

/// 2D position estimate produced by a detector
///
/// When `found` is false the coordinates are zero and carry no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub found: bool,
    /// Horizontal pixel coordinate in the source frame
    pub x: f64,
    /// Vertical pixel coordinate in the source frame
    pub y: f64,
    /// Capture timestamp of the source frame (ns since the Unix epoch)
    pub timestamp_ns: u64,
    /// Sequence number of the source frame
    pub sample: u64,
}

impl Position {
    pub fn new(x: f64, y: f64, timestamp_ns: u64, sample: u64) -> Self {
        Self {
            found: true,
            x,
            y,
            timestamp_ns,
            sample,
        }
    }

    pub fn not_found(timestamp_ns: u64, sample: u64) -> Self {
        Self {
            found: false,
            x: 0.0,
            y: 0.0,
            timestamp_ns,
            sample,
        }
    }
}

/// Writer side of a position channel
pub struct PositionWriter {
    name: String,
    slot: SlotWriter,
}

impl PositionWriter {
    pub fn create(path: &Path) -> TransportResult<Self> {
        let slot = SlotWriter::create(path, POSITION_MAGIC, POSITION_MAX_PAYLOAD)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, slot })
    }

    /// Publish a position, replacing the previous one
    pub fn publish(&mut self, position: &Position) -> TransportResult<u64> {
        let payload = serde_json::to_vec(position)?;
        self.slot.write(&payload, crate::now_ns())
    }

    pub fn path(&self) -> &Path {
        self.slot.path()
    }
}

impl PositionSink for PositionWriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_position(&mut self, position: &Position) -> TransportResult<()> {
        self.publish(position).map(|_| ())
    }
}

/// Reader side of a position channel
pub struct PositionReader {
    slot: SlotReader,
}

impl PositionReader {
    pub fn open(path: &Path) -> TransportResult<Self> {
        Ok(Self {
            slot: SlotReader::open(path, POSITION_MAGIC)?,
        })
    }

    /// Newest position if one arrived since the last read (non-blocking)
    pub fn try_read_position(&mut self) -> TransportResult<Option<Position>> {
        self.slot.read_latest()?.map(decode_position).transpose()
    }

    /// Wait up to `timeout` for a position newer than the last one returned
    pub fn read_latest_position(&mut self, timeout: Duration) -> TransportResult<Position> {
        decode_position(self.slot.wait_latest(timeout)?)
    }
}

fn decode_position(slot: SlotData) -> TransportResult<Position> {
    Ok(serde_json::from_slice(&slot.data)?)
}
