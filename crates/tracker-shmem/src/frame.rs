// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Frame channels
//!
//! Frame payload layout (inside a `STRKFRAM` slot):
//! ```text
//!   [0:4]   Width (u32)
//!   [4:8]   Height (u32)
//!   [8:12]  Channels (u32, always 3)
//!   [12:]   RGB bytes, row-major, width * height * 3
//! ```

use image::RgbImage;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::slot::{SlotData, SlotReader, SlotWriter};
use crate::traits::{FrameSink, FrameSource};
use crate::{TransportError, TransportResult};

pub const FRAME_MAGIC: &[u8; 8] = b"STRKFRAM";
pub const FRAME_HEADER_SIZE: usize = 12;
pub const RGB_CHANNELS: u32 = 3;

/// One image read from a frame channel
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Sequence number assigned by the writer (starts at 1)
    pub sequence: u64,
    /// Capture timestamp in nanoseconds since the Unix epoch
    pub timestamp_ns: u64,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Maximum payload needed for frames up to `width` x `height`
pub fn frame_payload_size(width: u32, height: u32) -> usize {
    FRAME_HEADER_SIZE + width as usize * height as usize * RGB_CHANNELS as usize
}

fn channel_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn decode_frame(slot: SlotData) -> TransportResult<Frame> {
    let data = slot.data;
    if data.len() < FRAME_HEADER_SIZE {
        return Err(TransportError::InvalidMessage(format!(
            "frame payload is {} bytes, shorter than its {} byte header",
            data.len(),
            FRAME_HEADER_SIZE
        )));
    }

    let field = |offset: usize| {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&data[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    };
    let width = field(0);
    let height = field(4);
    let channels = field(8);

    if channels != RGB_CHANNELS {
        return Err(TransportError::InvalidMessage(format!(
            "unsupported channel count {} (expected {})",
            channels, RGB_CHANNELS
        )));
    }

    let expected = frame_payload_size(width, height);
    if data.len() != expected {
        return Err(TransportError::InvalidMessage(format!(
            "{}x{} frame needs {} bytes, got {}",
            width,
            height,
            expected,
            data.len()
        )));
    }

    let pixels = data[FRAME_HEADER_SIZE..].to_vec();
    let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
        TransportError::InvalidMessage(format!("cannot build {}x{} image", width, height))
    })?;

    Ok(Frame {
        image,
        sequence: slot.sequence,
        timestamp_ns: slot.timestamp_ns,
    })
}

/// Writer side of a frame channel
pub struct FrameWriter {
    name: String,
    slot: SlotWriter,
    max_width: u32,
    max_height: u32,
    buffer: Vec<u8>,
}

impl FrameWriter {
    /// Create a frame slot able to carry images up to `max_width` x `max_height`
    pub fn create(path: &Path, max_width: u32, max_height: u32) -> TransportResult<Self> {
        let max_payload = frame_payload_size(max_width, max_height);
        let slot = SlotWriter::create(path, FRAME_MAGIC, max_payload)?;
        Ok(Self {
            name: channel_name(path),
            slot,
            max_width,
            max_height,
            buffer: Vec::with_capacity(max_payload),
        })
    }

    /// Publish an image, replacing the previous one
    pub fn write_image(&mut self, image: &RgbImage, timestamp_ns: u64) -> TransportResult<u64> {
        if image.width() > self.max_width || image.height() > self.max_height {
            return Err(TransportError::MessageTooLarge {
                size: frame_payload_size(image.width(), image.height()),
                max_size: self.slot.max_payload(),
            });
        }

        self.buffer.clear();
        self.buffer.extend_from_slice(&image.width().to_le_bytes());
        self.buffer.extend_from_slice(&image.height().to_le_bytes());
        self.buffer.extend_from_slice(&RGB_CHANNELS.to_le_bytes());
        self.buffer.extend_from_slice(image.as_raw());

        self.slot.write(&self.buffer, timestamp_ns)
    }

    pub fn max_dimensions(&self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }

    pub fn path(&self) -> &Path {
        self.slot.path()
    }
}

impl FrameSink for FrameWriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_frame(&mut self, image: &RgbImage, timestamp_ns: u64) -> TransportResult<()> {
        self.write_image(image, timestamp_ns).map(|_| ())
    }
}

/// Reader side of a frame channel
pub struct FrameReader {
    name: String,
    slot: SlotReader,
}

impl FrameReader {
    pub fn open(path: &Path) -> TransportResult<Self> {
        let slot = SlotReader::open(path, FRAME_MAGIC)?;
        debug!(
            "[SHM] Opened frame slot {} (writer pid {})",
            path.display(),
            slot.writer_pid()
        );
        Ok(Self {
            name: channel_name(path),
            slot,
        })
    }

    /// Newest frame if one arrived since the last read (non-blocking)
    pub fn try_read_frame(&mut self) -> TransportResult<Option<Frame>> {
        self.slot.read_latest()?.map(decode_frame).transpose()
    }

    /// Wait up to `timeout` for a frame newer than the last one returned
    pub fn read_latest_frame(&mut self, timeout: Duration) -> TransportResult<Frame> {
        decode_frame(self.slot.wait_latest(timeout)?)
    }

    pub fn path(&self) -> &Path {
        self.slot.path()
    }
}

impl FrameSource for FrameReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_latest_frame(&mut self, timeout: Duration) -> TransportResult<Frame> {
        FrameReader::read_latest_frame(self, timeout)
    }

    fn is_connected(&self) -> bool {
        self.slot.is_current()
    }
}
