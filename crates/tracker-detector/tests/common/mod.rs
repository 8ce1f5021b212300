//! Common test utilities and helpers

#![allow(dead_code)]

use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracker_shmem::{
    ChannelProvider, Frame, FrameSink, FrameSource, Position, PositionSink, TransportError,
    TransportResult,
};

/// Something that happened on a mock channel or in a test-driven command
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    FrameRead(u64),
    PositionServed(Position),
    OverlayWritten(u64),
    CommandStarted,
    CommandFinished,
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// Channel provider whose source produces a new synthetic frame on every read
#[derive(Clone)]
pub struct RecordingChannels {
    pub log: EventLog,
    /// Time each frame read takes
    pub read_delay: Duration,
}

impl RecordingChannels {
    pub fn new(read_delay: Duration) -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            read_delay,
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().clone()
    }
}

/// 32x24 black frame with a green 4x4 square whose position moves with `sequence`
pub fn synthetic_frame(sequence: u64) -> Frame {
    let x0 = (sequence % 20) as u32;
    let image = RgbImage::from_fn(32, 24, |x, y| {
        if x >= x0 && x < x0 + 4 && (10..14).contains(&y) {
            Rgb([0, 200, 0])
        } else {
            Rgb([0, 0, 0])
        }
    });
    Frame {
        image,
        sequence,
        timestamp_ns: sequence * 1_000_000,
    }
}

struct RecordingSource {
    log: EventLog,
    delay: Duration,
    next: u64,
}

impl FrameSource for RecordingSource {
    fn name(&self) -> &str {
        "cam1"
    }

    fn read_latest_frame(&mut self, _timeout: Duration) -> TransportResult<Frame> {
        thread::sleep(self.delay);
        self.next += 1;
        self.log.lock().push(Event::FrameRead(self.next));
        Ok(synthetic_frame(self.next))
    }
}

struct RecordingSink {
    log: EventLog,
}

impl PositionSink for RecordingSink {
    fn name(&self) -> &str {
        "pos1"
    }

    fn write_position(&mut self, position: &Position) -> TransportResult<()> {
        self.log.lock().push(Event::PositionServed(*position));
        Ok(())
    }
}

struct RecordingFrameSink {
    log: EventLog,
    name: String,
}

impl FrameSink for RecordingFrameSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_frame(&mut self, _image: &RgbImage, timestamp_ns: u64) -> TransportResult<()> {
        self.log
            .lock()
            .push(Event::OverlayWritten(timestamp_ns / 1_000_000));
        Ok(())
    }
}

impl ChannelProvider for RecordingChannels {
    fn connect_source(&self, name: &str, _timeout: Duration) -> TransportResult<Box<dyn FrameSource>> {
        if name != "cam1" {
            return Err(TransportError::ChannelNotFound(name.to_string()));
        }
        Ok(Box::new(RecordingSource {
            log: self.log.clone(),
            delay: self.read_delay,
            next: 0,
        }))
    }

    fn create_sink(&self, _name: &str) -> TransportResult<Box<dyn PositionSink>> {
        Ok(Box::new(RecordingSink {
            log: self.log.clone(),
        }))
    }

    fn create_frame_sink(
        &self,
        name: &str,
        _width: u32,
        _height: u32,
    ) -> TransportResult<Box<dyn FrameSink>> {
        Ok(Box::new(RecordingFrameSink {
            log: self.log.clone(),
            name: name.to_string(),
        }))
    }
}

/// Write a TOML file into `dir` and return its path
pub fn write_config(dir: &std::path::Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("tracker.toml");
    std::fs::write(&path, content).expect("Failed to write config file");
    path
}
