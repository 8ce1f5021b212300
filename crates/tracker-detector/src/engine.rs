// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! # Detector Engine
//!
//! Owns the active strategy and the channel handles, and carries the
//! detector life cycle:
//!
//! ```text
//! Configured --start()--> Running --stop()--> Stopped (terminal)
//!      \________________________stop()_________/
//! ```
//!
//! Tuning mode is an independent flag. While it is on, every cycle also
//! publishes an overlay image to `<sink>-tuning`.
//!
//! The engine is not thread-safe by itself; the worker and the console share
//! it through [`SharedEngine`] and hold the lock for a whole cycle or command.

use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::overlay::{render_overlay, tuning_channel_name};
use crate::strategy::{Detection, DetectionStrategy, DetectorKind};
use crate::{DetectorError, DetectorResult};
use tracker_shmem::{
    ChannelProvider, Frame, FrameSink, FrameSource, Position, PositionSink, TransportError,
};

/// A tuning report is logged every this many processed frames
pub const TUNING_REPORT_INTERVAL: u64 = 30;

/// Overlay publication failures are logged on the first and every Nth occurrence
const TUNING_ERROR_LOG_INTERVAL: u64 = 100;

/// The engine behind the single mutual-exclusion region
pub type SharedEngine = Arc<Mutex<DetectorEngine>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Configured,
    Running,
    Stopped,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters kept for the lifetime of the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// `find_object` calls made while not stopped
    pub cycles: u64,
    pub frames_processed: u64,
    pub positions_served: u64,
    pub source_errors: u64,
    pub sink_errors: u64,
}

struct TuningSink {
    sink: Box<dyn FrameSink>,
    dimensions: (u32, u32),
}

pub struct DetectorEngine {
    strategy: Box<dyn DetectionStrategy>,
    channels: Arc<dyn ChannelProvider>,
    source_name: String,
    sink_name: String,
    source: Option<Box<dyn FrameSource>>,
    sink: Option<Box<dyn PositionSink>>,
    tuning_sink: Option<TuningSink>,
    tuning_errors: u64,
    state: EngineState,
    tune_mode: bool,
    last_position: Option<Position>,
    stats: EngineStats,
}

fn source_unavailable(channel: &str, err: TransportError) -> DetectorError {
    DetectorError::SourceUnavailable {
        channel: channel.to_string(),
        reason: err.to_string(),
    }
}

fn sink_unavailable(channel: &str, err: TransportError) -> DetectorError {
    DetectorError::SinkUnavailable {
        channel: channel.to_string(),
        reason: err.to_string(),
    }
}

impl DetectorEngine {
    /// Create an engine in the `Configured` state with the strategy's
    /// default tunables
    pub fn new(
        strategy: Box<dyn DetectionStrategy>,
        channels: Arc<dyn ChannelProvider>,
        source: impl Into<String>,
        sink: impl Into<String>,
    ) -> Self {
        Self {
            strategy,
            channels,
            source_name: source.into(),
            sink_name: sink.into(),
            source: None,
            sink: None,
            tuning_sink: None,
            tuning_errors: 0,
            state: EngineState::Configured,
            tune_mode: false,
            last_position: None,
            stats: EngineStats::default(),
        }
    }

    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    /// Load strategy tunables from the `key` table of `file`
    ///
    /// Only allowed before `start()`. A failure leaves the previous tunables
    /// in effect.
    pub fn configure(&mut self, file: &Path, key: &str) -> DetectorResult<()> {
        match self.state {
            EngineState::Configured => {
                self.strategy.configure(file, key)?;
                info!(
                    "[ENGINE] {} detector configured from '{}' [{}]",
                    self.strategy.kind(),
                    file.display(),
                    key
                );
                Ok(())
            }
            EngineState::Running => Err(DetectorError::InvalidState {
                operation: "configure",
                state: EngineState::Running.as_str(),
            }),
            EngineState::Stopped => Err(DetectorError::EngineStopped),
        }
    }

    /// Enter `Running` and try to open both channels
    ///
    /// Channels that cannot be opened yet are retried by the detection cycle.
    pub fn start(&mut self) -> DetectorResult<()> {
        match self.state {
            EngineState::Stopped => return Err(DetectorError::EngineStopped),
            EngineState::Running => return Ok(()),
            EngineState::Configured => {}
        }

        self.state = EngineState::Running;
        info!(
            "[ENGINE] Starting {} detector: source '{}' -> sink '{}'",
            self.strategy.kind(),
            self.source_name,
            self.sink_name
        );

        if let Err(e) = self.ensure_sink() {
            warn!("[ENGINE] {} (will retry)", e);
        }
        let timeout = self.strategy.frame_timeout();
        if let Err(e) = self.ensure_source(timeout) {
            warn!("[ENGINE] {} (will retry)", e);
        }
        Ok(())
    }

    /// Pull the newest frame and run the strategy over it
    ///
    /// # Errors
    ///
    /// - `EngineStopped` after `stop()`
    /// - `SourceUnavailable` if the source cannot be connected or yields no
    ///   frame within the strategy's frame timeout
    pub fn find_object(&mut self) -> DetectorResult<()> {
        self.ensure_not_stopped()?;
        self.stats.cycles += 1;

        let frame = match self.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.source_errors += 1;
                return Err(e);
            }
        };

        let detection = self.strategy.find_object(&frame);
        let position = detection.to_position(&frame);
        self.stats.frames_processed += 1;

        if self.tune_mode {
            self.publish_tuning(&frame, &detection);
        }

        self.last_position = Some(position);
        Ok(())
    }

    /// Publish the last computed position to the sink
    ///
    /// Re-serves the previous position when the current cycle's
    /// `find_object` failed; publishes nothing before the first detection.
    pub fn serve_position(&mut self) -> DetectorResult<()> {
        self.ensure_not_stopped()?;

        let Some(position) = self.last_position else {
            return Ok(());
        };

        if let Err(e) = self.ensure_sink() {
            self.stats.sink_errors += 1;
            return Err(e);
        }

        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.write_position(&position) {
                self.sink = None;
                self.stats.sink_errors += 1;
                return Err(sink_unavailable(&self.sink_name, e));
            }
        }

        self.stats.positions_served += 1;
        Ok(())
    }

    /// One detection cycle: `find_object` then `serve_position`
    ///
    /// `serve_position` runs even when `find_object` failed; the first error
    /// is returned.
    pub fn cycle(&mut self) -> DetectorResult<()> {
        let found = self.find_object();
        if matches!(found, Err(DetectorError::EngineStopped)) {
            return found;
        }
        let served = self.serve_position();
        found.and(served)
    }

    pub fn set_tune_mode(&mut self, enabled: bool) {
        if self.tune_mode == enabled {
            return;
        }
        self.tune_mode = enabled;
        if enabled {
            info!(
                "[ENGINE] Tuning mode ON (overlay on '{}')",
                tuning_channel_name(&self.sink_name)
            );
        } else {
            self.tuning_sink = None;
            info!("[ENGINE] Tuning mode OFF");
        }
    }

    pub fn get_tune_mode(&self) -> bool {
        self.tune_mode
    }

    /// Flip tuning mode, returning the new value
    pub fn toggle_tune_mode(&mut self) -> bool {
        self.set_tune_mode(!self.tune_mode);
        self.tune_mode
    }

    /// Enter `Stopped` and release every channel handle
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }
        self.state = EngineState::Stopped;
        self.source = None;
        self.sink = None;
        self.tuning_sink = None;

        let stats = self.stats;
        info!(
            "[ENGINE] Stopped after {} cycles: {} frames processed, {} positions served, {} source errors, {} sink errors",
            stats.cycles,
            stats.frames_processed,
            stats.positions_served,
            stats.source_errors,
            stats.sink_errors
        );
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == EngineState::Stopped
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn sink_name(&self) -> &str {
        &self.sink_name
    }

    pub fn strategy_kind(&self) -> DetectorKind {
        self.strategy.kind()
    }

    pub fn last_position(&self) -> Option<Position> {
        self.last_position
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn is_source_connected(&self) -> bool {
        self.source.is_some()
    }

    fn ensure_not_stopped(&self) -> DetectorResult<()> {
        if self.state == EngineState::Stopped {
            Err(DetectorError::EngineStopped)
        } else {
            Ok(())
        }
    }

    fn ensure_source(&mut self, timeout: std::time::Duration) -> DetectorResult<()> {
        if self.source.is_none() {
            let source = self
                .channels
                .connect_source(&self.source_name, timeout)
                .map_err(|e| source_unavailable(&self.source_name, e))?;
            self.source = Some(source);
        }
        Ok(())
    }

    fn ensure_sink(&mut self) -> DetectorResult<()> {
        if self.sink.is_none() {
            let sink = self
                .channels
                .create_sink(&self.sink_name)
                .map_err(|e| sink_unavailable(&self.sink_name, e))?;
            self.sink = Some(sink);
        }
        Ok(())
    }

    fn read_frame(&mut self) -> DetectorResult<Frame> {
        let timeout = self.strategy.frame_timeout();
        self.ensure_source(timeout)?;

        let Some(source) = self.source.as_mut() else {
            return Err(DetectorError::SourceUnavailable {
                channel: self.source_name.clone(),
                reason: "not connected".to_string(),
            });
        };

        match source.read_latest_frame(timeout) {
            Ok(frame) => Ok(frame),
            Err(e) => {
                // A quiet producer keeps its handle; a vanished or restarted one
                // is reconnected next cycle
                if !matches!(e, TransportError::Timeout) || !source.is_connected() {
                    debug!(
                        "[ENGINE] Dropping source '{}' handle: {}",
                        self.source_name, e
                    );
                    self.source = None;
                }
                Err(source_unavailable(&self.source_name, e))
            }
        }
    }

    fn publish_tuning(&mut self, frame: &Frame, detection: &Detection) {
        if self.stats.frames_processed % TUNING_REPORT_INTERVAL == 0 {
            info!(
                "[TUNING] frame #{} {}x{}: found={} x={:.1} y={:.1} area={}",
                frame.sequence,
                frame.width(),
                frame.height(),
                detection.found,
                detection.x,
                detection.y,
                detection.area
            );
        }

        let overlay = render_overlay(&frame.image, detection);
        let dimensions = overlay.dimensions();

        if self.tuning_sink.as_ref().map(|t| t.dimensions) != Some(dimensions) {
            self.tuning_sink = None;
            let name = tuning_channel_name(&self.sink_name);
            match self
                .channels
                .create_frame_sink(&name, dimensions.0, dimensions.1)
            {
                Ok(sink) => self.tuning_sink = Some(TuningSink { sink, dimensions }),
                Err(e) => {
                    self.report_tuning_error(&e);
                    return;
                }
            }
        }

        let result = match self.tuning_sink.as_mut() {
            Some(tuning) => tuning.sink.write_frame(&overlay, frame.timestamp_ns),
            None => return,
        };
        if let Err(e) = result {
            self.tuning_sink = None;
            self.report_tuning_error(&e);
        }
    }

    fn report_tuning_error(&mut self, err: &TransportError) {
        self.tuning_errors += 1;
        if self.tuning_errors == 1 || self.tuning_errors % TUNING_ERROR_LOG_INTERVAL == 0 {
            warn!(
                "[TUNING] Overlay channel '{}' unavailable ({} failures): {}",
                tuning_channel_name(&self.sink_name),
                self.tuning_errors,
                err
            );
        }
    }
}

impl Drop for DetectorEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
