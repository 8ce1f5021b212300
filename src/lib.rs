//! # Simple Tracker
//!
//! Real-time object detection node for multi-process tracking pipelines. A
//! camera process writes frames into a shared-memory channel, the detector
//! finds the object in each frame, and the position is published to another
//! shared-memory channel for downstream consumers.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! simple-tracker = "0.1"
//! ```
//!
//! ```rust,no_run
//! use simple_tracker::prelude::*;
//! use std::sync::Arc;
//!
//! let namespace = ShmNamespace::from_env();
//! let mut engine = DetectorEngine::new(
//!     create_strategy(DetectorKind::Difference),
//!     Arc::new(namespace),
//!     "cam1",
//!     "pos1",
//! );
//! engine.configure("tracker.toml".as_ref(), "motion")?;
//! engine.start()?;
//!
//! loop {
//!     if let Err(e) = engine.cycle() {
//!         eprintln!("{}", e);
//!     }
//! }
//! # Ok::<(), DetectorError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: tracker-config, tracker-observability      │
//! │  (TOML tunables, logging)                               │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  I/O: tracker-shmem                                     │
//! │  (latest-only frame and position slots)                 │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application: tracker-detector                          │
//! │  (engine, strategies, worker, console, `detector` bin)  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Platform Support
//!
//! - Linux (slots live in `/dev/shm/simple-tracker`)
//! - macOS and other Unix systems (slots live in the temp directory)
//!
//! ## License
//!
//! Apache-2.0

pub use tracker_config as config;
pub use tracker_detector as detector;
pub use tracker_observability as observability;
pub use tracker_shmem as shmem;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_section, ConfigError, DifferenceConfig, HsvConfig, Validate};
    pub use crate::detector::{
        create_strategy, run_node, DetectionStrategy, DetectorEngine, DetectorError,
        DetectorKind, NodeOptions, SharedEngine, ShutdownToken,
    };
    pub use crate::shmem::{
        ChannelProvider, Frame, FrameReader, FrameWriter, Position, PositionReader,
        PositionWriter, ShmNamespace,
    };
}
