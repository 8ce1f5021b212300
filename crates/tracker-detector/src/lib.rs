// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! # Simple Tracker Detector
//!
//! Real-time object detector node. Frames are pulled from a shared-memory
//! SOURCE, run through a pluggable [`DetectionStrategy`], and the resulting
//! positions are published to a shared-memory SINK.
//!
//! Two threads share one [`DetectorEngine`] behind a single mutex:
//! - the **worker** runs `find_object` + `serve_position` back to back
//! - the **console** toggles tuning mode (`t`) or exits (`x`)
//!
//! A [`ShutdownToken`] set by `x` or Ctrl-C ends both loops.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tracker_detector::{create_strategy, DetectorEngine, DetectorKind};
//! use tracker_shmem::ShmNamespace;
//!
//! let mut engine = DetectorEngine::new(
//!     create_strategy(DetectorKind::Hsv),
//!     Arc::new(ShmNamespace::from_env()),
//!     "cam1",
//!     "pos1",
//! );
//! engine.start()?;
//! engine.find_object()?;
//! engine.serve_position()?;
//! # Ok::<(), tracker_detector::DetectorError>(())
//! ```

pub mod cli;
pub mod console;
pub mod engine;
pub mod error;
pub mod node;
pub mod overlay;
pub mod shutdown;
pub mod strategy;
pub mod worker;

pub use cli::{parse_args, CliError, ConfigSelection, NodeOptions};
pub use console::{spawn_console, Command, Console, ConsoleExit};
pub use engine::{DetectorEngine, EngineState, EngineStats, SharedEngine};
pub use error::{DetectorError, DetectorResult};
pub use node::{run_node, NodeReport};
pub use shutdown::{install_interrupt_handler, ShutdownToken};
pub use strategy::{create_strategy, Detection, DetectionStrategy, DetectorKind};
pub use worker::{run_worker, spawn_worker, WorkerReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
