// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! # tracker-shmem
//!
//! Shared-memory transport between Simple Tracker nodes on one host.
//!
//! Every channel is a named, latest-only slot backed by a memory-mapped file
//! inside a namespace directory (`/dev/shm/simple-tracker` by default). The
//! process that creates a slot is its only writer; any number of readers may
//! map it and pick up the most recent record.
//!
//! Two record kinds are carried:
//! - **Frames** (`STRKFRAM` slots): RGB images produced by a camera node
//! - **Positions** (`STRKPOS1` slots): 2D detection results
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tracker_shmem::ShmNamespace;
//!
//! let namespace = ShmNamespace::from_env();
//! let mut reader = namespace.open_frame_reader("cam1")?;
//! let frame = reader.read_latest_frame(Duration::from_millis(500))?;
//! println!("frame #{} ({}x{})", frame.sequence, frame.width(), frame.height());
//! # Ok::<(), tracker_shmem::TransportError>(())
//! ```
//!
//! ## Architecture
//!
//! 1. **slot**: the latest-only slot protocol (header + seqlock + payload)
//! 2. **frame** / **position**: record encodings on top of slots
//! 3. **traits**: transport-agnostic interfaces consumed by the detector
//! 4. **namespace**: channel naming and the shared-memory `ChannelProvider`

pub mod error;
pub mod frame;
pub mod namespace;
pub mod position;
pub mod slot;
pub mod traits;

pub use error::{TransportError, TransportResult};
pub use frame::{Frame, FrameReader, FrameWriter};
pub use namespace::{ShmNamespace, SHM_DIR_ENV_VAR};
pub use position::{Position, PositionReader, PositionWriter};
pub use slot::{SlotData, SlotReader, SlotWriter};
pub use traits::{ChannelProvider, FrameSink, FrameSource, PositionSink};

/// Current wall-clock time in nanoseconds since the Unix epoch
pub fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
