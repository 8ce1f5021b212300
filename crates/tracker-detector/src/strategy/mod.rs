// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! # Detection Strategies
//!
//! A strategy turns one frame into one [`Detection`]. The engine owns exactly
//! one boxed strategy and never looks inside it, so new algorithms plug in by
//! implementing [`DetectionStrategy`] and adding a [`DetectorKind`].
//!
//! Available strategies:
//! - **Difference** (`TYPE 0`): grayscale motion against the previous frame
//! - **HSV** (`TYPE 1`): color range threshold

pub mod difference;
pub mod hsv;

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::{DetectorError, DetectorResult};
use tracker_shmem::{Frame, Position};

pub use difference::DifferenceStrategy;
pub use hsv::HsvStrategy;

/// Detector variant selected by the `TYPE` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    Difference = 0,
    Hsv = 1,
}

impl DetectorKind {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Difference => "Difference detector (grey-scale)",
            Self::Hsv => "HSV detector (color)",
        }
    }
}

impl TryFrom<i32> for DetectorKind {
    type Error = DetectorError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Difference),
            1 => Ok(Self::Hsv),
            other => Err(DetectorError::InvalidType(other)),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Difference => write!(f, "difference"),
            Self::Hsv => write!(f, "hsv"),
        }
    }
}

/// Result of running a strategy over one frame
#[derive(Debug, Clone)]
pub struct Detection {
    pub found: bool,
    pub x: f64,
    pub y: f64,
    /// Pixel area of the accepted blob (0 when nothing was found)
    pub area: u32,
    /// Binary foreground mask (255 = foreground), same size as the frame
    pub mask: GrayImage,
}

impl Detection {
    pub fn not_found(mask: GrayImage) -> Self {
        Self {
            found: false,
            x: 0.0,
            y: 0.0,
            area: 0,
            mask,
        }
    }

    /// Position record for this detection, stamped with the frame it came from
    pub fn to_position(&self, frame: &Frame) -> Position {
        if self.found {
            Position::new(self.x, self.y, frame.timestamp_ns, frame.sequence)
        } else {
            Position::not_found(frame.timestamp_ns, frame.sequence)
        }
    }
}

/// Pluggable detection algorithm
///
/// Implementations must not block; frame acquisition (and its timeout) is
/// the engine's job, the strategy only reports the cadence it expects.
pub trait DetectionStrategy: Send {
    fn kind(&self) -> DetectorKind;

    /// Load tunables from the `key` table of the TOML `file`
    ///
    /// On failure the previous tunables stay in effect.
    fn configure(&mut self, file: &Path, key: &str) -> DetectorResult<()>;

    /// How long the engine should wait for a new frame before reporting the
    /// source as unavailable
    fn frame_timeout(&self) -> Duration;

    fn find_object(&mut self, frame: &Frame) -> Detection;
}

/// Build the strategy for `kind` with default tunables
pub fn create_strategy(kind: DetectorKind) -> Box<dyn DetectionStrategy> {
    match kind {
        DetectorKind::Difference => Box::new(DifferenceStrategy::default()),
        DetectorKind::Hsv => Box::new(HsvStrategy::default()),
    }
}

/// Connected foreground region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    pub area: u32,
    pub x: f64,
    pub y: f64,
}

/// Largest 8-connected foreground blob whose area lies in `min_area..=max_area`
pub fn largest_blob(mask: &GrayImage, min_area: u32, max_area: u32) -> Option<Blob> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    // Per-label (area, sum_x, sum_y); labels are consecutive from 1
    let mut stats: Vec<(u32, u64, u64)> = Vec::new();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel[0] as usize;
        if label == 0 {
            continue;
        }
        if label > stats.len() {
            stats.resize(label, (0, 0, 0));
        }
        let entry = &mut stats[label - 1];
        entry.0 += 1;
        entry.1 += x as u64;
        entry.2 += y as u64;
    }

    stats
        .into_iter()
        .filter(|(area, _, _)| *area >= min_area && *area <= max_area)
        .max_by_key(|(area, _, _)| *area)
        .map(|(area, sum_x, sum_y)| Blob {
            area,
            x: sum_x as f64 / area as f64,
            y: sum_y as f64 / area as f64,
        })
}

/// Detection from a mask using the largest in-bounds blob
pub(crate) fn detect_from_mask(mask: GrayImage, min_area: u32, max_area: u32) -> Detection {
    match largest_blob(&mask, min_area, max_area) {
        Some(blob) => Detection {
            found: true,
            x: blob.x,
            y: blob.y,
            area: blob.area,
            mask,
        },
        None => Detection::not_found(mask),
    }
}
