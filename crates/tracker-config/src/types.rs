// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Tunable type definitions
//!
//! Each detection strategy has one tunables struct. Every field has a
//! default so a configuration table only needs the values it changes.

use serde::{Deserialize, Serialize};

/// Default time a strategy waits for a new frame before reporting the source
/// as unavailable
pub const DEFAULT_FRAME_TIMEOUT_MS: u64 = 1000;

/// Grayscale frame-differencing detector tunables
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DifferenceConfig {
    /// Minimum absolute intensity change for a pixel to count as motion
    pub intensity_threshold: u8,
    /// Gaussian blur sigma applied before differencing (0 disables)
    pub blur_sigma: f32,
    /// Smallest blob (in pixels) accepted as the object
    pub min_object_area: u32,
    /// Largest blob (in pixels) accepted as the object
    pub max_object_area: u32,
    pub frame_timeout_ms: u64,
}

impl Default for DifferenceConfig {
    fn default() -> Self {
        Self {
            intensity_threshold: 15,
            blur_sigma: 2.0,
            min_object_area: 10,
            max_object_area: u32::MAX,
            frame_timeout_ms: DEFAULT_FRAME_TIMEOUT_MS,
        }
    }
}

/// HSV color-threshold detector tunables
///
/// Hue uses the 0-180 scale. When `h_min > h_max` the accepted hue range
/// wraps through 180/0 (useful for reds).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HsvConfig {
    pub h_min: u8,
    pub h_max: u8,
    pub s_min: u8,
    pub s_max: u8,
    pub v_min: u8,
    pub v_max: u8,
    /// Erosion radius applied to the mask (0 disables)
    pub erode_size: u8,
    /// Dilation radius applied after erosion (0 disables)
    pub dilate_size: u8,
    pub min_object_area: u32,
    pub max_object_area: u32,
    pub frame_timeout_ms: u64,
}

impl Default for HsvConfig {
    fn default() -> Self {
        Self {
            h_min: 0,
            h_max: 180,
            s_min: 0,
            s_max: 255,
            v_min: 0,
            v_max: 255,
            erode_size: 0,
            dilate_size: 0,
            min_object_area: 10,
            max_object_area: u32::MAX,
            frame_timeout_ms: DEFAULT_FRAME_TIMEOUT_MS,
        }
    }
}

impl HsvConfig {
    /// True when the hue range wraps through 180/0
    pub fn hue_wraps(&self) -> bool {
        self.h_min > self.h_max
    }
}
