// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! HSV color-threshold strategy
//!
//! Pipeline: RGB -> HSV (hue 0-180) -> in-range mask -> erode -> dilate ->
//! largest connected blob -> centroid.

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::{detect_from_mask, Detection, DetectionStrategy, DetectorKind};
use crate::DetectorResult;
use tracker_config::{load_section, HsvConfig, Validate};
use tracker_shmem::Frame;

/// Convert one RGB pixel to HSV with hue in 0..180 and S/V in 0..=255
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (max - min) as f32;

    let v = max;
    let s = if max == 0 {
        0
    } else {
        (255.0 * delta / max as f32).round() as u8
    };

    if delta == 0.0 {
        return (0, s, v);
    }

    let (r, g, b) = (r as f32, g as f32, b as f32);
    let mut degrees = if max as f32 == r {
        60.0 * (g - b) / delta
    } else if max as f32 == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if degrees < 0.0 {
        degrees += 360.0;
    }

    let h = (degrees / 2.0).round() as u16 % 180;
    (h as u8, s, v)
}

#[derive(Debug, Default)]
pub struct HsvStrategy {
    config: HsvConfig,
}

impl HsvStrategy {
    pub fn new(config: HsvConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HsvConfig {
        &self.config
    }

    fn hue_matches(&self, h: u8) -> bool {
        if self.config.hue_wraps() {
            h >= self.config.h_min || h <= self.config.h_max
        } else {
            h >= self.config.h_min && h <= self.config.h_max
        }
    }

    fn in_range(&self, (h, s, v): (u8, u8, u8)) -> bool {
        self.hue_matches(h)
            && (self.config.s_min..=self.config.s_max).contains(&s)
            && (self.config.v_min..=self.config.v_max).contains(&v)
    }

    /// Binary mask of pixels inside the configured HSV box
    pub fn threshold_mask(&self, image: &RgbImage) -> GrayImage {
        let mut mask = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            let [r, g, b] = image.get_pixel(x, y).0;
            if self.in_range(rgb_to_hsv(r, g, b)) {
                Luma([255])
            } else {
                Luma([0])
            }
        });

        if self.config.erode_size > 0 {
            mask = erode(&mask, Norm::LInf, self.config.erode_size);
        }
        if self.config.dilate_size > 0 {
            mask = dilate(&mask, Norm::LInf, self.config.dilate_size);
        }
        mask
    }
}

impl DetectionStrategy for HsvStrategy {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Hsv
    }

    fn configure(&mut self, file: &Path, key: &str) -> DetectorResult<()> {
        let config: HsvConfig = load_section(file, key)?;
        config.validate()?;

        info!(
            "[HSV] Configured from '{}' [{}]: H={}..{}{} S={}..{} V={}..{}, erode={}, dilate={}",
            file.display(),
            key,
            config.h_min,
            config.h_max,
            if config.hue_wraps() { " (wrapping)" } else { "" },
            config.s_min,
            config.s_max,
            config.v_min,
            config.v_max,
            config.erode_size,
            config.dilate_size
        );

        self.config = config;
        Ok(())
    }

    fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.config.frame_timeout_ms)
    }

    fn find_object(&mut self, frame: &Frame) -> Detection {
        let mask = self.threshold_mask(&frame.image);
        detect_from_mask(
            mask,
            self.config.min_object_area,
            self.config.max_object_area,
        )
    }
}
