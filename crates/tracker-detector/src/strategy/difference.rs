// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Grayscale frame-differencing strategy
//!
//! Pipeline: grayscale -> optional gaussian blur -> |current - previous| ->
//! threshold -> largest connected blob -> centroid.
//!
//! The previous processed frame is the reference. The first frame, and any
//! frame whose size differs from the reference, only seeds the reference.

use image::{imageops, GrayImage};
use imageproc::filter::gaussian_blur_f32;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{detect_from_mask, Detection, DetectionStrategy, DetectorKind};
use crate::DetectorResult;
use tracker_config::{load_section, DifferenceConfig, Validate};
use tracker_shmem::Frame;

#[derive(Debug, Default)]
pub struct DifferenceStrategy {
    config: DifferenceConfig,
    reference: Option<GrayImage>,
}

impl DifferenceStrategy {
    pub fn new(config: DifferenceConfig) -> Self {
        Self {
            config,
            reference: None,
        }
    }

    pub fn config(&self) -> &DifferenceConfig {
        &self.config
    }

    fn preprocess(&self, frame: &Frame) -> GrayImage {
        let gray = imageops::grayscale(&frame.image);
        if self.config.blur_sigma > 0.0 {
            gaussian_blur_f32(&gray, self.config.blur_sigma)
        } else {
            gray
        }
    }

    fn motion_mask(&self, current: &GrayImage, previous: &GrayImage) -> GrayImage {
        let threshold = self.config.intensity_threshold;
        let mut mask = GrayImage::new(current.width(), current.height());
        for ((out, now), before) in mask.iter_mut().zip(current.iter()).zip(previous.iter()) {
            *out = if now.abs_diff(*before) >= threshold { 255 } else { 0 };
        }
        mask
    }
}

impl DetectionStrategy for DifferenceStrategy {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Difference
    }

    fn configure(&mut self, file: &Path, key: &str) -> DetectorResult<()> {
        let config: DifferenceConfig = load_section(file, key)?;
        config.validate()?;

        info!(
            "[DIFFERENCE] Configured from '{}' [{}]: threshold={}, blur_sigma={}, area={}..={}",
            file.display(),
            key,
            config.intensity_threshold,
            config.blur_sigma,
            config.min_object_area,
            config.max_object_area
        );

        self.config = config;
        self.reference = None;
        Ok(())
    }

    fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.config.frame_timeout_ms)
    }

    fn find_object(&mut self, frame: &Frame) -> Detection {
        let current = self.preprocess(frame);

        let previous = match self.reference.take() {
            Some(previous) if previous.dimensions() == current.dimensions() => previous,
            stale => {
                if stale.is_some() {
                    debug!(
                        "[DIFFERENCE] Frame size changed to {}x{}, reseeding reference",
                        current.width(),
                        current.height()
                    );
                }
                let mask = GrayImage::new(current.width(), current.height());
                self.reference = Some(current);
                return Detection::not_found(mask);
            }
        };

        let mask = self.motion_mask(&current, &previous);
        self.reference = Some(current);

        detect_from_mask(
            mask,
            self.config.min_object_area,
            self.config.max_object_area,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DetectorError;
    use image::{Rgb, RgbImage};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn frame_with_square(sequence: u64, x0: u32, y0: u32) -> Frame {
        let image = RgbImage::from_fn(40, 30, |x, y| {
            if x >= x0 && x < x0 + 5 && y >= y0 && y < y0 + 5 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        Frame {
            image,
            sequence,
            timestamp_ns: sequence * 1000,
        }
    }

    fn unblurred() -> DifferenceStrategy {
        DifferenceStrategy::new(DifferenceConfig {
            blur_sigma: 0.0,
            min_object_area: 1,
            ..DifferenceConfig::default()
        })
    }

    #[test]
    fn test_first_frame_seeds_reference() {
        let mut strategy = unblurred();
        let detection = strategy.find_object(&frame_with_square(1, 10, 10));
        assert!(!detection.found);
        assert_eq!(detection.mask.dimensions(), (40, 30));
    }

    #[test]
    fn test_static_scene_has_no_motion() {
        let mut strategy = unblurred();
        strategy.find_object(&frame_with_square(1, 10, 10));
        let detection = strategy.find_object(&frame_with_square(2, 10, 10));
        assert!(!detection.found);
    }

    #[test]
    fn test_object_appearing_is_found() {
        let mut strategy = unblurred();
        let empty = Frame {
            image: RgbImage::new(40, 30),
            sequence: 1,
            timestamp_ns: 0,
        };
        strategy.find_object(&empty);

        let detection = strategy.find_object(&frame_with_square(2, 20, 4));
        assert!(detection.found);
        assert_eq!(detection.area, 25);
        assert!((detection.x - 22.0).abs() < 1e-9);
        assert!((detection.y - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_size_change_reseeds() {
        let mut strategy = unblurred();
        strategy.find_object(&frame_with_square(1, 10, 10));

        let smaller = Frame {
            image: RgbImage::new(20, 20),
            sequence: 2,
            timestamp_ns: 0,
        };
        let detection = strategy.find_object(&smaller);
        assert!(!detection.found);
        assert_eq!(detection.mask.dimensions(), (20, 20));
    }

    #[test]
    fn test_blur_keeps_large_motion() {
        let mut strategy = DifferenceStrategy::default();
        strategy.find_object(&Frame {
            image: RgbImage::new(40, 30),
            sequence: 1,
            timestamp_ns: 0,
        });
        let detection = strategy.find_object(&frame_with_square(2, 15, 10));
        assert!(detection.found);
        assert!((detection.x - 17.0).abs() < 1.0);
        assert!((detection.y - 12.0).abs() < 1.0);
    }

    #[test]
    fn test_configure_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[motion]\nintensity_threshold = 40\nblur_sigma = 0.0\nframe_timeout_ms = 250"
        )
        .unwrap();

        let mut strategy = DifferenceStrategy::default();
        strategy.configure(file.path(), "motion").unwrap();

        assert_eq!(strategy.config().intensity_threshold, 40);
        assert_eq!(strategy.config().min_object_area, 10);
        assert_eq!(strategy.frame_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_failed_configure_keeps_previous_tunables() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[motion]\nmin_object_area = 50\nmax_object_area = 5").unwrap();

        let mut strategy = DifferenceStrategy::default();
        let result = strategy.configure(file.path(), "motion");
        assert!(matches!(result, Err(DetectorError::Config(_))));
        assert_eq!(strategy.config(), &DifferenceConfig::default());

        let result = strategy.configure(file.path(), "missing");
        assert!(matches!(result, Err(DetectorError::Config(_))));
    }

    #[test]
    fn test_configure_rejects_huge_blur() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[motion]\nblur_sigma = 1.0e9").unwrap();

        let mut strategy = DifferenceStrategy::default();
        let result = strategy.configure(file.path(), "motion");
        assert!(matches!(result, Err(DetectorError::Config(_))));
        assert_eq!(strategy.config().blur_sigma, DifferenceConfig::default().blur_sigma);
    }
}
