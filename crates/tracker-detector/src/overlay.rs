// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Tuning overlay rendering

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_circle_mut};

use crate::strategy::Detection;

/// Suffix appended to the sink name for the tuning overlay channel
pub const TUNING_CHANNEL_SUFFIX: &str = "-tuning";

const MASK_TINT: Rgb<u8> = Rgb([0, 255, 0]);
const MARKER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Overlay channel name for `sink`
pub fn tuning_channel_name(sink: &str) -> String {
    format!("{}{}", sink, TUNING_CHANNEL_SUFFIX)
}

/// Frame with the foreground mask tinted green and the detected position
/// marked in red
pub fn render_overlay(frame: &RgbImage, detection: &Detection) -> RgbImage {
    let mut canvas = frame.clone();

    if detection.mask.dimensions() == canvas.dimensions() {
        for (pixel, mask) in canvas.pixels_mut().zip(detection.mask.pixels()) {
            if mask[0] > 0 {
                for (channel, tint) in pixel.0.iter_mut().zip(MASK_TINT.0) {
                    *channel = ((*channel as u16 + tint as u16) / 2) as u8;
                }
            }
        }
    }

    if detection.found {
        let center = (detection.x.round() as i32, detection.y.round() as i32);
        draw_cross_mut(&mut canvas, MARKER_COLOR, center.0, center.1);

        let radius = (detection.area as f64 / std::f64::consts::PI).sqrt().ceil() as i32;
        if radius > 1 {
            draw_hollow_circle_mut(&mut canvas, center, radius, MARKER_COLOR);
        }
    }

    canvas
}
