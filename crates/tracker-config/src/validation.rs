// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Tunables validation
//!
//! Loading only checks types. These checks make sure ranges are consistent
//! before a strategy starts using the values. All violations are collected
//! and reported together.

use crate::{ConfigError, ConfigResult, DifferenceConfig, HsvConfig};

/// Largest hue value on the 0-180 scale
pub const MAX_HUE: u8 = 180;

/// Largest accepted blur sigma; blur cost grows with the kernel radius
pub const MAX_BLUR_SIGMA: f32 = 50.0;

/// Validation errors that can occur during tunables validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    InvertedRange { field: String, min: u64, max: u64 },
    OutOfRange { field: String, value: u64, max: u64 },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvertedRange { field, min, max } => {
                write!(f, "{}: minimum {} is greater than maximum {}", field, min, max)
            }
            Self::OutOfRange { field, value, max } => {
                write!(f, "{} = {} is outside valid range (0-{})", field, value, max)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid value for {}: {}", field, reason)
            }
        }
    }
}

/// Implemented by every tunables struct
pub trait Validate {
    /// Collect every violation into `errors`
    fn collect_errors(&self, errors: &mut Vec<ConfigValidationError>);

    /// Validate the tunables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` listing every violation
    fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        self.collect_errors(&mut errors);

        if errors.is_empty() {
            return Ok(());
        }

        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        Err(ConfigError::ValidationError(format!(
            "Tunables validation failed:\n{}",
            error_messages
        )))
    }
}

impl Validate for DifferenceConfig {
    fn collect_errors(&self, errors: &mut Vec<ConfigValidationError>) {
        if !(0.0..=MAX_BLUR_SIGMA).contains(&self.blur_sigma) {
            errors.push(ConfigValidationError::InvalidValue {
                field: "blur_sigma".to_string(),
                reason: format!(
                    "must be between 0 and {}, got {}",
                    MAX_BLUR_SIGMA, self.blur_sigma
                ),
            });
        }
        validate_area(self.min_object_area, self.max_object_area, errors);
        validate_timeout(self.frame_timeout_ms, errors);
    }
}

impl Validate for HsvConfig {
    fn collect_errors(&self, errors: &mut Vec<ConfigValidationError>) {
        for (field, value) in [("h_min", self.h_min), ("h_max", self.h_max)] {
            if value > MAX_HUE {
                errors.push(ConfigValidationError::OutOfRange {
                    field: field.to_string(),
                    value: value as u64,
                    max: MAX_HUE as u64,
                });
            }
        }

        // Hue may wrap, saturation and value may not
        for (field, min, max) in [
            ("saturation", self.s_min, self.s_max),
            ("value", self.v_min, self.v_max),
        ] {
            if min > max {
                errors.push(ConfigValidationError::InvertedRange {
                    field: field.to_string(),
                    min: min as u64,
                    max: max as u64,
                });
            }
        }

        validate_area(self.min_object_area, self.max_object_area, errors);
        validate_timeout(self.frame_timeout_ms, errors);
    }
}

fn validate_area(min: u32, max: u32, errors: &mut Vec<ConfigValidationError>) {
    if min > max {
        errors.push(ConfigValidationError::InvertedRange {
            field: "object_area".to_string(),
            min: min as u64,
            max: max as u64,
        });
    }
}

fn validate_timeout(timeout_ms: u64, errors: &mut Vec<ConfigValidationError>) {
    if timeout_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "frame_timeout_ms".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
}
