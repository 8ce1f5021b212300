// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Command-line interface
//!
//! ```text
//! detector TYPE SOURCE SINK [-c FILE -k KEY] [--shm-dir DIR] [--debug CRATE]...
//! ```
//!
//! Exit codes: `0` for help/version and a clean run, `-1` for missing or
//! invalid arguments, `1` for parse failures and runtime errors.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::strategy::DetectorKind;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_INVALID_ARGUMENTS: i32 = -1;
pub const EXIT_FAILURE: i32 = 1;

const TYPE_HELP: &str = "TYPE\n  0: Difference detector (grey-scale)\n  1: HSV detector (color)";

/// Simple Tracker object detector
///
/// Perform TYPE object detection on frames from the shared-memory SOURCE and
/// publish detected object positions to the shared-memory SINK.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "detector",
    override_usage = "detector [OPTIONS]\n       detector TYPE SOURCE SINK [CONFIGURATION]",
    disable_version_flag = true,
    after_help = TYPE_HELP
)]
pub struct Args {
    /// Detector type (0: difference, 1: HSV)
    #[arg(value_name = "TYPE", allow_negative_numbers = true)]
    pub detector_type: Option<i32>,

    /// Name of the frame channel to read images from
    #[arg(value_name = "SOURCE")]
    pub source: Option<String>,

    /// Name of the position channel to publish to
    #[arg(value_name = "SINK")]
    pub sink: Option<String>,

    /// Configuration file
    #[arg(short = 'c', long, value_name = "FILE", help_heading = "CONFIGURATION")]
    pub config_file: Option<PathBuf>,

    /// Configuration key
    #[arg(short = 'k', long, value_name = "KEY", help_heading = "CONFIGURATION")]
    pub config_key: Option<String>,

    /// Shared-memory directory [default: $TRACKER_SHM_DIR or /dev/shm/simple-tracker]
    #[arg(long, value_name = "DIR")]
    pub shm_dir: Option<PathBuf>,

    /// Enable debug logging for a crate (repeatable; `all` for every crate)
    #[arg(long = "debug", value_name = "CRATE")]
    pub debug_crates: Vec<String>,

    /// Print version information
    #[arg(short = 'v', long)]
    pub version: bool,
}

/// Tunables source given by `-c FILE -k KEY`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSelection {
    pub file: PathBuf,
    pub key: String,
}

/// Validated node settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOptions {
    pub kind: DetectorKind,
    pub source: String,
    pub sink: String,
    pub config: Option<ConfigSelection>,
    pub shm_dir: Option<PathBuf>,
    /// Crates to log at `debug`, added to those in `TRACKER_DEBUG`
    pub debug_crates: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// `--help` (clap renders the text)
    #[error("{0}")]
    Help(clap::Error),

    #[error("version requested")]
    Version,

    /// Malformed command line (unknown flag, non-integer TYPE, ...)
    #[error("Error: {0}")]
    Parse(clap::Error),

    /// Well-formed but incomplete or inconsistent arguments
    #[error("Error: {message} Exiting.")]
    Invalid { message: String },
}

impl CliError {
    fn invalid(message: &str) -> Self {
        Self::Invalid {
            message: message.to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Help(_) | Self::Version => EXIT_SUCCESS,
            Self::Parse(_) => EXIT_FAILURE,
            Self::Invalid { .. } => EXIT_INVALID_ARGUMENTS,
        }
    }

    /// Print the message the way the operator expects and return the exit code
    pub fn report(&self) -> i32 {
        match self {
            Self::Help(err) | Self::Parse(err) => {
                let _ = err.print();
            }
            Self::Version => println!("{}", version_text()),
            Self::Invalid { .. } => {
                println!("{}", usage_text());
                println!("{}", self);
            }
        }
        self.exit_code()
    }
}

pub fn version_text() -> String {
    format!(
        "Simple-Tracker Object Detector version {}\nLicensed under the {} license.",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_LICENSE")
    )
}

pub fn usage_text() -> String {
    Args::command().render_help().to_string()
}

/// Parse and validate a full command line (including the program name)
pub fn parse_args<I, T>(args: I) -> Result<NodeOptions, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = Args::try_parse_from(args).map_err(|err| match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            CliError::Help(err)
        }
        _ => CliError::Parse(err),
    })?;
    args.validate()
}

impl Args {
    /// Check argument presence and consistency
    pub fn validate(self) -> Result<NodeOptions, CliError> {
        if self.version {
            return Err(CliError::Version);
        }

        let Some(detector_type) = self.detector_type else {
            return Err(CliError::invalid("a TYPE must be specified."));
        };
        let Some(source) = self.source else {
            return Err(CliError::invalid("a SOURCE must be specified."));
        };
        let Some(sink) = self.sink else {
            return Err(CliError::invalid("a SINK name must be specified."));
        };

        let config = match (self.config_file, self.config_key) {
            (Some(file), Some(key)) => Some(ConfigSelection { file, key }),
            (None, None) => None,
            _ => {
                return Err(CliError::invalid(
                    "config file must be supplied with a corresponding config-key.",
                ))
            }
        };

        let kind = DetectorKind::try_from(detector_type)
            .map_err(|_| CliError::invalid("invalid TYPE specified."))?;

        Ok(NodeOptions {
            kind,
            source,
            sink,
            config,
            shm_dir: self.shm_dir,
            debug_crates: self.debug_crates,
        })
    }
}
