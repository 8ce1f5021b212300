// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! Shared-memory namespace
//!
//! Maps channel names to slot files inside one directory and implements
//! [`ChannelProvider`] on top of them.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::traits::{ChannelProvider, FrameSink, FrameSource, PositionSink};
use crate::{FrameReader, FrameWriter, PositionReader, PositionWriter};
use crate::{TransportError, TransportResult};

/// Environment variable overriding the namespace directory
pub const SHM_DIR_ENV_VAR: &str = "TRACKER_SHM_DIR";

const NAMESPACE_DIR: &str = "simple-tracker";
const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Directory holding the slot files of one set of cooperating nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShmNamespace {
    root: PathBuf,
}

impl ShmNamespace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Namespace from `TRACKER_SHM_DIR`, or the platform default
    pub fn from_env() -> Self {
        match std::env::var_os(SHM_DIR_ENV_VAR) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::new(Self::default_root()),
        }
    }

    /// `/dev/shm/simple-tracker` on Linux, `<tmp>/simple-tracker` elsewhere
    pub fn default_root() -> PathBuf {
        #[cfg(target_os = "linux")]
        {
            let dev_shm = Path::new("/dev/shm");
            if dev_shm.is_dir() {
                return dev_shm.join(NAMESPACE_DIR);
            }
        }
        std::env::temp_dir().join(NAMESPACE_DIR)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Slot file backing the channel `name`
    pub fn channel_path(&self, name: &str) -> TransportResult<PathBuf> {
        validate_channel_name(name)?;
        Ok(self.root.join(name))
    }

    pub fn channel_exists(&self, name: &str) -> bool {
        self.channel_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    pub fn create_frame_writer(
        &self,
        name: &str,
        max_width: u32,
        max_height: u32,
    ) -> TransportResult<FrameWriter> {
        FrameWriter::create(&self.channel_path(name)?, max_width, max_height)
    }

    pub fn open_frame_reader(&self, name: &str) -> TransportResult<FrameReader> {
        let path = self.existing_channel(name)?;
        FrameReader::open(&path)
    }

    pub fn create_position_writer(&self, name: &str) -> TransportResult<PositionWriter> {
        PositionWriter::create(&self.channel_path(name)?)
    }

    pub fn open_position_reader(&self, name: &str) -> TransportResult<PositionReader> {
        let path = self.existing_channel(name)?;
        PositionReader::open(&path)
    }

    fn existing_channel(&self, name: &str) -> TransportResult<PathBuf> {
        let path = self.channel_path(name)?;
        if !path.is_file() {
            return Err(TransportError::ChannelNotFound(name.to_string()));
        }
        Ok(path)
    }
}

impl Default for ShmNamespace {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Channel names: `[A-Za-z0-9._-]+`, not starting with `.`
pub fn validate_channel_name(name: &str) -> TransportResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(TransportError::InvalidChannelName(name.to_string()))
    }
}

impl ChannelProvider for ShmNamespace {
    fn connect_source(
        &self,
        name: &str,
        timeout: Duration,
    ) -> TransportResult<Box<dyn FrameSource>> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.open_frame_reader(name) {
                Ok(reader) => {
                    info!("[SHM] Connected to frame channel '{}'", name);
                    return Ok(Box::new(reader));
                }
                // Producer not up yet, or still initialising its slot
                Err(TransportError::ChannelNotFound(_)) | Err(TransportError::InvalidSlot { .. })
                    if Instant::now() < deadline =>
                {
                    thread::sleep(CONNECT_POLL_INTERVAL);
                }
                Err(e) => {
                    debug!("[SHM] Could not connect to '{}': {}", name, e);
                    return Err(e);
                }
            }
        }
    }

    fn create_sink(&self, name: &str) -> TransportResult<Box<dyn PositionSink>> {
        let writer = self.create_position_writer(name)?;
        info!("[SHM] Created position channel '{}'", name);
        Ok(Box::new(writer))
    }

    fn create_frame_sink(
        &self,
        name: &str,
        width: u32,
        height: u32,
    ) -> TransportResult<Box<dyn FrameSink>> {
        Ok(Box::new(self.create_frame_writer(name, width, height)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;
    use image::RgbImage;
    use tempfile::tempdir;

    #[test]
    fn test_channel_name_validation() {
        assert!(validate_channel_name("cam1").is_ok());
        assert!(validate_channel_name("pos_1.left-eye").is_ok());

        for bad in ["", ".hidden", "a/b", "..", "cam 1", "caméra"] {
            assert!(
                matches!(
                    validate_channel_name(bad),
                    Err(TransportError::InvalidChannelName(_))
                ),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_channel_path() {
        let namespace = ShmNamespace::new("/tmp/ns");
        assert_eq!(
            namespace.channel_path("cam1").unwrap(),
            PathBuf::from("/tmp/ns/cam1")
        );
    }

    #[test]
    fn test_open_missing_channel() {
        let dir = tempdir().unwrap();
        let namespace = ShmNamespace::new(dir.path());

        assert!(!namespace.channel_exists("cam1"));
        assert!(matches!(
            namespace.open_frame_reader("cam1"),
            Err(TransportError::ChannelNotFound(name)) if name == "cam1"
        ));
    }

    #[test]
    fn test_connect_source_times_out() {
        let dir = tempdir().unwrap();
        let namespace = ShmNamespace::new(dir.path());

        let start = Instant::now();
        let result = namespace.connect_source("cam1", Duration::from_millis(30));
        assert!(matches!(result, Err(TransportError::ChannelNotFound(_))));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_provider_round_trip() {
        let dir = tempdir().unwrap();
        let namespace = ShmNamespace::new(dir.path().join("nested"));

        let mut camera = namespace.create_frame_writer("cam1", 4, 4).unwrap();
        camera.write_image(&RgbImage::new(4, 4), 1).unwrap();

        let mut source = namespace
            .connect_source("cam1", Duration::from_millis(100))
            .unwrap();
        assert_eq!(source.name(), "cam1");
        assert_eq!(
            source
                .read_latest_frame(Duration::from_millis(50))
                .unwrap()
                .sequence,
            1
        );

        let mut sink = namespace.create_sink("pos1").unwrap();
        sink.write_position(&Position::new(1.0, 2.0, 3, 1)).unwrap();

        let mut reader = namespace.open_position_reader("pos1").unwrap();
        assert!(reader.try_read_position().unwrap().unwrap().found);
    }
}
