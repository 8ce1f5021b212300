// Copyright 2025 Simple Tracker Developers
// SPDX-License-Identifier: Apache-2.0

//! # Latest-Only Shared Memory Slots
//!
//! A slot holds exactly one record: the most recent one written. Readers that
//! fall behind skip straight to the newest record.
//!
//! Format:
//! ```text
//! Header (256 bytes):
//!   [0:8]    Magic (8 bytes ASCII, identifies the record kind)
//!   [8:12]   Version (u32)
//!   [12:16]  Max payload size (u32)
//!   [16:20]  Writer PID (u32)
//!   [20:24]  Payload size (u32)
//!   [24:32]  Timestamp ns (u64)
//!   [32:40]  Seqlock counter (u64, odd while a write is in progress)
//!   [40:256] Padding (zeros)
//!
//! Then max_payload bytes of payload.
//! ```
//!
//! All integers are little-endian. The published sequence number is the
//! seqlock counter divided by two, so the first record is sequence 1.

use memmap2::MmapMut;
use std::fs::{self, File, OpenOptions};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::{TransportError, TransportResult};

pub const SLOT_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 256;

const MAGIC_RANGE: std::ops::Range<usize> = 0..8;
const VERSION_OFFSET: usize = 8;
const MAX_PAYLOAD_OFFSET: usize = 12;
const WRITER_PID_OFFSET: usize = 16;
const PAYLOAD_SIZE_OFFSET: usize = 20;
const TIMESTAMP_OFFSET: usize = 24;
const SEQLOCK_OFFSET: usize = 32;

/// Torn reads are retried this many times before giving up on a poll
const READ_ATTEMPTS: usize = 16;
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Data read from a slot
#[derive(Debug, Clone)]
pub struct SlotData {
    pub data: Vec<u8>,
    pub timestamp_ns: u64,
    pub sequence: u64,
}

impl SlotData {
    /// Milliseconds elapsed since the record was written
    pub fn age_ms(&self) -> f64 {
        crate::now_ns().saturating_sub(self.timestamp_ns) as f64 / 1_000_000.0
    }
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn seqlock(mmap: &MmapMut) -> &AtomicU64 {
    // SAFETY: mappings are page aligned and at least HEADER_SIZE bytes long,
    // so SEQLOCK_OFFSET addresses an 8-byte aligned u64 that lives as long as
    // the mapping.
    unsafe { &*(mmap.as_ptr().add(SEQLOCK_OFFSET) as *const AtomicU64) }
}

/// (device, inode) of a slot file
type FileIdentity = (u64, u64);

#[cfg(unix)]
fn file_identity(metadata: &fs::Metadata) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn file_identity(_metadata: &fs::Metadata) -> Option<FileIdentity> {
    None
}

fn invalid_slot(path: &Path, reason: impl Into<String>) -> TransportError {
    TransportError::InvalidSlot {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Single writer of a latest-only slot
///
/// The writer owns the slot file and removes it when dropped.
pub struct SlotWriter {
    path: PathBuf,
    mmap: MmapMut,
    max_payload: usize,
    sequence: u64,
}

impl SlotWriter {
    /// Create (or replace) the slot file at `path`
    pub fn create(path: &Path, magic: &[u8; 8], max_payload: usize) -> TransportResult<Self> {
        if max_payload > u32::MAX as usize {
            return Err(TransportError::MessageTooLarge {
                size: max_payload,
                max_size: u32::MAX as usize,
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Unlink first so readers still mapping an old slot never see it shrink
        match fs::remove_file(path) {
            Ok(()) => debug!("[SHM] Replaced stale slot {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        #[cfg(unix)]
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;

        #[cfg(not(unix))]
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let total_size = HEADER_SIZE + max_payload;
        file.set_len(total_size as u64)?;

        let mut mmap = unsafe { MmapMut::map_mut(&file)? };

        mmap[MAGIC_RANGE].copy_from_slice(magic);
        write_u32(&mut mmap, VERSION_OFFSET, SLOT_VERSION);
        write_u32(&mut mmap, MAX_PAYLOAD_OFFSET, max_payload as u32);
        write_u32(&mut mmap, WRITER_PID_OFFSET, std::process::id());
        write_u32(&mut mmap, PAYLOAD_SIZE_OFFSET, 0);
        write_u64(&mut mmap, TIMESTAMP_OFFSET, 0);
        mmap[SEQLOCK_OFFSET + 8..HEADER_SIZE].fill(0);
        seqlock(&mmap).store(0, Ordering::Release);

        info!(
            "[SHM] Created slot {} ({} byte payload)",
            path.display(),
            max_payload
        );

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            max_payload,
            sequence: 0,
        })
    }

    /// Publish a record, replacing the previous one
    ///
    /// Returns the sequence number of the new record.
    pub fn write(&mut self, payload: &[u8], timestamp_ns: u64) -> TransportResult<u64> {
        if payload.len() > self.max_payload {
            return Err(TransportError::MessageTooLarge {
                size: payload.len(),
                max_size: self.max_payload,
            });
        }

        let counter = self.sequence * 2;
        seqlock(&self.mmap).store(counter + 1, Ordering::Relaxed);
        fence(Ordering::Release);

        self.mmap[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);
        write_u32(&mut self.mmap, PAYLOAD_SIZE_OFFSET, payload.len() as u32);
        write_u64(&mut self.mmap, TIMESTAMP_OFFSET, timestamp_ns);

        seqlock(&self.mmap).store(counter + 2, Ordering::Release);

        // Mapping is shared; readers observe writes without msync
        self.sequence += 1;
        Ok(self.sequence)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Sequence number of the last record written (0 before the first write)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Drop for SlotWriter {
    fn drop(&mut self) {
        let _ = self.mmap.flush();
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("[SHM] Could not remove slot {}: {}", self.path.display(), e);
        }
        info!(
            "[SHM] Slot {} closed after {} records written",
            self.path.display(),
            self.sequence
        );
    }
}

/// Reader of a latest-only slot
pub struct SlotReader {
    path: PathBuf,
    identity: Option<FileIdentity>,
    _file: File,
    mmap: MmapMut,
    max_payload: usize,
    last_sequence: u64,
}

impl SlotReader {
    /// Open an existing slot for reading
    ///
    /// Fails if the file does not exist, is too small, or carries a
    /// different magic or version.
    pub fn open(path: &Path, magic: &[u8; 8]) -> TransportResult<Self> {
        // Write access is needed for the shared read/write mapping
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };

        if mmap.len() < HEADER_SIZE {
            return Err(invalid_slot(
                path,
                format!("{} bytes (need at least {})", mmap.len(), HEADER_SIZE),
            ));
        }

        if &mmap[MAGIC_RANGE] != magic {
            return Err(invalid_slot(
                path,
                format!("expected magic {:?}, got {:?}", magic, &mmap[MAGIC_RANGE]),
            ));
        }

        let version = read_u32(&mmap, VERSION_OFFSET);
        if version != SLOT_VERSION {
            return Err(invalid_slot(
                path,
                format!("unsupported version {} (expected {})", version, SLOT_VERSION),
            ));
        }

        let max_payload = read_u32(&mmap, MAX_PAYLOAD_OFFSET) as usize;
        if mmap.len() < HEADER_SIZE + max_payload {
            return Err(invalid_slot(
                path,
                format!(
                    "{} bytes cannot hold a {} byte payload",
                    mmap.len(),
                    max_payload
                ),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            identity: file_identity(&file.metadata()?),
            _file: file,
            mmap,
            max_payload,
            last_sequence: 0,
        })
    }

    /// Read the latest record if it is newer than the last one returned
    ///
    /// Non-blocking. Returns `Ok(None)` when nothing new has been written or
    /// the writer kept the slot busy for every retry.
    pub fn read_latest(&mut self) -> TransportResult<Option<SlotData>> {
        for _ in 0..READ_ATTEMPTS {
            let before = seqlock(&self.mmap).load(Ordering::Acquire);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let sequence = before / 2;
            if sequence <= self.last_sequence {
                return Ok(None);
            }

            let payload_size = read_u32(&self.mmap, PAYLOAD_SIZE_OFFSET) as usize;
            let timestamp_ns = read_u64(&self.mmap, TIMESTAMP_OFFSET);

            let data = if payload_size <= self.max_payload {
                Some(self.mmap[HEADER_SIZE..HEADER_SIZE + payload_size].to_vec())
            } else {
                None
            };

            fence(Ordering::Acquire);
            if seqlock(&self.mmap).load(Ordering::Relaxed) != before {
                continue;
            }

            let data = data.ok_or_else(|| {
                invalid_slot(
                    &self.path,
                    format!(
                        "payload size {} exceeds slot capacity {}",
                        payload_size, self.max_payload
                    ),
                )
            })?;

            self.last_sequence = sequence;
            return Ok(Some(SlotData {
                data,
                timestamp_ns,
                sequence,
            }));
        }

        Ok(None)
    }

    /// Wait up to `timeout` for a record newer than the last one returned
    ///
    /// # Errors
    ///
    /// `TransportError::Timeout` if nothing new arrives in time.
    pub fn wait_latest(&mut self, timeout: Duration) -> TransportResult<SlotData> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(data) = self.read_latest()? {
                return Ok(data);
            }
            if Instant::now() >= deadline {
                return Err(TransportError::Timeout);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// True while the slot file this reader mapped is still the one at its path
    ///
    /// Turns false once the writer removed the slot or a new writer replaced it.
    pub fn is_current(&self) -> bool {
        match fs::metadata(&self.path) {
            Ok(metadata) => file_identity(&metadata) == self.identity,
            Err(_) => false,
        }
    }

    /// PID of the process that created the slot
    pub fn writer_pid(&self) -> u32 {
        read_u32(&self.mmap, WRITER_PID_OFFSET)
    }

    /// Sequence number of the last record returned (0 before the first read)
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const MAGIC: &[u8; 8] = b"TESTSLOT";

    #[test]
    fn test_slot_writer_creation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slot.bin");

        let writer = SlotWriter::create(&path, MAGIC, 1024).unwrap();

        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), (HEADER_SIZE + 1024) as u64);
        assert_eq!(writer.sequence(), 0);

        drop(writer);
        assert!(!path.exists(), "writer should remove its slot on drop");
    }

    #[test]
    fn test_latest_only_semantics() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slot.bin");

        let mut writer = SlotWriter::create(&path, MAGIC, 64).unwrap();
        let mut reader = SlotReader::open(&path, MAGIC).unwrap();
        assert_eq!(reader.writer_pid(), std::process::id());

        // Nothing written yet
        assert!(reader.read_latest().unwrap().is_none());

        writer.write(b"first", 10).unwrap();
        writer.write(b"second", 20).unwrap();

        let data = reader.read_latest().unwrap().unwrap();
        assert_eq!(data.data, b"second");
        assert_eq!(data.timestamp_ns, 20);
        assert_eq!(data.sequence, 2);

        // Already consumed
        assert!(reader.read_latest().unwrap().is_none());

        writer.write(b"third", 30).unwrap();
        assert_eq!(reader.read_latest().unwrap().unwrap().data, b"third");
    }

    #[test]
    fn test_payload_too_large() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slot.bin");

        let mut writer = SlotWriter::create(&path, MAGIC, 4).unwrap();
        let result = writer.write(b"too long", 0);
        assert!(matches!(
            result,
            Err(TransportError::MessageTooLarge { size: 8, max_size: 4 })
        ));
        assert_eq!(writer.sequence(), 0);
    }

    #[test]
    fn test_wait_latest_times_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slot.bin");

        let _writer = SlotWriter::create(&path, MAGIC, 16).unwrap();
        let mut reader = SlotReader::open(&path, MAGIC).unwrap();

        let start = Instant::now();
        let result = reader.wait_latest(Duration::from_millis(20));
        assert!(matches!(result, Err(TransportError::Timeout)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_open_rejects_wrong_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slot.bin");

        let _writer = SlotWriter::create(&path, MAGIC, 16).unwrap();
        let result = SlotReader::open(&path, b"OTHERKND");
        assert!(matches!(result, Err(TransportError::InvalidSlot { .. })));
    }

    #[test]
    fn test_open_rejects_short_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.bin");

        let mut file = File::create(&path).unwrap();
        file.write_all(&[0u8; 32]).unwrap();
        file.sync_all().unwrap();
        drop(file);

        let result = SlotReader::open(&path, MAGIC);
        assert!(matches!(result, Err(TransportError::InvalidSlot { .. })));
    }

    #[test]
    fn test_recreated_slot_keeps_old_reader_valid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slot.bin");

        let mut writer = SlotWriter::create(&path, MAGIC, 16).unwrap();
        let mut reader = SlotReader::open(&path, MAGIC).unwrap();
        writer.write(b"old", 1).unwrap();
        drop(writer);

        // A new writer gets a fresh file; the old mapping still reads the old record
        assert!(!reader.is_current());
        let mut writer = SlotWriter::create(&path, MAGIC, 16).unwrap();
        writer.write(b"new", 2).unwrap();
        assert_eq!(reader.read_latest().unwrap().unwrap().data, b"old");
        assert!(!reader.is_current());

        let mut fresh = SlotReader::open(&path, MAGIC).unwrap();
        assert!(fresh.is_current());
        assert_eq!(fresh.read_latest().unwrap().unwrap().data, b"new");
    }
}
