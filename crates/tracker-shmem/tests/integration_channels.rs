//! Integration tests for shared-memory channels across threads

use image::{Rgb, RgbImage};
use std::thread;
use std::time::{Duration, Instant};
use tracker_shmem::{ChannelProvider, Position, ShmNamespace, TransportError};

fn create_namespace() -> (tempfile::TempDir, ShmNamespace) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let namespace = ShmNamespace::new(dir.path());
    (dir, namespace)
}

#[test]
fn test_concurrent_reader_never_sees_torn_frames() {
    let (_dir, namespace) = create_namespace();
    let mut camera = namespace
        .create_frame_writer("cam1", 32, 32)
        .expect("Failed to create frame writer");
    let mut reader = namespace
        .open_frame_reader("cam1")
        .expect("Failed to open frame reader");

    let producer = thread::spawn(move || {
        for value in 1..=200u32 {
            let shade = (value % 251) as u8;
            let image = RgbImage::from_pixel(32, 32, Rgb([shade, shade, shade]));
            camera.write_image(&image, value as u64).unwrap();
        }
        // Keep the slot alive until the reader is done
        camera
    });

    let mut last_sequence = 0;
    let deadline = Instant::now() + Duration::from_secs(5);
    while last_sequence < 200 && Instant::now() < deadline {
        match reader.read_latest_frame(Duration::from_millis(50)) {
            Ok(frame) => {
                assert!(frame.sequence > last_sequence, "sequence went backwards");
                let first = *frame.image.get_pixel(0, 0);
                assert!(
                    frame.image.pixels().all(|p| *p == first),
                    "frame {} mixes two writes",
                    frame.sequence
                );
                assert_eq!(first[0] as u64, frame.timestamp_ns % 251);
                last_sequence = frame.sequence;
            }
            Err(TransportError::Timeout) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    let _camera = producer.join().unwrap();
    assert_eq!(last_sequence, 200);
}

#[test]
fn test_source_connects_once_producer_appears() {
    let (_dir, namespace) = create_namespace();
    let producer_namespace = namespace.clone();

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        let mut camera = producer_namespace.create_frame_writer("late", 8, 8).unwrap();
        camera.write_image(&RgbImage::new(8, 8), 1).unwrap();
        thread::sleep(Duration::from_millis(200));
    });

    let mut source = namespace
        .connect_source("late", Duration::from_secs(2))
        .expect("source should appear within the timeout");
    let frame = source.read_latest_frame(Duration::from_secs(1)).unwrap();
    assert_eq!(frame.width(), 8);

    producer.join().unwrap();
}

#[test]
fn test_writer_drop_removes_channel() {
    let (_dir, namespace) = create_namespace();

    let sink = namespace.create_sink("pos1").unwrap();
    assert!(namespace.channel_exists("pos1"));

    drop(sink);
    assert!(!namespace.channel_exists("pos1"));
}

#[test]
fn test_position_reader_sees_latest_only() {
    let (_dir, namespace) = create_namespace();
    let mut sink = namespace.create_sink("pos1").unwrap();
    let mut reader = namespace.open_position_reader("pos1").unwrap();

    for sample in 1..=5 {
        sink.write_position(&Position::new(sample as f64, 0.0, 0, sample))
            .unwrap();
    }

    let position = reader.try_read_position().unwrap().unwrap();
    assert_eq!(position.sample, 5);
    assert!(reader.try_read_position().unwrap().is_none());
}

#[test]
fn test_source_notices_restarted_producer() {
    let (_dir, namespace) = create_namespace();
    let camera = namespace.create_frame_writer("cam1", 8, 8).unwrap();
    let mut source = namespace
        .connect_source("cam1", Duration::from_millis(100))
        .unwrap();
    assert!(source.is_connected());

    // A restarted producer replaces the slot file under the old mapping
    drop(camera);
    assert!(!source.is_connected());
    let mut camera = namespace.create_frame_writer("cam1", 8, 8).unwrap();
    assert!(!source.is_connected());

    camera
        .write_image(&RgbImage::from_pixel(8, 8, Rgb([9, 9, 9])), 1)
        .unwrap();
    assert!(matches!(
        source.read_latest_frame(Duration::from_millis(20)),
        Err(TransportError::Timeout)
    ));

    let mut fresh = namespace
        .connect_source("cam1", Duration::from_millis(100))
        .unwrap();
    assert!(fresh.is_connected());
    let frame = fresh.read_latest_frame(Duration::from_millis(100)).unwrap();
    assert_eq!(*frame.image.get_pixel(0, 0), Rgb([9, 9, 9]));
}
