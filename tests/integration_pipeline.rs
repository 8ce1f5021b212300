//! End-to-end pipeline tests: camera slot -> detector engine -> position slot
//!
//! Every test uses its own namespace directory so they can run in parallel.

use image::{Rgb, RgbImage};
use simple_tracker::detector::overlay::tuning_channel_name;
use simple_tracker::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const MOTION: &str = "[motion]\nintensity_threshold = 30\nblur_sigma = 0.0\nmin_object_area = 4\nframe_timeout_ms = 100\n";
const GREEN: &str = "[green]\nh_min = 50\nh_max = 70\ns_min = 100\nv_min = 100\nmin_object_area = 4\nframe_timeout_ms = 100\n";

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("tracker.toml");
    std::fs::write(&path, content).unwrap();
    path
}

/// 40x30 black frame with a 5x5 square of `color` at (`x0`, `y0`)
fn frame_with_square(x0: u32, y0: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(40, 30, |x, y| {
        if (x0..x0 + 5).contains(&x) && (y0..y0 + 5).contains(&y) {
            color
        } else {
            Rgb([0, 0, 0])
        }
    })
}

fn engine_for(
    kind: DetectorKind,
    namespace: &ShmNamespace,
    config: &Path,
    key: &str,
) -> DetectorEngine {
    let mut engine = DetectorEngine::new(
        create_strategy(kind),
        Arc::new(namespace.clone()),
        "cam1",
        "pos1",
    );
    engine.configure(config, key).unwrap();
    engine
}

#[test]
fn test_difference_pipeline_reports_moving_square() {
    let dir = TempDir::new().unwrap();
    let namespace = ShmNamespace::new(dir.path().join("shm"));
    let mut camera = namespace.create_frame_writer("cam1", 40, 30).unwrap();

    let config = write_config(dir.path(), MOTION);
    let mut engine = engine_for(DetectorKind::Difference, &namespace, &config, "motion");
    engine.start().unwrap();

    // First frame only seeds the reference
    camera.write_image(&RgbImage::new(40, 30), 1_000).unwrap();
    engine.cycle().unwrap();

    let mut positions = namespace.open_position_reader("pos1").unwrap();
    let first = positions.try_read_position().unwrap().unwrap();
    assert!(!first.found);
    assert_eq!(first.sample, 1);
    assert_eq!(first.timestamp_ns, 1_000);

    camera
        .write_image(&frame_with_square(10, 10, Rgb([255, 255, 255])), 2_000)
        .unwrap();
    engine.cycle().unwrap();

    let second = positions.try_read_position().unwrap().unwrap();
    assert!(second.found);
    assert_eq!(second.sample, 2);
    assert!((second.x - 12.0).abs() < 1e-9);
    assert!((second.y - 12.0).abs() < 1e-9);

    engine.stop();
    assert!(!namespace.channel_exists("pos1"));
}

#[test]
fn test_hsv_pipeline_publishes_tuning_overlay() {
    let dir = TempDir::new().unwrap();
    let namespace = ShmNamespace::new(dir.path().join("shm"));
    let mut camera = namespace.create_frame_writer("cam1", 40, 30).unwrap();

    let config = write_config(dir.path(), GREEN);
    let mut engine = engine_for(DetectorKind::Hsv, &namespace, &config, "green");
    engine.start().unwrap();
    engine.set_tune_mode(true);

    camera
        .write_image(&frame_with_square(20, 5, Rgb([0, 200, 0])), 5)
        .unwrap();
    engine.cycle().unwrap();

    let position = namespace
        .open_position_reader("pos1")
        .unwrap()
        .read_latest_position(Duration::from_secs(1))
        .unwrap();
    assert!(position.found);
    assert!((position.x - 22.0).abs() < 1e-9);
    assert!((position.y - 7.0).abs() < 1e-9);

    let mut overlay = namespace
        .open_frame_reader(&tuning_channel_name("pos1"))
        .unwrap();
    let frame = overlay.read_latest_frame(Duration::from_secs(1)).unwrap();
    assert_eq!((frame.width(), frame.height()), (40, 30));
    assert_eq!(*frame.image.get_pixel(22, 7), Rgb([255, 0, 0]));

    engine.set_tune_mode(false);
    assert!(!namespace.channel_exists(&tuning_channel_name("pos1")));
}

#[test]
fn test_engine_waits_for_late_camera() {
    let dir = TempDir::new().unwrap();
    let namespace = ShmNamespace::new(dir.path().join("shm"));

    let config = write_config(dir.path(), GREEN);
    let mut engine = engine_for(DetectorKind::Hsv, &namespace, &config, "green");
    engine.start().unwrap();

    assert!(matches!(
        engine.cycle(),
        Err(DetectorError::SourceUnavailable { .. })
    ));
    assert!(!engine.is_source_connected());

    let mut camera = namespace.create_frame_writer("cam1", 40, 30).unwrap();
    camera
        .write_image(&frame_with_square(0, 0, Rgb([0, 200, 0])), 9)
        .unwrap();
    engine.cycle().unwrap();

    assert!(engine.is_source_connected());
    let position = engine.last_position().unwrap();
    assert!(position.found);
    assert!((position.x - 2.0).abs() < 1e-9);
}
