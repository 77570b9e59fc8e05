// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use board_camera::config::CaptureResolution;
use board_camera::pipelines::photo::EncodingQuality;
use board_camera::{AppError, Config, SizeLabel, ViewportSize};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.default_size, SizeLabel::M, "M is the default size");
    assert_eq!(config.jpeg_quality, EncodingQuality::High);
    assert_eq!(
        config.ideal_resolution,
        CaptureResolution {
            width: 1920,
            height: 1080
        }
    );
    assert!(config.photo_dir.ends_with("board-camera"));
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from(&dir.path().join("config.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_full_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "default_size": "XL",
            "jpeg_quality": "Maximum",
            "ideal_resolution": { "width": 1280, "height": 720 },
            "photo_dir": "/tmp/shots",
            "initial_viewport": { "width": 1024, "height": 768 }
        }"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.default_size, SizeLabel::XL);
    assert_eq!(config.jpeg_quality, EncodingQuality::Maximum);
    assert_eq!(config.ideal_resolution.width, 1280);
    assert_eq!(config.photo_dir, std::path::PathBuf::from("/tmp/shots"));
    assert_eq!(config.initial_viewport, ViewportSize::new(1024, 768));
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "default_size": "L" }"#).unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.default_size, SizeLabel::L);
    assert_eq!(config.ideal_resolution, CaptureResolution::default());
}

#[test]
fn test_invalid_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));
}
