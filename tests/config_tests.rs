// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use camera_identify::{CaptureSource, Config, OverlapPolicy, PermissionMode, RequestEncoding};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.endpoint, "http://127.0.0.1:5000");
    assert_eq!(config.capture_interval(), Duration::from_millis(1500));
    assert_eq!(config.request_encoding, RequestEncoding::Json);
    assert_eq!(config.overlap_policy, OverlapPolicy::Skip);
    assert_eq!(config.permission, PermissionMode::Auto);
    assert_eq!((config.target_width, config.target_height), (224, 224));
    assert_eq!(config.request_timeout(), Some(Duration::from_secs(10)));
    assert!(
        !config.mirror_preview,
        "Mirror preview should be disabled by default"
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_source_is_first_video_device() {
    let config = Config::default();
    assert_eq!(
        config.source,
        CaptureSource::Device {
            path: PathBuf::from("/dev/video0")
        }
    );
    assert!(config.source.is_device());
}

#[test]
fn test_empty_toml_gives_defaults() {
    let config = Config::from_toml("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_partial_toml_overrides_only_named_fields() {
    let config = Config::from_toml(
        r#"
        endpoint = "http://classifier.lan:8080"
        capture_interval_ms = 3000
        overlap_policy = "supersede"
        request_encoding = "multipart"
        "#,
    )
    .unwrap();

    assert_eq!(config.endpoint, "http://classifier.lan:8080");
    assert_eq!(config.capture_interval(), Duration::from_secs(3));
    assert_eq!(config.overlap_policy, OverlapPolicy::Supersede);
    assert_eq!(config.request_encoding, RequestEncoding::Multipart);
    assert_eq!(config.target_width, 224);
}

#[test]
fn test_source_table_parses() {
    let config = Config::from_toml(
        r#"
        [source]
        kind = "directory"
        path = "/srv/frames"
        "#,
    )
    .unwrap();
    assert_eq!(
        config.source,
        CaptureSource::Directory {
            path: PathBuf::from("/srv/frames")
        }
    );
}

#[test]
fn test_invalid_values_rejected() {
    assert!(Config::from_toml("jpeg_quality = 0").is_err());
    assert!(Config::from_toml("target_width = 0").is_err());
    assert!(Config::from_toml("endpoint = \"  \"").is_err());
    assert!(Config::from_toml("overlap_policy = \"queue\"").is_err());
}

#[test]
fn test_interval_is_clamped() {
    let config = Config {
        capture_interval_ms: 5,
        ..Default::default()
    };
    assert_eq!(config.capture_interval(), Duration::from_millis(100));
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "capture_interval_ms = 2000\nmirror_preview = true\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.capture_interval_ms, 2000);
    assert!(config.mirror_preview);
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(Config::load(Some(&missing)).is_err());
}

#[test]
fn test_source_from_path_hint() {
    let dir = tempfile::tempdir().unwrap();

    assert!(CaptureSource::from_path_hint("/dev/video2").is_device());
    assert_eq!(
        CaptureSource::from_path_hint(dir.path()),
        CaptureSource::Directory {
            path: dir.path().to_path_buf()
        }
    );
    let file = CaptureSource::from_path_hint("cat.jpg");
    assert_eq!(file.path(), Path::new("cat.jpg"));
    assert!(!file.is_device());
}

#[test]
fn test_request_timeout_zero_disables_timeout() {
    let config = Config::from_toml("request_timeout_ms = 0").unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.request_timeout(), None);

    let config = Config::from_toml("request_timeout_ms = 2500").unwrap();
    assert_eq!(config.request_timeout(), Some(Duration::from_millis(2500)));
}
