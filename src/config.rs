// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Loaded from `$XDG_CONFIG_HOME/camera-identify/config.toml`. Every field has
//! a default, so an empty or partial file is valid.

use crate::app::capture_loop::OverlapPolicy;
use crate::backends::permission::PermissionMode;
use crate::constants::{camera, classifier, preprocessing, timing};
use crate::errors::{AppError, AppResult};
use crate::pipelines::classifier::RequestEncoding;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CaptureSource {
    /// V4L2 capture device (e.g. /dev/video0)
    Device { path: PathBuf },
    /// Directory of still images, cycled in name order
    Directory { path: PathBuf },
    /// Single still image, returned on every capture
    File { path: PathBuf },
}

impl Default for CaptureSource {
    fn default() -> Self {
        CaptureSource::Device {
            path: PathBuf::from(camera::DEFAULT_DEVICE),
        }
    }
}

impl CaptureSource {
    /// Guess the source kind from a command-line path
    ///
    /// Paths under `/dev` are devices, existing directories are image
    /// directories, anything else is treated as a single image file.
    pub fn from_path_hint(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.starts_with("/dev") {
            CaptureSource::Device { path }
        } else if path.is_dir() {
            CaptureSource::Directory { path }
        } else {
            CaptureSource::File { path }
        }
    }

    /// Path backing this source
    pub fn path(&self) -> &Path {
        match self {
            CaptureSource::Device { path }
            | CaptureSource::Directory { path }
            | CaptureSource::File { path } => path,
        }
    }

    /// Whether this source is real camera hardware
    pub fn is_device(&self) -> bool {
        matches!(self, CaptureSource::Device { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Classifier base URL; requests go to `<endpoint>/identify`
    pub endpoint: String,
    /// Request body encoding (JSON or multipart form)
    pub request_encoding: RequestEncoding,
    /// Per-request timeout in milliseconds (0 waits forever)
    pub request_timeout_ms: u64,
    /// Milliseconds between capture ticks
    pub capture_interval_ms: u64,
    /// What a tick does while a request is still outstanding
    pub overlap_policy: OverlapPolicy,
    /// Frame source
    pub source: CaptureSource,
    /// How camera access is requested
    pub permission: PermissionMode,
    /// Preprocessed still width
    pub target_width: u32,
    /// Preprocessed still height
    pub target_height: u32,
    /// JPEG quality of the encoded still
    pub jpeg_quality: u8,
    /// Mirror the preview horizontally (selfie mode)
    pub mirror_preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: classifier::DEFAULT_BASE_URL.to_string(),
            request_encoding: RequestEncoding::default(),
            request_timeout_ms: classifier::DEFAULT_TIMEOUT_MS,
            capture_interval_ms: timing::CAPTURE_INTERVAL.as_millis() as u64,
            overlap_policy: OverlapPolicy::default(),
            source: CaptureSource::default(),
            permission: PermissionMode::default(),
            target_width: preprocessing::TARGET_WIDTH,
            target_height: preprocessing::TARGET_HEIGHT,
            jpeg_quality: preprocessing::JPEG_QUALITY,
            mirror_preview: false,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("camera-identify").join("config.toml"))
    }

    /// Load the config from `path`, or from the default location
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file that was named explicitly is an error.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(AppError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .map_err(|e| AppError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_toml(&text)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse a config from TOML text and validate it
    pub fn from_toml(text: &str) -> AppResult<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| AppError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> AppResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(AppError::Config("endpoint must not be empty".into()));
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(AppError::Config(format!(
                "target size must be non-zero, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(AppError::Config(format!(
                "jpeg_quality must be within 1-100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    /// Capture interval, clamped to a sane minimum
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms).max(timing::MIN_CAPTURE_INTERVAL)
    }

    /// Request timeout, if any
    ///
    /// A zero timeout would fail every request, so `0` disables it instead.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}
