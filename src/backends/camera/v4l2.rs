// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture source
//!
//! Opens a capture node, negotiates a small MJPEG (or YUYV) format and keeps
//! a memory-mapped stream running for the lifetime of the source. Dropping
//! the source stops streaming and closes the device.

use super::types::{BackendError, BackendResult, CameraDevice, CameraFormat, CameraFrame, PixelFormat};
use super::FrameSource;
use crate::constants::{camera, timing};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Formats tried in order; MJPEG keeps USB bandwidth low
const PREFERRED_FORMATS: [PixelFormat; 2] = [PixelFormat::MJPEG, PixelFormat::YUYV];

/// Enumerate V4L2 video capture devices
pub fn enumerate_cameras() -> Vec<CameraDevice> {
    let mut paths: Vec<_> = std::fs::read_dir("/dev")
        .into_iter()
        .flatten()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("video"))
        })
        .collect();
    paths.sort();

    let mut cameras = Vec::new();
    for path in paths {
        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        // Metadata nodes share the card name but cannot stream video
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            debug!(path = %path.display(), "Skipping non-capture node");
            continue;
        }
        cameras.push(CameraDevice {
            name: caps.card,
            path: path.to_string_lossy().to_string(),
            driver: caps.driver,
        });
    }

    info!(count = cameras.len(), "Enumerated V4L2 cameras");
    cameras
}

/// Streaming V4L2 capture source
pub struct V4l2Source {
    device: CameraDevice,
    format: CameraFormat,
    stream: MmapStream<'static>,
}

impl V4l2Source {
    /// Open `path`, negotiate a format and start streaming
    pub fn open(path: &Path) -> BackendResult<Self> {
        let path_str = path.to_string_lossy().to_string();
        let dev = Device::with_path(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::DeviceNotFound(path_str.clone())
            } else {
                BackendError::InitializationFailed(format!("{}: {}", path_str, e))
            }
        })?;

        let caps = dev
            .query_caps()
            .map_err(|e| BackendError::InitializationFailed(format!("QUERYCAP failed: {}", e)))?;
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            return Err(BackendError::NotAvailable(format!(
                "{} is not a video capture device",
                path_str
            )));
        }

        let format = negotiate_format(&dev)?;
        info!(device = %caps.card, format = %format, "Negotiated capture format");

        let mut stream = MmapStream::with_buffers(&dev, Type::VideoCapture, camera::STREAM_BUFFERS)
            .map_err(|e| BackendError::InitializationFailed(format!("Failed to create stream: {}", e)))?;

        // Let auto exposure settle
        for _ in 0..timing::WARMUP_FRAMES {
            if let Err(e) = stream.next() {
                warn!(error = %e, "Warm-up frame failed");
                break;
            }
        }

        Ok(Self {
            device: CameraDevice {
                name: caps.card,
                path: path_str,
                driver: caps.driver,
            },
            format,
            stream,
        })
    }

    /// Negotiated format
    pub fn format(&self) -> &CameraFormat {
        &self.format
    }
}

fn negotiate_format(dev: &Device) -> BackendResult<CameraFormat> {
    let mut last_error = None;
    for wanted in PREFERRED_FORMATS {
        let mut fmt = dev
            .format()
            .map_err(|e| BackendError::InitializationFailed(format!("Failed to query format: {}", e)))?;
        fmt.width = camera::PREFERRED_WIDTH;
        fmt.height = camera::PREFERRED_HEIGHT;
        fmt.fourcc = FourCC::new(&wanted.fourcc());

        match dev.set_format(&fmt) {
            Ok(actual) if actual.fourcc == fmt.fourcc => {
                return Ok(CameraFormat {
                    width: actual.width,
                    height: actual.height,
                    pixel_format: wanted,
                });
            }
            Ok(actual) => {
                debug!(wanted = %wanted, got = ?actual.fourcc, "Device substituted format");
                last_error = Some(format!("device does not offer {}", wanted));
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(BackendError::FormatNotSupported(
        last_error.unwrap_or_else(|| "no usable format".to_string()),
    ))
}

impl FrameSource for V4l2Source {
    fn describe(&self) -> String {
        format!("{} ({})", self.device.name, self.format)
    }

    fn capture(&mut self) -> BackendResult<CameraFrame> {
        // Buffers filled while idle hold stale frames; the last dequeue
        // waits for a fresh one
        for _ in 1..camera::STREAM_BUFFERS {
            self.stream
                .next()
                .map_err(|e| BackendError::CaptureFailed(e.to_string()))?;
        }

        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| BackendError::CaptureFailed(e.to_string()))?;

        let used = (meta.bytesused as usize).min(buf.len());
        if used == 0 {
            return Err(BackendError::CaptureFailed("empty buffer".into()));
        }

        let stride = self
            .format
            .pixel_format
            .bytes_per_pixel()
            .map(|bpp| self.format.width * bpp)
            .unwrap_or(0);

        Ok(CameraFrame {
            width: self.format.width,
            height: self.format.height,
            data: Arc::from(&buf[..used]),
            format: self.format.pixel_format,
            stride,
            captured_at: Instant::now(),
        })
    }
}
