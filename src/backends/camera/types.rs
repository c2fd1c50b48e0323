// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use std::sync::Arc;
use std::time::Instant;

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    pub path: String,   // V4L2 device node (e.g. /dev/video0)
    pub driver: String, // V4L2 driver name (e.g. uvcvideo)
}

/// Camera format specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.pixel_format)
    }
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    /// Common raw format from webcam sensors
    YUYV,
    /// UYVY - Packed 4:2:2 (U Y0 V Y1 interleaved)
    UYVY,
    /// Motion JPEG - each frame is a complete JPEG image
    MJPEG,
}

impl PixelFormat {
    /// Bytes per pixel for uncompressed formats (None for MJPEG)
    pub fn bytes_per_pixel(&self) -> Option<u32> {
        match self {
            Self::RGBA => Some(4),
            Self::RGB24 => Some(3),
            Self::Gray8 => Some(1),
            Self::YUYV | Self::UYVY => Some(2),
            Self::MJPEG => None,
        }
    }

    /// Map a V4L2 FourCC to a pixel format
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"MJPG" | b"JPEG" => Some(Self::MJPEG),
            b"YUYV" => Some(Self::YUYV),
            b"UYVY" => Some(Self::UYVY),
            b"RGB3" => Some(Self::RGB24),
            b"AB24" => Some(Self::RGBA),
            b"GREY" => Some(Self::Gray8),
            _ => None,
        }
    }

    /// V4L2 FourCC for this format
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            Self::MJPEG => *b"MJPG",
            Self::YUYV => *b"YUYV",
            Self::UYVY => *b"UYVY",
            Self::RGB24 => *b"RGB3",
            Self::RGBA => *b"AB24",
            Self::Gray8 => *b"GREY",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fourcc = self.fourcc();
        write!(f, "{}", String::from_utf8_lossy(&fourcc))
    }
}

/// A single captured frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data (or the compressed bitstream for MJPEG)
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding, 0 for MJPEG)
    pub stride: u32,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed RGBA frame
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// Raw frame bytes
    pub fn data_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// Dequeuing or reading a frame failed
    CaptureFailed(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}
