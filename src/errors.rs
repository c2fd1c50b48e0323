// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the identification client

use crate::backends::camera::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera-related errors
    Camera(BackendError),
    /// Permission query errors
    Permission(PermissionError),
    /// Frame preprocessing errors
    Preprocess(PreprocessError),
    /// Remote classification errors
    Classify(ClassifyError),
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Permission query errors
#[derive(Debug, Clone)]
pub enum PermissionError {
    /// D-Bus / portal communication failed
    Portal(String),
    /// The request was closed without an answer
    Cancelled,
    /// Device check could not run
    Device(String),
}

/// Frame preprocessing errors
#[derive(Debug, Clone)]
pub enum PreprocessError {
    /// Frame buffer is empty or smaller than its geometry implies
    InvalidFrame(String),
    /// Pixel format cannot be converted
    UnsupportedFormat(String),
    /// Compressed frame could not be decoded
    DecodeFailed(String),
    /// Resized still could not be encoded
    EncodingFailed(String),
}

/// Remote classification errors
#[derive(Debug, Clone)]
pub enum ClassifyError {
    /// Endpoint URL could not be built
    InvalidEndpoint(String),
    /// Connection, timeout or other transport failure
    Transport(String),
    /// Server answered with a non-success status
    Status {
        /// HTTP status code
        code: u16,
        /// Response body (possibly truncated)
        body: String,
    },
    /// Body was not the expected JSON
    MalformedResponse(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Permission(e) => write!(f, "Permission error: {}", e),
            AppError::Preprocess(e) => write!(f, "Preprocessing error: {}", e),
            AppError::Classify(e) => write!(f, "Classification error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionError::Portal(msg) => write!(f, "Portal request failed: {}", msg),
            PermissionError::Cancelled => write!(f, "Permission request was cancelled"),
            PermissionError::Device(msg) => write!(f, "Device check failed: {}", msg),
        }
    }
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            PreprocessError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            PreprocessError::DecodeFailed(msg) => write!(f, "Decode failed: {}", msg),
            PreprocessError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
        }
    }
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyError::InvalidEndpoint(msg) => write!(f, "Invalid endpoint: {}", msg),
            ClassifyError::Transport(msg) => write!(f, "Request failed: {}", msg),
            ClassifyError::Status { code, body } if body.is_empty() => {
                write!(f, "Server returned HTTP {}", code)
            }
            ClassifyError::Status { code, body } => {
                write!(f, "Server returned HTTP {}: {}", code, body)
            }
            ClassifyError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for PermissionError {}
impl std::error::Error for PreprocessError {}
impl std::error::Error for ClassifyError {}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Camera(err)
    }
}

impl From<PermissionError> for AppError {
    fn from(err: PermissionError) -> Self {
        AppError::Permission(err)
    }
}

impl From<PreprocessError> for AppError {
    fn from(err: PreprocessError) -> Self {
        AppError::Preprocess(err)
    }
}

impl From<ClassifyError> for AppError {
    fn from(err: ClassifyError) -> Self {
        AppError::Classify(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<reqwest::Error> for ClassifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClassifyError::MalformedResponse(err.to_string())
        } else {
            ClassifyError::Transport(err.to_string())
        }
    }
}

impl From<zbus::Error> for PermissionError {
    fn from(err: zbus::Error) -> Self {
        PermissionError::Portal(err.to_string())
    }
}

impl From<image::ImageError> for PreprocessError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => PreprocessError::UnsupportedFormat(e.to_string()),
            image::ImageError::Decoding(e) => PreprocessError::DecodeFailed(e.to_string()),
            other => PreprocessError::EncodingFailed(other.to_string()),
        }
    }
}
