// SPDX-License-Identifier: GPL-3.0-only

//! Camera Identify - live object identification from a camera feed
//!
//! Captures a frame from the camera at a fixed interval, shrinks it to the
//! model input size, and sends it to an identification server. The label
//! the server returns is overlaid on the camera preview.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Session lifecycle, shared state and the capture loop
//! - [`backends`]: Camera sources and camera permission providers
//! - [`pipelines`]: Frame preprocessing and the classifier client
//! - [`config`]: User configuration handling
//! - [`terminal`]: Terminal renderer
//!
//! # Example
//!
//! ```ignore
//! let config = Config::load(None)?;
//! let session = CaptureSession::mount(SessionParts::from_config(&config)?);
//! // ... watch session.state().board().subscribe() ...
//! session.unmount().await;
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod terminal;

// Re-export commonly used types
pub use app::{AppState, CaptureSession, DisplayState, OverlapPolicy, RootView, SessionParts};
pub use backends::permission::{PermissionMode, PermissionStatus};
pub use config::{CaptureSource, Config};
pub use errors::{AppError, AppResult};
pub use pipelines::{Prediction, RequestEncoding};
