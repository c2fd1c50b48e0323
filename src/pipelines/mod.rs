// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ Camera Frame │ ──▶ │   Preprocessor    │ ──▶ │    Classifier    │ ──▶ label
//! │ (MJPG/YUYV/  │     │  - convert to RGB │     │  POST /identify  │
//! │  RGBA/...)   │     │  - resize 224x224 │     │  (JSON or form)  │
//! │              │     │  - JPEG + base64  │     │                  │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//! ```
//!
//! - [`preprocess`]: resize and encode frames for the model
//! - [`classifier`]: HTTP client for the identification server

pub mod classifier;
pub mod preprocess;

pub use classifier::{Classifier, HttpClassifier, Prediction, RequestEncoding};
pub use preprocess::{EncodedFrame, Preprocessor};
