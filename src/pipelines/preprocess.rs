// SPDX-License-Identifier: GPL-3.0-only

//! Frame preprocessing
//!
//! Turns a captured frame into the classifier's input: an RGB still resized
//! to the model's fixed input size, JPEG-encoded, plus its base64 text.

use crate::backends::camera::format_converters::frame_to_rgb;
use crate::backends::camera::types::CameraFrame;
use crate::constants::preprocessing;
use crate::errors::PreprocessError;
use base64::Engine;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A preprocessed still ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// JPEG bytes (used for multipart uploads)
    pub jpeg: Vec<u8>,
    /// Standard base64 of `jpeg` (used for JSON bodies)
    pub base64: String,
    pub width: u32,
    pub height: u32,
}

/// Resizes and encodes frames for the classifier
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
    jpeg_quality: u8,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(
            preprocessing::TARGET_WIDTH,
            preprocessing::TARGET_HEIGHT,
            preprocessing::JPEG_QUALITY,
        )
    }
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32, jpeg_quality: u8) -> Self {
        Self {
            target_width,
            target_height,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Output size as (width, height)
    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Resize `frame` to the target size and encode it
    ///
    /// The aspect ratio is not preserved; the model expects a square input.
    pub fn prepare(&self, frame: &CameraFrame) -> Result<EncodedFrame, PreprocessError> {
        let start = std::time::Instant::now();

        let rgb = frame_to_rgb(frame)?;
        let resized = if rgb.dimensions() == (self.target_width, self.target_height) {
            rgb
        } else {
            imageops::resize(&rgb, self.target_width, self.target_height, FilterType::Triangle)
        };

        let jpeg = encode_jpeg(&resized, self.jpeg_quality)?;
        let base64 = base64::engine::general_purpose::STANDARD.encode(&jpeg);

        debug!(
            source_width = frame.width,
            source_height = frame.height,
            jpeg_bytes = jpeg.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Frame preprocessed"
        );

        Ok(EncodedFrame {
            jpeg,
            base64,
            width: self.target_width,
            height: self.target_height,
        })
    }

    /// Preprocess on a blocking thread, logging and swallowing failures
    ///
    /// `None` means the tick should not submit anything.
    pub async fn prepare_or_skip(&self, frame: Arc<CameraFrame>) -> Option<EncodedFrame> {
        let preprocessor = *self;
        match tokio::task::spawn_blocking(move || preprocessor.prepare(&frame)).await {
            Ok(Ok(encoded)) => Some(encoded),
            Ok(Err(e)) => {
                error!(error = %e, "Error preprocessing image");
                None
            }
            Err(e) => {
                warn!(error = %e, "Preprocessing task panicked");
                None
            }
        }
    }
}

/// Encode an RGB image as JPEG
fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, PreprocessError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| PreprocessError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;
    use std::time::Instant;

    #[test]
    fn test_output_is_target_sized_jpeg() {
        let frame = CameraFrame::from_rgba(640, 480, vec![128u8; 640 * 480 * 4]);
        let encoded = Preprocessor::default().prepare(&frame).unwrap();

        assert_eq!((encoded.width, encoded.height), (224, 224));
        let decoded = image::load_from_memory(&encoded.jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (224, 224));

        let round_trip = base64::engine::general_purpose::STANDARD
            .decode(&encoded.base64)
            .unwrap();
        assert_eq!(round_trip, encoded.jpeg);
    }

    #[test]
    fn test_corrupt_frame_is_an_error() {
        let frame = CameraFrame {
            width: 320,
            height: 240,
            data: Arc::from(vec![1u8, 2, 3].into_boxed_slice()),
            format: PixelFormat::MJPEG,
            stride: 0,
            captured_at: Instant::now(),
        };
        assert!(Preprocessor::default().prepare(&frame).is_err());
    }

    #[tokio::test]
    async fn test_prepare_or_skip_returns_none_on_failure() {
        let frame = CameraFrame {
            width: 0,
            height: 0,
            data: Arc::from(Vec::new().into_boxed_slice()),
            format: PixelFormat::RGBA,
            stride: 0,
            captured_at: Instant::now(),
        };
        assert!(Preprocessor::default().prepare_or_skip(Arc::new(frame)).await.is_none());
    }

    #[test]
    fn test_quality_is_clamped() {
        let p = Preprocessor::new(10, 10, 0);
        let frame = CameraFrame::from_rgba(20, 20, vec![0u8; 20 * 20 * 4]);
        assert!(p.prepare(&frame).is_ok());
    }
}
