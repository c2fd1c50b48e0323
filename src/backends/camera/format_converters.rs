// SPDX-License-Identifier: GPL-3.0-only

//! Pixel format conversion to packed RGB
//!
//! Every capture source hands out frames in its native layout; the
//! preprocessor and the terminal preview both work on `RgbImage`.

use super::types::{CameraFrame, PixelFormat};
use crate::errors::PreprocessError;
use image::RgbImage;

/// Convert a captured frame to a packed RGB image
pub fn frame_to_rgb(frame: &CameraFrame) -> Result<RgbImage, PreprocessError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(PreprocessError::InvalidFrame(format!(
            "zero-sized frame {}x{}",
            frame.width, frame.height
        )));
    }

    if frame.format == PixelFormat::MJPEG {
        let decoded = image::load_from_memory_with_format(frame.data_slice(), image::ImageFormat::Jpeg)?;
        return Ok(decoded.to_rgb8());
    }

    // 4:2:2 formats encode pixel pairs
    if matches!(frame.format, PixelFormat::YUYV | PixelFormat::UYVY) && frame.width % 2 == 1 {
        return Err(PreprocessError::InvalidFrame(format!(
            "{} frame with odd width {}",
            frame.format, frame.width
        )));
    }

    let data = frame.data_slice();
    let bpp = frame.format.bytes_per_pixel().unwrap_or(0);
    let row_len = (frame.width * bpp) as usize;
    let stride = frame.stride as usize;
    if stride < row_len {
        return Err(PreprocessError::InvalidFrame(format!(
            "stride {} shorter than row length {}",
            stride, row_len
        )));
    }
    let needed = stride * (frame.height as usize - 1) + row_len;
    if data.len() < needed {
        return Err(PreprocessError::InvalidFrame(format!(
            "buffer holds {} bytes, {}x{} {} needs {}",
            data.len(),
            frame.width,
            frame.height,
            frame.format,
            needed
        )));
    }

    let mut rgb = Vec::with_capacity((frame.width * frame.height * 3) as usize);
    for row in data.chunks(stride).take(frame.height as usize) {
        let row = &row[..row_len];
        match frame.format {
            PixelFormat::RGBA => {
                for px in row.chunks_exact(4) {
                    rgb.extend_from_slice(&px[..3]);
                }
            }
            PixelFormat::RGB24 => rgb.extend_from_slice(row),
            PixelFormat::Gray8 => {
                for &v in row {
                    rgb.extend_from_slice(&[v, v, v]);
                }
            }
            PixelFormat::YUYV => {
                // Y0 U Y1 V - each 4-byte group encodes 2 pixels
                for chunk in row.chunks_exact(4) {
                    push_yuv(&mut rgb, chunk[0], chunk[1], chunk[3]);
                    push_yuv(&mut rgb, chunk[2], chunk[1], chunk[3]);
                }
            }
            PixelFormat::UYVY => {
                // U Y0 V Y1
                for chunk in row.chunks_exact(4) {
                    push_yuv(&mut rgb, chunk[1], chunk[0], chunk[2]);
                    push_yuv(&mut rgb, chunk[3], chunk[0], chunk[2]);
                }
            }
            PixelFormat::MJPEG => unreachable!("handled above"),
        }
    }

    RgbImage::from_raw(frame.width, frame.height, rgb).ok_or_else(|| {
        PreprocessError::InvalidFrame(format!(
            "converted buffer does not match {}x{}",
            frame.width, frame.height
        ))
    })
}

fn push_yuv(out: &mut Vec<u8>, y: u8, u: u8, v: u8) {
    let (r, g, b) = yuv_to_rgb(y, u, v);
    out.extend_from_slice(&[r, g, b]);
}

/// Convert YUV (BT.601) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn frame(width: u32, height: u32, format: PixelFormat, stride: u32, data: Vec<u8>) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format,
            stride,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_rgba_drops_alpha_and_padding() {
        // 2x1 RGBA with 4 bytes of row padding
        let data = vec![10, 20, 30, 255, 40, 50, 60, 255, 0, 0, 0, 0];
        let img = frame_to_rgb(&frame(2, 1, PixelFormat::RGBA, 12, data)).unwrap();
        assert_eq!(img.into_raw(), vec![10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn test_gray_expands_to_rgb() {
        let img = frame_to_rgb(&frame(2, 1, PixelFormat::Gray8, 2, vec![7, 200])).unwrap();
        assert_eq!(img.into_raw(), vec![7, 7, 7, 200, 200, 200]);
    }

    #[test]
    fn test_yuyv_neutral_chroma_is_gray() {
        let img = frame_to_rgb(&frame(2, 1, PixelFormat::YUYV, 4, vec![100, 128, 150, 128])).unwrap();
        assert_eq!(img.into_raw(), vec![100, 100, 100, 150, 150, 150]);
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let result = frame_to_rgb(&frame(4, 4, PixelFormat::RGB24, 12, vec![0u8; 10]));
        assert!(matches!(result, Err(PreprocessError::InvalidFrame(_))));
    }

    #[test]
    fn test_corrupt_mjpeg_is_an_error() {
        let result = frame_to_rgb(&frame(4, 4, PixelFormat::MJPEG, 0, vec![0xFF, 0xD8, 0x00]));
        assert!(result.is_err());
    }

    #[test]
    fn test_yuv_to_rgb_clamps() {
        assert_eq!(yuv_to_rgb(255, 255, 255).0, 255);
        assert_eq!(yuv_to_rgb(0, 0, 0).0, 0);
    }
}
