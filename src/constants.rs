// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Capture timing
pub mod timing {
    use super::Duration;

    /// Interval between capture ticks
    pub const CAPTURE_INTERVAL: Duration = Duration::from_millis(1500);

    /// Lower bound accepted for a configured capture interval
    pub const MIN_CAPTURE_INTERVAL: Duration = Duration::from_millis(100);

    /// Frames discarded after opening a V4L2 device (auto exposure settling)
    pub const WARMUP_FRAMES: usize = 4;

    /// Terminal redraw / input poll period
    pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Consecutive superseded requests before the loop warns that the
    /// classifier cannot keep up with the interval
    pub const SUPERSEDE_WARN_AFTER: u32 = 3;
}

/// Preprocessing parameters matching the classifier's input shape
pub mod preprocessing {
    /// Model input width
    pub const TARGET_WIDTH: u32 = 224;

    /// Model input height
    pub const TARGET_HEIGHT: u32 = 224;

    /// JPEG quality for the encoded still (0-100)
    pub const JPEG_QUALITY: u8 = 90;
}

/// Remote classifier defaults
pub mod classifier {
    /// Default base URL (development server on loopback)
    pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

    /// Identification route, relative to the base URL
    pub const IDENTIFY_PATH: &str = "identify";

    /// Field name carrying the image, both in JSON and multipart bodies
    pub const IMAGE_FIELD: &str = "image";

    /// File name announced for the multipart image part
    pub const MULTIPART_FILE_NAME: &str = "frame.jpg";

    /// Default request timeout in milliseconds
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

    /// Longest response body excerpt kept in error messages
    pub const MAX_ERROR_BODY_LEN: usize = 512;
}

/// Camera defaults
pub mod camera {
    /// Default capture device
    pub const DEFAULT_DEVICE: &str = "/dev/video0";

    /// Preferred capture width (the frame is downscaled to 224 anyway)
    pub const PREFERRED_WIDTH: u32 = 640;

    /// Preferred capture height
    pub const PREFERRED_HEIGHT: u32 = 480;

    /// Number of mmap buffers for V4L2 streaming
    pub const STREAM_BUFFERS: u32 = 4;
}

/// File formats accepted by the file source
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    }
}

/// UI Constants
pub mod ui {
    /// Shown when camera permission is denied
    pub const NO_ACCESS_MESSAGE: &str = "No access to camera";

    /// Shown before the first frame arrives
    pub const WAITING_MESSAGE: &str = "Waiting for camera...";

    /// Rows between the prediction badge and the bottom edge
    pub const BADGE_BOTTOM_OFFSET: u16 = 2;

    /// Horizontal padding inside the prediction badge
    pub const BADGE_PADDING: u16 = 1;
}
