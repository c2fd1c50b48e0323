// SPDX-License-Identifier: GPL-3.0-only

//! Still-image frame source
//!
//! Serves frames from image files, either a single file or every image in a
//! directory in name order. Useful without camera hardware and for replaying
//! a fixed set of test images against the classifier.

use super::types::{BackendError, BackendResult, CameraFrame};
use super::FrameSource;
use crate::constants::file_formats;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Frame source cycling through image files
pub struct FileSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl FileSource {
    /// Serve the same image on every capture
    pub fn from_file(path: &Path) -> BackendResult<Self> {
        if !path.is_file() {
            return Err(BackendError::DeviceNotFound(path.display().to_string()));
        }
        Ok(Self {
            paths: vec![path.to_path_buf()],
            next: 0,
        })
    }

    /// Serve every image in `dir`, wrapping around at the end
    pub fn from_directory(dir: &Path) -> BackendResult<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(file_formats::is_image_extension)
            })
            .collect();

        if paths.is_empty() {
            return Err(BackendError::DeviceNotFound(format!(
                "no images in {}",
                dir.display()
            )));
        }

        paths.sort();
        info!(dir = %dir.display(), count = paths.len(), "Image directory source ready");
        Ok(Self { paths, next: 0 })
    }

    /// Number of images served in rotation
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always false; construction fails without images
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for FileSource {
    fn describe(&self) -> String {
        match self.paths.as_slice() {
            [single] => single.display().to_string(),
            many => format!("{} images", many.len()),
        }
    }

    fn capture(&mut self) -> BackendResult<CameraFrame> {
        let path = &self.paths[self.next % self.paths.len()];
        self.next = (self.next + 1) % self.paths.len();
        load_image_as_frame(path)
    }
}

/// Load an image file as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    debug!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        BackendError::CaptureFailed(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(CameraFrame::from_rgba(width, height, rgba.into_raw()))
}
