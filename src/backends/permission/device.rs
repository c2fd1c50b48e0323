// SPDX-License-Identifier: GPL-3.0-only

//! Device node access check
//!
//! Outside a sandbox, "permission" to use a camera is the ability to open
//! its node, usually granted by membership of the `video` group.

use super::CameraPermission;
use crate::errors::PermissionError;
use async_trait::async_trait;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Grants access when the device node is readable and writable
pub struct DeviceAccessPermission {
    path: PathBuf,
}

impl DeviceAccessPermission {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CameraPermission for DeviceAccessPermission {
    fn name(&self) -> &'static str {
        "device"
    }

    async fn request(&self) -> Result<bool, PermissionError> {
        if !self.path.exists() {
            return Err(PermissionError::Device(format!(
                "{} does not exist",
                self.path.display()
            )));
        }

        let c_path = CString::new(self.path.as_os_str().as_bytes())
            .map_err(|e| PermissionError::Device(e.to_string()))?;
        let result = unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) };

        debug!(path = %self.path.display(), result, "Checked device access");
        Ok(result == 0)
    }
}
