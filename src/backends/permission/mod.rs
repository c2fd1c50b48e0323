// SPDX-License-Identifier: GPL-3.0-only

//! Camera access permission
//!
//! The gate asks a [`CameraPermission`] provider once per mount. Whatever
//! goes wrong while asking is logged and counted as a denial; the answer is
//! final for the session.

pub mod device;
pub mod portal;

pub use device::DeviceAccessPermission;
pub use portal::PortalPermission;

use crate::config::CaptureSource;
use crate::errors::PermissionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Tri-state permission status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionStatus {
    /// No answer yet
    #[default]
    Unknown,
    /// Camera access granted
    Granted,
    /// Camera access denied (or the query failed)
    Denied,
}

impl PermissionStatus {
    /// Whether a decision has been made
    pub fn is_decided(&self) -> bool {
        !matches!(self, PermissionStatus::Unknown)
    }
}

/// A way of asking the platform for camera access
#[async_trait]
pub trait CameraPermission: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Ask for access; `Ok(true)` means granted
    async fn request(&self) -> Result<bool, PermissionError>;
}

/// How camera access is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    /// Portal inside a Flatpak sandbox, device node check otherwise
    #[default]
    Auto,
    /// Always go through xdg-desktop-portal
    Portal,
    /// Check read/write access on the device node
    Device,
    /// Assume access is granted
    Granted,
}

/// Provider with a fixed answer
pub struct StaticPermission {
    granted: bool,
}

impl StaticPermission {
    pub fn granted() -> Self {
        Self { granted: true }
    }

    pub fn denied() -> Self {
        Self { granted: false }
    }
}

#[async_trait]
impl CameraPermission for StaticPermission {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn request(&self) -> Result<bool, PermissionError> {
        Ok(self.granted)
    }
}

/// True when running inside a Flatpak sandbox
pub fn is_flatpak() -> bool {
    Path::new("/.flatpak-info").exists()
}

/// Pick the permission provider for a mode and frame source
///
/// Image files need no camera permission, so `Auto` grants them outright.
pub fn provider_for(mode: PermissionMode, source: &CaptureSource) -> Arc<dyn CameraPermission> {
    match mode {
        PermissionMode::Granted => Arc::new(StaticPermission::granted()),
        PermissionMode::Portal => Arc::new(PortalPermission::new()),
        PermissionMode::Device => Arc::new(DeviceAccessPermission::new(source.path())),
        PermissionMode::Auto if !source.is_device() => Arc::new(StaticPermission::granted()),
        PermissionMode::Auto if is_flatpak() => Arc::new(PortalPermission::new()),
        PermissionMode::Auto => Arc::new(DeviceAccessPermission::new(source.path())),
    }
}

/// Resolves the permission status once per mount
pub struct PermissionGate;

impl PermissionGate {
    /// Ask `provider` and map the answer to a final status
    ///
    /// Query failures are logged and become [`PermissionStatus::Denied`].
    pub async fn resolve(provider: &dyn CameraPermission) -> PermissionStatus {
        match provider.request().await {
            Ok(true) => {
                info!(provider = provider.name(), "Camera access granted");
                PermissionStatus::Granted
            }
            Ok(false) => {
                warn!(provider = provider.name(), "Camera access denied");
                PermissionStatus::Denied
            }
            Err(e) => {
                error!(provider = provider.name(), error = %e, "Error requesting camera permission");
                PermissionStatus::Denied
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl CameraPermission for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn request(&self) -> Result<bool, PermissionError> {
            Err(PermissionError::Portal("bus unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_grant_and_deny() {
        assert_eq!(
            PermissionGate::resolve(&StaticPermission::granted()).await,
            PermissionStatus::Granted
        );
        assert_eq!(
            PermissionGate::resolve(&StaticPermission::denied()).await,
            PermissionStatus::Denied
        );
    }

    #[tokio::test]
    async fn test_query_failure_counts_as_denial() {
        assert_eq!(PermissionGate::resolve(&Failing).await, PermissionStatus::Denied);
    }

    #[tokio::test]
    async fn test_auto_grants_file_sources() {
        let source = CaptureSource::File {
            path: "/tmp/frame.png".into(),
        };
        let provider = provider_for(PermissionMode::Auto, &source);
        assert_eq!(provider.name(), "static");
        assert!(provider.request().await.unwrap());
    }

    #[test]
    fn test_unknown_is_undecided() {
        assert!(!PermissionStatus::Unknown.is_decided());
        assert!(PermissionStatus::Denied.is_decided());
    }
}
