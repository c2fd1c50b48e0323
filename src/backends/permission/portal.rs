// SPDX-License-Identifier: GPL-3.0-only

//! xdg-desktop-portal camera access
//!
//! Sandboxed apps ask `org.freedesktop.portal.Camera.AccessCamera`, which
//! may show a prompt. The answer arrives as a `Response` signal on a request
//! object whose path is derived from our unique bus name and a handle token.

use super::CameraPermission;
use crate::errors::PermissionError;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use tracing::{debug, info};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

const PORTAL_DESTINATION: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const CAMERA_INTERFACE: &str = "org.freedesktop.portal.Camera";
const REQUEST_INTERFACE: &str = "org.freedesktop.portal.Request";

/// Portal response code for "granted"
const RESPONSE_SUCCESS: u32 = 0;

/// Requests camera access through xdg-desktop-portal
#[derive(Default)]
pub struct PortalPermission;

impl PortalPermission {
    pub fn new() -> Self {
        Self
    }
}

/// Object path the portal will use for a request with `token`
///
/// The sender's unique name loses its leading ':' and has '.' replaced by '_'.
pub fn request_path(unique_name: &str, token: &str) -> String {
    let sender = unique_name.trim_start_matches(':').replace('.', "_");
    format!("{}/request/{}/{}", PORTAL_PATH, sender, token)
}

#[async_trait]
impl CameraPermission for PortalPermission {
    fn name(&self) -> &'static str {
        "portal"
    }

    async fn request(&self) -> Result<bool, PermissionError> {
        let connection = zbus::Connection::session().await?;

        let camera = zbus::Proxy::new(&connection, PORTAL_DESTINATION, PORTAL_PATH, CAMERA_INTERFACE)
            .await?;

        // Older portals lack the property; let AccessCamera decide then
        let present: bool = camera.get_property("IsCameraPresent").await.unwrap_or(true);
        if !present {
            info!("Portal reports no camera present");
            return Ok(false);
        }

        let token = format!("camera_identify_{}", uuid::Uuid::new_v4().simple());
        let unique_name = connection
            .unique_name()
            .ok_or_else(|| PermissionError::Portal("connection has no unique name".into()))?
            .to_string();
        let path = request_path(&unique_name, &token);

        // Subscribe before calling so a fast answer is not missed
        let request =
            zbus::Proxy::new(&connection, PORTAL_DESTINATION, path.as_str(), REQUEST_INTERFACE)
                .await?;
        let mut responses = request.receive_signal("Response").await?;

        let mut options: HashMap<&str, Value> = HashMap::new();
        options.insert("handle_token", Value::new(token.as_str()));
        let handle: OwnedObjectPath = camera.call("AccessCamera", &(options,)).await?;
        debug!(handle = %handle, expected = %path, "Camera access requested");

        let message = responses.next().await.ok_or(PermissionError::Cancelled)?;
        let (code, _results): (u32, HashMap<String, OwnedValue>) = message.body().deserialize()?;

        debug!(code, "Portal response");
        Ok(code == RESPONSE_SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_path_from_unique_name() {
        assert_eq!(
            request_path(":1.42", "camera_identify_abc"),
            "/org/freedesktop/portal/desktop/request/1_42/camera_identify_abc"
        );
    }
}
