// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle
//!
//! Mounting a session starts the capture timer and asks for camera
//! permission. Once access is granted the camera is opened and attached to
//! the slot the loop reads from. Unmounting stops the timer, aborts
//! outstanding work and releases the camera.
//!
//! # Architecture
//!
//! - `state`: observable state (permission, camera, preview, prediction)
//! - `capture_loop`: periodic capture → preprocess → classify
//! - `view`: what to render for a given state

pub mod capture_loop;
pub mod state;
pub mod view;

pub use capture_loop::{CaptureLoop, CaptureLoopHandle, LoopStatsSnapshot, OverlapPolicy};
pub use state::{AppState, CameraStatus, DisplayState, PredictionBoard};
pub use view::RootView;

use crate::backends::camera::{self, BackendResult, CameraSlot, FrameSource};
use crate::backends::permission::{self, CameraPermission, PermissionGate, PermissionStatus};
use crate::config::Config;
use crate::errors::AppResult;
use crate::pipelines::classifier::{Classifier, HttpClassifier};
use crate::pipelines::preprocess::Preprocessor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Opens the camera once permission is granted
pub type SourceOpener = Box<dyn FnOnce() -> BackendResult<Box<dyn FrameSource>> + Send>;

/// Everything a session needs, injected at mount
pub struct SessionParts {
    pub permission: Arc<dyn CameraPermission>,
    pub classifier: Arc<dyn Classifier>,
    pub opener: SourceOpener,
    pub preprocessor: Preprocessor,
    pub interval: Duration,
    pub policy: OverlapPolicy,
}

impl SessionParts {
    /// Build the production collaborators described by `config`
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let classifier = HttpClassifier::new(
            &config.endpoint,
            config.request_encoding,
            config.request_timeout(),
        )?;
        let source = config.source.clone();

        Ok(Self {
            permission: permission::provider_for(config.permission, &config.source),
            classifier: Arc::new(classifier),
            opener: Box::new(move || camera::open_source(&source)),
            preprocessor: Preprocessor::new(
                config.target_width,
                config.target_height,
                config.jpeg_quality,
            ),
            interval: config.capture_interval(),
            policy: config.overlap_policy,
        })
    }
}

/// A mounted capture session
pub struct CaptureSession {
    state: AppState,
    slot: CameraSlot,
    capture_loop: CaptureLoopHandle,
    gate: JoinHandle<()>,
}

impl CaptureSession {
    /// Start the timer and the permission request
    pub fn mount(parts: SessionParts) -> Self {
        let state = AppState::new();
        let slot = CameraSlot::new();

        let capture_loop = CaptureLoop::new(
            slot.clone(),
            parts.preprocessor,
            parts.classifier,
            state.clone(),
            parts.interval,
            parts.policy,
        )
        .spawn();

        let gate = tokio::spawn(resolve_and_attach(
            parts.permission,
            parts.opener,
            state.clone(),
            slot.clone(),
        ));

        info!("Capture session mounted");
        Self {
            state,
            slot,
            capture_loop,
            gate,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn stats(&self) -> LoopStatsSnapshot {
        self.capture_loop.stats()
    }

    /// Whether a camera is attached
    pub fn camera_attached(&self) -> bool {
        self.slot.is_attached()
    }

    /// Stop the timer, abort outstanding work and release the camera
    pub async fn unmount(self) {
        self.gate.abort();
        self.capture_loop.stop().await;
        drop(self.slot.release());
        self.state.set_camera(CameraStatus::Released);
        info!("Capture session unmounted");
    }
}

async fn resolve_and_attach(
    provider: Arc<dyn CameraPermission>,
    opener: SourceOpener,
    state: AppState,
    slot: CameraSlot,
) {
    let status = PermissionGate::resolve(provider.as_ref()).await;
    state.set_permission(status);
    if status != PermissionStatus::Granted {
        return;
    }

    match tokio::task::spawn_blocking(opener).await {
        Ok(Ok(source)) => {
            state.set_camera(CameraStatus::Ready(source.describe()));
            slot.attach(source);
        }
        Ok(Err(e)) => {
            error!(error = %e, "Failed to open camera");
            state.set_camera(CameraStatus::Failed(e.to_string()));
        }
        Err(e) => {
            warn!(error = %e, "Camera open task panicked");
            state.set_camera(CameraStatus::Failed(e.to_string()));
        }
    }
}
