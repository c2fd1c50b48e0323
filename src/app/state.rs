// SPDX-License-Identifier: GPL-3.0-only

//! Observable application state
//!
//! Each piece of state sits in a `tokio::sync::watch` channel: the capture
//! loop and the permission task write, views subscribe and redraw on change.

use crate::backends::camera::types::CameraFrame;
use crate::backends::permission::PermissionStatus;
use crate::pipelines::classifier::Prediction;
use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// What the display shows as the current prediction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    /// Last applied label; empty until the first response
    pub label: String,
    /// Server inference time reported with the label
    pub inference_time: Option<String>,
    /// Sequence number of the request that produced the label (0 = none)
    pub sequence: u64,
    /// Local time the label was applied
    pub updated_at: Option<DateTime<Local>>,
}

/// Holds the displayed prediction and enforces newest-wins ordering
///
/// A response is applied only if its request sequence number is newer than
/// the one behind the label currently shown, so a slow response for an
/// older frame can never overwrite a newer label.
#[derive(Debug, Clone)]
pub struct PredictionBoard {
    tx: Arc<watch::Sender<DisplayState>>,
}

impl Default for PredictionBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionBoard {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(DisplayState::default())),
        }
    }

    /// Watch for label changes
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.tx.subscribe()
    }

    /// Snapshot of the current state
    pub fn current(&self) -> DisplayState {
        self.tx.borrow().clone()
    }

    /// Current label text
    pub fn label(&self) -> String {
        self.tx.borrow().label.clone()
    }

    /// Apply a response for request `sequence`
    ///
    /// Returns false (and leaves the label alone) for stale responses.
    pub fn apply(&self, sequence: u64, prediction: Prediction) -> bool {
        self.tx.send_if_modified(|state| {
            if sequence <= state.sequence {
                debug!(
                    sequence,
                    shown = state.sequence,
                    label = %prediction.label,
                    "Discarding stale prediction"
                );
                return false;
            }
            if state.label != prediction.label {
                info!(label = %prediction.label, sequence, "Prediction changed");
            }
            state.label = prediction.label;
            state.inference_time = prediction.inference_time;
            state.sequence = sequence;
            state.updated_at = Some(Local::now());
            true
        })
    }
}

/// Camera attachment state, for status display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CameraStatus {
    /// Not attached yet (permission pending or device opening)
    #[default]
    Waiting,
    /// Attached; holds the source description
    Ready(String),
    /// Opening failed; ticks stay no-ops
    Failed(String),
    /// Released at unmount
    Released,
}

/// Shared state of one mounted session
#[derive(Debug, Clone)]
pub struct AppState {
    permission: Arc<watch::Sender<PermissionStatus>>,
    camera: Arc<watch::Sender<CameraStatus>>,
    preview: Arc<watch::Sender<Option<Arc<CameraFrame>>>>,
    board: PredictionBoard,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            permission: Arc::new(watch::Sender::new(PermissionStatus::Unknown)),
            camera: Arc::new(watch::Sender::new(CameraStatus::Waiting)),
            preview: Arc::new(watch::Sender::new(None)),
            board: PredictionBoard::new(),
        }
    }

    pub fn board(&self) -> &PredictionBoard {
        &self.board
    }

    pub fn permission(&self) -> PermissionStatus {
        *self.permission.borrow()
    }

    pub fn subscribe_permission(&self) -> watch::Receiver<PermissionStatus> {
        self.permission.subscribe()
    }

    /// Record the permission decision; only the first decision sticks
    pub fn set_permission(&self, status: PermissionStatus) {
        self.permission.send_if_modified(|current| {
            if current.is_decided() || !status.is_decided() {
                return false;
            }
            *current = status;
            true
        });
    }

    pub fn camera(&self) -> CameraStatus {
        self.camera.borrow().clone()
    }

    pub fn set_camera(&self, status: CameraStatus) {
        self.camera.send_replace(status);
    }

    /// Latest captured frame
    pub fn preview(&self) -> Option<Arc<CameraFrame>> {
        self.preview.borrow().clone()
    }

    pub fn publish_frame(&self, frame: Arc<CameraFrame>) {
        self.preview.send_replace(Some(frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_starts_empty() {
        let board = PredictionBoard::new();
        assert_eq!(board.label(), "");
        assert_eq!(board.current().sequence, 0);
    }

    #[test]
    fn test_newer_response_overwrites() {
        let board = PredictionBoard::new();
        assert!(board.apply(1, Prediction::new("dog")));
        assert!(board.apply(2, Prediction::new("cat")));
        assert_eq!(board.label(), "cat");
    }

    #[test]
    fn test_late_response_for_older_frame_is_discarded() {
        // Request 1 resolves after request 2
        let board = PredictionBoard::new();
        assert!(board.apply(2, Prediction::new("cat")));
        assert!(!board.apply(1, Prediction::new("dog")));
        assert_eq!(board.label(), "cat");
        assert_eq!(board.current().sequence, 2);
    }

    #[test]
    fn test_subscribers_see_changes() {
        let board = PredictionBoard::new();
        let mut rx = board.subscribe();
        board.apply(1, Prediction::new("cup"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().label, "cup");
    }

    #[test]
    fn test_permission_is_set_once() {
        let state = AppState::new();
        state.set_permission(PermissionStatus::Denied);
        state.set_permission(PermissionStatus::Granted);
        assert_eq!(state.permission(), PermissionStatus::Denied);
    }
}
