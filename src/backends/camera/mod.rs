// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │    Capture loop     │
//! └──────────┬──────────┘
//!            │ tick
//!            ▼
//! ┌─────────────────────┐
//! │     CameraSlot      │  ← attached at mount, released at unmount
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  FrameSource trait  │
//! └──────────┬──────────┘
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐  ┌──────────┐
//!   │ V4L2 │  │  Files   │
//!   └──────┘  └──────────┘
//! ```

pub mod file_source;
pub mod format_converters;
pub mod types;
pub mod v4l2;

pub use file_source::FileSource;
pub use types::*;
pub use v4l2::V4l2Source;

use crate::config::CaptureSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Something that can hand out still frames on demand
///
/// Capturing may block (device dequeue, file decode); callers run it on a
/// blocking thread.
pub trait FrameSource: Send {
    /// Human readable description for logs and the status bar
    fn describe(&self) -> String;

    /// Capture one frame
    fn capture(&mut self) -> BackendResult<CameraFrame>;
}

/// Open the frame source named by the configuration
pub fn open_source(source: &CaptureSource) -> BackendResult<Box<dyn FrameSource>> {
    info!(source = ?source, "Opening frame source");
    match source {
        CaptureSource::Device { path } => Ok(Box::new(V4l2Source::open(path)?)),
        CaptureSource::Directory { path } => Ok(Box::new(FileSource::from_directory(path)?)),
        CaptureSource::File { path } => Ok(Box::new(FileSource::from_file(path)?)),
    }
}

/// Holder for the camera handle shared with the capture loop
///
/// Empty until the view attaches a source; a tick that finds it empty does
/// nothing. The source is taken out of the lock while a capture runs, so a
/// stalled device never blocks `is_attached` or `release`.
#[derive(Clone, Default)]
pub struct CameraSlot {
    inner: Arc<SlotInner>,
}

#[derive(Default)]
struct SlotInner {
    held: Mutex<Held>,
    attached: AtomicBool,
}

#[derive(Default)]
struct Held {
    source: Option<Box<dyn FrameSource>>,
    /// Bumped by every attach and release
    generation: u64,
}

impl CameraSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a source, replacing any previous one
    pub fn attach(&self, source: Box<dyn FrameSource>) {
        debug!(source = %source.describe(), "Camera attached");
        let previous = {
            let mut held = self.lock();
            held.generation += 1;
            self.inner.attached.store(true, Ordering::Release);
            held.source.replace(source)
        };
        drop(previous);
    }

    /// Take the source out, releasing the device when dropped
    ///
    /// Returns `None` if nothing is attached or a capture currently holds
    /// the source; in the latter case the capture drops it when it returns.
    pub fn release(&self) -> Option<Box<dyn FrameSource>> {
        let released = {
            let mut held = self.lock();
            held.generation += 1;
            self.inner.attached.store(false, Ordering::Release);
            held.source.take()
        };
        match &released {
            Some(source) => debug!(source = %source.describe(), "Camera released"),
            None => debug!("Camera released"),
        }
        released
    }

    /// Whether a source is attached
    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::Acquire)
    }

    /// Description of the attached source, if it is not mid-capture
    pub fn describe(&self) -> Option<String> {
        self.lock().source.as_ref().map(|s| s.describe())
    }

    /// Capture a frame if a source is attached
    ///
    /// Returns `None` when the slot is empty. Blocks for as long as the
    /// source does, without holding the slot lock.
    pub fn capture(&self) -> Option<BackendResult<CameraFrame>> {
        let (mut source, generation) = {
            let mut held = self.lock();
            match held.source.take() {
                Some(source) => (source, held.generation),
                None if self.is_attached() => {
                    return Some(Err(BackendError::CaptureFailed(
                        "a capture is already in progress".into(),
                    )));
                }
                None => return None,
            }
        };

        let result = source.capture();

        let mut held = self.lock();
        if held.generation == generation && held.source.is_none() {
            held.source = Some(source);
        } else {
            drop(held);
            debug!(source = %source.describe(), "Source released during capture");
        }
        Some(result)
    }

    fn lock(&self) -> MutexGuard<'_, Held> {
        // A panic inside `describe` must not wedge the slot forever
        self.inner.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
