// SPDX-License-Identifier: GPL-3.0-only

//! Periodic capture → preprocess → classify loop
//!
//! A fixed-interval timer drives the loop. Each tick captures a frame from
//! the camera slot (if one is attached), preprocesses it and submits it to
//! the classifier in a background task, so ticks stay on wall-clock time.
//!
//! At most one classification is in flight. What a tick does while one is
//! outstanding is set by [`OverlapPolicy`]. Every submission carries a
//! sequence number and the [`PredictionBoard`] drops responses older than
//! the label on screen.

use super::state::AppState;
use crate::backends::camera::CameraSlot;
use crate::constants::timing;
use crate::pipelines::classifier::Classifier;
use crate::pipelines::preprocess::Preprocessor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Behaviour of a tick while a classification is still running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Skip the tick; the outstanding request finishes undisturbed
    #[default]
    Skip,
    /// Abort the outstanding request and submit the fresh frame
    ///
    /// A classifier that always answers slower than the interval is
    /// aborted every time and the label never updates; the loop warns
    /// after a streak of supersedes.
    Supersede,
}

/// Counters describing loop activity
#[derive(Debug, Default)]
pub struct LoopStats {
    ticks: AtomicU64,
    captures: AtomicU64,
    skipped_busy: AtomicU64,
    superseded: AtomicU64,
    submissions: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of [`LoopStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStatsSnapshot {
    /// Timer firings
    pub ticks: u64,
    /// Frames taken from the camera
    pub captures: u64,
    /// Ticks skipped because a request was outstanding
    pub skipped_busy: u64,
    /// Outstanding requests aborted in favour of a fresh frame
    pub superseded: u64,
    /// Requests sent to the classifier
    pub submissions: u64,
    /// Captures, preprocessing runs or requests that failed
    pub failures: u64,
}

impl LoopStats {
    pub fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            captures: self.captures.load(Ordering::Relaxed),
            skipped_busy: self.skipped_busy.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            submissions: self.submissions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct InFlight {
    sequence: u64,
    handle: JoinHandle<()>,
}

/// The capture loop and its collaborators
pub struct CaptureLoop {
    slot: CameraSlot,
    preprocessor: Preprocessor,
    classifier: Arc<dyn Classifier>,
    state: AppState,
    interval: Duration,
    policy: OverlapPolicy,
    next_sequence: u64,
    in_flight: Option<InFlight>,
    supersede_streak: u32,
    stats: Arc<LoopStats>,
}

impl CaptureLoop {
    pub fn new(
        slot: CameraSlot,
        preprocessor: Preprocessor,
        classifier: Arc<dyn Classifier>,
        state: AppState,
        interval: Duration,
        policy: OverlapPolicy,
    ) -> Self {
        Self {
            slot,
            preprocessor,
            classifier,
            state,
            interval,
            policy,
            next_sequence: 1,
            in_flight: None,
            supersede_streak: 0,
            stats: Arc::new(LoopStats::default()),
        }
    }

    /// Shared activity counters
    pub fn stats(&self) -> Arc<LoopStats> {
        Arc::clone(&self.stats)
    }

    /// Whether a classification is outstanding
    pub fn is_busy(&mut self) -> bool {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.handle.is_finished())
        {
            self.in_flight = None;
        }
        self.in_flight.is_some()
    }

    /// Handle one timer firing
    ///
    /// Does nothing when no camera is attached. Otherwise applies the
    /// overlap policy and starts a capture-and-classify task.
    pub fn tick(&mut self) {
        LoopStats::bump(&self.stats.ticks);

        // Lock-free; a capture blocked on the device never stalls the timer
        if !self.slot.is_attached() {
            return;
        }

        if !self.is_busy() {
            self.supersede_streak = 0;
        } else {
            match self.policy {
                OverlapPolicy::Skip => {
                    LoopStats::bump(&self.stats.skipped_busy);
                    debug!("Classification in flight, skipping tick");
                    return;
                }
                OverlapPolicy::Supersede => self.supersede_outstanding(),
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let handle = tokio::spawn(capture_and_classify(
            sequence,
            self.slot.clone(),
            self.preprocessor,
            Arc::clone(&self.classifier),
            self.state.clone(),
            Arc::clone(&self.stats),
        ));
        self.in_flight = Some(InFlight { sequence, handle });
    }

    fn supersede_outstanding(&mut self) {
        let Some(previous) = self.in_flight.take() else {
            return;
        };
        debug!(sequence = previous.sequence, "Superseding outstanding request");
        previous.handle.abort();
        LoopStats::bump(&self.stats.superseded);

        self.supersede_streak += 1;
        if self.supersede_streak == timing::SUPERSEDE_WARN_AFTER {
            warn!(
                streak = self.supersede_streak,
                interval_ms = self.interval.as_millis(),
                "Classifier is slower than the capture interval, no label can arrive"
            );
        }
    }

    /// Run the timer until the handle is stopped or dropped
    ///
    /// The first tick fires one interval after the call.
    pub fn spawn(self) -> CaptureLoopHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let stats = self.stats();
        let task = tokio::spawn(self.run(shutdown_rx));
        CaptureLoopHandle {
            shutdown: Some(shutdown_tx),
            task,
            stats,
        }
    }

    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        info!(interval_ms = self.interval.as_millis(), policy = ?self.policy, "Capture loop started");

        let mut timer = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => self.tick(),
            }
        }

        if let Some(in_flight) = self.in_flight.take() {
            debug!(sequence = in_flight.sequence, "Aborting in-flight request");
            in_flight.handle.abort();
        }
        info!("Capture loop stopped");
    }
}

/// One tick's worth of work
async fn capture_and_classify(
    sequence: u64,
    slot: CameraSlot,
    preprocessor: Preprocessor,
    classifier: Arc<dyn Classifier>,
    state: AppState,
    stats: Arc<LoopStats>,
) {
    let captured = match tokio::task::spawn_blocking(move || slot.capture()).await {
        Ok(Some(result)) => result,
        // Released between the tick and the capture
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "Capture task panicked");
            LoopStats::bump(&stats.failures);
            return;
        }
    };

    let frame = match captured {
        Ok(frame) => Arc::new(frame),
        Err(e) => {
            error!(sequence, error = %e, "Error capturing frame");
            LoopStats::bump(&stats.failures);
            return;
        }
    };
    LoopStats::bump(&stats.captures);
    state.publish_frame(Arc::clone(&frame));

    let Some(encoded) = preprocessor.prepare_or_skip(frame).await else {
        LoopStats::bump(&stats.failures);
        return;
    };

    LoopStats::bump(&stats.submissions);
    match classifier.identify(&encoded).await {
        Ok(prediction) => {
            state.board().apply(sequence, prediction);
        }
        Err(e) => {
            LoopStats::bump(&stats.failures);
            error!(sequence, error = %e, "Error capturing or identifying object");
        }
    }
}

/// Running capture loop
pub struct CaptureLoopHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    stats: Arc<LoopStats>,
}

impl CaptureLoopHandle {
    pub fn stats(&self) -> LoopStatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether the loop task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the timer and wait for the loop to exit
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Capture loop task ended abnormally");
        }
    }
}
