// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Identifying a single image file
//! - Checking that the classifier server is reachable
//! - Running the capture loop without a UI

use camera_identify::app::{CaptureSession, RootView, SessionParts};
use camera_identify::backends::camera::file_source::load_image_as_frame;
use camera_identify::backends::camera::v4l2::enumerate_cameras;
use camera_identify::backends::permission::PermissionStatus;
use camera_identify::constants::ui;
use camera_identify::pipelines::{Classifier, HttpClassifier, Preprocessor};
use camera_identify::{Config, DisplayState};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        println!("  {} ({})", camera.name, camera.path);
        if !camera.driver.is_empty() {
            println!("      Driver: {}", camera.driver);
        }
        println!();
    }

    Ok(())
}

/// Send one image file through the preprocessing and classification steps
pub async fn identify_file(
    config: &Config,
    image: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame = load_image_as_frame(image)?;
    println!(
        "Loaded {} ({}x{})",
        image.display(),
        frame.width,
        frame.height
    );

    let preprocessor = Preprocessor::new(
        config.target_width,
        config.target_height,
        config.jpeg_quality,
    );
    let encoded = preprocessor.prepare(&frame)?;

    let classifier = HttpClassifier::new(
        &config.endpoint,
        config.request_encoding,
        config.request_timeout(),
    )?;
    println!("Sending to {}", classifier.identify_url());

    let start = Instant::now();
    let prediction = classifier.identify(&encoded).await?;
    let elapsed = start.elapsed();

    if prediction.label.is_empty() {
        println!("No prediction returned");
    } else {
        println!("Prediction: {}", prediction.label);
    }
    if let Some(time) = &prediction.preprocessing_time {
        println!("  Server preprocessing: {}", time);
    }
    if let Some(time) = &prediction.inference_time {
        println!("  Server inference: {}", time);
    }
    println!("  Round trip: {:.0?}", elapsed);

    Ok(())
}

/// Check that the classifier server answers
pub async fn ping(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let classifier = HttpClassifier::new(
        &config.endpoint,
        config.request_encoding,
        config.request_timeout(),
    )?;

    let start = Instant::now();
    let body = classifier.health().await?;
    println!("{} is up ({:.0?})", config.endpoint, start.elapsed());
    if !body.is_empty() {
        println!("  {}", body);
    }
    Ok(())
}

/// Run the capture loop and print every label change until Ctrl+C
pub async fn run_headless(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let session = CaptureSession::mount(SessionParts::from_config(config)?);
    let state = session.state().clone();
    let mut labels = state.board().subscribe();
    let mut permission = state.subscribe_permission();

    println!(
        "Identifying every {} ms via {} (Ctrl+C to stop)",
        config.capture_interval().as_millis(),
        config.endpoint
    );

    let mut decided = false;
    let result: Result<(), Box<dyn std::error::Error>> = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                }
                break Ok(());
            }
            status = permission.wait_for(|s| s.is_decided()), if !decided => {
                let Ok(status) = status.map(|s| *s) else {
                    break Ok(());
                };
                decided = true;
                if RootView::for_status(status) == RootView::NoAccess {
                    break Err(ui::NO_ACCESS_MESSAGE.into());
                }
                if status == PermissionStatus::Granted {
                    info!("Camera access granted");
                }
            }
            changed = labels.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let display = labels.borrow_and_update().clone();
                print_display(&display);
            }
        }
    };

    let stats = session.stats();
    session.unmount().await;
    println!(
        "Stopped after {} ticks: {} sent, {} skipped, {} superseded, {} failed",
        stats.ticks, stats.submissions, stats.skipped_busy, stats.superseded, stats.failures
    );

    result
}

fn print_display(display: &DisplayState) {
    let time = display
        .updated_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    match &display.inference_time {
        Some(inference) => println!("[{}] {} ({})", time, display.label, inference),
        None => println!("[{}] {}", time, display.label),
    }
}
