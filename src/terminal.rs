// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end
//!
//! Renders the camera preview to the terminal using Unicode half-block
//! characters for improved vertical resolution, with the current prediction
//! drawn as a badge near the bottom edge.

use crate::app::{
    AppState, CameraStatus, CaptureSession, DisplayState, LoopStatsSnapshot, RootView,
    SessionParts, view,
};
use crate::backends::camera::format_converters::frame_to_rgb;
use crate::backends::camera::types::CameraFrame;
use crate::config::Config;
use crate::constants::{timing, ui};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use image::RgbImage;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};
use std::io::{self, stdout};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{info, warn};

type TuiTerminal = Terminal<CrosstermBackend<io::Stdout>>;

/// Run the terminal front end until the user quits
pub fn run(runtime: &Runtime, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let parts = SessionParts::from_config(config)?;
    let mut terminal = setup_terminal()?;

    let result = with_session(runtime, parts, |session| {
        run_app(&mut terminal, session, config.mirror_preview)
    });

    let restored = restore_terminal(&mut terminal);
    result?;
    restored?;
    Ok(())
}

/// Mount a session for the duration of `f`
///
/// The session is unmounted whatever `f` returns. Session tasks are spawned
/// onto the runtime; `f` runs on the calling thread.
fn with_session<T, E>(
    runtime: &Runtime,
    parts: SessionParts,
    f: impl FnOnce(&CaptureSession) -> Result<T, E>,
) -> Result<T, E> {
    let session = {
        let _guard = runtime.enter();
        CaptureSession::mount(parts)
    };
    let result = f(&session);
    runtime.block_on(session.unmount());
    result
}

fn setup_terminal() -> io::Result<TuiTerminal> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e);
    }
    Terminal::new(CrosstermBackend::new(stdout)).inspect_err(|_| {
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = disable_raw_mode();
    })
}

/// Undo `setup_terminal`, attempting every step and reporting the first failure
fn restore_terminal(terminal: &mut TuiTerminal) -> io::Result<()> {
    let raw = disable_raw_mode();
    let screen = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let cursor = terminal.show_cursor();
    if let Err(e) = raw.as_ref().and(screen.as_ref()).and(cursor.as_ref()) {
        warn!(error = %e, "Failed to restore terminal");
    }
    raw.and(screen).and(cursor)
}

fn run_app(
    terminal: &mut TuiTerminal,
    session: &CaptureSession,
    mirror: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = session.state();
    let mut frame_widget = FrameWidget::new(mirror);

    loop {
        frame_widget.update_from(state);

        let root = RootView::for_status(state.permission());
        let display = state.board().current();
        let status_message = build_status_message(&state.camera(), session.stats(), &display);

        terminal.draw(|f| {
            let area = f.area();
            match root {
                RootView::Empty => {}
                RootView::NoAccess => {
                    f.render_widget(CenteredMessage(ui::NO_ACCESS_MESSAGE), area);
                }
                RootView::Capture => {
                    // Reserve bottom line for status
                    let camera_area = Rect {
                        x: area.x,
                        y: area.y,
                        width: area.width,
                        height: area.height.saturating_sub(1),
                    };
                    f.render_widget(&frame_widget, camera_area);

                    if let Some(label) = view::badge_text(&display) {
                        f.render_widget(Badge { label: &label }, camera_area);
                    }

                    let status_area = Rect {
                        x: area.x,
                        y: area.y + area.height.saturating_sub(1),
                        width: area.width,
                        height: 1,
                    };
                    f.render_widget(
                        StatusBar {
                            message: &status_message,
                        },
                        status_area,
                    );
                }
            }
        })?;

        // Handle input with timeout for frame updates
        if event::poll(timing::UI_POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            // Ctrl+C to quit
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }

            // 'q' also quits
            if key.code == KeyCode::Char('q') || key.code == KeyCode::Esc {
                break;
            }
        }
    }

    info!("Terminal front end closed");
    Ok(())
}

fn build_status_message(
    camera: &CameraStatus,
    stats: LoopStatsSnapshot,
    display: &DisplayState,
) -> String {
    let mut msg = match camera {
        CameraStatus::Waiting => "Opening camera".to_string(),
        CameraStatus::Ready(name) => name.clone(),
        CameraStatus::Failed(e) => format!("Camera error: {}", e),
        CameraStatus::Released => "Camera released".to_string(),
    };
    msg.push_str(&format!(
        " | sent {} | skipped {} | failed {}",
        stats.submissions, stats.skipped_busy, stats.failures
    ));
    if let Some(time) = &display.inference_time {
        msg.push_str(&format!(" | inference {}", time));
    }
    msg.push_str(" | 'q' quit");
    msg
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget {
    source: Option<Arc<CameraFrame>>,
    image: Option<RgbImage>,
    mirror: bool,
}

impl FrameWidget {
    fn new(mirror: bool) -> Self {
        Self {
            source: None,
            image: None,
            mirror,
        }
    }

    /// Pick up the latest preview frame, converting only when it changed
    fn update_from(&mut self, state: &AppState) {
        let Some(frame) = state.preview() else {
            return;
        };
        if self
            .source
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &frame))
        {
            return;
        }
        self.update_frame(frame);
    }

    fn update_frame(&mut self, frame: Arc<CameraFrame>) {
        match frame_to_rgb(&frame) {
            Ok(mut image) => {
                if self.mirror {
                    image::imageops::flip_horizontal_in_place(&mut image);
                }
                self.image = Some(image);
            }
            Err(e) => warn!(error = %e, "Failed to convert preview frame"),
        }
        self.source = Some(frame);
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(image) = self.image.as_ref().filter(|i| i.width() > 0 && i.height() > 0) else {
            // No frame yet - show placeholder
            CenteredMessage(ui::WAITING_MESSAGE).render(area, buf);
            return;
        };
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Calculate display dimensions maintaining aspect ratio
        // Each terminal cell displays 2 vertical pixels using half-block characters
        let frame_aspect = image.width() as f64 / image.height() as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            // Terminal is taller - fit to width
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = image.width() as f64 / display_width as f64;
        let y_scale = image.height() as f64 / (display_height * 2) as f64;

        // Upper half (▀) colored with fg, lower half with bg
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(image, src_x, src_y_top));
                    cell.set_bg(sample_pixel(image, src_x, src_y_bottom));
                }
            }
        }
    }
}

fn sample_pixel(image: &RgbImage, x: u32, y: u32) -> Color {
    let x = x.min(image.width() - 1);
    let y = y.min(image.height() - 1);
    let [r, g, b] = image.get_pixel(x, y).0;
    Color::Rgb(r, g, b)
}

/// Single line of text centered in the area
struct CenteredMessage(&'static str);

impl Widget for CenteredMessage {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let x = area.x + (area.width.saturating_sub(self.0.chars().count() as u16)) / 2;
        let y = area.y + area.height / 2;
        buf.set_stringn(x, y, self.0, area.width as usize, Style::default());
    }
}

/// Prediction label, centered horizontally near the bottom of the area
struct Badge<'a> {
    label: &'a str,
}

impl Widget for Badge<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows_needed = ui::BADGE_BOTTOM_OFFSET + 1;
        if area.height < rows_needed || area.width == 0 {
            return;
        }

        let padding = " ".repeat(ui::BADGE_PADDING as usize);
        let text = format!("{}{}{}", padding, self.label, padding);
        let width = (text.chars().count() as u16).min(area.width);
        let x = area.x + (area.width - width) / 2;
        let y = area.y + area.height - rows_needed;

        buf.set_stringn(
            x,
            y,
            &text,
            width as usize,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        buf.set_stringn(
            area.x,
            area.y,
            self.message,
            area.width as usize,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::OverlapPolicy;
    use crate::backends::camera::{BackendResult, FrameSource};
    use crate::backends::permission::StaticPermission;
    use crate::errors::ClassifyError;
    use crate::pipelines::{Classifier, EncodedFrame, Prediction, Preprocessor};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf.cell((x, y)).map(|c| c.symbol()).unwrap_or(" "))
            .collect()
    }

    #[test]
    fn test_badge_sits_above_bottom_edge() {
        let area = Rect::new(0, 0, 20, 6);
        let mut buf = Buffer::empty(area);
        Badge { label: "cat" }.render(area, &mut buf);

        // 6 rows, offset 2 from the bottom -> row 3
        assert_eq!(row(&buf, 3).trim(), "cat");
        assert_eq!(row(&buf, 5).trim(), "");
        let cell = buf.cell((9, 3)).unwrap();
        assert_eq!(cell.bg, Color::DarkGray);
    }

    #[test]
    fn test_centered_message_counts_characters() {
        let area = Rect::new(0, 0, 12, 3);
        let mut buf = Buffer::empty(area);
        CenteredMessage("äöü").render(area, &mut buf);

        // 3 characters (6 bytes) in 12 columns start at column 4
        assert_eq!(buf.cell((4, 1)).unwrap().symbol(), "ä");
        assert_eq!(buf.cell((6, 1)).unwrap().symbol(), "ü");
        assert_eq!(row(&buf, 1).trim(), "äöü");
    }

    #[test]
    fn test_badge_skipped_when_area_too_small() {
        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        Badge { label: "cat" }.render(area, &mut buf);
        assert_eq!(row(&buf, 0).trim(), "");
        assert_eq!(row(&buf, 1).trim(), "");
    }

    #[test]
    fn test_frame_widget_placeholder_without_frame() {
        let area = Rect::new(0, 0, 30, 5);
        let mut buf = Buffer::empty(area);
        (&FrameWidget::new(false)).render(area, &mut buf);
        assert_eq!(row(&buf, 2).trim(), ui::WAITING_MESSAGE);
    }

    #[test]
    fn test_frame_widget_draws_half_blocks() {
        let mut widget = FrameWidget::new(false);
        widget.update_frame(Arc::new(CameraFrame::from_rgba(
            4,
            4,
            [255, 0, 0, 255].repeat(16),
        )));

        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);

        let cell = buf.cell((0, 0)).unwrap();
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
    }

    #[test]
    fn test_mirror_flips_preview() {
        // Left column red, right column blue
        let mut data = Vec::new();
        for _ in 0..2 {
            data.extend_from_slice(&[255, 0, 0, 255, 0, 0, 255, 255]);
        }
        let mut widget = FrameWidget::new(true);
        widget.update_frame(Arc::new(CameraFrame::from_rgba(2, 2, data)));

        let image = widget.image.as_ref().unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(image.get_pixel(1, 0).0, [255, 0, 0]);
    }

    struct Gray {
        dropped: Arc<AtomicBool>,
    }

    impl FrameSource for Gray {
        fn describe(&self) -> String {
            "gray".into()
        }

        fn capture(&mut self) -> BackendResult<CameraFrame> {
            Ok(CameraFrame::from_rgba(8, 8, vec![128; 8 * 8 * 4]))
        }
    }

    impl Drop for Gray {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    struct Fixed;

    #[async_trait]
    impl Classifier for Fixed {
        async fn identify(&self, _frame: &EncodedFrame) -> Result<Prediction, ClassifyError> {
            Ok(Prediction::new("cat"))
        }
    }

    fn poll_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_session_unmounted_when_front_end_fails() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let dropped = Arc::new(AtomicBool::new(false));
        let parts = SessionParts {
            permission: Arc::new(StaticPermission::granted()),
            classifier: Arc::new(Fixed),
            opener: {
                let dropped = dropped.clone();
                Box::new(move || -> BackendResult<Box<dyn FrameSource>> {
                    Ok(Box::new(Gray { dropped }))
                })
            },
            preprocessor: Preprocessor::default(),
            interval: Duration::from_millis(50),
            policy: OverlapPolicy::Skip,
        };

        let result: Result<(), &str> = with_session(&runtime, parts, |session| {
            assert!(poll_until(|| session.camera_attached()));
            Err("terminal went away")
        });

        assert_eq!(result, Err("terminal went away"));
        assert!(poll_until(|| dropped.load(Ordering::SeqCst)), "camera released");
    }

    #[test]
    fn test_status_message_reports_camera_and_counters() {
        let stats = LoopStatsSnapshot {
            submissions: 3,
            skipped_busy: 1,
            ..Default::default()
        };
        let display = DisplayState {
            inference_time: Some("0.012".into()),
            ..Default::default()
        };
        let msg = build_status_message(&CameraStatus::Ready("cam".into()), stats, &display);
        assert!(msg.starts_with("cam | sent 3 | skipped 1"));
        assert!(msg.contains("inference 0.012"));
        assert!(msg.ends_with("'q' quit"));
    }
}
