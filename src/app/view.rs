// SPDX-License-Identifier: GPL-3.0-only

//! View selection
//!
//! The root view is a pure function of the permission status; the badge is
//! a pure function of the display state. Renderers (terminal, headless)
//! only draw what these return.

use super::state::DisplayState;
use crate::backends::permission::PermissionStatus;
use crate::constants::ui;

/// Top-level view for a permission status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootView {
    /// Permission not decided yet: draw nothing
    Empty,
    /// Permission denied: static message, no retry
    NoAccess,
    /// Preview with the prediction badge
    Capture,
}

impl RootView {
    pub fn for_status(status: PermissionStatus) -> Self {
        match status {
            PermissionStatus::Unknown => RootView::Empty,
            PermissionStatus::Denied => RootView::NoAccess,
            PermissionStatus::Granted => RootView::Capture,
        }
    }

    /// Fixed message for this view, if it has one
    pub fn message(&self) -> Option<&'static str> {
        match self {
            RootView::NoAccess => Some(ui::NO_ACCESS_MESSAGE),
            RootView::Empty | RootView::Capture => None,
        }
    }
}

/// Text of the prediction badge, `None` while there is no label
pub fn badge_text(display: &DisplayState) -> Option<String> {
    let label = display.label.trim();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_views_are_exclusive() {
        assert_eq!(RootView::for_status(PermissionStatus::Unknown), RootView::Empty);
        assert_eq!(RootView::for_status(PermissionStatus::Denied), RootView::NoAccess);
        assert_eq!(RootView::for_status(PermissionStatus::Granted), RootView::Capture);
    }

    #[test]
    fn test_only_denied_has_a_message() {
        assert_eq!(RootView::NoAccess.message(), Some("No access to camera"));
        assert_eq!(RootView::Empty.message(), None);
        assert_eq!(RootView::Capture.message(), None);
    }

    #[test]
    fn test_badge_hidden_without_label() {
        assert_eq!(badge_text(&DisplayState::default()), None);
        let display = DisplayState {
            label: "Carrot".into(),
            ..Default::default()
        };
        assert_eq!(badge_text(&display).as_deref(), Some("Carrot"));
    }
}
