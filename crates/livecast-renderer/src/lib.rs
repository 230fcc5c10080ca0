//! livecast-renderer: the presentation seam.
//!
//! The streaming core never touches a display directly. Everything visible
//! (media tracks, the stream status line, transient notices, screen-reader
//! announcements, caption overlay, device status cards) goes through the
//! [`Presenter`] trait, which the host application implements.

use livecast_core::{CaptionEvent, MediaTrack, SystemStatus};

pub mod console;
pub mod log_presenter;
pub mod notice;

pub use console::ConsoleLog;
pub use log_presenter::LogPresenter;
pub use notice::NoticeBoard;

// MARK: - Presenter trait

/// Rendering and notification collaborator injected into the core.
///
/// Implementations must be cheap and non-blocking: they are called from the
/// session event loop.
pub trait Presenter: Send + Sync {
    /// Attach an inbound track. Video replaces any placeholder content;
    /// audio is attached silently alongside.
    fn render_track(&self, track: &MediaTrack);

    /// Remove every rendered media element and restore the placeholder.
    fn clear_media(&self);

    /// Short status line under the player ("connecting…", "connected", …).
    fn set_stream_status(&self, text: &str);

    /// Flip the start/stop control between its two states.
    fn set_streaming(&self, active: bool);

    /// Show a transient notice. Dismissal is driven by [`NoticeBoard`].
    fn show_notice(&self, text: &str);

    fn dismiss_notice(&self);

    /// Screen-reader announcement.
    fn announce(&self, text: &str);

    fn show_caption(&self, caption: &CaptionView);

    fn hide_caption(&self);

    fn show_system_status(&self, _status: &SystemStatus) {}
}

// MARK: - CaptionView

/// Caption resolved to the strings that are actually displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionView {
    pub emoji: String,
    pub lang_code: String,
    pub timestamp: String,
    pub text: String,
    pub speaker: String,
    pub is_final: bool,
}

impl From<&CaptionEvent> for CaptionView {
    fn from(ev: &CaptionEvent) -> Self {
        Self {
            emoji: ev.emoji_or_default().to_string(),
            lang_code: ev.lang_code_or_default().to_string(),
            timestamp: ev.timestamp_label(),
            text: ev.text.clone(),
            speaker: ev.speaker_label(),
            is_final: ev.is_final,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_view_applies_defaults() {
        let ev = CaptionEvent::from_json(r#"{"text":"hello","is_final":true,"speaker":3}"#).unwrap();
        let view = CaptionView::from(&ev);
        assert_eq!(view.emoji, "🙂");
        assert_eq!(view.lang_code, "KR");
        assert_eq!(view.timestamp, "00:00:00");
        assert_eq!(view.speaker, "Speaker 3");
        assert!(view.is_final);
    }
}
