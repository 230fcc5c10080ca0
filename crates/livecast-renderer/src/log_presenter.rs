use livecast_core::status::{classify, StatusField};
use livecast_core::{MediaTrack, SystemStatus, TrackKind};
use parking_lot::Mutex;
use tracing::info;

use crate::{CaptionView, Presenter};

/// Headless presenter that renders everything as log lines.
///
/// Used by the `livecast-viewer` binary. Tracks are reported rather than
/// played back; playback belongs to whatever sink replaces this presenter.
#[derive(Debug, Default)]
pub struct LogPresenter {
    attached: Mutex<Vec<MediaTrack>>,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached_tracks(&self) -> Vec<MediaTrack> {
        self.attached.lock().clone()
    }
}

impl Presenter for LogPresenter {
    fn render_track(&self, track: &MediaTrack) {
        let mut attached = self.attached.lock();
        if track.kind == TrackKind::Video {
            // Video replaces the placeholder and any earlier video element.
            attached.retain(|t| t.kind != TrackKind::Video);
        }
        info!(
            "[player] attached {} track id={} stream={} ({})",
            track.kind, track.id, track.stream_id, track.mime_type
        );
        attached.push(track.clone());
    }

    fn clear_media(&self) {
        let mut attached = self.attached.lock();
        if !attached.is_empty() {
            info!("[player] cleared {} media element(s)", attached.len());
        }
        attached.clear();
    }

    fn set_stream_status(&self, text: &str) {
        info!("[status] {}", text);
    }

    fn set_streaming(&self, active: bool) {
        info!("[player] streaming={}", active);
    }

    fn show_notice(&self, text: &str) {
        info!("[notice] {}", text);
    }

    fn dismiss_notice(&self) {
        tracing::debug!("[notice] dismissed");
    }

    fn announce(&self, text: &str) {
        info!("[a11y] {}", text);
    }

    fn show_caption(&self, caption: &CaptionView) {
        info!(
            "[caption] {} {} {} {} | {}{}",
            caption.emoji,
            caption.lang_code,
            caption.timestamp,
            caption.speaker,
            caption.text,
            if caption.is_final { "" } else { " …" }
        );
    }

    fn hide_caption(&self) {
        tracing::debug!("[caption] hidden");
    }

    fn show_system_status(&self, status: &SystemStatus) {
        info!(
            "[device] battery={} ({:?}) signal={} ({:?}) temp={} ({:?}) storage={} ({:?})",
            status.battery,
            classify(StatusField::Battery, &status.battery),
            status.signal,
            classify(StatusField::Signal, &status.signal),
            status.temperature,
            classify(StatusField::Temperature, &status.temperature),
            status.storage,
            classify(StatusField::Storage, &status.storage),
        );
    }
}
