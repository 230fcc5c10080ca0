use std::sync::Arc;
use std::time::Duration;

use livecast_core::messages::Message;
use livecast_core::{CaptionEvent, Language, SessionState, ViewerConfig};
use livecast_renderer::{CaptionView, Presenter};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Puts captions on screen while a streaming session is active, and hides
/// them again after a hold time. Only one hide timer is ever pending.
pub struct CaptionDisplay {
    presenter: Arc<dyn Presenter>,
    session: watch::Receiver<SessionState>,
    language: Language,
    final_hold: Duration,
    partial_hold: Duration,
    hide: Mutex<Option<JoinHandle<()>>>,
}

impl CaptionDisplay {
    pub fn new(
        presenter: Arc<dyn Presenter>,
        session: watch::Receiver<SessionState>,
        config: &ViewerConfig,
    ) -> Self {
        Self {
            presenter,
            session,
            language: config.language,
            final_hold: config.caption_hold(true),
            partial_hold: config.caption_hold(false),
            hide: Mutex::new(None),
        }
    }

    /// Show `caption` if it has text and a session is active. Returns whether
    /// it was shown.
    pub fn show(&self, caption: &CaptionEvent) -> bool {
        if !caption.is_displayable() {
            return false;
        }
        let state = *self.session.borrow();
        if !state.is_active() {
            debug!("Caption dropped while session is {}", state);
            return false;
        }

        self.presenter.show_caption(&CaptionView::from(caption));
        if caption.is_final {
            self.presenter
                .announce(&Message::Subtitle(caption.text.clone()).text(self.language));
        }

        let hold = if caption.is_final { self.final_hold } else { self.partial_hold };
        let presenter = Arc::clone(&self.presenter);
        let mut pending = self.hide.lock();
        if let Some(prev) = pending.take() {
            prev.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            presenter.hide_caption();
        }));
        true
    }

    /// Hide immediately and cancel the pending timer.
    pub fn clear(&self) {
        if let Some(prev) = self.hide.lock().take() {
            prev.abort();
        }
        self.presenter.hide_caption();
    }
}

impl Drop for CaptionDisplay {
    fn drop(&mut self) {
        if let Some(prev) = self.hide.get_mut().take() {
            prev.abort();
        }
    }
}
