use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::{ConsoleLog, Presenter};

/// Transient, auto-dismissing user notices.
///
/// At most one notice is visible: a new one replaces the previous notice and
/// restarts the dismissal timer. Each notice also updates the status line,
/// is announced to screen readers, and lands in the console.
pub struct NoticeBoard {
    presenter: Arc<dyn Presenter>,
    console: Arc<ConsoleLog>,
    ttl: Duration,
    dismiss: Mutex<Option<JoinHandle<()>>>,
}

impl NoticeBoard {
    pub fn new(presenter: Arc<dyn Presenter>, console: Arc<ConsoleLog>, ttl: Duration) -> Self {
        Self { presenter, console, ttl, dismiss: Mutex::new(None) }
    }

    pub fn show(&self, text: &str) {
        warn!("Notice: {}", text);
        self.console.push(format!("ERROR: {text}"));
        self.presenter.set_stream_status(text);

        let mut pending = self.dismiss.lock();
        if let Some(handle) = pending.take() {
            if !handle.is_finished() {
                handle.abort();
                self.presenter.dismiss_notice();
            }
        }
        self.presenter.show_notice(text);
        self.presenter.announce(text);

        let presenter = Arc::clone(&self.presenter);
        let ttl = self.ttl;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            presenter.dismiss_notice();
        }));
    }
}

impl Drop for NoticeBoard {
    fn drop(&mut self) {
        if let Some(handle) = self.dismiss.get_mut().take() {
            handle.abort();
        }
    }
}
