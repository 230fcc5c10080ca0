//! `WS /ws` caption feed with automatic reconnect.
//!
//! # State machine
//!
//! ```text
//! Connecting ──open──► Open ──unexpected close──► Closed ──delay(n)──► Connecting
//!     │                  │                           │
//!     └──connect error───┼──────────────────────────►┘ n > max ──► Closed (terminal)
//!                        └──close()──► Closed (no retry)
//! ```

use futures::{SinkExt, StreamExt};
use livecast_core::{CaptionEvent, SubtitleChannelState, ViewerError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::ReconnectPolicy;

#[derive(Debug, Clone, PartialEq)]
pub enum SubtitleEvent {
    Connected,
    Caption(CaptionEvent),
    Reconnecting { attempt: u32, delay: Duration },
    /// Terminal: no further reconnect is scheduled.
    Exhausted { attempts: u32 },
}

impl SubtitleEvent {
    pub fn as_error(&self) -> Option<ViewerError> {
        match self {
            Self::Exhausted { attempts } => {
                Some(ViewerError::SubtitleChannelExhausted { attempts: *attempts })
            }
            _ => None,
        }
    }
}

/// Owner handle for a running channel. Dropping it closes the channel.
pub struct SubtitleChannel {
    state: watch::Receiver<SubtitleChannelState>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

enum SessionEnd {
    /// Owner asked to close; do not retry.
    Requested,
    Unexpected,
}

impl SubtitleChannel {
    /// Start connecting immediately. Events are delivered on the returned
    /// receiver; dropping it does not stop the channel.
    pub fn spawn(url: Url, policy: ReconnectPolicy) -> (Self, mpsc::Receiver<SubtitleEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (state_tx, state_rx) = watch::channel(SubtitleChannelState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(url, policy, state_tx, events_tx, shutdown_rx));
        (Self { state: state_rx, shutdown: shutdown_tx, task }, events_rx)
    }

    pub fn state(&self) -> SubtitleChannelState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SubtitleChannelState> {
        self.state.clone()
    }

    /// Clean close: the server gets a close frame and no reconnect follows.
    pub async fn close(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            debug!("Subtitle task ended abnormally: {}", e);
        }
    }
}

async fn run(
    url: Url,
    policy: ReconnectPolicy,
    state: watch::Sender<SubtitleChannelState>,
    events: mpsc::Sender<SubtitleEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;

    loop {
        let _ = state.send(SubtitleChannelState::Connecting);
        info!("Connecting subtitle feed: {}", url);

        let connected = tokio::select! {
            res = connect_async(url.as_str()) => res,
            _ = shutdown.changed() => {
                let _ = state.send(SubtitleChannelState::Closed);
                return;
            }
        };

        match connected {
            Ok((ws, _)) => {
                attempt = 0;
                let _ = state.send(SubtitleChannelState::Open);
                info!("Subtitle feed connected");
                let _ = events.send(SubtitleEvent::Connected).await;

                if let SessionEnd::Requested = pump(ws, &events, &mut shutdown).await {
                    let _ = state.send(SubtitleChannelState::Closed);
                    info!("Subtitle feed closed");
                    return;
                }
            }
            Err(e) => warn!("Subtitle feed connect failed: {}", e),
        }

        let _ = state.send(SubtitleChannelState::Closed);
        attempt += 1;
        let Some(delay) = policy.delay(attempt) else {
            warn!("Subtitle feed gave up after {} reconnect attempts", policy.max_attempts);
            let _ = events.send(SubtitleEvent::Exhausted { attempts: policy.max_attempts }).await;
            return;
        };

        info!("Subtitle feed reconnecting in {:?} (attempt {}/{})", delay, attempt, policy.max_attempts);
        let _ = events.send(SubtitleEvent::Reconnecting { attempt, delay }).await;
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => return,
        }
    }
}

async fn pump<S>(
    mut ws: S,
    events: &mpsc::Sender<SubtitleEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message>
        + Unpin,
{
    loop {
        tokio::select! {
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => match CaptionEvent::from_json(&text) {
                    Ok(caption) => {
                        let _ = events.send(SubtitleEvent::Caption(caption)).await;
                    }
                    Err(e) => debug!("Dropping malformed caption frame: {}", e),
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("Subtitle feed closed by server: {:?}", frame);
                    return SessionEnd::Unexpected;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Subtitle feed error: {}", e);
                    return SessionEnd::Unexpected;
                }
                None => return SessionEnd::Unexpected,
            },
            _ = shutdown.changed() => {
                let _ = ws.send(Message::Close(None)).await;
                return SessionEnd::Requested;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn unreachable_feed_exhausts_after_max_reconnects() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let policy = ReconnectPolicy {
            base: Duration::from_millis(100),
            ceiling: Duration::from_millis(300),
            max_attempts: 3,
        };
        let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
        let (channel, mut events) = SubtitleChannel::spawn(url, policy);

        let mut delays = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                SubtitleEvent::Reconnecting { attempt, delay } => {
                    assert_eq!(attempt as usize, delays.len() + 1);
                    delays.push(delay.as_millis());
                }
                SubtitleEvent::Exhausted { attempts } => {
                    assert_eq!(attempts, 3);
                    break;
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(delays, vec![100, 200, 300]);
        assert!(events.recv().await.is_none());
        assert_eq!(channel.state(), SubtitleChannelState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn default_policy_gives_up_after_five_unclean_closes() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
        let (channel, mut events) = SubtitleChannel::spawn(url, ReconnectPolicy::default());

        let mut delays = Vec::new();
        let exhausted = loop {
            match events.recv().await.unwrap() {
                SubtitleEvent::Reconnecting { attempt, delay } => {
                    assert_eq!(attempt as usize, delays.len() + 1);
                    delays.push(delay.as_millis());
                }
                SubtitleEvent::Exhausted { attempts } => break attempts,
                other => panic!("unexpected {other:?}"),
            }
        };
        assert_eq!(delays, vec![2_000, 4_000, 8_000, 10_000, 10_000]);
        assert_eq!(exhausted, 5);

        // No sixth reconnect is scheduled.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(events.recv().await.is_none());
        assert_eq!(channel.state(), SubtitleChannelState::Closed);
    }

    #[test]
    fn exhaustion_maps_to_viewer_error() {
        let ev = SubtitleEvent::Exhausted { attempts: 5 };
        assert!(matches!(
            ev.as_error(),
            Some(ViewerError::SubtitleChannelExhausted { attempts: 5 })
        ));
        assert!(SubtitleEvent::Connected.as_error().is_none());
    }
}
