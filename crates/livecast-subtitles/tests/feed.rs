//! Caption feed against an in-process WebSocket server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use livecast_core::SubtitleChannelState;
use livecast_subtitles::{ReconnectPolicy, SubtitleChannel, SubtitleEvent};
use tokio::sync::mpsc;
use url::Url;

async fn serve(app: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("ws://{addr}/ws")).unwrap()
}

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        base: Duration::from_millis(50),
        ceiling: Duration::from_millis(200),
        max_attempts: 5,
    }
}

async fn next(events: &mut mpsc::Receiver<SubtitleEvent>) -> SubtitleEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event within 5s")
        .expect("channel still running")
}

/// Each connection gets one good caption, one malformed frame, then the
/// server hangs up.
async fn flaky(ws: WebSocketUpgrade, State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    ws.on_upgrade(move |mut socket: WebSocket| async move {
        let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
        let caption = format!(
            r#"{{"text":"caption {n}","emoji":"😀","lang_code":"EN","timestamp":65,"is_final":true,"speaker":2}}"#
        );
        let _ = socket.send(Message::Text(caption)).await;
        let _ = socket.send(Message::Text("{not json".into())).await;
        let _ = socket.close().await;
    })
}

#[tokio::test]
async fn delivers_captions_and_reconnects_after_drop() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new().route("/ws", get(flaky)).with_state(hits.clone());
    let url = serve(app).await;

    let (channel, mut events) = SubtitleChannel::spawn(url, fast_policy());

    assert_eq!(next(&mut events).await, SubtitleEvent::Connected);
    match next(&mut events).await {
        SubtitleEvent::Caption(c) => {
            assert_eq!(c.text, "caption 1");
            assert_eq!(c.lang_code_or_default(), "EN");
            assert_eq!(c.timestamp_label(), "00:01:05");
            assert_eq!(c.speaker_label(), "Speaker 2");
        }
        other => panic!("expected caption, got {other:?}"),
    }
    // The malformed frame is dropped without closing; the next event is the
    // server hang-up.
    assert_eq!(
        next(&mut events).await,
        SubtitleEvent::Reconnecting { attempt: 1, delay: Duration::from_millis(50) }
    );
    assert_eq!(next(&mut events).await, SubtitleEvent::Connected);
    match next(&mut events).await {
        SubtitleEvent::Caption(c) => assert_eq!(c.text, "caption 2"),
        other => panic!("expected caption, got {other:?}"),
    }
    // Counter was reset by the successful open.
    assert_eq!(
        next(&mut events).await,
        SubtitleEvent::Reconnecting { attempt: 1, delay: Duration::from_millis(50) }
    );

    channel.close().await;
    assert!(hits.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn explicit_close_does_not_reconnect() {
    let app = Router::new().route(
        "/ws",
        get(|ws: WebSocketUpgrade| async move {
            ws.on_upgrade(|mut socket: WebSocket| async move {
                while let Some(Ok(msg)) = socket.recv().await {
                    if let Message::Close(_) = msg {
                        break;
                    }
                }
            })
        }),
    );
    let url = serve(app).await;

    let (channel, mut events) = SubtitleChannel::spawn(url, fast_policy());
    assert_eq!(next(&mut events).await, SubtitleEvent::Connected);
    assert_eq!(channel.state(), SubtitleChannelState::Open);

    let mut state = channel.watch_state();
    channel.close().await;
    assert_eq!(*state.borrow_and_update(), SubtitleChannelState::Closed);

    // Task finished: no Reconnecting event, the stream just ends.
    let rest = tokio::time::timeout(Duration::from_secs(1), events.recv()).await.unwrap();
    assert!(rest.is_none());
}
