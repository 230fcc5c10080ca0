use std::sync::Arc;

use anyhow::Result;
use livecast_core::{Message, SessionState, ViewerConfig};
use livecast_renderer::{ConsoleLog, LogPresenter, NoticeBoard, Presenter};
use livecast_session::{LifecycleEvent, SessionDeps, StreamingSessionController};
use livecast_signaling::{ResetClient, SignalingClient, StatusClient, StatusUpdate};
use livecast_subtitles::{CaptionDisplay, ReconnectPolicy, SubtitleChannel, SubtitleEvent};
use livecast_webrtc::RtcPeerFactory;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Operator commands read line by line from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Stop,
    Lifecycle(LifecycleEvent),
    Status,
    Log,
    Quit,
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "s" => Ok(Self::Start),
            "stop" | "x" => Ok(Self::Stop),
            "hide" => Ok(Self::Lifecycle(LifecycleEvent::Hidden)),
            "show" => Ok(Self::Lifecycle(LifecycleEvent::Visible)),
            "blur" => Ok(Self::Lifecycle(LifecycleEvent::Blurred)),
            "status" => Ok(Self::Status),
            "log" => Ok(Self::Log),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

const HELP: &str = "commands: start | stop | hide | show | blur | status | log | quit";

/// Viewer main loop.
///
/// # Flow
/// 1. Load and validate `ViewerConfig` (file + `LIVECAST_*` env)
/// 2. Wire HTTP clients, the webrtc-rs peer factory and the session actor
/// 3. Open the caption feed and the device status poller
/// 4. Dispatch stdin commands, caption events and status updates until
///    `quit` or Ctrl-C, which is handled as a page unload
pub async fn run() -> Result<()> {
    let config = ViewerConfig::load()?;
    let host = config.host_class()?;
    info!(
        "Server {} ({:?} host), requested quality {}",
        config.server_url,
        host,
        config.video_quality.label()
    );

    let presenter = Arc::new(LogPresenter::new());
    let console = Arc::new(ConsoleLog::new());
    let notices = NoticeBoard::new(presenter.clone(), console.clone(), config.notice_ttl());

    // ── Session ────────────────────────────────────────────────────────────
    let controller = StreamingSessionController::spawn(
        &config,
        SessionDeps {
            factory: Arc::new(RtcPeerFactory::new(&config)?),
            negotiator: Arc::new(SignalingClient::new(&config)?),
            release: Arc::new(ResetClient::new(&config)?),
            presenter: presenter.clone(),
            console: console.clone(),
        },
    )?;
    let mut session_state = controller.watch_state();

    // ── Captions ───────────────────────────────────────────────────────────
    let captions = CaptionDisplay::new(presenter.clone(), controller.watch_state(), &config);
    let (subtitles, mut subtitle_events) =
        SubtitleChannel::spawn(config.subtitle_url()?, ReconnectPolicy::from_config(&config));

    // ── Device status ──────────────────────────────────────────────────────
    let (poller, mut status_updates) =
        StatusClient::new(&config)?.spawn_poller(config.status_poll_interval());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    info!("{}", HELP);

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<Command>() {
                    Ok(Command::Start) => controller.start(),
                    Ok(Command::Stop) => controller.stop(),
                    Ok(Command::Lifecycle(event)) => controller.lifecycle(event),
                    Ok(Command::Status) => match controller.snapshot().await {
                        Some(s) => info!(
                            "state={} session={:?} link={:?} since={:?} last_error={:?} captions={:?}",
                            s.state, s.session_id, s.link, s.started_at, s.last_error, subtitles.state()
                        ),
                        None => warn!("Session task is not running"),
                    },
                    Ok(Command::Log) => {
                        for line in console.lines() {
                            println!("{line}");
                        }
                    }
                    Ok(Command::Quit) => break,
                    Err(e) => warn!("{} ({})", e, HELP),
                },
                Ok(None) => {
                    debug!("stdin closed; waiting for Ctrl-C");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    stdin_open = false;
                }
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received");
                controller.lifecycle(LifecycleEvent::Unload);
                break;
            }

            Some(event) = subtitle_events.recv() => {
                on_subtitle_event(event, &captions, presenter.as_ref(), &notices, &config);
            }

            Some(update) = status_updates.recv() => {
                on_status_update(update, presenter.as_ref(), &config);
            }

            Ok(()) = session_state.changed() => {
                let state = *session_state.borrow_and_update();
                if state == SessionState::Idle {
                    captions.clear();
                }
            }
        }
    }

    // ── Shutdown ───────────────────────────────────────────────────────────
    info!("Shutting down...");
    controller.shutdown().await;
    subtitles.close().await;
    poller.abort();
    Ok(())
}

fn on_subtitle_event(
    event: SubtitleEvent,
    captions: &CaptionDisplay,
    presenter: &dyn Presenter,
    notices: &NoticeBoard,
    config: &ViewerConfig,
) {
    match &event {
        SubtitleEvent::Connected => {
            presenter.announce(&Message::SubtitleConnected.text(config.language));
        }
        SubtitleEvent::Caption(caption) => {
            if !captions.show(caption) {
                debug!("Caption not shown: {:?}", caption.text);
            }
        }
        SubtitleEvent::Reconnecting { attempt, delay } => {
            info!("Caption feed reconnect #{} in {:?}", attempt, delay);
        }
        SubtitleEvent::Exhausted { .. } => {
            if let Some(err) = event.as_error() {
                warn!("{}", err);
            }
            notices.show(&Message::SubtitleUnavailable.text(config.language));
        }
    }
}

fn on_status_update(update: StatusUpdate, presenter: &dyn Presenter, config: &ViewerConfig) {
    presenter.show_system_status(&update.status);
    for alert in update.alerts {
        presenter.announce(&alert.message().text(config.language));
    }
}
