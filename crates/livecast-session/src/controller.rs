use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use livecast_core::{
    FailureReason, HostClass, IceConnectionState, IceGatheringState, Language, Message,
    SessionDescription, SessionState, SignalingError, VideoQuality, ViewerConfig, ViewerError,
};
use livecast_renderer::{ConsoleLog, NoticeBoard, Presenter};
use livecast_signaling::{Negotiator, ReleaseNotifier, ResetKind};
use livecast_webrtc::{LinkId, PeerConnectionManager, PeerEvent, PeerEventKind, PeerFactory};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::health::{self, ConnectionHealthMonitor, HealthVerdict, MonitorSignal, MonitorSignalKind};
use crate::LifecycleEvent;

/// Collaborators injected at construction.
pub struct SessionDeps {
    pub factory: Arc<dyn PeerFactory>,
    pub negotiator: Arc<dyn Negotiator>,
    pub release: Arc<dyn ReleaseNotifier>,
    pub presenter: Arc<dyn Presenter>,
    pub console: Arc<ConsoleLog>,
}

/// Read-only view of the controller for collaborators and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Local>>,
    pub last_error: Option<String>,
    pub link: Option<LinkId>,
}

enum Command {
    Start,
    Stop,
    Lifecycle(LifecycleEvent),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

enum Internal {
    NegotiateNow { link: LinkId },
    Negotiated { link: LinkId, result: Result<SessionDescription, SignalingError> },
    IceRetry { link: LinkId, epoch: u64 },
    IceGraceExpired { link: LinkId, epoch: u64 },
    BlurCheck { epoch: u64 },
}

// ── Handle ───────────────────────────────────────────────────────────────────

/// Top-level streaming state machine.
///
/// All methods are non-blocking: they enqueue a command for the session task.
/// Dropping the handle performs a passive cleanup and ends the task.
pub struct StreamingSessionController {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
    task: JoinHandle<()>,
}

impl StreamingSessionController {
    pub fn spawn(config: &ViewerConfig, deps: SessionDeps) -> Result<Self, ViewerError> {
        let host = config.host_class()?;
        let base = config.base_url()?;
        deps.console.push(match host {
            HostClass::Local => format!(
                "Local network detected ({}) - using direct connection",
                base.host_str().unwrap_or_default()
            ),
            HostClass::Remote => format!(
                "Remote connection ({}) - using STUN server",
                base.host_str().unwrap_or_default()
            ),
        });

        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let (monitor_tx, monitor_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);

        let manager = PeerConnectionManager::new(
            deps.factory,
            Arc::clone(&deps.presenter),
            deps.release,
            peer_tx,
        );
        let notices =
            NoticeBoard::new(Arc::clone(&deps.presenter), Arc::clone(&deps.console), config.notice_ttl());

        let actor = SessionActor {
            host,
            language: config.language,
            quality: config.video_quality,
            timings: Timings::from_config(config, host),
            manager,
            negotiator: deps.negotiator,
            presenter: deps.presenter,
            console: deps.console,
            notices,
            state: state_tx,
            session: None,
            last_error: None,
            sessions_started: 0,
            negotiation: None,
            timers: Vec::new(),
            blur_timer: None,
            monitor: None,
            ice_recovery: None,
            ice_epoch: 0,
            recovery_timer: None,
            stats_logged: None,
            page_hidden: false,
            blur_epoch: 0,
            internal: internal_tx,
            monitor_tx,
        };
        let task = tokio::spawn(actor.run(command_rx, peer_rx, monitor_rx, internal_rx));

        Ok(Self { commands: command_tx, state: state_rx, task })
    }

    pub fn start(&self) {
        self.send(Command::Start);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    pub fn lifecycle(&self, event: LifecycleEvent) {
        self.send(Command::Lifecycle(event));
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Processed in order with every command sent before it.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx));
        rx.await.ok()
    }

    /// Passive cleanup, then stop the session task.
    pub async fn shutdown(self) {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx));
        let _ = rx.await;
        if let Err(e) = self.task.await {
            warn!("Session task ended abnormally: {}", e);
        }
    }

    fn send(&self, cmd: Command) {
        if self.commands.send(cmd).is_err() {
            debug!("Session task is gone; command dropped");
        }
    }
}

// ── Actor ────────────────────────────────────────────────────────────────────

struct Timings {
    restart_delay: Duration,
    ice_retry_delay: Duration,
    ice_grace: Duration,
    health_interval: Duration,
    blur_hide_delay: Duration,
}

impl Timings {
    fn from_config(config: &ViewerConfig, host: HostClass) -> Self {
        Self {
            restart_delay: config.restart_delay(),
            ice_retry_delay: config.ice_retry_delay(),
            ice_grace: config.ice_failure_grace(),
            health_interval: ConnectionHealthMonitor::interval_for(
                host,
                config.health_interval(HostClass::Local),
                config.health_interval(HostClass::Remote),
            ),
            blur_hide_delay: config.blur_hide_delay(),
        }
    }
}

struct Session {
    id: Uuid,
    started_at: DateTime<Local>,
}

struct SessionActor {
    host: HostClass,
    language: Language,
    quality: VideoQuality,
    timings: Timings,
    manager: PeerConnectionManager,
    negotiator: Arc<dyn Negotiator>,
    presenter: Arc<dyn Presenter>,
    console: Arc<ConsoleLog>,
    notices: NoticeBoard,
    state: watch::Sender<SessionState>,
    session: Option<Session>,
    last_error: Option<String>,
    sessions_started: u64,
    negotiation: Option<JoinHandle<()>>,
    /// Restart-delay timers of the current link.
    timers: Vec<JoinHandle<()>>,
    blur_timer: Option<JoinHandle<()>>,
    monitor: Option<ConnectionHealthMonitor>,
    /// Link whose ICE failure recovery is in progress.
    ice_recovery: Option<LinkId>,
    /// Bumped at the start and end of every recovery episode.
    ice_epoch: u64,
    /// Pending retry or grace timer of the current episode.
    recovery_timer: Option<JoinHandle<()>>,
    stats_logged: Option<LinkId>,
    page_hidden: bool,
    blur_epoch: u64,
    internal: mpsc::UnboundedSender<Internal>,
    monitor_tx: mpsc::UnboundedSender<MonitorSignal>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut peer_events: mpsc::UnboundedReceiver<PeerEvent>,
        mut monitor: mpsc::UnboundedReceiver<MonitorSignal>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Start) => self.start().await,
                    Some(Command::Stop) => self.stop().await,
                    Some(Command::Lifecycle(event)) => self.on_lifecycle(event).await,
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(Command::Shutdown(done)) => {
                        self.passive_cleanup("shutdown").await;
                        let _ = done.send(());
                        return;
                    }
                    None => {
                        self.passive_cleanup("controller dropped").await;
                        return;
                    }
                },
                Some(event) = peer_events.recv() => self.on_peer_event(event).await,
                Some(signal) = monitor.recv() => self.on_monitor_signal(signal).await,
                Some(msg) = internal.recv() => self.on_internal(msg).await,
            }
        }
    }

    // MARK: - Helpers

    fn text(&self, message: Message) -> String {
        message.text(self.language)
    }

    fn current_state(&self) -> SessionState {
        *self.state.borrow()
    }

    fn set_state(&mut self, next: SessionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            info!("Session state: {} -> {}", prev, next);
            self.console.push(format!("Session state: {prev} -> {next}"));
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.current_state(),
            session_id: self.session.as_ref().map(|s| s.id),
            started_at: self.session.as_ref().map(|s| s.started_at),
            last_error: self.last_error.clone(),
            link: self.manager.current_link(),
        }
    }

    fn schedule(&mut self, delay: Duration, msg: Internal) {
        let tx = self.internal.clone();
        self.timers.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(msg);
        }));
    }

    /// Abort everything tied to the current link.
    fn cancel_work(&mut self) {
        if let Some(task) = self.negotiation.take() {
            task.abort();
        }
        for timer in self.timers.drain(..) {
            timer.abort();
        }
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
        self.end_ice_recovery();
        self.stats_logged = None;
    }

    /// Arm the single recovery timer, replacing any earlier one.
    fn arm_recovery(&mut self, delay: Duration, msg: Internal) {
        let tx = self.internal.clone();
        if let Some(old) = self.recovery_timer.replace(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(msg);
        })) {
            old.abort();
        }
    }

    fn end_ice_recovery(&mut self) {
        self.ice_recovery = None;
        self.ice_epoch += 1;
        if let Some(timer) = self.recovery_timer.take() {
            timer.abort();
        }
    }

    fn in_recovery(&self, link: LinkId, epoch: u64) -> bool {
        self.ice_recovery == Some(link) && self.ice_epoch == epoch
    }

    /// Return to Idle and release the session record.
    fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            let secs = (Local::now() - session.started_at).num_seconds();
            self.console.push(format!("Session {} ended after {}s", session.id, secs));
        }
        self.set_state(SessionState::Idle);
        self.presenter.set_streaming(false);
    }

    // MARK: - Commands

    async fn start(&mut self) {
        let current = self.current_state();
        if current.is_active() {
            self.console.push(format!("Start ignored: session already {current}"));
            return;
        }

        let session = Session { id: Uuid::new_v4(), started_at: Local::now() };
        self.console.push(format!(
            "Initiating streaming connection (session {}, {})",
            session.id,
            self.quality.label()
        ));
        self.presenter.announce(&self.text(Message::StreamingStart));
        self.session = Some(session);
        self.last_error = None;
        self.page_hidden = false;

        self.set_state(SessionState::Negotiating);
        self.presenter.set_streaming(true);
        self.presenter.set_stream_status(&self.text(Message::StreamingChecking));

        // A previous session released its server resources; give the server
        // a moment before offering again.
        let delayed = self.sessions_started > 0 || self.manager.has_link();
        self.sessions_started += 1;

        self.cancel_work();
        let peer = match self.manager.create(self.host).await {
            Ok(peer) => peer,
            Err(e) => {
                self.fail_negotiation(ViewerError::NegotiationFailed { reason: e.to_string() })
                    .await;
                return;
            }
        };
        let link = peer.link_id();

        if delayed {
            debug!("Negotiating PeerLink #{} after {:?}", link, self.timings.restart_delay);
            self.schedule(self.timings.restart_delay, Internal::NegotiateNow { link });
        } else {
            self.negotiate(link);
        }
    }

    fn negotiate(&mut self, link: LinkId) {
        if self.current_state() != SessionState::Negotiating {
            return;
        }
        let Some(peer) = self.manager.current().filter(|p| p.link_id() == link) else {
            return;
        };
        self.console.push("Waiting for ICE gathering, then sending offer");

        let negotiator = Arc::clone(&self.negotiator);
        let tx = self.internal.clone();
        self.negotiation = Some(tokio::spawn(async move {
            let result = negotiator.negotiate(peer.as_local_offer()).await;
            let _ = tx.send(Internal::Negotiated { link, result });
        }));
    }

    async fn stop(&mut self) {
        if self.current_state() == SessionState::Idle && !self.manager.has_link() {
            debug!("Stop ignored: nothing to stop");
            return;
        }
        self.console.push("Stopping streaming immediately");
        self.presenter.announce(&self.text(Message::StreamingStop));

        // State flips before any network round-trip.
        self.end_session();
        self.cancel_work();
        self.manager.teardown(ResetKind::Forced).await;
        self.console.push("Streaming stopped and server released");
    }

    async fn on_lifecycle(&mut self, event: LifecycleEvent) {
        debug!("Lifecycle: {:?}", event);
        match event {
            LifecycleEvent::Hidden => {
                self.page_hidden = true;
                self.passive_cleanup("page hidden").await;
            }
            LifecycleEvent::Unload => self.passive_cleanup("unload").await,
            LifecycleEvent::Visible => {
                self.page_hidden = false;
                self.blur_epoch += 1;
                if let Some(timer) = self.blur_timer.take() {
                    timer.abort();
                }
            }
            LifecycleEvent::Blurred => {
                self.blur_epoch += 1;
                let epoch = self.blur_epoch;
                let delay = self.timings.blur_hide_delay;
                let tx = self.internal.clone();
                if let Some(timer) = self.blur_timer.replace(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Internal::BlurCheck { epoch });
                })) {
                    timer.abort();
                }
            }
        }
    }

    async fn passive_cleanup(&mut self, reason: &str) {
        if !self.current_state().is_active() && !self.manager.has_link() {
            return;
        }
        self.console.push(format!("Cleaning up streaming ({reason})"));
        self.end_session();
        self.cancel_work();
        self.manager.teardown(ResetKind::Passive).await;
    }

    // MARK: - Failure paths

    /// Signaling never produced a usable answer: discard locally, nothing
    /// to release on the server.
    async fn fail_negotiation(&mut self, err: ViewerError) {
        let message = match &err {
            ViewerError::AlreadyStreaming => Message::AlreadyStreaming,
            ViewerError::NetworkUnavailable { .. } => Message::NetworkError,
            ViewerError::NegotiationFailed { reason } => Message::ConnectionError(reason.clone()),
            other => Message::ConnectionError(other.to_string()),
        };
        warn!("Negotiation failed: {}", err);
        self.last_error = Some(err.to_string());
        self.set_state(SessionState::Failed);
        self.cancel_work();
        self.manager.discard().await;
        self.end_session();
        self.notices.show(&self.text(message));
    }

    fn begin_ice_recovery(&mut self, link: LinkId) {
        if self.ice_recovery == Some(link) {
            return;
        }
        self.ice_recovery = Some(link);
        self.ice_epoch += 1;
        let epoch = self.ice_epoch;
        self.console.push(format!(
            "ICE failed; retrying ICE restart in {:?}",
            self.timings.ice_retry_delay
        ));
        self.arm_recovery(self.timings.ice_retry_delay, Internal::IceRetry { link, epoch });
    }

    async fn give_up(&mut self, reason: FailureReason) {
        let err = ViewerError::IceFailed { reason: format!("{reason:?}") };
        warn!("{}", err);
        self.last_error = Some(err.to_string());
        self.set_state(SessionState::Failed);
        self.cancel_work();
        self.manager.teardown(ResetKind::Passive).await;
        self.end_session();
        self.notices.show(&self.text(Message::ConnectionFailed(reason)));
    }

    // MARK: - Events

    async fn on_peer_event(&mut self, event: PeerEvent) {
        let link = event.link;
        if !self.manager.is_current(link) {
            debug!("Ignoring event from stale PeerLink #{}: {:?}", link, event.kind);
            return;
        }
        match event.kind {
            PeerEventKind::IceState(state) => self.on_ice_state(link, state).await,
            PeerEventKind::Gathering(state) => {
                self.console.push(format!("ICE gathering state: {state}"));
                if state == IceGatheringState::Complete {
                    self.console.push("All ICE candidates have been gathered");
                }
            }
            PeerEventKind::Candidate(c) => {
                self.console.push(format!(
                    "ICE Candidate: {} {} {}:{}",
                    c.kind, c.protocol, c.address, c.port
                ));
                if c.kind.is_usable() {
                    self.console.push(format!("Valid candidate found: {}", c.kind));
                }
            }
            PeerEventKind::Track(track) => {
                if self.manager.attach_track(link, &track) {
                    self.console.push(format!("Track received: {} ({})", track.kind, track.mime_type));
                    self.presenter.set_stream_status(&self.text(Message::StreamingConnected));
                }
            }
        }
    }

    async fn on_ice_state(&mut self, link: LinkId, state: IceConnectionState) {
        self.console.push(format!("ICE Connection state: {state}"));
        match state {
            IceConnectionState::Checking => {
                self.presenter.set_stream_status(&self.text(Message::StreamingChecking));
            }
            s if s.is_connected() => {
                if self.ice_recovery == Some(link) {
                    self.console.push("ICE recovered");
                    self.end_ice_recovery();
                }
                if matches!(
                    self.current_state(),
                    SessionState::Negotiating | SessionState::Disconnected
                ) {
                    self.set_state(SessionState::Connected);
                }
                self.presenter.set_stream_status(&self.text(Message::StreamingComplete));
                self.on_connected(link).await;
            }
            IceConnectionState::Disconnected => {
                if self.current_state() == SessionState::Connected {
                    self.set_state(SessionState::Disconnected);
                }
                self.presenter.set_stream_status(&self.text(Message::StreamingDisconnected));
            }
            IceConnectionState::Failed => {
                self.presenter.set_stream_status(&self.text(Message::StreamingFailed));
                self.begin_ice_recovery(link);
            }
            _ => {}
        }
    }

    /// First-connect work for a link: stats snapshot, announcement, monitor.
    async fn on_connected(&mut self, link: LinkId) {
        let Some(peer) = self.manager.current() else {
            return;
        };

        if self.stats_logged != Some(link) {
            self.stats_logged = Some(link);
            self.console.push("WebRTC connection established successfully");
            self.presenter.announce(&self.text(Message::StreamingConnected));
            let sample = peer.sample_health().await;
            for line in health::describe(&sample) {
                self.console.push(line);
            }
        }

        let running = self.monitor.as_ref().map_or(false, |m| m.link() == link && m.is_running());
        if !running {
            if let Some(old) = self.monitor.take() {
                old.stop();
            }
            self.monitor = Some(ConnectionHealthMonitor::spawn(
                peer,
                self.host,
                self.timings.health_interval,
                self.monitor_tx.clone(),
            ));
        }
    }

    async fn on_monitor_signal(&mut self, signal: MonitorSignal) {
        if !self.manager.is_current(signal.link) {
            return;
        }
        match signal.kind {
            MonitorSignalKind::Verdict(HealthVerdict::Stalled) => {
                self.console.push("Warning: Connection is active but no new packets received");
            }
            MonitorSignalKind::Verdict(_) => {}
            MonitorSignalKind::RestartIssued => {
                self.console.push("ICE restart requested after disconnect");
            }
            MonitorSignalKind::Failed(_) => {
                self.console.push("Health monitor reports ICE failure");
                self.begin_ice_recovery(signal.link);
            }
        }
    }

    async fn on_internal(&mut self, msg: Internal) {
        match msg {
            Internal::NegotiateNow { link } => self.negotiate(link),
            Internal::Negotiated { link, result } => self.on_negotiated(link, result).await,
            Internal::IceRetry { link, epoch } => {
                if !self.in_recovery(link, epoch) {
                    return;
                }
                let Some(peer) = self.manager.current().filter(|p| p.link_id() == link) else {
                    return;
                };
                if peer.ice_state() != IceConnectionState::Failed {
                    self.console.push("ICE recovered before restart");
                    self.end_ice_recovery();
                    return;
                }
                if let Err(e) = peer.restart_ice().await {
                    warn!("PeerLink #{}: ICE restart failed: {}", link, e);
                }
                self.console.push(format!(
                    "ICE restart issued; giving up in {:?} if still failed",
                    self.timings.ice_grace
                ));
                self.arm_recovery(self.timings.ice_grace, Internal::IceGraceExpired { link, epoch });
            }
            Internal::IceGraceExpired { link, epoch } => {
                if !self.in_recovery(link, epoch) {
                    return;
                }
                let Some(peer) = self.manager.current().filter(|p| p.link_id() == link) else {
                    return;
                };
                if peer.ice_state() != IceConnectionState::Failed {
                    self.console.push("ICE recovered within grace period");
                    self.end_ice_recovery();
                    return;
                }
                let sample = peer.sample_health().await;
                self.give_up(health::diagnose(Some(&sample))).await;
            }
            Internal::BlurCheck { epoch } => {
                self.blur_timer = None;
                if epoch == self.blur_epoch && self.page_hidden {
                    self.passive_cleanup("blurred and hidden").await;
                }
            }
        }
    }

    async fn on_negotiated(
        &mut self,
        link: LinkId,
        result: Result<SessionDescription, SignalingError>,
    ) {
        self.negotiation = None;
        if !self.manager.is_current(link) || self.current_state() != SessionState::Negotiating {
            debug!("Dropping negotiation result for stale PeerLink #{}", link);
            return;
        }
        let Some(peer) = self.manager.current() else {
            return;
        };

        match result {
            Ok(answer) => {
                self.console.push("Received response from server");
                match peer.set_remote_description(answer).await {
                    Ok(()) => self.console.push("Remote description set successfully"),
                    Err(e) => {
                        self.fail_negotiation(ViewerError::NegotiationFailed {
                            reason: format!("Failed to set remote description: {e}"),
                        })
                        .await
                    }
                }
            }
            Err(e) => {
                self.console.push(format!("Error: {e}"));
                self.fail_negotiation(ViewerError::from(e)).await;
            }
        }
    }
}
