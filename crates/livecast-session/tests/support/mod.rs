//! In-memory collaborators for driving the session controller without a
//! network.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use livecast_core::{
    CandidateKind, HealthSample, HostClass, IceConnectionState, Language, MediaTrack,
    SessionDescription, SignalingError, TrackKind, ViewerConfig,
};
use livecast_renderer::{CaptionView, ConsoleLog, Presenter};
use livecast_session::{SessionDeps, StreamingSessionController};
use livecast_signaling::{LocalOffer, Negotiator, ReleaseNotifier, ResetKind};
use livecast_webrtc::{LinkId, MediaPeer, PeerError, PeerEvent, PeerEventKind, PeerEventSender, PeerFactory};
use parking_lot::Mutex;

// ── Peer ─────────────────────────────────────────────────────────────────────

pub struct FakePeer {
    pub link: LinkId,
    pub ice: Mutex<IceConnectionState>,
    pub sample: Mutex<HealthSample>,
    pub remote: Mutex<Option<SessionDescription>>,
    pub restarts: AtomicUsize,
    pub closes: AtomicUsize,
    pub detaches: AtomicUsize,
}

impl FakePeer {
    pub fn new(link: LinkId) -> Self {
        Self {
            link,
            ice: Mutex::new(IceConnectionState::New),
            sample: Mutex::new(HealthSample::default()),
            remote: Mutex::new(None),
            restarts: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            detaches: AtomicUsize::new(0),
        }
    }

    pub fn set_ice(&self, state: IceConnectionState) {
        *self.ice.lock() = state;
    }

    pub fn set_sample(&self, sample: HealthSample) {
        *self.sample.lock() = sample;
    }

    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalOffer for FakePeer {
    async fn wait_gathering_complete(&self) {}

    async fn local_description(&self) -> Option<SessionDescription> {
        Some(SessionDescription::offer("v=0\r\nm=video 9 UDP/TLS/RTP/SAVPF 96\r\na=recvonly\r\n"))
    }
}

#[async_trait]
impl MediaPeer for FakePeer {
    fn link_id(&self) -> LinkId {
        self.link
    }

    async fn create_offer(&self) -> Result<(), PeerError> {
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        *self.remote.lock() = Some(desc);
        Ok(())
    }

    async fn restart_ice(&self) -> Result<(), PeerError> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn sample_health(&self) -> HealthSample {
        self.sample.lock().clone()
    }

    fn ice_state(&self) -> IceConnectionState {
        *self.ice.lock()
    }

    fn detach(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        *self.ice.lock() = IceConnectionState::Closed;
    }

    fn as_local_offer(&self) -> &dyn LocalOffer {
        self
    }
}

/// A sample whose diagnosis is `FailedPairs(n)`.
pub fn failed_pairs_sample(n: u32) -> HealthSample {
    HealthSample {
        failed_pairs: n,
        local_candidate_kinds: vec![CandidateKind::Host],
        ..Default::default()
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeFactory {
    pub peers: Mutex<Vec<Arc<FakePeer>>>,
    events: Mutex<Option<PeerEventSender>>,
}

impl FakeFactory {
    pub fn peer(&self, index: usize) -> Arc<FakePeer> {
        Arc::clone(&self.peers.lock()[index])
    }

    pub fn latest(&self) -> Arc<FakePeer> {
        let peers = self.peers.lock();
        Arc::clone(peers.last().expect("a peer was created"))
    }

    pub fn created(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn emit(&self, link: LinkId, kind: PeerEventKind) {
        if let Some(tx) = self.events.lock().as_ref() {
            let _ = tx.send(PeerEvent { link, kind });
        }
    }

    /// Move a peer to `state` and report it the way the backend would.
    pub fn ice(&self, peer: &FakePeer, state: IceConnectionState) {
        peer.set_ice(state);
        self.emit(peer.link, PeerEventKind::IceState(state));
    }
}

#[async_trait]
impl PeerFactory for FakeFactory {
    async fn create(
        &self,
        link: LinkId,
        _host: HostClass,
        events: PeerEventSender,
    ) -> Result<Arc<dyn MediaPeer>, PeerError> {
        *self.events.lock() = Some(events);
        let peer = Arc::new(FakePeer::new(link));
        self.peers.lock().push(Arc::clone(&peer));
        Ok(peer)
    }
}

// ── Negotiator ───────────────────────────────────────────────────────────────

/// Answers every offer, or plays back a scripted sequence of results.
#[derive(Default)]
pub struct FakeNegotiator {
    script: Mutex<VecDeque<Result<SessionDescription, SignalingError>>>,
    calls: AtomicUsize,
}

impl FakeNegotiator {
    pub fn failing(err: SignalingError) -> Self {
        let negotiator = Self::default();
        negotiator.script.lock().push_back(Err(err));
        negotiator
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Negotiator for FakeNegotiator {
    async fn negotiate(&self, link: &dyn LocalOffer) -> Result<SessionDescription, SignalingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        link.wait_gathering_complete().await;
        if link.local_description().await.is_none() {
            return Err(SignalingError::LocalDescriptionUnavailable);
        }
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(SessionDescription::answer("v=0\r\na=sendonly\r\n")))
    }
}

// ── Presenter / release ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct Screen {
    pub tracks: Mutex<Vec<MediaTrack>>,
    pub clears: AtomicUsize,
    pub statuses: Mutex<Vec<String>>,
    pub streaming: Mutex<Vec<bool>>,
    pub notices: Mutex<Vec<String>>,
    pub announcements: Mutex<Vec<String>>,
}

impl Screen {
    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }

    pub fn announced(&self, text: &str) -> usize {
        self.announcements.lock().iter().filter(|a| a.as_str() == text).count()
    }

    pub fn streaming(&self) -> Option<bool> {
        self.streaming.lock().last().copied()
    }
}

impl Presenter for Screen {
    fn render_track(&self, track: &MediaTrack) {
        self.tracks.lock().push(track.clone());
    }
    fn clear_media(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
    fn set_stream_status(&self, text: &str) {
        self.statuses.lock().push(text.to_string());
    }
    fn set_streaming(&self, active: bool) {
        self.streaming.lock().push(active);
    }
    fn show_notice(&self, text: &str) {
        self.notices.lock().push(text.to_string());
    }
    fn dismiss_notice(&self) {}
    fn announce(&self, text: &str) {
        self.announcements.lock().push(text.to_string());
    }
    fn show_caption(&self, _: &CaptionView) {}
    fn hide_caption(&self) {}
}

#[derive(Default)]
pub struct Releases(pub Mutex<Vec<ResetKind>>);

impl Releases {
    pub fn kinds(&self) -> Vec<ResetKind> {
        self.0.lock().clone()
    }
}

#[async_trait]
impl ReleaseNotifier for Releases {
    async fn release(&self, kind: ResetKind) {
        self.0.lock().push(kind);
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

pub const LOCAL_SERVER: &str = "http://localhost:8080";
pub const REMOTE_SERVER: &str = "https://cam.example.org";

pub struct Harness {
    pub controller: StreamingSessionController,
    pub factory: Arc<FakeFactory>,
    pub negotiator: Arc<FakeNegotiator>,
    pub screen: Arc<Screen>,
    pub releases: Arc<Releases>,
    pub console: Arc<ConsoleLog>,
}

pub fn harness(server_url: &str, negotiator: FakeNegotiator) -> Harness {
    let config = ViewerConfig {
        server_url: server_url.into(),
        language: Language::En,
        ..Default::default()
    };
    let factory = Arc::new(FakeFactory::default());
    let negotiator = Arc::new(negotiator);
    let screen = Arc::new(Screen::default());
    let releases = Arc::new(Releases::default());
    let console = Arc::new(ConsoleLog::new());

    let controller = StreamingSessionController::spawn(
        &config,
        SessionDeps {
            factory: factory.clone(),
            negotiator: negotiator.clone(),
            release: releases.clone(),
            presenter: screen.clone(),
            console: console.clone(),
        },
    )
    .expect("valid config");

    Harness { controller, factory, negotiator, screen, releases, console }
}

/// Let every ready task run. Under a paused clock this also advances time
/// by `ms`.
pub async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn video_track(id: &str) -> MediaTrack {
    MediaTrack {
        kind: TrackKind::Video,
        id: id.into(),
        stream_id: "stream".into(),
        mime_type: "video/H264".into(),
    }
}
