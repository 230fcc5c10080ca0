use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use livecast_core::{HostClass, MediaTrack};
use livecast_renderer::Presenter;
use livecast_signaling::{ReleaseNotifier, ResetKind};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{LinkId, MediaPeer, PeerError, PeerEventSender, PeerFactory};

/// Owns the single current PeerLink.
///
/// `create` always tears the previous link down first, so at most one link is
/// live at any time. `teardown` is idempotent.
pub struct PeerConnectionManager {
    factory: Arc<dyn PeerFactory>,
    presenter: Arc<dyn Presenter>,
    release: Arc<dyn ReleaseNotifier>,
    observer: PeerEventSender,
    current: Mutex<Option<Arc<dyn MediaPeer>>>,
    next_link: AtomicU64,
}

impl PeerConnectionManager {
    pub fn new(
        factory: Arc<dyn PeerFactory>,
        presenter: Arc<dyn Presenter>,
        release: Arc<dyn ReleaseNotifier>,
        observer: PeerEventSender,
    ) -> Self {
        Self {
            factory,
            presenter,
            release,
            observer,
            current: Mutex::new(None),
            next_link: AtomicU64::new(1),
        }
    }

    /// Build a fresh link and start offer creation.
    ///
    /// Offer failures are logged only; negotiation will then fail on its own
    /// when no local description appears.
    pub async fn create(&self, host: HostClass) -> Result<Arc<dyn MediaPeer>, PeerError> {
        if self.current.lock().is_some() {
            debug!("Discarding previous PeerLink before create");
            self.teardown(ResetKind::Passive).await;
        }

        let link = self.next_link.fetch_add(1, Ordering::Relaxed);
        let peer = self.factory.create(link, host, self.observer.clone()).await?;
        info!("PeerLink #{} created ({:?} host)", link, host);

        if let Err(e) = peer.create_offer().await {
            warn!("PeerLink #{}: offer creation failed: {}", link, e);
        }

        *self.current.lock() = Some(Arc::clone(&peer));
        Ok(peer)
    }

    /// Stop, detach and close the current link, clear rendered media, then
    /// notify the server. The server is notified even when there was no link.
    pub async fn teardown(&self, kind: ResetKind) {
        self.discard().await;
        self.release.release(kind).await;
    }

    /// Local half of [`teardown`](Self::teardown): the server is not told.
    /// Used when negotiation never reached the server's media pipeline.
    pub async fn discard(&self) -> bool {
        let peer = self.current.lock().take();
        let Some(peer) = peer else {
            return false;
        };
        info!("Tearing down PeerLink #{}", peer.link_id());
        peer.detach();
        peer.close().await;
        self.presenter.clear_media();
        true
    }

    /// Attach a track if it belongs to the current link.
    pub fn attach_track(&self, link: LinkId, track: &MediaTrack) -> bool {
        if !self.is_current(link) {
            debug!("Ignoring {} track from stale PeerLink #{}", track.kind, link);
            return false;
        }
        info!("Attaching {} track {} ({})", track.kind, track.id, track.mime_type);
        self.presenter.render_track(track);
        true
    }

    pub fn current(&self) -> Option<Arc<dyn MediaPeer>> {
        self.current.lock().clone()
    }

    pub fn current_link(&self) -> Option<LinkId> {
        self.current.lock().as_ref().map(|p| p.link_id())
    }

    pub fn is_current(&self, link: LinkId) -> bool {
        self.current_link() == Some(link)
    }

    pub fn has_link(&self) -> bool {
        self.current.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use livecast_core::{
        HealthSample, IceConnectionState, SessionDescription, SystemStatus, TrackKind,
    };
    use livecast_renderer::CaptionView;
    use livecast_signaling::LocalOffer;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakePeer {
        link: LinkId,
        fail_offer: bool,
        closed: AtomicUsize,
        detached: AtomicUsize,
    }

    #[async_trait]
    impl LocalOffer for FakePeer {
        async fn wait_gathering_complete(&self) {}
        async fn local_description(&self) -> Option<SessionDescription> {
            None
        }
    }

    #[async_trait]
    impl MediaPeer for FakePeer {
        fn link_id(&self) -> LinkId {
            self.link
        }
        async fn create_offer(&self) -> Result<(), PeerError> {
            if self.fail_offer {
                Err(PeerError::Closed)
            } else {
                Ok(())
            }
        }
        async fn set_remote_description(&self, _: SessionDescription) -> Result<(), PeerError> {
            Ok(())
        }
        async fn restart_ice(&self) -> Result<(), PeerError> {
            Ok(())
        }
        async fn sample_health(&self) -> HealthSample {
            HealthSample::default()
        }
        fn ice_state(&self) -> IceConnectionState {
            IceConnectionState::New
        }
        fn detach(&self) {
            self.detached.fetch_add(1, Ordering::SeqCst);
        }
        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
        fn as_local_offer(&self) -> &dyn LocalOffer {
            self
        }
    }

    #[derive(Default)]
    struct FakeFactory {
        fail_offer: bool,
        made: Mutex<Vec<Arc<FakePeer>>>,
    }

    #[async_trait]
    impl PeerFactory for FakeFactory {
        async fn create(
            &self,
            link: LinkId,
            _host: HostClass,
            _events: PeerEventSender,
        ) -> Result<Arc<dyn MediaPeer>, PeerError> {
            let peer = Arc::new(FakePeer { link, fail_offer: self.fail_offer, ..Default::default() });
            self.made.lock().push(Arc::clone(&peer));
            Ok(peer)
        }
    }

    #[derive(Default)]
    struct Screen {
        tracks: Mutex<Vec<MediaTrack>>,
        clears: AtomicUsize,
    }

    impl Presenter for Screen {
        fn render_track(&self, track: &MediaTrack) {
            self.tracks.lock().push(track.clone());
        }
        fn clear_media(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
        fn set_stream_status(&self, _: &str) {}
        fn set_streaming(&self, _: bool) {}
        fn show_notice(&self, _: &str) {}
        fn dismiss_notice(&self) {}
        fn announce(&self, _: &str) {}
        fn show_caption(&self, _: &CaptionView) {}
        fn hide_caption(&self) {}
        fn show_system_status(&self, _: &SystemStatus) {}
    }

    #[derive(Default)]
    struct Releases(Mutex<Vec<ResetKind>>);

    #[async_trait]
    impl ReleaseNotifier for Releases {
        async fn release(&self, kind: ResetKind) {
            self.0.lock().push(kind);
        }
    }

    struct Fixture {
        factory: Arc<FakeFactory>,
        screen: Arc<Screen>,
        releases: Arc<Releases>,
        manager: PeerConnectionManager,
    }

    fn fixture(fail_offer: bool) -> Fixture {
        let factory = Arc::new(FakeFactory { fail_offer, ..Default::default() });
        let screen = Arc::new(Screen::default());
        let releases = Arc::new(Releases::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let manager = PeerConnectionManager::new(
            factory.clone(),
            screen.clone(),
            releases.clone(),
            tx,
        );
        Fixture { factory, screen, releases, manager }
    }

    fn video(id: &str) -> MediaTrack {
        MediaTrack {
            kind: TrackKind::Video,
            id: id.into(),
            stream_id: "s".into(),
            mime_type: "video/H264".into(),
        }
    }

    #[tokio::test]
    async fn create_discards_previous_link() {
        let f = fixture(false);
        let first = f.manager.create(HostClass::Local).await.unwrap();
        let second = f.manager.create(HostClass::Local).await.unwrap();

        assert_ne!(first.link_id(), second.link_id());
        assert_eq!(f.manager.current_link(), Some(second.link_id()));

        let made = f.factory.made.lock();
        assert_eq!(made[0].closed.load(Ordering::SeqCst), 1);
        assert_eq!(made[0].detached.load(Ordering::SeqCst), 1);
        assert_eq!(made[1].closed.load(Ordering::SeqCst), 0);
        assert_eq!(*f.releases.0.lock(), vec![ResetKind::Passive]);
    }

    #[tokio::test]
    async fn teardown_twice_closes_once() {
        let f = fixture(false);
        f.manager.create(HostClass::Remote).await.unwrap();

        f.manager.teardown(ResetKind::Forced).await;
        f.manager.teardown(ResetKind::Forced).await;

        assert!(!f.manager.has_link());
        let made = f.factory.made.lock();
        assert_eq!(made[0].closed.load(Ordering::SeqCst), 1);
        assert_eq!(f.screen.clears.load(Ordering::SeqCst), 1);
        // Server notification is attempted every time.
        assert_eq!(f.releases.0.lock().len(), 2);
    }

    #[tokio::test]
    async fn discard_skips_server_release() {
        let f = fixture(false);
        f.manager.create(HostClass::Local).await.unwrap();

        assert!(f.manager.discard().await);
        assert!(!f.manager.discard().await);
        assert!(f.releases.0.lock().is_empty());
        assert_eq!(f.screen.clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn offer_failure_still_yields_link() {
        let f = fixture(true);
        let peer = f.manager.create(HostClass::Local).await.unwrap();
        assert!(f.manager.is_current(peer.link_id()));
    }

    #[tokio::test]
    async fn stale_tracks_are_not_rendered() {
        let f = fixture(false);
        let old = f.manager.create(HostClass::Local).await.unwrap().link_id();
        let new = f.manager.create(HostClass::Local).await.unwrap().link_id();

        assert!(!f.manager.attach_track(old, &video("old")));
        assert!(f.manager.attach_track(new, &video("new")));

        let tracks = f.screen.tracks.lock();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "new");
    }
}
