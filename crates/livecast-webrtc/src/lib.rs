//! livecast-webrtc: the receive-only media peer.
//!
//! # Architecture
//!
//! ```text
//! StreamingSessionController
//!        │ create / teardown / attach_track
//!        ▼
//! PeerConnectionManager ── owns ──► current PeerLink (Arc<dyn MediaPeer>)
//!        │                                │ PeerEvent { link, kind }
//!        │ PeerFactory::create            ▼
//!        └──────────────────────► mpsc observer channel ──► controller
//! ```
//!
//! The backend is abstracted behind [`MediaPeer`] / [`PeerFactory`] so the
//! controller can be exercised without a network. [`RtcPeerFactory`] is the
//! production implementation on top of webrtc-rs.

use std::sync::Arc;

use async_trait::async_trait;
use livecast_core::{
    CandidateInfo, HealthSample, HostClass, IceConnectionState, IceGatheringState, MediaTrack,
    SessionDescription,
};
use livecast_signaling::LocalOffer;
use tokio::sync::mpsc;

pub mod error;
pub mod manager;
pub mod rtc;
pub mod stats;

pub use error::PeerError;
pub use manager::PeerConnectionManager;
pub use rtc::{RtcPeer, RtcPeerFactory};

/// Monotonic identifier of one PeerLink. Events tagged with a link that is no
/// longer current are stale and must be ignored.
pub type LinkId = u64;

// MARK: - Events

#[derive(Debug, Clone, PartialEq)]
pub enum PeerEventKind {
    IceState(IceConnectionState),
    Gathering(IceGatheringState),
    Candidate(CandidateInfo),
    Track(MediaTrack),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeerEvent {
    pub link: LinkId,
    pub kind: PeerEventKind,
}

pub type PeerEventSender = mpsc::UnboundedSender<PeerEvent>;

// MARK: - Capability traits

/// One underlying peer connection.
#[async_trait]
pub trait MediaPeer: LocalOffer {
    fn link_id(&self) -> LinkId;

    /// Create the local offer and assign it as local description, which
    /// starts ICE gathering.
    async fn create_offer(&self) -> Result<(), PeerError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError>;

    /// Ask the ICE agent to restart. A hint, not a renegotiation.
    async fn restart_ice(&self) -> Result<(), PeerError>;

    /// Current statistics. A peer whose stats cannot be read returns an
    /// empty sample.
    async fn sample_health(&self) -> HealthSample;

    fn ice_state(&self) -> IceConnectionState;

    /// Replace every observer with a no-op.
    fn detach(&self);

    /// Stop all transceivers and close the connection. Errors are logged.
    async fn close(&self);

    fn as_local_offer(&self) -> &dyn LocalOffer;
}

#[async_trait]
pub trait PeerFactory: Send + Sync {
    async fn create(
        &self,
        link: LinkId,
        host: HostClass,
        events: PeerEventSender,
    ) -> Result<Arc<dyn MediaPeer>, PeerError>;
}
