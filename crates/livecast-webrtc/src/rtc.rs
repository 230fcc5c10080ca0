//! webrtc-rs backed [`MediaPeer`].
//!
//! # Connection setup
//!
//! ```text
//! 1. MediaEngine (default codecs) + default interceptors → API
//! 2. RTCConfiguration: STUN only for remote hosts, max-bundle, rtcp-mux require
//! 3. recvonly transceivers: video, audio
//! 4. observers → PeerEvent { link, kind } on the manager's channel
//! 5. create_offer → set_local_description → ICE gathering
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use livecast_core::{
    CandidateInfo, HealthSample, HostClass, IceConnectionState, MediaTrack, SdpType,
    SessionDescription, TrackKind, ViewerConfig,
};
use livecast_signaling::LocalOffer;
use tracing::{debug, info, trace, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::ice_transport_policy::RTCIceTransportPolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

use crate::stats;
use crate::{LinkId, MediaPeer, PeerError, PeerEvent, PeerEventKind, PeerEventSender, PeerFactory};

// ── Factory ──────────────────────────────────────────────────────────────────

pub struct RtcPeerFactory {
    api: API,
    stun_servers: Vec<String>,
    remote_pool_size: u8,
    gathering_timeout: Duration,
}

impl RtcPeerFactory {
    pub fn new(config: &ViewerConfig) -> Result<Self, PeerError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self {
            api,
            stun_servers: config.stun_servers.clone(),
            remote_pool_size: config.remote_candidate_pool_size,
            gathering_timeout: config.gathering_timeout(),
        })
    }

    /// Local hosts skip STUN entirely and pre-gather nothing.
    pub fn configuration(&self, host: HostClass) -> RTCConfiguration {
        let (ice_servers, pool) = match host {
            HostClass::Local => (Vec::new(), 0),
            HostClass::Remote => (
                vec![RTCIceServer { urls: self.stun_servers.clone(), ..Default::default() }],
                self.remote_pool_size,
            ),
        };
        RTCConfiguration {
            ice_servers,
            ice_candidate_pool_size: pool,
            bundle_policy: RTCBundlePolicy::MaxBundle,
            rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
            ice_transport_policy: RTCIceTransportPolicy::All,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PeerFactory for RtcPeerFactory {
    async fn create(
        &self,
        link: LinkId,
        host: HostClass,
        events: PeerEventSender,
    ) -> Result<Arc<dyn MediaPeer>, PeerError> {
        let config = self.configuration(host);
        info!(
            "PeerLink #{}: {} ICE server(s), candidate pool {}",
            link,
            config.ice_servers.len(),
            config.ice_candidate_pool_size
        );
        let pc = Arc::new(self.api.new_peer_connection(config).await?);

        for kind in [RTPCodecType::Video, RTPCodecType::Audio] {
            pc.add_transceiver_from_kind(
                kind,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await?;
        }

        let peer = RtcPeer { link, pc, gathering_timeout: self.gathering_timeout };
        peer.observe(events);
        Ok(Arc::new(peer))
    }
}

// ── Peer ─────────────────────────────────────────────────────────────────────

pub struct RtcPeer {
    link: LinkId,
    pc: Arc<RTCPeerConnection>,
    /// Upper bound on ICE gathering before the offer is sent with whatever
    /// was gathered so far.
    gathering_timeout: Duration,
}

impl RtcPeer {
    fn observe(&self, events: PeerEventSender) {
        let link = self.link;

        let tx = events.clone();
        self.pc.on_ice_connection_state_change(Box::new(move |state| {
            let _ = tx.send(PeerEvent { link, kind: PeerEventKind::IceState(stats::ice_state(state)) });
            Box::pin(async {})
        }));

        let tx = events.clone();
        self.pc.on_ice_gathering_state_change(Box::new(move |state| {
            let _ = tx.send(PeerEvent {
                link,
                kind: PeerEventKind::Gathering(stats::gathering_state(state)),
            });
            Box::pin(async {})
        }));

        let tx = events.clone();
        self.pc.on_ice_candidate(Box::new(move |candidate| {
            if let Some(c) = candidate {
                let info = CandidateInfo {
                    kind: stats::gathered_candidate_kind(c.typ),
                    protocol: c.protocol.to_string(),
                    address: c.address.clone(),
                    port: c.port,
                };
                let _ = tx.send(PeerEvent { link, kind: PeerEventKind::Candidate(info) });
            }
            Box::pin(async {})
        }));

        let tx = events;
        self.pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let kind = match track.kind() {
                RTPCodecType::Video => Some(TrackKind::Video),
                RTPCodecType::Audio => Some(TrackKind::Audio),
                _ => None,
            };
            if let Some(kind) = kind {
                let media = MediaTrack {
                    kind,
                    id: track.id(),
                    stream_id: track.stream_id(),
                    mime_type: track.codec().capability.mime_type.clone(),
                };
                let _ = tx.send(PeerEvent { link, kind: PeerEventKind::Track(media) });
            }

            // Drain RTP so receive statistics keep advancing; ends when the
            // connection closes.
            Box::pin(async move {
                tokio::spawn(async move {
                    let mut packets: u64 = 0;
                    while track.read_rtp().await.is_ok() {
                        packets += 1;
                    }
                    trace!("PeerLink #{}: track {} ended after {} packets", link, track.id(), packets);
                });
            })
        }));
    }
}

fn to_core_description(desc: RTCSessionDescription) -> Option<SessionDescription> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => return None,
    };
    Some(SessionDescription { sdp_type, sdp: desc.sdp })
}

#[async_trait]
impl LocalOffer for RtcPeer {
    async fn wait_gathering_complete(&self) {
        let mut done = self.pc.gathering_complete_promise().await;
        if tokio::time::timeout(self.gathering_timeout, done.recv()).await.is_err() {
            warn!(
                "PeerLink #{}: ICE gathering incomplete after {:?}",
                self.link, self.gathering_timeout
            );
        }
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.pc.local_description().await.and_then(to_core_description)
    }
}

#[async_trait]
impl MediaPeer for RtcPeer {
    fn link_id(&self) -> LinkId {
        self.link
    }

    async fn create_offer(&self) -> Result<(), PeerError> {
        let offer = self.pc.create_offer(None).await?;
        self.pc.set_local_description(offer).await?;
        debug!("PeerLink #{}: local offer set, gathering candidates", self.link);
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        let remote = match desc.sdp_type {
            SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
            SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
            SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpType::Rollback => return Err(PeerError::UnsupportedDescription("rollback".into())),
        };
        self.pc.set_remote_description(remote).await?;
        Ok(())
    }

    async fn restart_ice(&self) -> Result<(), PeerError> {
        let offer = self
            .pc
            .create_offer(Some(RTCOfferOptions { voice_activity_detection: false, ice_restart: true }))
            .await?;
        self.pc.set_local_description(offer).await?;
        info!("PeerLink #{}: ICE restart requested", self.link);
        Ok(())
    }

    async fn sample_health(&self) -> HealthSample {
        let report = self.pc.get_stats().await;
        stats::health_from_report(&report)
    }

    fn ice_state(&self) -> IceConnectionState {
        stats::ice_state(self.pc.ice_connection_state())
    }

    fn detach(&self) {
        self.pc.on_ice_connection_state_change(Box::new(|_| Box::pin(async {})));
        self.pc.on_ice_gathering_state_change(Box::new(|_| Box::pin(async {})));
        self.pc.on_ice_candidate(Box::new(|_| Box::pin(async {})));
        self.pc.on_track(Box::new(|_, _, _| Box::pin(async {})));
    }

    async fn close(&self) {
        for transceiver in self.pc.get_transceivers().await {
            if let Err(e) = transceiver.stop().await {
                debug!("PeerLink #{}: transceiver stop: {}", self.link, e);
            }
        }
        if let Err(e) = self.pc.close().await {
            warn!("PeerLink #{}: close failed: {}", self.link, e);
        }
    }

    fn as_local_offer(&self) -> &dyn LocalOffer {
        self
    }
}
