use serde::{Deserialize, Serialize};

// MARK: - SessionState

/// Lifecycle state of one streaming attempt, owned by the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Negotiating,
    Connected,
    Disconnected,
    Failed,
}

impl SessionState {
    /// A session is active while it holds (or is acquiring) a live PeerLink.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Negotiating | Self::Connected | Self::Disconnected)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Negotiating => "negotiating",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

// MARK: - ICE states

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

impl IceConnectionState {
    /// `completed` is reported by some stacks instead of `connected`.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected | Self::Completed)
    }
}

impl std::fmt::Display for IceConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Checking => "checking",
            Self::Connected => "connected",
            Self::Completed => "completed",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceGatheringState {
    New,
    Gathering,
    Complete,
}

impl std::fmt::Display for IceGatheringState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Gathering => write!(f, "gathering"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

// MARK: - SessionDescription

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// Session description exchanged with the server. The SDP body is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self { sdp_type: SdpType::Offer, sdp: sdp.into() }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self { sdp_type: SdpType::Answer, sdp: sdp.into() }
    }

    /// Number of `a=candidate:` lines batched into the description.
    pub fn candidate_count(&self) -> usize {
        self.sdp.matches("a=candidate:").count()
    }
}

// MARK: - Media tracks

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Inbound media track handed to the render target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub kind: TrackKind,
    pub id: String,
    pub stream_id: String,
    pub mime_type: String,
}

// MARK: - ICE candidates

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Host,
    ServerReflexive,
    PeerReflexive,
    Relay,
    Unknown,
}

impl CandidateKind {
    /// Host and server-reflexive candidates are the ones a direct or
    /// STUN-assisted path can use.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Host | Self::ServerReflexive)
    }
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Host => "host",
            Self::ServerReflexive => "srflx",
            Self::PeerReflexive => "prflx",
            Self::Relay => "relay",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A gathered local ICE candidate, reported for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateInfo {
    pub kind: CandidateKind,
    pub protocol: String,
    pub address: String,
    pub port: u16,
}

// MARK: - HealthSample

/// Snapshot of peer statistics taken at one sampling tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthSample {
    /// At least one candidate pair reached `succeeded`.
    pub has_succeeded_pair: bool,
    pub failed_pairs: u32,
    /// `(local_candidate_id, remote_candidate_id)` of succeeded pairs.
    pub succeeded_pair_ids: Vec<(String, String)>,
    pub current_rtt_ms: Option<f64>,
    pub local_candidate_kinds: Vec<CandidateKind>,
    pub remote_candidate_kinds: Vec<CandidateKind>,
    pub video_packets_received: u64,
    pub video_bytes_received: u64,
    pub audio_packets_received: u64,
}

impl HealthSample {
    pub fn has_local_host_candidate(&self) -> bool {
        self.local_candidate_kinds.contains(&CandidateKind::Host)
    }
}

// MARK: - SubtitleChannelState

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtitleChannelState {
    #[default]
    Connecting,
    Open,
    Closed,
}

// MARK: - VideoQuality

/// Viewer-side video quality preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    #[default]
    Hd,
    Fhd,
    #[serde(rename = "4k")]
    Uhd,
}

impl VideoQuality {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hd => "HD 1280x720",
            Self::Fhd => "FHD 1920x1080",
            Self::Uhd => "4K 3840x2160",
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            Self::Hd => "HD",
            Self::Fhd => "FHD",
            Self::Uhd => "4K",
        }
    }
}

impl std::str::FromStr for VideoQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hd" => Ok(Self::Hd),
            "fhd" => Ok(Self::Fhd),
            "4k" | "uhd" => Ok(Self::Uhd),
            other => Err(format!("unknown video quality '{other}'")),
        }
    }
}
