use thiserror::Error;

/// Failures surfaced by the streaming core. None of them is fatal: every
/// path returns the session to Idle.
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Negotiation failed: {reason}")]
    NegotiationFailed { reason: String },

    #[error("Stream already in progress")]
    AlreadyStreaming,

    #[error("Network unavailable: {reason}")]
    NetworkUnavailable { reason: String },

    #[error("ICE failed: {reason}")]
    IceFailed { reason: String },

    #[error("Subtitle channel gave up after {attempts} reconnect attempts")]
    SubtitleChannelExhausted { attempts: u32 },

    #[error("Configuration invalid: {reason}")]
    ConfigurationInvalid { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classified outcome of one offer/answer exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    #[error("Stream already in progress")]
    AlreadyStreaming,

    #[error("Network unavailable: {reason}")]
    NetworkUnavailable { reason: String },

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Malformed session description: {reason}")]
    MalformedDescription { reason: String },

    #[error("Timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Local description never became available")]
    LocalDescriptionUnavailable,
}

impl From<SignalingError> for ViewerError {
    fn from(err: SignalingError) -> Self {
        match err {
            SignalingError::AlreadyStreaming => ViewerError::AlreadyStreaming,
            SignalingError::NetworkUnavailable { reason } => {
                ViewerError::NetworkUnavailable { reason }
            }
            other => ViewerError::NegotiationFailed { reason: other.to_string() },
        }
    }
}
