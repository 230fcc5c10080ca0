use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeerError {
    #[error("WebRTC error: {0}")]
    Webrtc(#[from] webrtc::Error),

    #[error("Unsupported remote description type: {0}")]
    UnsupportedDescription(String),

    #[error("Peer connection already closed")]
    Closed,
}
