//! Wire encoding for `/post`: base64 of the JSON session description, in
//! both directions.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use livecast_core::{SessionDescription, SignalingError};

pub fn encode(desc: &SessionDescription) -> Result<String, SignalingError> {
    let json = serde_json::to_vec(desc)
        .map_err(|e| SignalingError::MalformedDescription { reason: e.to_string() })?;
    Ok(STANDARD.encode(json))
}

pub fn decode(body: &str) -> Result<SessionDescription, SignalingError> {
    let raw = STANDARD
        .decode(body.trim())
        .map_err(|e| SignalingError::MalformedDescription { reason: format!("base64: {e}") })?;
    let desc: SessionDescription = serde_json::from_slice(&raw)
        .map_err(|e| SignalingError::MalformedDescription { reason: format!("json: {e}") })?;
    if desc.sdp.trim().is_empty() {
        return Err(SignalingError::MalformedDescription { reason: "empty sdp".into() });
    }
    Ok(desc)
}
