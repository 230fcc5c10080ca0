//! Offer/answer exchange against `POST /post`.
//!
//! # Lifecycle
//!
//! ```text
//! 1. link.wait_gathering_complete()      ← all candidates batched, no trickle
//! 2. POST /post  base64(json(offer))
//! 3. 200 → base64(json(answer))  |  non-2xx → classified SignalingError
//! ```

use std::time::Duration;

use async_trait::async_trait;
use livecast_core::{SessionDescription, SignalingError, ViewerConfig, ViewerError};
use tracing::{debug, info, warn};
use url::Url;

use crate::codec;
use crate::{LocalOffer, Negotiator};

/// Body substring the server uses to refuse a second viewer.
pub const ALREADY_STREAMING_MARKER: &str = "Stream already in progress";

/// Map a non-success response onto the signaling error taxonomy.
pub fn classify_failure(status: u16, body: &str) -> SignalingError {
    if status == 409 || body.contains(ALREADY_STREAMING_MARKER) {
        return SignalingError::AlreadyStreaming;
    }
    let body = body.trim();
    SignalingError::ServerError {
        status,
        body: if body.is_empty() {
            format!("HTTP error! status: {status}")
        } else {
            body.to_string()
        },
    }
}

fn classify_transport(err: reqwest::Error, timeout: Duration) -> SignalingError {
    if err.is_timeout() {
        SignalingError::Timeout { ms: timeout.as_millis() as u64 }
    } else {
        SignalingError::NetworkUnavailable { reason: err.to_string() }
    }
}

// ── SignalingClient ───────────────────────────────────────────────────────────

/// Exchanges one local description for one remote description.
///
/// Not retried: the caller decides what to do with a failure.
#[derive(Debug, Clone)]
pub struct SignalingClient {
    http: reqwest::Client,
    post_url: Url,
    timeout: Duration,
}

impl SignalingClient {
    pub fn new(config: &ViewerConfig) -> Result<Self, ViewerError> {
        Ok(Self::with_url(config.post_url()?, config.signaling_timeout()))
    }

    pub fn with_url(post_url: Url, timeout: Duration) -> Self {
        Self { http: reqwest::Client::new(), post_url, timeout }
    }

    /// Post an already-gathered description and decode the answer.
    pub async fn exchange(
        &self,
        local: &SessionDescription,
    ) -> Result<SessionDescription, SignalingError> {
        let body = codec::encode(local)?;
        debug!("POST {} ({} bytes)", self.post_url, body.len());

        let response = self
            .http
            .post(self.post_url.clone())
            .timeout(self.timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| classify_transport(e, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_transport(e, self.timeout))?;

        if !status.is_success() {
            let err = classify_failure(status.as_u16(), &text);
            warn!("Signaling rejected ({}): {}", status, err);
            return Err(err);
        }

        info!("Received response from server");
        codec::decode(&text)
    }
}

#[async_trait]
impl Negotiator for SignalingClient {
    async fn negotiate(&self, link: &dyn LocalOffer) -> Result<SessionDescription, SignalingError> {
        link.wait_gathering_complete().await;
        let local = link
            .local_description()
            .await
            .ok_or(SignalingError::LocalDescriptionUnavailable)?;
        info!("Sending offer with {} ICE candidates", local.candidate_count());
        self.exchange(&local).await
    }
}
