//! `POST /reset`: tell the server to release the streaming session.
//!
//! Every notification goes out twice, through independent deliveries:
//! an awaited request bounded by a short timeout ("keepalive") and a detached
//! fire-and-forget task ("beacon"). Only one of them may survive a closing
//! process; the endpoint is idempotent so receiving both is harmless.

use std::time::Duration;

use async_trait::async_trait;
use livecast_core::{ViewerConfig, ViewerError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::ReleaseNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    /// Explicit user stop: body `{"force":true}`.
    Forced,
    /// Passive cleanup (hide, blur, unload, teardown): empty body.
    Passive,
}

#[derive(Debug, Clone)]
pub struct ResetClient {
    http: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl ResetClient {
    pub fn new(config: &ViewerConfig) -> Result<Self, ViewerError> {
        Ok(Self::with_url(config.reset_url()?, config.reset_timeout()))
    }

    pub fn with_url(url: Url, timeout: Duration) -> Self {
        Self { http: reqwest::Client::new(), url, timeout }
    }

    fn request(http: &reqwest::Client, url: &Url, kind: ResetKind) -> reqwest::RequestBuilder {
        let req = http.post(url.clone());
        match kind {
            ResetKind::Forced => req.json(&serde_json::json!({ "force": true })),
            ResetKind::Passive => req,
        }
    }

    /// Awaited delivery.
    pub async fn send_keepalive(&self, kind: ResetKind) -> Result<(), reqwest::Error> {
        let resp = Self::request(&self.http, &self.url, kind)
            .timeout(self.timeout)
            .send()
            .await?;
        debug!("Reset ({:?}) acknowledged: {}", kind, resp.status());
        Ok(())
    }

    /// Detached delivery; the returned handle may be dropped.
    pub fn send_beacon(&self, kind: ResetKind) -> JoinHandle<()> {
        let http = self.http.clone();
        let url = self.url.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            match Self::request(&http, &url, kind).timeout(timeout).send().await {
                Ok(resp) => debug!("Reset beacon ({:?}) delivered: {}", kind, resp.status()),
                Err(e) => debug!("Reset beacon ({:?}) not delivered: {}", kind, e),
            }
        })
    }
}

#[async_trait]
impl ReleaseNotifier for ResetClient {
    async fn release(&self, kind: ResetKind) {
        let _beacon = self.send_beacon(kind);
        if let Err(e) = self.send_keepalive(kind).await {
            warn!("Reset request ({:?}) failed: {}", kind, e);
        }
    }
}
