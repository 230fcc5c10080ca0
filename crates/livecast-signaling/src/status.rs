//! `GET /status` polling for the device status cards.

use std::time::Duration;

use livecast_core::status::{detect_alerts, StatusAlert};
use livecast_core::{SystemStatus, ViewerConfig, ViewerError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct StatusClient {
    http: reqwest::Client,
    url: Url,
    timeout: Duration,
}

/// One poll result plus the threshold crossings it caused.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: SystemStatus,
    pub alerts: Vec<StatusAlert>,
}

impl StatusClient {
    pub fn new(config: &ViewerConfig) -> Result<Self, ViewerError> {
        Ok(Self::with_url(config.status_url()?, config.status_timeout()))
    }

    pub fn with_url(url: Url, timeout: Duration) -> Self {
        Self { http: reqwest::Client::new(), url, timeout }
    }

    pub async fn fetch(&self) -> Result<SystemStatus, reqwest::Error> {
        self.http
            .get(self.url.clone())
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<SystemStatus>()
            .await
    }

    /// Like [`fetch`](Self::fetch) but every failure renders as `N/A`.
    pub async fn fetch_or_unavailable(&self) -> SystemStatus {
        match self.fetch().await {
            Ok(status) => status,
            Err(e) if e.is_timeout() => {
                debug!("System status request timed out");
                SystemStatus::unavailable()
            }
            Err(e) => {
                warn!("Failed to fetch system status: {}", e);
                SystemStatus::unavailable()
            }
        }
    }

    /// Poll immediately, then every `interval`, until the receiver is dropped.
    pub fn spawn_poller(self, interval: Duration) -> (JoinHandle<()>, mpsc::Receiver<StatusUpdate>) {
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<SystemStatus> = None;
            loop {
                ticker.tick().await;
                let status = self.fetch_or_unavailable().await;
                let alerts = detect_alerts(last.as_ref(), &status);
                last = Some(status.clone());
                if tx.send(StatusUpdate { status, alerts }).await.is_err() {
                    debug!("Status receiver dropped; stopping poller");
                    return;
                }
            }
        });
        (handle, rx)
    }
}
