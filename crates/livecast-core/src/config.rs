use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ViewerError;
use crate::host::{classify_url, HostClass};
use crate::messages::Language;
use crate::types::VideoQuality;

pub const CONFIG_PATH_ENV: &str = "LIVECAST_CONFIG";
pub const SERVER_URL_ENV: &str = "LIVECAST_SERVER_URL";
pub const LANGUAGE_ENV: &str = "LIVECAST_LANGUAGE";
pub const VIDEO_QUALITY_ENV: &str = "LIVECAST_VIDEO_QUALITY";

/// Viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    #[serde(alias = "serverUrl")]
    pub server_url: String,
    #[serde(alias = "stunServers")]
    pub stun_servers: Vec<String>,
    #[serde(alias = "remoteCandidatePoolSize")]
    pub remote_candidate_pool_size: u8,
    #[serde(alias = "localHealthIntervalMs")]
    pub local_health_interval_ms: u64,
    #[serde(alias = "remoteHealthIntervalMs")]
    pub remote_health_interval_ms: u64,
    #[serde(alias = "iceRetryDelayMs")]
    pub ice_retry_delay_ms: u64,
    #[serde(alias = "iceFailureGraceMs")]
    pub ice_failure_grace_ms: u64,
    #[serde(alias = "gatheringTimeoutMs")]
    pub gathering_timeout_ms: u64,
    #[serde(alias = "signalingTimeoutMs")]
    pub signaling_timeout_ms: u64,
    #[serde(alias = "resetTimeoutMs")]
    pub reset_timeout_ms: u64,
    #[serde(alias = "subtitleReconnectBaseMs")]
    pub subtitle_reconnect_base_ms: u64,
    #[serde(alias = "subtitleReconnectCeilingMs")]
    pub subtitle_reconnect_ceiling_ms: u64,
    #[serde(alias = "subtitleMaxReconnects")]
    pub subtitle_max_reconnects: u32,
    #[serde(alias = "finalCaptionHoldMs")]
    pub final_caption_hold_ms: u64,
    #[serde(alias = "partialCaptionHoldMs")]
    pub partial_caption_hold_ms: u64,
    #[serde(alias = "noticeTtlMs")]
    pub notice_ttl_ms: u64,
    #[serde(alias = "statusPollIntervalMs")]
    pub status_poll_interval_ms: u64,
    #[serde(alias = "statusTimeoutMs")]
    pub status_timeout_ms: u64,
    #[serde(alias = "blurHideDelayMs")]
    pub blur_hide_delay_ms: u64,
    #[serde(alias = "restartDelayMs")]
    pub restart_delay_ms: u64,
    #[serde(alias = "videoQuality")]
    pub video_quality: VideoQuality,
    pub language: Language,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".into(),
            stun_servers: vec!["stun:stun.l.google.com:19302".into()],
            remote_candidate_pool_size: 10,
            local_health_interval_ms: 5_000,
            remote_health_interval_ms: 10_000,
            ice_retry_delay_ms: 1_000,
            ice_failure_grace_ms: 5_000,
            gathering_timeout_ms: 10_000,
            signaling_timeout_ms: 15_000,
            reset_timeout_ms: 3_000,
            subtitle_reconnect_base_ms: 2_000,
            subtitle_reconnect_ceiling_ms: 10_000,
            subtitle_max_reconnects: 5,
            final_caption_hold_ms: 5_000,
            partial_caption_hold_ms: 3_000,
            notice_ttl_ms: 5_000,
            status_poll_interval_ms: 10_000,
            status_timeout_ms: 5_000,
            blur_hide_delay_ms: 2_000,
            restart_delay_ms: 300,
            video_quality: VideoQuality::Hd,
            language: Language::Ko,
        }
    }
}

impl ViewerConfig {
    /// Defaults, then the JSON file named by `LIVECAST_CONFIG`, then
    /// individual environment overrides.
    pub fn load() -> Result<Self, ViewerError> {
        let mut cfg = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ViewerError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|e| ViewerError::ConfigurationInvalid {
            reason: format!("{}: {}", path.as_ref().display(), e),
        })
    }

    /// Apply `LIVECAST_*` overrides using `lookup` to read variables.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ViewerError> {
        if let Some(url) = lookup(SERVER_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.server_url = url.trim().to_string();
        }
        if let Some(lang) = lookup(LANGUAGE_ENV).filter(|v| !v.trim().is_empty()) {
            self.language = lang
                .parse()
                .map_err(|reason| ViewerError::ConfigurationInvalid { reason })?;
        }
        if let Some(quality) = lookup(VIDEO_QUALITY_ENV).filter(|v| !v.trim().is_empty()) {
            self.video_quality = quality
                .parse()
                .map_err(|reason| ViewerError::ConfigurationInvalid { reason })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ViewerError> {
        let url = self.base_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ViewerError::ConfigurationInvalid {
                reason: format!("server_url must be http(s), got '{}'", url.scheme()),
            });
        }
        let intervals = [
            ("local_health_interval_ms", self.local_health_interval_ms),
            ("remote_health_interval_ms", self.remote_health_interval_ms),
            ("gathering_timeout_ms", self.gathering_timeout_ms),
            ("signaling_timeout_ms", self.signaling_timeout_ms),
            ("subtitle_reconnect_base_ms", self.subtitle_reconnect_base_ms),
            ("status_poll_interval_ms", self.status_poll_interval_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(ViewerError::ConfigurationInvalid {
                reason: format!("{name} must be greater than zero"),
            });
        }
        if self.subtitle_reconnect_ceiling_ms < self.subtitle_reconnect_base_ms {
            return Err(ViewerError::ConfigurationInvalid {
                reason: "subtitle_reconnect_ceiling_ms is below the base delay".into(),
            });
        }
        Ok(())
    }

    // ── Endpoints ────────────────────────────────────────────────────────────

    pub fn base_url(&self) -> Result<Url, ViewerError> {
        Url::parse(&self.server_url).map_err(|e| ViewerError::ConfigurationInvalid {
            reason: format!("server_url '{}': {}", self.server_url, e),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ViewerError> {
        self.base_url()?
            .join(path)
            .map_err(|e| ViewerError::ConfigurationInvalid { reason: e.to_string() })
    }

    pub fn post_url(&self) -> Result<Url, ViewerError> {
        self.endpoint("/post")
    }

    pub fn reset_url(&self) -> Result<Url, ViewerError> {
        self.endpoint("/reset")
    }

    pub fn status_url(&self) -> Result<Url, ViewerError> {
        self.endpoint("/status")
    }

    /// `ws://…/ws`, or `wss://…/ws` when the server is served over https.
    pub fn subtitle_url(&self) -> Result<Url, ViewerError> {
        let mut url = self.endpoint("/ws")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| ViewerError::ConfigurationInvalid {
            reason: format!("cannot derive websocket url from '{}'", self.server_url),
        })?;
        Ok(url)
    }

    pub fn host_class(&self) -> Result<HostClass, ViewerError> {
        Ok(classify_url(&self.base_url()?))
    }

    // ── Durations ────────────────────────────────────────────────────────────

    pub fn health_interval(&self, class: HostClass) -> Duration {
        match class {
            HostClass::Local => Duration::from_millis(self.local_health_interval_ms),
            HostClass::Remote => Duration::from_millis(self.remote_health_interval_ms),
        }
    }

    pub fn ice_retry_delay(&self) -> Duration {
        Duration::from_millis(self.ice_retry_delay_ms)
    }

    pub fn ice_failure_grace(&self) -> Duration {
        Duration::from_millis(self.ice_failure_grace_ms)
    }

    pub fn gathering_timeout(&self) -> Duration {
        Duration::from_millis(self.gathering_timeout_ms)
    }

    pub fn signaling_timeout(&self) -> Duration {
        Duration::from_millis(self.signaling_timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    pub fn caption_hold(&self, is_final: bool) -> Duration {
        if is_final {
            Duration::from_millis(self.final_caption_hold_ms)
        } else {
            Duration::from_millis(self.partial_caption_hold_ms)
        }
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn blur_hide_delay(&self) -> Duration {
        Duration::from_millis(self.blur_hide_delay_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}
