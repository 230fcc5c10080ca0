//! livecast-signaling: HTTP side of the viewer.
//!
//! ```text
//! Viewer                                  Server
//! ───────────────────────────             ─────────────────────
//! SignalingClient ── POST /post ───────►  offer → answer (base64 JSON)
//! ResetClient     ── POST /reset ──────►  release session (keepalive + beacon)
//! StatusClient    ── GET  /status ─────►  {battery, signal, temperature, storage}
//! ```

use async_trait::async_trait;
use livecast_core::{SessionDescription, SignalingError};

pub mod client;
pub mod codec;
pub mod reset;
pub mod status;

pub use client::SignalingClient;
pub use reset::{ResetClient, ResetKind};
pub use status::{StatusClient, StatusUpdate};

// MARK: - Capability traits

/// The local half of a negotiation: something that can finish ICE gathering
/// and then produce its local description.
#[async_trait]
pub trait LocalOffer: Send + Sync {
    /// Resolve once ICE gathering reports `complete` (immediately if it
    /// already has, or if gathering can never start).
    async fn wait_gathering_complete(&self);

    async fn local_description(&self) -> Option<SessionDescription>;
}

/// Exchanges a local description for a remote one.
#[async_trait]
pub trait Negotiator: Send + Sync {
    async fn negotiate(&self, link: &dyn LocalOffer) -> Result<SessionDescription, SignalingError>;
}

/// Best-effort server-side resource release.
#[async_trait]
pub trait ReleaseNotifier: Send + Sync {
    /// Never fails: delivery problems are logged.
    async fn release(&self, kind: ResetKind);
}
