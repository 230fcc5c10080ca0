//! livecast-session: the streaming session state machine.
//!
//! ```text
//!            start()                 ICE connected
//!   Idle ───────────► Negotiating ─────────────────► Connected ◄──► Disconnected
//!    ▲                    │                              │
//!    │   stop() / hide    │ signaling error              │ ICE failed, restart,
//!    │   / unload         ▼                              ▼ grace expired
//!    └──────────────── Failed ◄──────────────────────────┘
//! ```
//!
//! [`StreamingSessionController`] is an actor: one task owns all session
//! state and processes commands, peer events, monitor signals and timers in
//! order. Collaborators only ever see a read-only `watch` of the state.

pub mod controller;
pub mod health;

pub use controller::{SessionDeps, SessionSnapshot, StreamingSessionController};
pub use health::{ConnectionHealthMonitor, HealthVerdict, MonitorSignal, MonitorSignalKind};

/// Host page lifecycle, fed by the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Viewer is no longer visible.
    Hidden,
    Visible,
    /// Focus lost. Cleanup happens only if the viewer is hidden once the
    /// blur delay has elapsed.
    Blurred,
    /// Process/page is going away.
    Unload,
}
