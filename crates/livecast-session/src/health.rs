//! Connection health monitoring.
//!
//! ICE can report `connected` while no media arrives. The monitor samples
//! peer statistics on a fixed interval (short for local hosts, longer for
//! remote ones), compares each sample with the previous one, and:
//!
//! - issues a single ICE restart when a local link is `disconnected`;
//! - hands `failed` over to the controller and stops;
//! - stops as soon as the link is `closed`.
//!
//! It never tears anything down itself.

use std::sync::Arc;
use std::time::Duration;

use livecast_core::{FailureReason, HealthSample, HostClass, IceConnectionState};
use livecast_webrtc::{LinkId, MediaPeer};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

// MARK: - Verdicts

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    /// Media counters advanced since the last sample.
    Flowing,
    /// A pair succeeded and packets were seen before, but none arrived since
    /// the previous tick.
    Stalled,
    /// No candidate pair has succeeded.
    NoPath,
    /// Path exists but no media has been counted yet.
    Idle,
}

pub fn assess(previous: Option<&HealthSample>, current: &HealthSample) -> HealthVerdict {
    if !current.has_succeeded_pair {
        return HealthVerdict::NoPath;
    }
    let packets = current.video_packets_received;
    match previous {
        Some(prev) if packets > 0 && packets == prev.video_packets_received => HealthVerdict::Stalled,
        _ if packets > 0 => HealthVerdict::Flowing,
        _ => HealthVerdict::Idle,
    }
}

/// Best guess at why ICE failed. `None` means stats could not be read.
pub fn diagnose(sample: Option<&HealthSample>) -> FailureReason {
    match sample {
        None => FailureReason::Unknown,
        Some(s) if !s.has_local_host_candidate() => FailureReason::NoHostCandidate,
        Some(s) if s.failed_pairs > 0 => FailureReason::FailedPairs(s.failed_pairs),
        Some(_) => FailureReason::Unreachable,
    }
}

/// Console lines for the one-off stats snapshot taken on connect.
pub fn describe(sample: &HealthSample) -> Vec<String> {
    let mut lines = vec![format!(
        "Video: {} packets, {} bytes received",
        sample.video_packets_received, sample.video_bytes_received
    )];
    let rtt = sample
        .current_rtt_ms
        .map(|ms| format!("{ms:.0}ms"))
        .unwrap_or_else(|| "N/A".into());
    for (local, remote) in &sample.succeeded_pair_ids {
        lines.push(format!("Connection: {local} -> {remote}, RTT: {rtt}"));
    }
    lines
}

// MARK: - Monitor

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorSignalKind {
    Verdict(HealthVerdict),
    RestartIssued,
    /// ICE reported failed; carries the last sample for diagnosis.
    Failed(HealthSample),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSignal {
    pub link: LinkId,
    pub kind: MonitorSignalKind,
}

/// Handle to one sampling loop. Stopping consumes it, so a loop is cancelled
/// exactly once; dropping it cancels too.
pub struct ConnectionHealthMonitor {
    link: LinkId,
    task: JoinHandle<()>,
}

impl ConnectionHealthMonitor {
    pub fn interval_for(host: HostClass, local: Duration, remote: Duration) -> Duration {
        if host.is_local() {
            local
        } else {
            remote
        }
    }

    pub fn spawn(
        peer: Arc<dyn MediaPeer>,
        host: HostClass,
        interval: Duration,
        signals: mpsc::UnboundedSender<MonitorSignal>,
    ) -> Self {
        let link = peer.link_id();
        info!("Health monitor for PeerLink #{} every {:?}", link, interval);
        let task = tokio::spawn(sample_loop(peer, host, interval, signals));
        Self { link, task }
    }

    pub fn link(&self) -> LinkId {
        self.link
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        debug!("Health monitor for PeerLink #{} stopped", self.link);
        self.task.abort();
    }
}

impl Drop for ConnectionHealthMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn sample_loop(
    peer: Arc<dyn MediaPeer>,
    host: HostClass,
    interval: Duration,
    signals: mpsc::UnboundedSender<MonitorSignal>,
) {
    let link = peer.link_id();
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut previous: Option<HealthSample> = None;
    let mut restart_issued = false;

    loop {
        ticker.tick().await;

        let state = peer.ice_state();
        match state {
            IceConnectionState::Closed => {
                debug!("PeerLink #{} closed; health monitor exiting", link);
                return;
            }
            IceConnectionState::Failed => {
                let sample = peer.sample_health().await;
                let _ = signals.send(MonitorSignal { link, kind: MonitorSignalKind::Failed(sample) });
                return;
            }
            IceConnectionState::Disconnected if host.is_local() && !restart_issued => {
                restart_issued = true;
                match peer.restart_ice().await {
                    Ok(()) => {
                        let _ = signals.send(MonitorSignal { link, kind: MonitorSignalKind::RestartIssued });
                    }
                    Err(e) => warn!("PeerLink #{}: ICE restart failed: {}", link, e),
                }
            }
            s if s.is_connected() => restart_issued = false,
            _ => {}
        }

        let sample = peer.sample_health().await;
        let verdict = assess(previous.as_ref(), &sample);
        match verdict {
            HealthVerdict::Stalled => warn!("PeerLink #{}: connection active but no new packets", link),
            other => debug!("PeerLink #{}: health {:?} ({})", link, other, state),
        }
        if signals.send(MonitorSignal { link, kind: MonitorSignalKind::Verdict(verdict) }).is_err() {
            return;
        }
        previous = Some(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecast_core::CandidateKind;

    fn sample(pair: bool, packets: u64) -> HealthSample {
        HealthSample {
            has_succeeded_pair: pair,
            video_packets_received: packets,
            local_candidate_kinds: vec![CandidateKind::Host],
            ..Default::default()
        }
    }

    #[test]
    fn unchanged_nonzero_counter_is_a_stall() {
        assert_eq!(assess(Some(&sample(true, 40)), &sample(true, 40)), HealthVerdict::Stalled);
        assert_eq!(assess(Some(&sample(true, 40)), &sample(true, 90)), HealthVerdict::Flowing);
        assert_eq!(assess(None, &sample(true, 40)), HealthVerdict::Flowing);
        assert_eq!(assess(Some(&sample(true, 0)), &sample(true, 0)), HealthVerdict::Idle);
        assert_eq!(assess(Some(&sample(true, 40)), &sample(false, 40)), HealthVerdict::NoPath);
    }

    #[test]
    fn diagnosis_order() {
        assert_eq!(diagnose(None), FailureReason::Unknown);

        let no_host = HealthSample {
            local_candidate_kinds: vec![CandidateKind::Relay],
            failed_pairs: 3,
            ..Default::default()
        };
        assert_eq!(diagnose(Some(&no_host)), FailureReason::NoHostCandidate);

        let failed = HealthSample { failed_pairs: 2, ..sample(false, 0) };
        assert_eq!(diagnose(Some(&failed)), FailureReason::FailedPairs(2));

        assert_eq!(diagnose(Some(&sample(false, 0))), FailureReason::Unreachable);
    }

    #[test]
    fn describe_lists_pairs_with_rtt() {
        let s = HealthSample {
            video_packets_received: 10,
            video_bytes_received: 12_000,
            succeeded_pair_ids: vec![("L1".into(), "R1".into())],
            current_rtt_ms: Some(12.4),
            ..Default::default()
        };
        assert_eq!(
            describe(&s),
            vec![
                "Video: 10 packets, 12000 bytes received".to_string(),
                "Connection: L1 -> R1, RTT: 12ms".to_string(),
            ]
        );
    }

    #[test]
    fn interval_depends_on_host() {
        let local = Duration::from_secs(5);
        let remote = Duration::from_secs(10);
        assert_eq!(ConnectionHealthMonitor::interval_for(HostClass::Local, local, remote), local);
        assert_eq!(ConnectionHealthMonitor::interval_for(HostClass::Remote, local, remote), remote);
    }
}
