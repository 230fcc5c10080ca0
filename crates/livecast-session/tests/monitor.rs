//! Health monitor loop against a scripted peer.

mod support;

use std::sync::Arc;
use std::time::Duration;

use livecast_core::{HostClass, IceConnectionState};
use livecast_session::{ConnectionHealthMonitor, HealthVerdict, MonitorSignal, MonitorSignalKind};
use tokio::sync::mpsc;

use support::{failed_pairs_sample, settle, FakePeer};

const TICK: Duration = Duration::from_secs(1);

fn drain(rx: &mut mpsc::UnboundedReceiver<MonitorSignal>) -> Vec<MonitorSignalKind> {
    let mut out = Vec::new();
    while let Ok(signal) = rx.try_recv() {
        out.push(signal.kind);
    }
    out
}

fn restarts_signalled(kinds: &[MonitorSignalKind]) -> usize {
    kinds.iter().filter(|k| **k == MonitorSignalKind::RestartIssued).count()
}

#[tokio::test(start_paused = true)]
async fn local_disconnect_restarts_once_per_episode() {
    let peer = Arc::new(FakePeer::new(7));
    peer.set_ice(IceConnectionState::Disconnected);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let monitor = ConnectionHealthMonitor::spawn(peer.clone(), HostClass::Local, TICK, tx);

    settle(3_500).await;
    assert_eq!(peer.restarts(), 1);
    assert_eq!(restarts_signalled(&drain(&mut rx)), 1);

    // Reconnect, then drop again: a new episode gets its own restart.
    peer.set_ice(IceConnectionState::Connected);
    settle(1_000).await;
    peer.set_ice(IceConnectionState::Disconnected);
    settle(2_000).await;
    assert_eq!(peer.restarts(), 2);

    assert!(monitor.is_running());
    monitor.stop();
}

#[tokio::test(start_paused = true)]
async fn remote_disconnect_is_left_to_ice() {
    let peer = Arc::new(FakePeer::new(3));
    peer.set_ice(IceConnectionState::Disconnected);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _monitor = ConnectionHealthMonitor::spawn(peer.clone(), HostClass::Remote, TICK, tx);

    settle(3_500).await;
    assert_eq!(peer.restarts(), 0);
    let kinds = drain(&mut rx);
    assert_eq!(restarts_signalled(&kinds), 0);
    assert_eq!(kinds.len(), 3);
    assert!(kinds.iter().all(|k| *k == MonitorSignalKind::Verdict(HealthVerdict::NoPath)));
}

#[tokio::test(start_paused = true)]
async fn failed_link_is_reported_and_loop_exits() {
    let peer = Arc::new(FakePeer::new(9));
    peer.set_ice(IceConnectionState::Failed);
    peer.set_sample(failed_pairs_sample(4));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let monitor = ConnectionHealthMonitor::spawn(peer.clone(), HostClass::Local, TICK, tx);

    settle(1_500).await;
    let signal = rx.try_recv().expect("failure signal");
    assert_eq!(signal.link, 9);
    assert_eq!(signal.kind, MonitorSignalKind::Failed(failed_pairs_sample(4)));

    settle(3_000).await;
    assert!(!monitor.is_running());
    assert!(drain(&mut rx).is_empty());
    assert_eq!(peer.restarts(), 0);
}

#[tokio::test(start_paused = true)]
async fn closed_link_ends_the_loop_silently() {
    let peer = Arc::new(FakePeer::new(1));
    peer.set_ice(IceConnectionState::Closed);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let monitor = ConnectionHealthMonitor::spawn(peer, HostClass::Local, TICK, tx);

    settle(1_500).await;
    assert!(!monitor.is_running());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn stalled_counter_is_flagged() {
    let peer = Arc::new(FakePeer::new(2));
    peer.set_ice(IceConnectionState::Connected);
    let mut sample = failed_pairs_sample(0);
    sample.has_succeeded_pair = true;
    sample.video_packets_received = 120;
    peer.set_sample(sample);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _monitor = ConnectionHealthMonitor::spawn(peer, HostClass::Local, TICK, tx);

    settle(2_500).await;
    assert_eq!(
        drain(&mut rx),
        vec![
            MonitorSignalKind::Verdict(HealthVerdict::Flowing),
            MonitorSignalKind::Verdict(HealthVerdict::Stalled),
        ]
    );
}
