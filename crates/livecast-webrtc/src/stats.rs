//! Translation from webrtc-rs types into the backend-neutral core types.

use livecast_core::{CandidateKind, HealthSample, IceConnectionState, IceGatheringState};
use webrtc::ice::candidate::{CandidatePairState, CandidateType};
use webrtc::ice_transport::ice_candidate_type::RTCIceCandidateType;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::stats::{StatsReport, StatsReportType};

pub fn ice_state(state: RTCIceConnectionState) -> IceConnectionState {
    match state {
        RTCIceConnectionState::Unspecified | RTCIceConnectionState::New => IceConnectionState::New,
        RTCIceConnectionState::Checking => IceConnectionState::Checking,
        RTCIceConnectionState::Connected => IceConnectionState::Connected,
        RTCIceConnectionState::Completed => IceConnectionState::Completed,
        RTCIceConnectionState::Disconnected => IceConnectionState::Disconnected,
        RTCIceConnectionState::Failed => IceConnectionState::Failed,
        RTCIceConnectionState::Closed => IceConnectionState::Closed,
    }
}

pub fn gathering_state(state: RTCIceGathererState) -> IceGatheringState {
    match state {
        RTCIceGathererState::Unspecified | RTCIceGathererState::New => IceGatheringState::New,
        RTCIceGathererState::Gathering => IceGatheringState::Gathering,
        RTCIceGathererState::Complete | RTCIceGathererState::Closed => IceGatheringState::Complete,
    }
}

pub fn gathered_candidate_kind(typ: RTCIceCandidateType) -> CandidateKind {
    match typ {
        RTCIceCandidateType::Host => CandidateKind::Host,
        RTCIceCandidateType::Srflx => CandidateKind::ServerReflexive,
        RTCIceCandidateType::Prflx => CandidateKind::PeerReflexive,
        RTCIceCandidateType::Relay => CandidateKind::Relay,
        RTCIceCandidateType::Unspecified => CandidateKind::Unknown,
    }
}

pub fn stats_candidate_kind(typ: CandidateType) -> CandidateKind {
    match typ {
        CandidateType::Host => CandidateKind::Host,
        CandidateType::ServerReflexive => CandidateKind::ServerReflexive,
        CandidateType::PeerReflexive => CandidateKind::PeerReflexive,
        CandidateType::Relay => CandidateKind::Relay,
        CandidateType::Unspecified => CandidateKind::Unknown,
    }
}

/// Fold one stats report into a [`HealthSample`].
pub fn health_from_report(report: &StatsReport) -> HealthSample {
    let mut sample = HealthSample::default();

    for stat in report.reports.values() {
        match stat {
            StatsReportType::CandidatePair(pair) => match pair.state {
                CandidatePairState::Succeeded => {
                    sample.has_succeeded_pair = true;
                    sample
                        .succeeded_pair_ids
                        .push((pair.local_candidate_id.clone(), pair.remote_candidate_id.clone()));
                    if pair.current_round_trip_time > 0.0 {
                        sample.current_rtt_ms = Some(pair.current_round_trip_time * 1000.0);
                    }
                }
                CandidatePairState::Failed => sample.failed_pairs += 1,
                _ => {}
            },
            StatsReportType::LocalCandidate(c) => {
                sample.local_candidate_kinds.push(stats_candidate_kind(c.candidate_type));
            }
            StatsReportType::RemoteCandidate(c) => {
                sample.remote_candidate_kinds.push(stats_candidate_kind(c.candidate_type));
            }
            StatsReportType::InboundRTP(rtp) => match rtp.kind.as_str() {
                "video" => {
                    sample.video_packets_received += rtp.packets_received;
                    sample.video_bytes_received += rtp.bytes_received;
                }
                "audio" => sample.audio_packets_received += rtp.packets_received,
                _ => {}
            },
            _ => {}
        }
    }

    // HashMap iteration order is arbitrary.
    sample.succeeded_pair_ids.sort();
    sample
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use webrtc::stats::{InboundRTPStats, RTCStatsType};

    #[test]
    fn candidate_types_map_onto_core_kinds() {
        assert_eq!(gathered_candidate_kind(RTCIceCandidateType::Host), CandidateKind::Host);
        assert_eq!(
            gathered_candidate_kind(RTCIceCandidateType::Srflx),
            CandidateKind::ServerReflexive
        );
        assert_eq!(stats_candidate_kind(CandidateType::Relay), CandidateKind::Relay);
        assert_eq!(stats_candidate_kind(CandidateType::Unspecified), CandidateKind::Unknown);
    }

    #[test]
    fn closed_gatherer_counts_as_complete() {
        assert_eq!(gathering_state(RTCIceGathererState::Closed), IceGatheringState::Complete);
        assert_eq!(ice_state(RTCIceConnectionState::Unspecified), IceConnectionState::New);
    }

    fn inbound(id: &str, kind: &str, packets: u64, bytes: u64) -> StatsReportType {
        StatsReportType::InboundRTP(InboundRTPStats {
            timestamp: tokio::time::Instant::now(),
            stats_type: RTCStatsType::InboundRTP,
            id: id.to_string(),
            ssrc: 1234,
            kind: kind.to_string(),
            packets_received: packets,
            track_identifier: format!("{kind}-track"),
            mid: "0".into(),
            last_packet_received_timestamp: None,
            header_bytes_received: 0,
            bytes_received: bytes,
            nack_count: 0,
            fir_count: None,
            pli_count: None,
        })
    }

    #[test]
    fn inbound_rtp_counters_split_by_kind() {
        let mut reports = HashMap::new();
        reports.insert("v".to_string(), inbound("v", "video", 300, 420_000));
        reports.insert("a".to_string(), inbound("a", "audio", 50, 8_000));
        let sample = health_from_report(&StatsReport { reports });

        assert_eq!(sample.video_packets_received, 300);
        assert_eq!(sample.video_bytes_received, 420_000);
        assert_eq!(sample.audio_packets_received, 50);
    }

    #[test]
    fn empty_report_is_empty_sample() {
        let report = StatsReport { reports: HashMap::new() };
        assert_eq!(health_from_report(&report), HealthSample::default());
    }
}
