//! User-facing strings emitted by the streaming core (notices, stream status
//! line, screen-reader announcements).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ko,
    En,
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ko" | "kr" => Ok(Self::Ko),
            "en" => Ok(Self::En),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

/// Why a connection ended in ICE failure, as inferred from the last stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    NoHostCandidate,
    FailedPairs(u32),
    Unreachable,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    StreamingStart,
    StreamingStop,
    StreamingChecking,
    StreamingConnected,
    StreamingComplete,
    StreamingDisconnected,
    StreamingFailed,
    StreamingActive,
    StreamingInactive,
    AlreadyStreaming,
    NetworkError,
    ConnectionError(String),
    ConnectionFailed(FailureReason),
    SubtitleConnected,
    SubtitleUnavailable,
    Subtitle(String),
    SignalLost,
    SignalRestored,
    TemperatureHigh,
    StorageLow,
}

impl Message {
    pub fn text(&self, lang: Language) -> String {
        match lang {
            Language::Ko => self.ko(),
            Language::En => self.en(),
        }
    }

    fn ko(&self) -> String {
        match self {
            Self::StreamingStart => "스트리밍 연결을 시작합니다".into(),
            Self::StreamingStop => "스트리밍을 즉시 중지합니다".into(),
            Self::StreamingChecking => "스트리밍 연결 중...".into(),
            Self::StreamingConnected => "스트리밍이 성공적으로 연결되었습니다".into(),
            Self::StreamingComplete => "스트리밍 연결 완료".into(),
            Self::StreamingDisconnected => "스트리밍 연결 끊김".into(),
            Self::StreamingFailed => "스트리밍 연결 실패".into(),
            Self::StreamingActive => "스트리밍이 활성화되었습니다".into(),
            Self::StreamingInactive => "스트리밍이 비활성화되었습니다".into(),
            Self::AlreadyStreaming => {
                "이미 스트리밍이 진행 중입니다. 잠시 후 다시 시도해주세요.".into()
            }
            Self::NetworkError => {
                "서버에 연결할 수 없습니다. 네트워크 연결을 확인해주세요.".into()
            }
            Self::ConnectionError(detail) => format!("연결 오류가 발생했습니다: {detail}"),
            Self::ConnectionFailed(reason) => {
                let why = match reason {
                    FailureReason::NoHostCandidate => {
                        "네트워크 인터페이스를 찾을 수 없습니다.".to_string()
                    }
                    FailureReason::FailedPairs(n) => format!(
                        "{n}개의 연결 시도가 실패했습니다. 방화벽이나 NAT 설정을 확인해주세요."
                    ),
                    FailureReason::Unreachable => "서버와 연결할 수 없습니다.".to_string(),
                    FailureReason::Unknown => "연결 상태를 분석할 수 없습니다.".to_string(),
                };
                format!("연결 실패: {why}")
            }
            Self::SubtitleConnected => "자막 서비스가 연결되었습니다".into(),
            Self::SubtitleUnavailable => "자막 서비스에 연결할 수 없습니다".into(),
            Self::Subtitle(text) => format!("자막: {text}"),
            Self::SignalLost => "네트워크 신호가 없습니다".into(),
            Self::SignalRestored => "네트워크 신호가 복구되었습니다".into(),
            Self::TemperatureHigh => "디바이스 온도가 높습니다. 주의하세요".into(),
            Self::StorageLow => "저장 공간이 부족합니다".into(),
        }
    }

    fn en(&self) -> String {
        match self {
            Self::StreamingStart => "Starting streaming connection".into(),
            Self::StreamingStop => "Stopping streaming immediately".into(),
            Self::StreamingChecking => "Checking streaming connection...".into(),
            Self::StreamingConnected => "Streaming connected successfully".into(),
            Self::StreamingComplete => "Streaming connection complete".into(),
            Self::StreamingDisconnected => "Streaming disconnected".into(),
            Self::StreamingFailed => "Streaming connection failed".into(),
            Self::StreamingActive => "Streaming is now active".into(),
            Self::StreamingInactive => "Streaming is now inactive".into(),
            Self::AlreadyStreaming => "Stream already in progress. Please try again later.".into(),
            Self::NetworkError => {
                "Cannot connect to server. Please check your network connection.".into()
            }
            Self::ConnectionError(detail) => format!("A connection error occurred: {detail}"),
            Self::ConnectionFailed(reason) => {
                let why = match reason {
                    FailureReason::NoHostCandidate => "No network interface found.".to_string(),
                    FailureReason::FailedPairs(n) => format!(
                        "{n} connection attempts failed. Check firewall or NAT settings."
                    ),
                    FailureReason::Unreachable => "Cannot reach the server.".to_string(),
                    FailureReason::Unknown => "Unable to analyze the connection.".to_string(),
                };
                format!("Connection failed: {why}")
            }
            Self::SubtitleConnected => "Subtitle service connected".into(),
            Self::SubtitleUnavailable => "Subtitle service unavailable".into(),
            Self::Subtitle(text) => format!("Subtitle: {text}"),
            Self::SignalLost => "Network signal lost".into(),
            Self::SignalRestored => "Network signal restored".into(),
            Self::TemperatureHigh => "Device temperature is high. Please be cautious".into(),
            Self::StorageLow => "Storage space is low".into(),
        }
    }
}
