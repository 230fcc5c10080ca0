//! Server device status (`GET /status`) and its display classification.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::messages::Message;

pub const UNAVAILABLE: &str = "N/A";

/// Free-form display strings reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub battery: String,
    pub signal: String,
    pub temperature: String,
    pub storage: String,
}

impl SystemStatus {
    /// Shown when the status endpoint cannot be reached.
    pub fn unavailable() -> Self {
        Self {
            battery: UNAVAILABLE.into(),
            signal: UNAVAILABLE.into(),
            temperature: UNAVAILABLE.into(),
            storage: UNAVAILABLE.into(),
        }
    }
}

// MARK: - StatusLevel

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Good,
    Warning,
    Error,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    Battery,
    Signal,
    Temperature,
    Storage,
}

fn temperature_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*°c").expect("static regex"))
}

fn storage_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*([gtmk]?b)?\s*free").expect("static regex")
    })
}

/// Degrees Celsius from strings such as `"45°C"`.
pub fn parse_temperature_c(value: &str) -> Option<u32> {
    temperature_re()
        .captures(value)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Free space in GB from strings such as `"15GB Free"` or `"800 MB free"`.
pub fn parse_free_gb(value: &str) -> Option<f64> {
    let caps = storage_re().captures(value)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps
        .get(2)
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_else(|| "gb".into());
    Some(match unit.chars().next() {
        Some('t') => amount * 1024.0,
        Some('m') => amount / 1024.0,
        Some('k') => amount / (1024.0 * 1024.0),
        _ => amount,
    })
}

fn signal_is_lost(value: &str) -> bool {
    let v = value.to_lowercase();
    v.contains("없음") || v.contains("n/a") || v.contains("none") || v.contains("no signal")
}

/// Visual level for one status card.
pub fn classify(field: StatusField, value: &str) -> StatusLevel {
    let v = value.to_lowercase();
    match field {
        StatusField::Battery => {
            if v.contains("충전") || v.contains("charging") {
                StatusLevel::Good
            } else if v.contains("낮음") || v.contains("low") {
                StatusLevel::Warning
            } else {
                StatusLevel::Neutral
            }
        }
        StatusField::Signal => {
            if ["강함", "strong", "good", "excellent"].iter().any(|k| v.contains(k)) {
                StatusLevel::Good
            } else if ["약함", "weak", "poor"].iter().any(|k| v.contains(k)) {
                StatusLevel::Warning
            } else if signal_is_lost(&v) {
                StatusLevel::Error
            } else {
                StatusLevel::Neutral
            }
        }
        StatusField::Temperature => match parse_temperature_c(value) {
            Some(t) if t < 60 => StatusLevel::Good,
            Some(t) if t < 75 => StatusLevel::Warning,
            Some(_) => StatusLevel::Error,
            None => StatusLevel::Neutral,
        },
        StatusField::Storage => match parse_free_gb(value) {
            Some(gb) if gb > 10.0 => StatusLevel::Good,
            Some(gb) if gb > 5.0 => StatusLevel::Warning,
            Some(_) => StatusLevel::Error,
            None => StatusLevel::Neutral,
        },
    }
}

// MARK: - Change announcements

/// Status transitions worth an accessibility announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAlert {
    SignalLost,
    SignalRestored,
    TemperatureHigh,
    StorageLow,
}

impl StatusAlert {
    pub fn message(&self) -> Message {
        match self {
            Self::SignalLost => Message::SignalLost,
            Self::SignalRestored => Message::SignalRestored,
            Self::TemperatureHigh => Message::TemperatureHigh,
            Self::StorageLow => Message::StorageLow,
        }
    }
}

const HOT_THRESHOLD_C: u32 = 75;
const LOW_STORAGE_GB: f64 = 5.0;

/// Compare a fresh status against the last one and report threshold crossings.
pub fn detect_alerts(previous: Option<&SystemStatus>, current: &SystemStatus) -> Vec<StatusAlert> {
    let mut alerts = Vec::new();

    let prev_signal = previous.map(|p| p.signal.as_str()).filter(|s| !s.is_empty());
    if !current.signal.is_empty() && prev_signal != Some(current.signal.as_str()) {
        if signal_is_lost(&current.signal) {
            alerts.push(StatusAlert::SignalLost);
        } else if prev_signal.map_or(false, signal_is_lost) {
            alerts.push(StatusAlert::SignalRestored);
        }
    }

    if previous.map(|p| p.temperature.as_str()) != Some(current.temperature.as_str()) {
        if let Some(t) = parse_temperature_c(&current.temperature) {
            let was_hot = previous
                .and_then(|p| parse_temperature_c(&p.temperature))
                .map_or(false, |prev| prev >= HOT_THRESHOLD_C);
            if t >= HOT_THRESHOLD_C && !was_hot {
                alerts.push(StatusAlert::TemperatureHigh);
            }
        }
    }

    if previous.map(|p| p.storage.as_str()) != Some(current.storage.as_str()) {
        if let Some(gb) = parse_free_gb(&current.storage) {
            let was_low = previous
                .and_then(|p| parse_free_gb(&p.storage))
                .map_or(false, |prev| prev < LOW_STORAGE_GB);
            if gb < LOW_STORAGE_GB && !was_low {
                alerts.push(StatusAlert::StorageLow);
            }
        }
    }

    alerts
}
