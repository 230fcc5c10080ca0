//! Caption frames pushed by the server over `/ws`.
//!
//! Wire shape: `{text, emoji, lang_code, timestamp, is_final, speaker}`.
//! The server also sends `emotion` and `language`, which are kept when
//! present. `timestamp` arrives either as seconds or as an `HH:MM:SS` label.

use serde::{Deserialize, Deserializer};

pub const DEFAULT_EMOJI: &str = "🙂";
pub const DEFAULT_LANG_CODE: &str = "KR";
pub const DEFAULT_TIMESTAMP: &str = "00:00:00";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptionEvent {
    pub text: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub emoji: Option<String>,
    #[serde(default, rename = "lang_code", deserialize_with = "empty_as_none")]
    pub lang_code: Option<String>,
    #[serde(default, rename = "timestamp", deserialize_with = "timestamp_seconds")]
    pub timestamp_seconds: Option<f64>,
    #[serde(default)]
    pub is_final: bool,
    /// `0` on the wire means the speaker has not been identified yet.
    #[serde(default, rename = "speaker", deserialize_with = "speaker_id")]
    pub speaker_id: Option<u32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub emotion: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub language: Option<String>,
}

impl CaptionEvent {
    /// Parse one WebSocket text frame.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Captions with blank text are never shown.
    pub fn is_displayable(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn emoji_or_default(&self) -> &str {
        self.emoji.as_deref().unwrap_or(DEFAULT_EMOJI)
    }

    pub fn lang_code_or_default(&self) -> &str {
        self.lang_code.as_deref().unwrap_or(DEFAULT_LANG_CODE)
    }

    pub fn timestamp_label(&self) -> String {
        match self.timestamp_seconds {
            Some(secs) if secs.is_finite() && secs >= 0.0 => {
                let total = secs.floor() as u64;
                format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
            }
            _ => DEFAULT_TIMESTAMP.to_string(),
        }
    }

    pub fn speaker_label(&self) -> String {
        match self.speaker_id {
            Some(id) => format!("Speaker {id}"),
            None => "Detecting...".to_string(),
        }
    }
}

fn empty_as_none<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(de)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn speaker_id<'de, D>(de: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<u32>::deserialize(de)?;
    Ok(value.filter(|id| *id != 0))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(f64),
    Label(String),
}

fn timestamp_seconds<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawTimestamp>::deserialize(de)? {
        Some(RawTimestamp::Seconds(secs)) => Some(secs),
        Some(RawTimestamp::Label(label)) => parse_clock_label(&label),
        None => None,
    })
}

/// `HH:MM:SS`, `MM:SS` or plain seconds. Anything else is treated as absent.
fn parse_clock_label(label: &str) -> Option<f64> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    let mut total = 0.0;
    for part in label.split(':') {
        let value: f64 = part.trim().parse().ok()?;
        total = total * 60.0 + value;
    }
    Some(total)
}
