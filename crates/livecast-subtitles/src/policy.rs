use std::time::Duration;

use livecast_core::ViewerConfig;

/// Exponential reconnect schedule for the caption feed.
///
/// Reconnect `n` (1-based) waits `min(base · 2^(n-1), ceiling)`. There are at
/// most `max_attempts` reconnects; the counter resets whenever a connection
/// opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub ceiling: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            ceiling: Duration::from_secs(10),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            base: Duration::from_millis(config.subtitle_reconnect_base_ms),
            ceiling: Duration::from_millis(config.subtitle_reconnect_ceiling_ms),
            max_attempts: config.subtitle_max_reconnects,
        }
    }

    /// Delay before reconnect `attempt`, or `None` once the budget is spent.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 1u32 << (attempt - 1).min(16);
        Some(self.base.saturating_mul(factor).min(self.ceiling))
    }
}
