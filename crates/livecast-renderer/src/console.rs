use std::collections::VecDeque;

use parking_lot::Mutex;

/// Maximum number of lines kept in the developer console.
pub const CONSOLE_CAPACITY: usize = 300;

/// Developer-facing stream console: a bounded, timestamped log of every
/// state transition, mirrored to `tracing`.
#[derive(Debug, Default)]
pub struct ConsoleLog {
    lines: Mutex<VecDeque<String>>,
}

impl ConsoleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `[HH:MM:SS] line`, evicting the oldest entry when full.
    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!("[console] {}", line);
        let stamped = format!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), line);
        let mut lines = self.lines.lock();
        if lines.len() >= CONSOLE_CAPACITY {
            lines.pop_front();
        }
        lines.push_back(stamped);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// True if any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|l| l.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_past_capacity() {
        let console = ConsoleLog::new();
        for i in 0..(CONSOLE_CAPACITY + 5) {
            console.push(format!("line {i}"));
        }
        let lines = console.lines();
        assert_eq!(lines.len(), CONSOLE_CAPACITY);
        assert!(lines[0].ends_with("line 5"));
        assert!(lines[0].starts_with('['));
        assert!(console.contains(&format!("line {}", CONSOLE_CAPACITY + 4)));
    }
}
