//! Rate limiting for high-frequency cue triggers

use std::time::{Duration, Instant};

/// Lets a trigger through only if more than `interval` has passed since the
/// last one that got through; everything in between is dropped.
#[derive(Debug, Clone)]
pub struct TypingThrottle {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl TypingThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    pub fn from_millis(interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(interval_ms))
    }

    /// Whether a trigger at `now` fires; records it if so
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_fired {
            if now.saturating_duration_since(last) <= self.interval {
                return false;
            }
        }
        self.last_fired = Some(now);
        true
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Forget the last trigger
    pub fn reset(&mut self) {
        self.last_fired = None;
    }
}
