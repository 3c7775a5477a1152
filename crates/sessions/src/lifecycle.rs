//! Idle expiry for transport sessions.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Decides when a session has been quiet long enough to be closed.
#[derive(Debug, Clone, Copy)]
pub struct IdlePolicy {
    max_idle: Option<Duration>,
}

impl IdlePolicy {
    /// `0` disables expiry.
    pub fn from_secs(secs: u64) -> Self {
        Self {
            max_idle: (secs > 0).then(|| Duration::from_secs(secs)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_idle.is_some()
    }

    pub fn is_expired(&self, last_seen: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let Some(max_idle) = self.max_idle else {
            return false;
        };
        match now.signed_duration_since(last_seen).to_std() {
            Ok(elapsed) => elapsed >= max_idle,
            // last_seen in the future (clock skew): not idle.
            Err(_) => false,
        }
    }

    /// How often the sweeper should run: a quarter of the idle limit,
    /// clamped to 5s..=60s.
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.max_idle
            .map(|d| (d / 4).clamp(Duration::from_secs(5), Duration::from_secs(60)))
    }
}
