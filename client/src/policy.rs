use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_DELAY_MS: u64 = 3000;
pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

/// Fixed-delay, bounded retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Automatic retries after a drop or failed dial before giving up
    pub max_attempts: u32,
    /// Delay before every retry, and before the manual reconnect that
    /// follows an administrative drop
    pub delay_ms: u64,
    /// How long to wait for `connect_status` after the transport opens
    pub handshake_timeout_ms: u64,
}

impl ReconnectPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RECONNECT_ATTEMPTS,
            delay_ms: RECONNECT_DELAY_MS,
            handshake_timeout_ms: HANDSHAKE_TIMEOUT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay(), Duration::from_millis(3000));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let policy: ReconnectPolicy = serde_json::from_str(r#"{"max_attempts": 2}"#).unwrap();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.delay_ms, RECONNECT_DELAY_MS);
    }
}
