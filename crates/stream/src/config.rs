use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the auth credential is carried on the wire.
///
/// The backend accepts a Bearer header everywhere; the query form exists for
/// transports that cannot attach request headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPlacement {
    #[default]
    Header,
    Query,
}

/// Retry behavior after transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// First backoff delay, doubled on each consecutive failure.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Ceiling for the backoff delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Consecutive failures tolerated since the last successful open before
    /// the channel goes terminal.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReconnectPolicy {
    /// Backoff before the retry following failure number `attempt`:
    /// `min(base * 2^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let millis = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }
}

/// Everything a [`StreamChannel`](crate::StreamChannel) needs to open its
/// connection. All inputs are explicit constructor parameters; nothing is
/// read from ambient state.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Full URL of the backend stream endpoint.
    pub endpoint: String,
    /// Opaque credential attached at open time. Must be non-empty.
    pub auth_token: String,
    /// Event names this channel dispatches; all others are ignored.
    pub recognized_events: Vec<String>,
    pub token_placement: TokenPlacement,
    pub reconnect: ReconnectPolicy,
}

impl ChannelConfig {
    pub fn new(
        endpoint: impl Into<String>,
        auth_token: impl Into<String>,
        recognized_events: &[&str],
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth_token: auth_token.into(),
            recognized_events: recognized_events.iter().map(|s| (*s).to_string()).collect(),
            token_placement: TokenPlacement::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn with_token_placement(mut self, placement: TokenPlacement) -> Self {
        self.token_placement = placement;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_one_second() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4_000));
    }

    #[test]
    fn backoff_caps_at_thirty_seconds() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(5), Duration::from_millis(30_000));
        assert_eq!(policy.delay_for(20), Duration::from_millis(30_000));
        // Shift widths past the integer size must not wrap around.
        assert_eq!(policy.delay_for(70), Duration::from_millis(30_000));
    }

    #[test]
    fn default_policy_matches_contract() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.base_delay_ms, 1_000);
        assert_eq!(policy.max_delay_ms, 30_000);
        assert_eq!(policy.max_attempts, 3);
    }
}
