use std::time::Duration;

/// Default time allowed for the TCP connect.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time to wait for the console's first frame.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default spacing between heartbeat requests.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default silence after which a session is considered stale.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(90);

/// Connection tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    /// Fail `connect` unless the console answers the first heartbeat.
    pub require_initial_response: bool,
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect attempt; doubled on each retry.
    pub reconnect_backoff: Duration,
    pub max_reconnect_backoff: Duration,
    /// Capacity of the queue between the read loop and the dispatcher.
    pub dispatch_capacity: usize,
    /// Frame payload limit applied to inbound frames.
    pub max_payload_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            require_initial_response: true,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            max_reconnect_attempts: 5,
            reconnect_backoff: Duration::from_secs(1),
            max_reconnect_backoff: Duration::from_secs(30),
            dispatch_capacity: 256,
            max_payload_size: airtouch_frame::DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl ConnectionConfig {
    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.reconnect_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_reconnect_backoff)
    }
}
