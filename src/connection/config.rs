//! Connection configuration.

use std::time::Duration;

use crate::core::{
    DEFAULT_LOG_FILE_PREFIX, DEFAULT_WIFI_TIMEOUT, HANDSHAKE_TIMEOUT, STATUS_TIMEOUT,
};

/// Tunables for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// How long a first-time pairing waits for the nonce message.
    pub handshake_timeout: Duration,

    /// Deadline applied to status queries by the async client.
    pub status_timeout: Duration,

    /// Connect timeout sent with Wi-Fi connect requests.
    pub wifi_timeout: Duration,

    /// Prefix of downloaded log artifact names.
    pub log_file_prefix: String,

    /// Capacity of the client's frame and command channels.
    pub channel_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: HANDSHAKE_TIMEOUT,
            status_timeout: STATUS_TIMEOUT,
            wifi_timeout: DEFAULT_WIFI_TIMEOUT,
            log_file_prefix: DEFAULT_LOG_FILE_PREFIX.to_string(),
            channel_capacity: 32,
        }
    }
}

/// Builder for [`ConnectionConfig`].
#[derive(Debug, Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nonce-message deadline for first-time pairing.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Set the status query deadline.
    pub fn status_timeout(mut self, timeout: Duration) -> Self {
        self.config.status_timeout = timeout;
        self
    }

    /// Set the Wi-Fi connect timeout sent to the device.
    pub fn wifi_timeout(mut self, timeout: Duration) -> Self {
        self.config.wifi_timeout = timeout;
        self
    }

    /// Set the log artifact name prefix.
    pub fn log_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.log_file_prefix = prefix.into();
        self
    }

    /// Set the client channel capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity.max(1);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.handshake_timeout, Duration::from_secs(3));
        assert_eq!(config.wifi_timeout, Duration::from_secs(15));
        assert_eq!(config.log_file_prefix, "vector-logs");
    }

    #[test]
    fn test_builder() {
        let config = ConnectionConfigBuilder::new()
            .handshake_timeout(Duration::from_millis(500))
            .status_timeout(Duration::from_secs(1))
            .log_file_prefix("robot-logs")
            .channel_capacity(0)
            .build();

        assert_eq!(config.handshake_timeout, Duration::from_millis(500));
        assert_eq!(config.status_timeout, Duration::from_secs(1));
        assert_eq!(config.log_file_prefix, "robot-logs");
        assert_eq!(config.channel_capacity, 1);
    }
}
