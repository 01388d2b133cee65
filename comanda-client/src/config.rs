//! Client configuration

use std::time::Duration;

/// Client configuration for connecting to the backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP base URL (e.g. "https://pos.example.com")
    pub base_url: String,

    /// Event channel TCP address (e.g. "pos.example.com:9100")
    pub message_tcp_addr: String,

    /// Client name reported in the channel handshake
    pub client_name: String,

    /// Default command ack timeout
    pub command_timeout: Duration,

    /// HTTP request timeout
    pub http_timeout: Duration,

    /// Delay between disconnect and rejoin during a restaurant switch,
    /// so the server finishes tenant-room teardown before we rejoin
    pub reconnect_grace: Duration,
}

impl ClientConfig {
    /// Create a new configuration with defaults
    pub fn new(base_url: impl Into<String>, tcp_addr: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            message_tcp_addr: tcp_addr.into(),
            client_name: "comanda-client".to_string(),
            command_timeout: Duration::from_secs(20),
            http_timeout: Duration::from_secs(30),
            reconnect_grace: Duration::from_millis(500),
        }
    }

    /// Set the client name
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Set the default command ack timeout
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the HTTP request timeout
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set the restaurant-switch reconnect grace delay
    pub fn with_reconnect_grace(mut self, grace: Duration) -> Self {
        self.reconnect_grace = grace;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080", "localhost:9100")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.command_timeout, Duration::from_secs(20));
        assert_eq!(config.reconnect_grace, Duration::from_millis(500));
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("http://10.0.0.2", "10.0.0.2:9100")
            .with_client_name("handheld-3")
            .with_command_timeout(Duration::from_secs(5));

        assert_eq!(config.client_name, "handheld-3");
        assert_eq!(config.command_timeout, Duration::from_secs(5));
    }
}
