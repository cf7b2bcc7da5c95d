//! Relay configuration and the shared consumer secret

use std::fmt;
use std::time::Duration;

use subtle::ConstantTimeEq;

/// Default listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:4447";

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen address (host:port)
    pub listen: String,
    /// Capacity of each session's outbound request queue
    pub request_queue_capacity: usize,
    /// Capacity of each tail call's line delivery channel
    pub line_buffer_capacity: usize,
    /// Interval between heartbeats toward each provider
    pub heartbeat_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN_ADDR.into(),
            request_queue_capacity: 64,
            line_buffer_capacity: 256,
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl RelayConfig {
    /// Create config with a custom listen address
    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }
}

/// The shared secret tail clients must present
///
/// Comparison is constant-time; the value never appears in `Debug` output.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret string
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Compare a presented token against the secret in constant time
    pub fn verify(&self, token: &str) -> bool {
        bool::from(self.0.as_bytes().ct_eq(token.as_bytes()))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_verify() {
        let secret = Secret::new("hunter2");
        assert!(secret.verify("hunter2"));
        assert!(!secret.verify("hunter3"));
        assert!(!secret.verify(""));
        assert!(!secret.verify("hunter22"));
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret(****)");
    }

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.listen, DEFAULT_LISTEN_ADDR);
        assert!(config.request_queue_capacity > 0);
        assert!(config.line_buffer_capacity > 0);
    }
}
