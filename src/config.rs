//! Client configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial file (or none
//! at all) works.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ClientError;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default primary (game) channel port.
pub const DEFAULT_GAME_PORT: u16 = 5555;

/// Default chat channel port.
pub const DEFAULT_CHAT_PORT: u16 = 5556;

/// Default connect timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default bounded wait per dispatcher at shutdown (1 second).
pub const DEFAULT_SHUTDOWN_JOIN_TIMEOUT_MS: u64 = 1_000;

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or address
    pub host: String,

    /// Port of the primary (game) channel
    pub game_port: u16,

    /// Port of the chat channel
    pub chat_port: u16,

    /// Connect timeout per channel, milliseconds
    pub connect_timeout_ms: u64,

    /// How long shutdown waits for each dispatcher, milliseconds
    pub shutdown_join_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            game_port: DEFAULT_GAME_PORT,
            chat_port: DEFAULT_CHAT_PORT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            shutdown_join_timeout_ms: DEFAULT_SHUTDOWN_JOIN_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ClientError> {
        serde_json::from_str(json).map_err(|e| ClientError::Config {
            reason: e.to_string(),
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ClientError::Config {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json_str(&json)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn shutdown_join_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_join_timeout_ms)
    }

    pub fn game_addr(&self) -> std::io::Result<SocketAddr> {
        resolve(&self.host, self.game_port)
    }

    pub fn chat_addr(&self) -> std::io::Result<SocketAddr> {
        resolve(&self.host, self.chat_port)
    }
}

fn resolve(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no address for {}:{}", host, port),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.game_port, DEFAULT_GAME_PORT);
        assert_eq!(config.shutdown_join_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json() {
        let config = ClientConfig::from_json_str(r#"{"host": "chess.local", "chat_port": 7000}"#)
            .unwrap();
        assert_eq!(
            config,
            ClientConfig {
                host: "chess.local".to_string(),
                chat_port: 7000,
                ..ClientConfig::default()
            }
        );
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = ClientConfig::from_json_str(r#"{"game_port": "eighty"}"#).unwrap_err();
        assert!(matches!(err, ClientError::Config { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = ClientConfig::from_json_file("/nonexistent/chess-client.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/chess-client.json"));
    }

    #[test]
    fn test_resolve_loopback() {
        let config = ClientConfig::default();
        let addr = config.game_addr().unwrap();
        assert_eq!(addr.port(), DEFAULT_GAME_PORT);
        assert!(addr.ip().is_loopback());
    }
}
