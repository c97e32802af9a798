//! # Broker Configuration
//!
//! One [`BrokerConfig`] value is built at start-up (from a TOML file or from
//! defaults) and handed explicitly to everything that needs it. Every field has
//! a default, so a config file only lists what it changes:
//!
//! ```toml
//! [server]
//! hostname = "0.0.0.0"
//! port = 4224
//! trusted_hosts = ["127.0.0.1", "::1", "10.0.0.5"]
//!
//! [resources]
//! directory = "/etc/resource-broker/resources"
//!
//! [client]
//! client_name = "ci-runner-7"
//!
//! [logging]
//! filter = "resource_broker=debug,broker_core=info"
//! ```

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 4224;
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Errors raised while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub server: ServerConfig,
    pub resources: ResourcesConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

impl BrokerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub hostname: String,
    /// `0` binds an ephemeral port.
    pub port: u16,
    /// Peers allowed to run privileged commands such as `shutdown`.
    pub trusted_hosts: Vec<IpAddr>,
    /// Largest accepted message body in bytes.
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            trusted_hosts: vec![IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V6(Ipv6Addr::LOCALHOST)],
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// IPv4-mapped IPv6 peers (`::ffff:a.b.c.d`, as seen on a dual-stack
    /// listener) are matched as their IPv4 address.
    pub fn is_trusted(&self, peer: IpAddr) -> bool {
        let peer = peer.to_canonical();
        self.trusted_hosts.iter().any(|host| host.to_canonical() == peer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Directory holding one resource definition per file.
    pub directory: PathBuf,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("resources"),
        }
    }
}

/// Where a client connects and the user name it acquires leases under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub hostname: String,
    pub port: u16,
    pub client_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            client_name: std::env::var("USER").unwrap_or_else(|_| "anonymous".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = BrokerConfig::from_toml_str("").unwrap();
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.resources.directory, PathBuf::from("resources"));
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = BrokerConfig::from_toml_str(
            r#"
            [server]
            port = 5000
            trusted_hosts = ["10.0.0.5"]

            [resources]
            directory = "/srv/resources"

            [client]
            client_name = "runner"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.hostname, "127.0.0.1");
        assert_eq!(config.server.max_frame_len, DEFAULT_MAX_FRAME_LEN);
        assert!(config.server.is_trusted("10.0.0.5".parse().unwrap()));
        assert!(!config.server.is_trusted("127.0.0.1".parse().unwrap()));
        assert_eq!(config.resources.directory, PathBuf::from("/srv/resources"));
        assert_eq!(config.client.client_name, "runner");
        assert_eq!(config.client.port, DEFAULT_PORT);
    }

    #[test]
    fn test_default_trusts_loopback_only() {
        let server = ServerConfig::default();
        assert!(server.is_trusted("127.0.0.1".parse().unwrap()));
        assert!(server.is_trusted("::1".parse().unwrap()));
        assert!(!server.is_trusted("192.168.1.4".parse().unwrap()));
        assert_eq!(server.address(), "127.0.0.1:4224");
    }

    #[test]
    fn test_mapped_ipv4_peer_matches_ipv4_entry() {
        let server = ServerConfig::default();
        assert!(server.is_trusted("::ffff:127.0.0.1".parse().unwrap()));
        assert!(!server.is_trusted("::ffff:192.168.1.4".parse().unwrap()));

        let server = ServerConfig {
            trusted_hosts: vec!["::ffff:10.0.0.5".parse().unwrap()],
            ..ServerConfig::default()
        };
        assert!(server.is_trusted("10.0.0.5".parse().unwrap()));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = BrokerConfig::from_toml_str("[server]\nport = \"high\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = BrokerConfig::from_toml_str("[server]\ntrusted_hosts = [\"not-an-ip\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = BrokerConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let path = dir.path().join("broker.toml");
        std::fs::write(&path, "[logging]\nfilter = \"debug\"\n").unwrap();
        assert_eq!(BrokerConfig::load(&path).unwrap().logging.filter, "debug");
    }
}
