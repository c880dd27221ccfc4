use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::listener::ListenerConfig;
use super::logging::LoggingConfig;
use super::network::NetworkConfig;
use super::service::ServiceConfig;
use super::upstream::UpstreamConfig;

/// Main configuration structure for dnsgate
///
/// Listeners, networks and upstreams are keyed by their number, so
/// `[listener.0]` is referred to as `listener.0` and defaults to
/// `upstream.0`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub network: BTreeMap<String, NetworkConfig>,

    #[serde(default)]
    pub upstream: BTreeMap<String, UpstreamConfig>,

    #[serde(default)]
    pub listener: BTreeMap<String, ListenerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let upstream = UpstreamConfig {
            name: "Cloudflare".to_string(),
            endpoint: "1.1.1.1:53".to_string(),
            ..UpstreamConfig::default()
        };
        Self {
            service: ServiceConfig::default(),
            logging: LoggingConfig::default(),
            network: BTreeMap::new(),
            upstream: BTreeMap::from([("0".to_string(), upstream)]),
            listener: BTreeMap::from([("0".to_string(), ListenerConfig::default())]),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. dnsgate.toml in current directory
    /// 3. /etc/dnsgate/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if Path::new("dnsgate.toml").exists() {
            Self::from_file("dnsgate.toml")?
        } else if Path::new("/etc/dnsgate/config.toml").exists() {
            Self::from_file("/etc/dnsgate/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(ip) = overrides.listen {
            for listener in self.listener.values_mut() {
                listener.ip = ip.clone();
            }
        }
    }

    /// Checks that the typed values can be built; references between
    /// tables are resolved leniently at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listener.is_empty() {
            return Err(ConfigError::Validation("No listeners configured".to_string()));
        }

        for (id, listener) in &self.listener {
            if listener.port == 0 {
                return Err(ConfigError::Validation(format!(
                    "listener.{}: port cannot be 0",
                    id
                )));
            }
        }

        for network in self.network.values() {
            network.ip_nets()?;
        }

        Ok(())
    }

    /// Listener ids sorted numerically where possible.
    pub fn listener_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.listener.keys().map(String::as_str).collect();
        ids.sort_by_key(|id| (id.parse::<u64>().unwrap_or(u64::MAX), id.to_string()));
        ids
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    /// Bind address applied to every listener.
    pub listen: Option<String>,
}
