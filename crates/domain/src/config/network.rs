use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use super::errors::ConfigError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub cidrs: Vec<String>,
}

impl NetworkConfig {
    /// Parses the configured CIDRs, preserving their order.
    pub fn ip_nets(&self) -> Result<Vec<IpNetwork>, ConfigError> {
        self.cidrs
            .iter()
            .map(|cidr| {
                cidr.trim().parse::<IpNetwork>().map_err(|e| {
                    ConfigError::Validation(format!(
                        "network '{}': invalid CIDR '{}': {}",
                        self.name, cidr, e
                    ))
                })
            })
            .collect()
    }
}
