use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub cache_enable: bool,

    /// Maximum number of cached responses.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Fixed cache lifetime in seconds; 0 keeps the upstream TTL.
    #[serde(default)]
    pub cache_ttl_override: u32,

    #[serde(default)]
    pub cache_serve_stale: bool,

    /// Seconds an expired entry stays around for stale serving.
    #[serde(default = "default_cache_stale_retention")]
    pub cache_stale_retention: u64,

    #[serde(default = "default_client_table_refresh_interval")]
    pub client_table_refresh_interval: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_enable: false,
            cache_size: default_cache_size(),
            cache_ttl_override: 0,
            cache_serve_stale: false,
            cache_stale_retention: default_cache_stale_retention(),
            client_table_refresh_interval: default_client_table_refresh_interval(),
        }
    }
}

fn default_cache_size() -> usize {
    4096
}

fn default_cache_stale_retention() -> u64 {
    300
}

fn default_client_table_refresh_interval() -> u64 {
    60
}
