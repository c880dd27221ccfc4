use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResolverType {
    /// Plain DNS over UDP, retried over TCP when truncated.
    #[default]
    Legacy,

    Tcp,

    Doh,

    Dot,

    /// The operating system's configured nameservers.
    Os,
}

impl ResolverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Tcp => "tcp",
            Self::Doh => "doh",
            Self::Dot => "dot",
            Self::Os => "os",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub resolver_type: ResolverType,

    #[serde(default)]
    pub endpoint: String,

    /// IP used to reach `endpoint` without asking the system resolver.
    #[serde(default)]
    pub bootstrap_ip: Option<String>,

    /// Milliseconds; zero or negative disables the deadline.
    #[serde(default = "default_timeout")]
    pub timeout: i64,

    #[serde(default)]
    pub send_client_info: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            resolver_type: ResolverType::Legacy,
            endpoint: String::new(),
            bootstrap_ip: None,
            timeout: default_timeout(),
            send_client_info: false,
        }
    }
}

impl UpstreamConfig {
    /// Fallback used when a query has no usable upstream.
    pub fn os_resolver() -> Self {
        Self {
            name: "OS resolver".to_string(),
            resolver_type: ResolverType::Os,
            endpoint: String::new(),
            bootstrap_ip: None,
            timeout: 2000,
            send_client_info: false,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout <= 0 {
            None
        } else {
            Some(Duration::from_millis(self.timeout as u64))
        }
    }
}

fn default_timeout() -> i64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_timeout_means_no_deadline() {
        let mut upstream = UpstreamConfig::default();
        assert_eq!(upstream.timeout(), Some(Duration::from_millis(5000)));
        upstream.timeout = 0;
        assert_eq!(upstream.timeout(), None);
        upstream.timeout = -1;
        assert_eq!(upstream.timeout(), None);
    }

    #[test]
    fn test_os_resolver_defaults() {
        let os = UpstreamConfig::os_resolver();
        assert_eq!(os.resolver_type, ResolverType::Os);
        assert_eq!(os.timeout(), Some(Duration::from_millis(2000)));
    }

    #[test]
    fn test_type_parses_lowercase() {
        let parsed: UpstreamConfig =
            toml::from_str("type = \"doh\"\nendpoint = \"https://dns.example/dns-query\"")
                .unwrap();
        assert_eq!(parsed.resolver_type, ResolverType::Doh);
        assert_eq!(parsed.resolver_type.as_str(), "doh");
    }
}
