use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid DNS message: {0}")]
    InvalidDnsMessage(String),

    #[error("Query timeout after {timeout_ms}ms waiting for {server}")]
    QueryTimeout { server: String, timeout_ms: u64 },

    #[error("Transport timeout connecting to {server}")]
    TransportTimeout { server: String },

    #[error("Transport connection refused by {server}")]
    TransportConnectionRefused { server: String },

    #[error("Transport error talking to {server}: {reason}")]
    Transport { server: String, reason: String },

    #[error("Bootstrap failed for {endpoint}: {reason}")]
    Bootstrap { endpoint: String, reason: String },

    #[error("Invalid upstream {name}: {reason}")]
    InvalidUpstream { name: String, reason: String },

    #[error("Failed to bind listener on {addr}: {reason}")]
    ListenerBind { addr: String, reason: String },

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DomainError {
    pub fn transport(server: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Transport {
            server: server.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::QueryTimeout { .. } | Self::TransportTimeout { .. }
        )
    }
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}
