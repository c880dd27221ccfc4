//! dnsgate domain layer
pub mod client;
pub mod config;
pub mod dns_name;
pub mod errors;
pub mod request;

pub use client::ClientInfo;
pub use config::{
    CliOverrides, Config, ConfigError, ListenerConfig, LoggingConfig, NetworkConfig,
    PolicyConfig, Rcode, ResolverType, Rule, ServiceConfig, UpstreamConfig,
};
pub use dns_name::canonical_name;
pub use errors::DomainError;
pub use request::{RequestContext, RequestId};
