mod errors;
mod listener;
mod logging;
mod network;
mod root;
mod service;
mod upstream;

pub use errors::ConfigError;
pub use listener::{ListenerConfig, PolicyConfig, Rcode, Rule};
pub use logging::LoggingConfig;
pub use network::NetworkConfig;
pub use root::{CliOverrides, Config};
pub use service::ServiceConfig;
pub use upstream::{ResolverType, UpstreamConfig};
