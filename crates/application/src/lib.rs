//! dnsgate application layer: ports, policy evaluation and the proxy engine.
pub mod dns_message;
pub mod ports;
pub mod services;
pub mod use_cases;
