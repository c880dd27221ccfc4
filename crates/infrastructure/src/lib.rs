//! dnsgate infrastructure: response cache, upstream transports, DNS
//! listeners and platform collaborators.
pub mod dns;
pub mod system;
