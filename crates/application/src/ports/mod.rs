mod arp_reader;
mod cache_maintenance_port;
mod client_info_lookup;
mod listen_address;
mod response_cache;
mod upstream_resolver;

pub use arp_reader::{ArpReader, ArpTable};
pub use cache_maintenance_port::CacheMaintenancePort;
pub use client_info_lookup::ClientInfoLookup;
pub use listen_address::ListenAddressProvider;
pub use response_cache::{CacheKey, CacheValue, ResponseCache};
pub use upstream_resolver::{UpstreamRegistry, UpstreamResolver, OS_UPSTREAM_ID};
