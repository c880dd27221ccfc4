pub mod cache;
pub mod server;
pub mod transport;
pub mod upstream;

pub use cache::{CacheMetrics, DnsCache, DnsCacheConfig};
pub use server::{DnsServerHandler, ListenerBinding, ListenerManager, RequestIdGenerator};
pub use upstream::{UpstreamHandle, UpstreamSet};
