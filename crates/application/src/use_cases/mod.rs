pub mod clients;
pub mod dns;

pub use clients::RefreshClientTableUseCase;
pub use dns::{HandleDnsQueryUseCase, ProxyOptions, ProxyQueryUseCase};
