mod handle_dns_query;
mod proxy_query;

pub use handle_dns_query::HandleDnsQueryUseCase;
pub use proxy_query::{ProxyOptions, ProxyQueryUseCase};
