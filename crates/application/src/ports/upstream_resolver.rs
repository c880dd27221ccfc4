use async_trait::async_trait;
use dnsgate_domain::{DomainError, RequestContext, UpstreamConfig};
use hickory_proto::op::Message;
use std::sync::Arc;

/// Id under which the synthetic OS resolver is cached and logged.
pub const OS_UPSTREAM_ID: &str = "upstream.os";

#[async_trait]
pub trait UpstreamResolver: Send + Sync {
    fn config(&self) -> &UpstreamConfig;

    /// One resolution attempt bounded by the upstream timeout.
    async fn resolve_once(
        &self,
        ctx: &RequestContext,
        query: &Message,
    ) -> Result<Message, DomainError>;

    /// Drops the resolved transport so the next attempt bootstraps again.
    fn re_bootstrap(&self);
}

/// Lookup of configured upstreams by `upstream.<n>` id.
pub trait UpstreamRegistry: Send + Sync {
    fn upstream(&self, id: &str) -> Option<Arc<dyn UpstreamResolver>>;

    fn os_resolver(&self) -> Arc<dyn UpstreamResolver>;
}
