use crate::dns_message::refused;
use crate::services::PolicyMatcher;
use crate::use_cases::dns::ProxyQueryUseCase;
use dnsgate_domain::{canonical_name, ListenerConfig, RequestContext};
use hickory_proto::op::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Per-listener query handling: policy decision, then either a REFUSED
/// reply or a proxied answer.
pub struct HandleDnsQueryUseCase {
    matcher: Arc<PolicyMatcher>,
    proxy: Arc<ProxyQueryUseCase>,
}

impl HandleDnsQueryUseCase {
    pub fn new(matcher: Arc<PolicyMatcher>, proxy: Arc<ProxyQueryUseCase>) -> Self {
        Self { matcher, proxy }
    }

    pub async fn execute(
        &self,
        ctx: &RequestContext,
        listener_id: &str,
        listener: &ListenerConfig,
        source: SocketAddr,
        query: &Message,
    ) -> Message {
        let domain = query
            .queries()
            .first()
            .map(|q| canonical_name(&q.name().to_ascii()))
            .unwrap_or_default();

        let outcome = self
            .matcher
            .upstream_for(ctx, listener_id, listener, Some(source), &domain);

        if !outcome.matched && listener.restricted {
            debug!(request_id = %ctx.request_id, domain = %domain, "refusing query on restricted listener");
            return refused(query);
        }

        let failover_rcodes = listener
            .policy
            .as_ref()
            .map(|p| p.failover_codes())
            .unwrap_or_default();

        self.proxy
            .execute(ctx, &outcome.upstreams, &failover_rcodes, query)
            .await
    }
}
