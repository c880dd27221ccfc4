use crate::dns::transport::{bootstrap, Transport};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use dnsgate_application::ports::{UpstreamRegistry, UpstreamResolver};
use dnsgate_domain::{DomainError, RequestContext, UpstreamConfig};
use hickory_proto::op::Message;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Shared handle for one configured upstream. The transport is built on
/// first use and swapped out atomically on re-bootstrap; in-flight queries
/// keep the transport they started with.
pub struct UpstreamHandle {
    id: String,
    config: UpstreamConfig,
    transport: ArcSwapOption<Transport>,
}

impl UpstreamHandle {
    pub fn new(id: impl Into<String>, config: UpstreamConfig) -> Self {
        Self {
            id: id.into(),
            config,
            transport: ArcSwapOption::empty(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.transport.load().is_some()
    }

    async fn transport(&self) -> Result<Arc<Transport>, DomainError> {
        if let Some(transport) = self.transport.load_full() {
            return Ok(transport);
        }
        let transport = Arc::new(bootstrap::connect(&self.config).await?);
        self.transport.store(Some(Arc::clone(&transport)));
        Ok(transport)
    }

    async fn exchange(
        &self,
        ctx: &RequestContext,
        query_bytes: &[u8],
    ) -> Result<Vec<u8>, DomainError> {
        let transport = self.transport().await?;
        let response = transport
            .send(query_bytes, ctx.client_info.as_deref())
            .await?;
        debug!(
            request_id = %ctx.request_id,
            upstream = %self.id,
            protocol = response.protocol_used,
            response_len = response.bytes.len(),
            "Upstream exchange completed"
        );
        Ok(response.bytes)
    }
}

#[async_trait]
impl UpstreamResolver for UpstreamHandle {
    fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    async fn resolve_once(
        &self,
        ctx: &RequestContext,
        query: &Message,
    ) -> Result<Message, DomainError> {
        let query_bytes = query
            .to_vec()
            .map_err(|e| DomainError::InvalidDnsMessage(e.to_string()))?;

        let response_bytes = match self.config.timeout() {
            Some(deadline) => tokio::time::timeout(deadline, self.exchange(ctx, &query_bytes))
                .await
                .map_err(|_| DomainError::QueryTimeout {
                    server: self.config.name.clone(),
                    timeout_ms: deadline.as_millis() as u64,
                })??,
            None => self.exchange(ctx, &query_bytes).await?,
        };

        Message::from_vec(&response_bytes).map_err(|e| DomainError::InvalidDnsMessage(e.to_string()))
    }

    fn re_bootstrap(&self) {
        if self.transport.swap(None).is_some() {
            debug!(upstream = %self.id, "Upstream transport discarded, will bootstrap again");
        }
    }
}

/// All configured upstreams keyed by `upstream.<n>`, plus the OS resolver
/// used when a query has nowhere else to go.
pub struct UpstreamSet {
    upstreams: FxHashMap<String, Arc<UpstreamHandle>>,
    os: Arc<UpstreamHandle>,
}

impl UpstreamSet {
    pub fn from_config(upstreams: &BTreeMap<String, UpstreamConfig>) -> Self {
        let upstreams = upstreams
            .iter()
            .map(|(n, config)| {
                let id = format!("upstream.{}", n);
                (id.clone(), Arc::new(UpstreamHandle::new(id, config.clone())))
            })
            .collect();
        Self {
            upstreams,
            os: Arc::new(UpstreamHandle::new(
                dnsgate_application::ports::OS_UPSTREAM_ID,
                UpstreamConfig::os_resolver(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }
}

impl UpstreamRegistry for UpstreamSet {
    fn upstream(&self, id: &str) -> Option<Arc<dyn UpstreamResolver>> {
        self.upstreams
            .get(id)
            .map(|u| Arc::clone(u) as Arc<dyn UpstreamResolver>)
    }

    fn os_resolver(&self) -> Arc<dyn UpstreamResolver> {
        Arc::clone(&self.os) as Arc<dyn UpstreamResolver>
    }
}
