use dnsgate_application::ports::ResponseCache;
use dnsgate_application::services::{ClientTable, PolicyMatcher};
use dnsgate_application::use_cases::{HandleDnsQueryUseCase, ProxyOptions, ProxyQueryUseCase};
use dnsgate_domain::Config;
use dnsgate_infrastructure::dns::{
    DnsCache, DnsCacheConfig, DnsServerHandler, ListenerManager, RequestIdGenerator, UpstreamSet,
};
use dnsgate_infrastructure::system::StaticListenAddress;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct DnsServices {
    pub cache: Option<Arc<DnsCache>>,
    pub client_table: Arc<ClientTable>,
    pub listener_manager: ListenerManager,
}

impl DnsServices {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let upstreams = Arc::new(UpstreamSet::from_config(&config.upstream));
        info!(upstreams = upstreams.len(), "Upstreams configured");

        let client_table = Arc::new(ClientTable::new());
        let cache = Self::build_cache(config);

        let mut proxy = ProxyQueryUseCase::new(
            upstreams,
            ProxyOptions {
                serve_stale: config.service.cache_serve_stale,
                ttl_override: config.service.cache_ttl_override,
            },
        )
        .with_client_lookup(client_table.clone());
        if let Some(cache) = &cache {
            proxy = proxy.with_cache(cache.clone() as Arc<dyn ResponseCache>);
        }

        let matcher = Arc::new(PolicyMatcher::new(&config.network)?);
        let use_case = Arc::new(HandleDnsQueryUseCase::new(matcher, Arc::new(proxy)));
        let handler = Arc::new(DnsServerHandler::new(
            use_case,
            Arc::new(RequestIdGenerator::new()),
        ));

        let listener_manager = ListenerManager::new(config, handler)
            .with_listen_address(Arc::new(StaticListenAddress::from_env()));

        Ok(Self {
            cache,
            client_table,
            listener_manager,
        })
    }

    fn build_cache(config: &Config) -> Option<Arc<DnsCache>> {
        if !config.service.cache_enable {
            info!("Response cache disabled");
            return None;
        }
        info!(
            max_entries = config.service.cache_size,
            serve_stale = config.service.cache_serve_stale,
            ttl_override = config.service.cache_ttl_override,
            "Response cache enabled"
        );
        Some(Arc::new(DnsCache::new(DnsCacheConfig {
            max_entries: config.service.cache_size,
            stale_retention: Duration::from_secs(config.service.cache_stale_retention),
        })))
    }
}
