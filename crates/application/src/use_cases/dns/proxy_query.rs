use crate::dns_message::{
    mac_from_message, reply_to, servfail, set_cached_answer_ttl, ttl_from_message, STALE_TTL,
};
use crate::ports::{
    CacheKey, CacheValue, ClientInfoLookup, ResponseCache, UpstreamRegistry, UpstreamResolver,
    OS_UPSTREAM_ID,
};
use dnsgate_domain::{ClientInfo, RequestContext};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RecordType;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyOptions {
    pub serve_stale: bool,
    /// Fixed cache lifetime in seconds; 0 keeps the upstream TTL.
    pub ttl_override: u32,
}

/// Forwards a query to an ordered list of upstreams, consulting and
/// filling the response cache on the way.
pub struct ProxyQueryUseCase {
    upstreams: Arc<dyn UpstreamRegistry>,
    cache: Option<Arc<dyn ResponseCache>>,
    clients: Option<Arc<dyn ClientInfoLookup>>,
    options: ProxyOptions,
}

type Candidate = (String, Arc<dyn UpstreamResolver>);

enum CacheLookup {
    Fresh(Message),
    Stale(Message),
    Miss,
}

impl ProxyQueryUseCase {
    pub fn new(upstreams: Arc<dyn UpstreamRegistry>, options: ProxyOptions) -> Self {
        Self {
            upstreams,
            cache: None,
            clients: None,
            options,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_client_lookup(mut self, clients: Arc<dyn ClientInfoLookup>) -> Self {
        self.clients = Some(clients);
        self
    }

    /// Always produces a response; SERVFAIL when every upstream failed.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        upstream_ids: &[String],
        failover_rcodes: &[u16],
        query: &Message,
    ) -> Message {
        let candidates = self.candidates(upstream_ids);
        // Inverse queries are never cached (RFC 1035 7.4).
        let cacheable = self.cache.is_some()
            && query
                .queries()
                .first()
                .is_some_and(|q| q.query_type() != RecordType::PTR);

        let mut stale_answer = None;
        if cacheable {
            match self.lookup_cache(ctx, &candidates, query) {
                CacheLookup::Fresh(answer) => return answer,
                CacheLookup::Stale(answer) => stale_answer = Some(answer),
                CacheLookup::Miss => {}
            }
        }
        let serve_stale = self.cache.is_some() && self.options.serve_stale;

        for (id, upstream) in &candidates {
            let Some(mut answer) = self.resolve(ctx, id, upstream.as_ref(), query).await else {
                if serve_stale {
                    if let Some(mut stale) = stale_answer.take() {
                        debug!(request_id = %ctx.request_id, "serving stale cached response");
                        let now = Instant::now();
                        set_cached_answer_ttl(&mut stale, now, now + STALE_TTL);
                        return stale;
                    }
                }
                continue;
            };

            let rcode = answer.response_code();
            if rcode != ResponseCode::NoError
                && candidates.len() > 1
                && failover_rcodes.contains(&u16::from(rcode))
            {
                debug!(
                    request_id = %ctx.request_id,
                    upstream = %id,
                    rcode = %rcode,
                    "failover rcode matched, process to next upstream"
                );
                continue;
            }

            if cacheable {
                self.store(ctx, id, query, &mut answer);
            }
            return answer;
        }

        error!(request_id = %ctx.request_id, "all upstreams failed");
        servfail(query)
    }

    /// Configured upstreams in order, unknown ids skipped. Falls back to
    /// the OS resolver when nothing is left.
    fn candidates(&self, upstream_ids: &[String]) -> Vec<Candidate> {
        let candidates: Vec<Candidate> = upstream_ids
            .iter()
            .filter_map(|id| self.upstreams.upstream(id).map(|u| (id.clone(), u)))
            .collect();
        if candidates.is_empty() {
            return vec![(OS_UPSTREAM_ID.to_string(), self.upstreams.os_resolver())];
        }
        candidates
    }

    fn lookup_cache(
        &self,
        ctx: &RequestContext,
        candidates: &[Candidate],
        query: &Message,
    ) -> CacheLookup {
        let (Some(cache), Some(question)) = (self.cache.as_ref(), query.queries().first()) else {
            return CacheLookup::Miss;
        };

        let mut stale = None;
        for (id, _) in candidates {
            let Some(cached) = cache.get(&CacheKey::new(question, id)) else {
                continue;
            };
            let mut answer = reply_to(&cached.message, query);
            let now = Instant::now();
            if cached.is_fresh(now) {
                debug!(request_id = %ctx.request_id, upstream = %id, "hit cached response");
                set_cached_answer_ttl(&mut answer, now, cached.expires_at);
                return CacheLookup::Fresh(answer);
            }
            stale = Some(answer);
        }
        stale.map_or(CacheLookup::Miss, CacheLookup::Stale)
    }

    /// One attempt, then a re-bootstrap and a second attempt. `None` means
    /// the upstream is abandoned for this query.
    async fn resolve(
        &self,
        ctx: &RequestContext,
        id: &str,
        upstream: &dyn UpstreamResolver,
        query: &Message,
    ) -> Option<Message> {
        let config = upstream.config();
        let mut ctx = ctx.clone();
        if config.send_client_info {
            if let Some(client) = self.client_info(query) {
                debug!(request_id = %ctx.request_id, "including client info with the request");
                ctx = ctx.with_client_info(Arc::new(client));
            }
        }

        debug!(
            request_id = %ctx.request_id,
            "sending query to {}: {}",
            id,
            config.name
        );
        let first = match upstream.resolve_once(&ctx, query).await {
            Ok(answer) => return Some(answer),
            Err(e) => e,
        };
        debug!(
            request_id = %ctx.request_id,
            upstream = %id,
            error = %first,
            "could not resolve query on first attempt, retrying..."
        );

        upstream.re_bootstrap();
        match upstream.resolve_once(&ctx, query).await {
            Ok(answer) => Some(answer),
            Err(e) => {
                error!(
                    request_id = %ctx.request_id,
                    upstream = %id,
                    error = %e,
                    "failed to resolve query"
                );
                None
            }
        }
    }

    fn client_info(&self, query: &Message) -> Option<ClientInfo> {
        let clients = self.clients.as_ref()?;
        let mac = mac_from_message(query)?;
        clients.client_info_by_mac(&mac)
    }

    fn store(&self, ctx: &RequestContext, id: &str, query: &Message, answer: &mut Message) {
        let (Some(cache), Some(question)) = (self.cache.as_ref(), query.queries().first()) else {
            return;
        };

        let now = Instant::now();
        let ttl = match self.options.ttl_override {
            0 => ttl_from_message(answer),
            fixed => fixed,
        };
        let expires_at = now + Duration::from_secs(u64::from(ttl));
        set_cached_answer_ttl(answer, now, expires_at);
        cache.insert(
            CacheKey::new(question, id),
            CacheValue::new(answer.clone(), expires_at),
        );
        debug!(request_id = %ctx.request_id, upstream = %id, ttl, "add cached response");
    }
}
