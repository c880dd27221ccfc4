#![allow(dead_code)]

use async_trait::async_trait;
use dnsgate_application::dns_message::response_with_rcode;
use dnsgate_application::ports::{
    ArpReader, ArpTable, CacheKey, CacheValue, ClientInfoLookup, ResponseCache, UpstreamRegistry,
    UpstreamResolver,
};
use dnsgate_domain::{ClientInfo, DomainError, RequestContext, UpstreamConfig};
use hickory_proto::op::{Message, ResponseCode};
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::messages::a_answer;

#[derive(Debug, Clone)]
pub enum MockReply {
    Answer(Ipv4Addr, u32),
    Rcode(ResponseCode),
    Fail,
}

/// Upstream that replays scripted replies; once the script runs out the
/// fallback reply is used.
pub struct MockUpstream {
    config: UpstreamConfig,
    script: Mutex<VecDeque<MockReply>>,
    fallback: Mutex<MockReply>,
    calls: AtomicUsize,
    re_bootstraps: AtomicUsize,
    seen_clients: Mutex<Vec<Option<Arc<ClientInfo>>>>,
}

impl MockUpstream {
    pub fn new(name: &str, fallback: MockReply) -> Arc<Self> {
        Arc::new(Self {
            config: UpstreamConfig {
                name: name.to_string(),
                ..UpstreamConfig::default()
            },
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            calls: AtomicUsize::new(0),
            re_bootstraps: AtomicUsize::new(0),
            seen_clients: Mutex::new(Vec::new()),
        })
    }

    pub fn with_client_info(name: &str, fallback: MockReply) -> Arc<Self> {
        Arc::new(Self {
            config: UpstreamConfig {
                name: name.to_string(),
                send_client_info: true,
                ..UpstreamConfig::default()
            },
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            calls: AtomicUsize::new(0),
            re_bootstraps: AtomicUsize::new(0),
            seen_clients: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, reply: MockReply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn set_fallback(&self, reply: MockReply) {
        *self.fallback.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn re_bootstraps(&self) -> usize {
        self.re_bootstraps.load(Ordering::SeqCst)
    }

    pub fn seen_clients(&self) -> Vec<Option<Arc<ClientInfo>>> {
        self.seen_clients.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamResolver for MockUpstream {
    fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    async fn resolve_once(
        &self,
        ctx: &RequestContext,
        query: &Message,
    ) -> Result<Message, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_clients
            .lock()
            .unwrap()
            .push(ctx.client_info.clone());

        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone());

        match reply {
            MockReply::Answer(ip, ttl) => Ok(a_answer(query, ip, ttl)),
            MockReply::Rcode(rcode) => Ok(response_with_rcode(query, rcode)),
            MockReply::Fail => Err(DomainError::TransportTimeout {
                server: self.config.name.clone(),
            }),
        }
    }

    fn re_bootstrap(&self) {
        self.re_bootstraps.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockUpstreamRegistry {
    upstreams: HashMap<String, Arc<MockUpstream>>,
    os: Arc<MockUpstream>,
}

impl MockUpstreamRegistry {
    pub fn new(os: Arc<MockUpstream>) -> Self {
        Self {
            upstreams: HashMap::new(),
            os,
        }
    }

    pub fn with(mut self, id: &str, upstream: Arc<MockUpstream>) -> Self {
        self.upstreams.insert(id.to_string(), upstream);
        self
    }
}

impl UpstreamRegistry for MockUpstreamRegistry {
    fn upstream(&self, id: &str) -> Option<Arc<dyn UpstreamResolver>> {
        self.upstreams
            .get(id)
            .map(|u| Arc::clone(u) as Arc<dyn UpstreamResolver>)
    }

    fn os_resolver(&self) -> Arc<dyn UpstreamResolver> {
        Arc::clone(&self.os) as Arc<dyn UpstreamResolver>
    }
}

#[derive(Default)]
pub struct MockResponseCache {
    entries: Mutex<HashMap<CacheKey, CacheValue>>,
}

impl MockResponseCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn entry(&self, key: &CacheKey) -> Option<CacheValue> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

impl ResponseCache for MockResponseCache {
    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn insert(&self, key: CacheKey, value: CacheValue) {
        self.entries.lock().unwrap().insert(key, value);
    }
}

#[derive(Default)]
pub struct MockClientLookup {
    clients: HashMap<String, ClientInfo>,
}

impl MockClientLookup {
    pub fn with_client(mut self, client: ClientInfo) -> Self {
        self.clients.insert(client.mac.to_string(), client);
        self
    }
}

impl ClientInfoLookup for MockClientLookup {
    fn client_info_by_mac(&self, mac: &str) -> Option<ClientInfo> {
        self.clients.get(mac).cloned()
    }
}

/// ARP reader returning whatever table was last set, or an error.
#[derive(Default)]
pub struct MockArpReader {
    table: Mutex<ArpTable>,
    fail: std::sync::atomic::AtomicBool,
}

impl MockArpReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entries(&self, entries: &[(&str, &str)]) {
        let table = entries
            .iter()
            .map(|(ip, mac)| (ip.parse::<IpAddr>().unwrap(), mac.to_string()))
            .collect();
        *self.table.lock().unwrap() = table;
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArpReader for MockArpReader {
    async fn read_arp_table(&self) -> Result<ArpTable, DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::IoError("arp table unavailable".into()));
        }
        Ok(self.table.lock().unwrap().clone())
    }
}
