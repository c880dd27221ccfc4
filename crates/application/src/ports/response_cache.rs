use compact_str::CompactString;
use dnsgate_domain::canonical_name;
use hickory_proto::op::{Message, Query};
use hickory_proto::rr::{DNSClass, RecordType};
use std::time::Instant;

/// A cached answer is specific to the question and to the upstream that
/// produced it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: CompactString,
    pub record_type: RecordType,
    pub dns_class: DNSClass,
    pub upstream: CompactString,
}

impl CacheKey {
    pub fn new(query: &Query, upstream: &str) -> Self {
        Self {
            name: CompactString::from(canonical_name(&query.name().to_ascii())),
            record_type: query.query_type(),
            dns_class: query.query_class(),
            upstream: CompactString::from(upstream),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CacheValue {
    pub message: Message,
    pub expires_at: Instant,
}

impl CacheValue {
    pub fn new(message: Message, expires_at: Instant) -> Self {
        Self {
            message,
            expires_at,
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

pub trait ResponseCache: Send + Sync {
    /// Returns the entry even when expired, as long as it is still retained.
    fn get(&self, key: &CacheKey) -> Option<CacheValue>;

    fn insert(&self, key: CacheKey, value: CacheValue);
}
