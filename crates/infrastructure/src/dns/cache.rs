//! Response cache shared by all listeners.
//!
//! Entries are keyed per upstream and kept past their expiry for the
//! stale-retention window so they can be served when upstreams fail.

use dashmap::DashMap;
use dnsgate_application::ports::{CacheKey, CacheMaintenancePort, CacheValue, ResponseCache};
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct DnsCacheConfig {
    pub max_entries: usize,
    pub stale_retention: Duration,
}

impl Default for DnsCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 4096,
            stale_retention: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub stale_hits: AtomicU64,
    pub misses: AtomicU64,
    pub insertions: AtomicU64,
    pub evictions: AtomicU64,
}

pub struct DnsCache {
    entries: DashMap<CacheKey, CacheValue, FxBuildHasher>,
    config: DnsCacheConfig,
    metrics: CacheMetrics,
}

impl DnsCache {
    pub fn new(config: DnsCacheConfig) -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher),
            config,
            metrics: CacheMetrics::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    fn is_retained(&self, value: &CacheValue, now: Instant) -> bool {
        value.expires_at + self.config.stale_retention > now
    }

    /// Makes room for one more entry: expired entries first, then the one
    /// closest to expiry.
    fn evict_for_insert(&self) {
        if self.entries.len() < self.config.max_entries {
            return;
        }
        if self.sweep_expired() > 0 && self.entries.len() < self.config.max_entries {
            return;
        }
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            self.metrics.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl ResponseCache for DnsCache {
    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let now = Instant::now();
        let value = match self.entries.get(key) {
            Some(entry) => entry.value().clone(),
            None => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if !self.is_retained(&value, now) {
            self.entries.remove_if(key, |_, v| !self.is_retained(v, now));
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        if value.is_fresh(now) {
            self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.stale_hits.fetch_add(1, Ordering::Relaxed);
        }
        Some(value)
    }

    fn insert(&self, key: CacheKey, value: CacheValue) {
        if self.config.max_entries == 0 {
            return;
        }
        if !self.entries.contains_key(&key) {
            self.evict_for_insert();
        }
        self.entries.insert(key, value);
        self.metrics.insertions.fetch_add(1, Ordering::Relaxed);
    }
}

impl CacheMaintenancePort for DnsCache {
    fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, value| self.is_retained(value, now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.metrics
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, remaining = self.entries.len(), "Expired cache entries swept");
        }
        removed
    }

    fn cache_size(&self) -> usize {
        self.entries.len()
    }
}
