#![allow(dead_code)]

use async_trait::async_trait;
use dnsgate_application::ports::{ArpReader, ArpTable, CacheMaintenancePort};
use dnsgate_domain::DomainError;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Counts sweeps and pretends each one removed `removed_per_sweep` entries.
pub struct MockCacheMaintenancePort {
    sweep_call_count: AtomicU64,
    removed_per_sweep: usize,
    size: AtomicUsize,
}

impl MockCacheMaintenancePort {
    pub fn new() -> Self {
        Self::with_removed_per_sweep(0)
    }

    pub fn with_removed_per_sweep(removed: usize) -> Self {
        Self {
            sweep_call_count: AtomicU64::new(0),
            removed_per_sweep: removed,
            size: AtomicUsize::new(100),
        }
    }

    pub fn sweep_call_count(&self) -> u64 {
        self.sweep_call_count.load(Ordering::Relaxed)
    }
}

impl CacheMaintenancePort for MockCacheMaintenancePort {
    fn sweep_expired(&self) -> usize {
        self.sweep_call_count.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .size
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
                Some(s.saturating_sub(self.removed_per_sweep))
            });
        self.removed_per_sweep
    }

    fn cache_size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }
}

pub struct MockArpReader {
    table: Mutex<ArpTable>,
    call_count: AtomicU64,
    should_fail: AtomicBool,
}

impl MockArpReader {
    pub fn with_entries(entries: Vec<(&str, &str)>) -> Self {
        let table = entries
            .into_iter()
            .map(|(ip, mac)| (ip.parse().unwrap(), mac.to_string()))
            .collect();
        Self {
            table: Mutex::new(table),
            call_count: AtomicU64::new(0),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl ArpReader for MockArpReader {
    async fn read_arp_table(&self) -> Result<ArpTable, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(DomainError::IoError("mock arp failure".into()));
        }
        Ok(self.table.lock().unwrap().clone())
    }
}
