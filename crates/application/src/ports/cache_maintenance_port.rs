/// Housekeeping hooks the background jobs call on the response cache.
pub trait CacheMaintenancePort: Send + Sync {
    /// Removes entries past their stale-retention window; returns how many.
    fn sweep_expired(&self) -> usize;

    fn cache_size(&self) -> usize;
}
