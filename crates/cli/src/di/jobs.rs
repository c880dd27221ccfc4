use super::DnsServices;
use dnsgate_application::ports::CacheMaintenancePort;
use dnsgate_application::use_cases::RefreshClientTableUseCase;
use dnsgate_domain::Config;
use dnsgate_infrastructure::system::ProcArpReader;
use dnsgate_jobs::{CacheSweepJob, ClientTableRefreshJob, JobRunner};
use std::sync::Arc;

pub fn build_jobs(config: &Config, services: &DnsServices) -> JobRunner {
    let mut runner = JobRunner::new();

    if let Some(cache) = &services.cache {
        let sweep = CacheSweepJob::new(cache.clone() as Arc<dyn CacheMaintenancePort>);
        runner = runner.with_cache_sweep(sweep);
    }

    let refresh = Arc::new(RefreshClientTableUseCase::new(
        Arc::new(ProcArpReader::new()),
        services.client_table.clone(),
    ));
    runner.with_client_table_refresh(
        ClientTableRefreshJob::new(refresh)
            .with_interval(config.service.client_table_refresh_interval),
    )
}
