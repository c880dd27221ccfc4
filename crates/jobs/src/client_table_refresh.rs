use dnsgate_application::use_cases::RefreshClientTableUseCase;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// Keeps the MAC-keyed client table in step with the neighbour table.
pub struct ClientTableRefreshJob {
    refresh: Arc<RefreshClientTableUseCase>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl ClientTableRefreshJob {
    pub fn new(refresh: Arc<RefreshClientTableUseCase>) -> Self {
        Self {
            refresh,
            interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, secs: u64) -> Self {
        self.interval_secs = secs.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Refreshes immediately, then on every interval tick.
    pub async fn start(self: Arc<Self>) {
        info!(interval_secs = self.interval_secs, "Starting client table refresh job");

        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("ClientTableRefreshJob: shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.refresh.execute().await {
                        error!(error = %e, "Client table refresh failed");
                    }
                }
            }
        }
    }
}
