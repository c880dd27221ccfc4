use dnsgate_infrastructure::dns::ListenerManager;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn start_dns_server(
    manager: ListenerManager,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let bound = manager.bind()?;
    info!(
        sockets = bound.len(),
        addresses = ?bound.local_addrs(),
        "DNS server ready"
    );
    manager.serve(bound, shutdown).await?;
    Ok(())
}
