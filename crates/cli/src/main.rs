use clap::Parser;
use dnsgate_domain::CliOverrides;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "dnsgate")]
#[command(version)]
#[command(about = "dnsgate - policy-driven local DNS forwarding proxy")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Bind address applied to every listener
    #[arg(short = 'l', long, value_name = "IP")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        log_level: cli.log_level.clone(),
        listen: cli.listen.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config.logging);

    info!("Starting dnsgate v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();

    let dns_services = di::DnsServices::new(&config)?;
    let jobs = di::build_jobs(&config, &dns_services).with_shutdown_token(shutdown.clone());
    let job_handles = jobs.start();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
        signal_token.cancel();
    });

    let result = server::start_dns_server(dns_services.listener_manager, shutdown.clone()).await;

    shutdown.cancel();
    for handle in job_handles {
        let _ = handle.await;
    }

    result?;
    info!("Server shutdown complete");
    Ok(())
}
