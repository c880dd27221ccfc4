use dnsgate_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(path: Option<&str>, overrides: CliOverrides) -> anyhow::Result<Config> {
    let config = Config::load(path, overrides)?;
    config.validate()?;
    info!(
        listeners = config.listener.len(),
        upstreams = config.upstream.len(),
        networks = config.network.len(),
        "Configuration loaded"
    );
    Ok(config)
}
