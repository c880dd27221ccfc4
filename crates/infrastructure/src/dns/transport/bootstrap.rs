//! Turns an upstream configuration into a ready-to-use transport,
//! resolving the endpoint host along the way.

use super::https::HttpsTransport;
use super::os::OsTransport;
use super::tcp::TcpTransport;
use super::tls::TlsTransport;
use super::udp::UdpTransport;
use super::Transport;
use dnsgate_domain::{DomainError, ResolverType, UpstreamConfig};
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

const DNS_PORT: u16 = 53;
const DOT_PORT: u16 = 853;
const HTTPS_PORT: u16 = 443;

pub async fn connect(config: &UpstreamConfig) -> Result<Transport, DomainError> {
    let transport = match config.resolver_type {
        ResolverType::Legacy => {
            let addr = resolve_endpoint(config, DNS_PORT).await?;
            Transport::Legacy(UdpTransport::new(addr), TcpTransport::new(addr))
        }
        ResolverType::Tcp => Transport::Tcp(TcpTransport::new(
            resolve_endpoint(config, DNS_PORT).await?,
        )),
        ResolverType::Dot => {
            let (host, _) = split_host_port(&config.endpoint, DOT_PORT)
                .ok_or_else(|| invalid_endpoint(config))?;
            let addr = resolve_endpoint(config, DOT_PORT).await?;
            Transport::Tls(TlsTransport::new(addr, host))
        }
        ResolverType::Doh => {
            let url = reqwest::Url::parse(&config.endpoint).map_err(|e| {
                DomainError::InvalidUpstream {
                    name: config.name.clone(),
                    reason: format!("invalid DoH URL '{}': {}", config.endpoint, e),
                }
            })?;
            let host = url.host_str().ok_or_else(|| invalid_endpoint(config))?;
            let port = url.port_or_known_default().unwrap_or(HTTPS_PORT);
            let pinned = match &config.bootstrap_ip {
                Some(ip) if host.parse::<IpAddr>().is_err() => {
                    Some((host.to_string(), SocketAddr::new(parse_ip(config, ip)?, port)))
                }
                _ => None,
            };
            Transport::Https(HttpsTransport::new(config.endpoint.clone(), pinned)?)
        }
        ResolverType::Os => Transport::Os(OsTransport::from_system().await),
    };

    debug!(
        upstream = %config.name,
        endpoint = %config.endpoint,
        protocol = transport.protocol_name(),
        "Upstream transport bootstrapped"
    );
    Ok(transport)
}

/// Socket address of a `host[:port]` endpoint. Literal IPs are used as-is,
/// otherwise the bootstrap IP, otherwise the system resolver.
async fn resolve_endpoint(
    config: &UpstreamConfig,
    default_port: u16,
) -> Result<SocketAddr, DomainError> {
    let (host, port) =
        split_host_port(&config.endpoint, default_port).ok_or_else(|| invalid_endpoint(config))?;

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    if let Some(ip) = &config.bootstrap_ip {
        return Ok(SocketAddr::new(parse_ip(config, ip)?, port));
    }

    let addrs = resolve_all(&host, port).await?;
    addrs.into_iter().next().ok_or_else(|| DomainError::Bootstrap {
        endpoint: config.endpoint.clone(),
        reason: "no addresses found".to_string(),
    })
}

/// Resolves a hostname to all its IP addresses (IPv4 + IPv6).
pub async fn resolve_all(hostname: &str, port: u16) -> Result<Vec<SocketAddr>, DomainError> {
    let target = format!("{}:{}", hostname, port);

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&target)
        .await
        .map_err(|e| DomainError::Bootstrap {
            endpoint: target.clone(),
            reason: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(DomainError::Bootstrap {
            endpoint: target,
            reason: "no addresses found".to_string(),
        });
    }

    Ok(addrs)
}

/// Splits `host`, `host:port`, `ip`, `ip:port`, `[v6]:port` or a bare v6
/// address.
pub fn split_host_port(endpoint: &str, default_port: u16) -> Option<(String, u16)> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return None;
    }
    if let Ok(addr) = endpoint.parse::<SocketAddr>() {
        return Some((addr.ip().to_string(), addr.port()));
    }
    if let Ok(ip) = endpoint.parse::<IpAddr>() {
        return Some((ip.to_string(), default_port));
    }
    match endpoint.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => {
            let port = port.parse().ok()?;
            Some((host.trim_matches(['[', ']']).to_string(), port))
        }
        Some(_) => None,
        None => Some((endpoint.to_string(), default_port)),
    }
}

fn parse_ip(config: &UpstreamConfig, ip: &str) -> Result<IpAddr, DomainError> {
    ip.trim().parse().map_err(|_| DomainError::InvalidUpstream {
        name: config.name.clone(),
        reason: format!("invalid bootstrap_ip '{}'", ip),
    })
}

fn invalid_endpoint(config: &UpstreamConfig) -> DomainError {
    DomainError::InvalidUpstream {
        name: config.name.clone(),
        reason: format!("invalid endpoint '{}'", config.endpoint),
    }
}
