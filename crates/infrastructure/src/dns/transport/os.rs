//! Resolver backed by the nameservers the operating system is configured
//! with.

use super::udp::UdpTransport;
use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use dnsgate_domain::DomainError;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::debug;

pub const RESOLV_CONF_PATH: &str = "/etc/resolv.conf";

const FALLBACK_NAMESERVER: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 53);

/// Tries each nameserver in order over UDP.
pub struct OsTransport {
    servers: Vec<UdpTransport>,
}

impl OsTransport {
    pub fn new(nameservers: Vec<SocketAddr>) -> Self {
        let nameservers = if nameservers.is_empty() {
            vec![FALLBACK_NAMESERVER]
        } else {
            nameservers
        };
        Self {
            servers: nameservers.into_iter().map(UdpTransport::new).collect(),
        }
    }

    pub async fn from_system() -> Self {
        let nameservers = match tokio::fs::read_to_string(RESOLV_CONF_PATH).await {
            Ok(contents) => parse_resolv_conf(&contents),
            Err(e) => {
                debug!(error = %e, path = RESOLV_CONF_PATH, "Cannot read resolver configuration");
                Vec::new()
            }
        };
        Self::new(nameservers)
    }

    pub fn nameservers(&self) -> Vec<SocketAddr> {
        self.servers.iter().map(UdpTransport::server_addr).collect()
    }
}

#[async_trait]
impl DnsTransport for OsTransport {
    async fn send(&self, message_bytes: &[u8]) -> Result<TransportResponse, DomainError> {
        let mut last_error = None;
        for server in &self.servers {
            match server.send(message_bytes).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    debug!(server = %server.server_addr(), error = %e, "OS nameserver failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            DomainError::transport("os", "no nameservers configured")
        }))
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}

/// `nameserver` entries of a resolv.conf, in file order.
pub fn parse_resolv_conf(contents: &str) -> Vec<SocketAddr> {
    contents
        .lines()
        .map(|line| line.split(['#', ';']).next().unwrap_or("").trim())
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some("nameserver"), Some(addr)) => {
                    // Link-local scope ids (fe80::1%eth0) are not representable here.
                    let addr = addr.split('%').next().unwrap_or(addr);
                    addr.parse::<IpAddr>().ok().map(|ip| SocketAddr::new(ip, 53))
                }
                _ => None,
            }
        })
        .collect()
}
