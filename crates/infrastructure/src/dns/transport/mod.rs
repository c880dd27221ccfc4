pub mod bootstrap;
pub mod https;
pub mod os;
pub mod tcp;
pub mod tls;
pub mod udp;

use async_trait::async_trait;
use dnsgate_domain::{ClientInfo, DomainError};
use tracing::debug;

#[derive(Debug)]
pub struct TransportResponse {
    pub bytes: Vec<u8>,

    pub protocol_used: &'static str,
}

/// One request/response exchange of raw DNS wire bytes. Deadlines are
/// applied by the caller around the whole exchange.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(&self, message_bytes: &[u8]) -> Result<TransportResponse, DomainError>;

    fn protocol_name(&self) -> &'static str;
}

/// Resolved transport for one upstream. Owns any pooled connections, so
/// dropping it drops them.
pub enum Transport {
    /// UDP first, TCP when the UDP reply is truncated.
    Legacy(udp::UdpTransport, tcp::TcpTransport),
    Tcp(tcp::TcpTransport),
    Tls(tls::TlsTransport),
    Https(https::HttpsTransport),
    Os(os::OsTransport),
}

impl Transport {
    pub async fn send(
        &self,
        message_bytes: &[u8],
        client: Option<&ClientInfo>,
    ) -> Result<TransportResponse, DomainError> {
        match self {
            Self::Legacy(udp, tcp) => {
                let response = udp.send(message_bytes).await?;
                if !is_truncated(&response.bytes) {
                    return Ok(response);
                }
                debug!(server = %tcp.server_addr(), "UDP response truncated, retrying over TCP");
                tcp.send(message_bytes).await
            }
            Self::Tcp(t) => t.send(message_bytes).await,
            Self::Tls(t) => t.send(message_bytes).await,
            Self::Https(t) => t.send_with_client(message_bytes, client).await,
            Self::Os(t) => t.send(message_bytes).await,
        }
    }

    pub fn protocol_name(&self) -> &'static str {
        match self {
            Self::Legacy(_, _) => "UDP",
            Self::Tcp(t) => t.protocol_name(),
            Self::Tls(t) => t.protocol_name(),
            Self::Https(t) => t.protocol_name(),
            Self::Os(t) => t.protocol_name(),
        }
    }
}

/// TC bit of a raw DNS header.
fn is_truncated(bytes: &[u8]) -> bool {
    bytes.get(2).is_some_and(|flags| flags & 0x02 != 0)
}
