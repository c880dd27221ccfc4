use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use dnsgate_domain::DomainError;
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

const MAX_TCP_MESSAGE_SIZE: usize = 65535;
const MAX_IDLE_TCP: usize = 2;

/// DNS over TCP with 2-byte length framing (RFC 1035 §4.2.2). Idle
/// connections are kept per transport and dropped with it.
pub struct TcpTransport {
    server_addr: SocketAddr,
    idle: Mutex<Vec<TcpStream>>,
}

impl TcpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    fn take_pooled(&self) -> Option<TcpStream> {
        self.idle.lock().ok()?.pop()
    }

    fn return_to_pool(&self, stream: TcpStream) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < MAX_IDLE_TCP {
                idle.push(stream);
            }
        }
    }

    async fn connect_new(&self) -> Result<TcpStream, DomainError> {
        let stream = TcpStream::connect(self.server_addr)
            .await
            .map_err(|e| connect_error(self.server_addr, e))?;

        stream
            .set_nodelay(true)
            .map_err(|e| DomainError::transport(self.server_addr.to_string(), e))?;

        Ok(stream)
    }

    async fn exchange(
        &self,
        stream: &mut TcpStream,
        message_bytes: &[u8],
    ) -> Result<Vec<u8>, DomainError> {
        send_with_length_prefix(stream, message_bytes)
            .await
            .map_err(|e| DomainError::transport(self.server_addr.to_string(), e))?;
        read_with_length_prefix(stream)
            .await
            .map_err(|e| DomainError::transport(self.server_addr.to_string(), e))
    }
}

#[async_trait]
impl DnsTransport for TcpTransport {
    async fn send(&self, message_bytes: &[u8]) -> Result<TransportResponse, DomainError> {
        if let Some(mut stream) = self.take_pooled() {
            match self.exchange(&mut stream, message_bytes).await {
                Ok(bytes) => {
                    debug!(server = %self.server_addr, "TCP query via pooled connection");
                    self.return_to_pool(stream);
                    return Ok(TransportResponse {
                        bytes,
                        protocol_used: "TCP",
                    });
                }
                Err(_) => {
                    debug!(server = %self.server_addr, "Pooled TCP connection stale, reconnecting");
                }
            }
        }

        let mut stream = self.connect_new().await?;
        let bytes = self.exchange(&mut stream, message_bytes).await?;

        debug!(
            server = %self.server_addr,
            response_len = bytes.len(),
            "TCP response received"
        );

        self.return_to_pool(stream);

        Ok(TransportResponse {
            bytes,
            protocol_used: "TCP",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "TCP"
    }
}

pub(crate) fn connect_error(server: SocketAddr, e: io::Error) -> DomainError {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => DomainError::TransportConnectionRefused {
            server: server.to_string(),
        },
        io::ErrorKind::TimedOut => DomainError::TransportTimeout {
            server: server.to_string(),
        },
        _ => DomainError::transport(server.to_string(), e),
    }
}

pub async fn send_with_length_prefix<S>(stream: &mut S, message_bytes: &[u8]) -> io::Result<()>
where
    S: AsyncWriteExt + Unpin,
{
    let length = u16::try_from(message_bytes.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("DNS message too large: {} bytes", message_bytes.len()),
        )
    })?;

    let mut framed = Vec::with_capacity(message_bytes.len() + 2);
    framed.extend_from_slice(&length.to_be_bytes());
    framed.extend_from_slice(message_bytes);

    stream.write_all(&framed).await?;
    stream.flush().await
}

pub async fn read_with_length_prefix<S>(stream: &mut S) -> io::Result<Vec<u8>>
where
    S: AsyncReadExt + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let response_len = u16::from_be_bytes(len_buf) as usize;
    if response_len > MAX_TCP_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Response too large: {} bytes", response_len),
        ));
    }

    let mut response = vec![0u8; response_len];
    stream.read_exact(&mut response).await?;
    Ok(response)
}
