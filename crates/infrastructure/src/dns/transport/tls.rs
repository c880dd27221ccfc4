//! DNS-over-TLS transport (RFC 7858)
//!
//! The rustls `ClientConfig` is built once and shared so session
//! resumption works across upstreams. Idle connections are pooled per
//! transport instance.

use super::tcp::{connect_error, read_with_length_prefix, send_with_length_prefix};
use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use dnsgate_domain::DomainError;
use rustls::pki_types::ServerName;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock, Mutex};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::debug;

const MAX_IDLE_TLS: usize = 2;

static SHARED_TLS_CONFIG: LazyLock<Arc<rustls::ClientConfig>> = LazyLock::new(|| {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
});

pub struct TlsTransport {
    server_addr: SocketAddr,
    hostname: String,
    idle: Mutex<Vec<TlsStream<TcpStream>>>,
}

impl TlsTransport {
    pub fn new(server_addr: SocketAddr, hostname: String) -> Self {
        Self {
            server_addr,
            hostname,
            idle: Mutex::new(Vec::new()),
        }
    }

    fn take_pooled(&self) -> Option<TlsStream<TcpStream>> {
        self.idle.lock().ok()?.pop()
    }

    fn return_to_pool(&self, stream: TlsStream<TcpStream>) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < MAX_IDLE_TLS {
                idle.push(stream);
            }
        }
    }

    async fn connect_new(&self) -> Result<TlsStream<TcpStream>, DomainError> {
        let connector = tokio_rustls::TlsConnector::from(SHARED_TLS_CONFIG.clone());

        let server_name = ServerName::try_from(self.hostname.clone()).map_err(|e| {
            DomainError::transport(
                self.server_addr.to_string(),
                format!("invalid TLS hostname '{}': {}", self.hostname, e),
            )
        })?;

        let tcp_stream = TcpStream::connect(self.server_addr)
            .await
            .map_err(|e| connect_error(self.server_addr, e))?;

        let tls_stream = connector
            .connect(server_name, tcp_stream)
            .await
            .map_err(|e| {
                DomainError::transport(
                    self.server_addr.to_string(),
                    format!("TLS handshake failed: {}", e),
                )
            })?;

        debug!(server = %self.server_addr, hostname = %self.hostname, "TLS connection established");
        Ok(tls_stream)
    }

    async fn exchange(
        &self,
        stream: &mut TlsStream<TcpStream>,
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
impl DnsTransport for TlsTransport {
    async fn send(&self, message_bytes: &[u8]) -> Result<TransportResponse, DomainError> {
        if let Some(mut stream) = self.take_pooled() {
            match self.exchange(&mut stream, message_bytes).await {
                Ok(bytes) => {
                    debug!(server = %self.server_addr, "TLS query via pooled connection");
                    self.return_to_pool(stream);
                    return Ok(TransportResponse {
                        bytes,
                        protocol_used: "TLS",
                    });
                }
                Err(_) => {
                    debug!(server = %self.server_addr, "Pooled TLS connection stale, reconnecting");
                }
            }
        }

        let mut stream = self.connect_new().await?;
        let bytes = self.exchange(&mut stream, message_bytes).await?;

        debug!(
            server = %self.server_addr,
            response_len = bytes.len(),
            "TLS response received"
        );

        self.return_to_pool(stream);

        Ok(TransportResponse {
            bytes,
            protocol_used: "TLS",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "TLS"
    }
}
