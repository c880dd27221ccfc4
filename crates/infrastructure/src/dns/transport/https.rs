//! DNS-over-HTTPS transport (RFC 8484)
//!
//! Queries are sent as HTTP POST with `application/dns-message`; the body
//! is the raw wire-format message in both directions.

use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use dnsgate_domain::{ClientInfo, DomainError};
use std::net::SocketAddr;
use tracing::debug;

const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

pub const HEADER_CLIENT_MAC: &str = "x-cd-mac";
pub const HEADER_CLIENT_IP: &str = "x-cd-ip";
pub const HEADER_CLIENT_HOST: &str = "x-cd-host";

pub struct HttpsTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpsTransport {
    /// `pinned` bypasses name resolution for the URL host.
    pub fn new(url: String, pinned: Option<(String, SocketAddr)>) -> Result<Self, DomainError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(4);
        if let Some((host, addr)) = pinned {
            builder = builder.resolve(&host, addr);
        }
        let client = builder.build().map_err(|e| DomainError::Bootstrap {
            endpoint: url.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { url, client })
    }

    pub async fn send_with_client(
        &self,
        message_bytes: &[u8],
        client_info: Option<&ClientInfo>,
    ) -> Result<TransportResponse, DomainError> {
        debug!(
            url = %self.url,
            message_len = message_bytes.len(),
            "Sending DoH query"
        );

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", DNS_MESSAGE_CONTENT_TYPE)
            .header("Accept", DNS_MESSAGE_CONTENT_TYPE)
            .body(Bytes::copy_from_slice(message_bytes));

        if let Some(info) = client_info {
            request = request.header(HEADER_CLIENT_MAC, info.mac.as_ref());
            if let Some(ip) = info.ip {
                request = request.header(HEADER_CLIENT_IP, ip.to_string());
            }
            if let Some(host) = info.hostname.as_deref() {
                request = request.header(HEADER_CLIENT_HOST, host);
            }
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DomainError::TransportTimeout {
                    server: self.url.clone(),
                }
            } else {
                DomainError::transport(self.url.clone(), e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::transport(
                self.url.clone(),
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }

        let response_bytes = response
            .bytes()
            .await
            .map_err(|e| DomainError::transport(self.url.clone(), e))?;

        debug!(
            url = %self.url,
            response_len = response_bytes.len(),
            "DoH response received"
        );

        Ok(TransportResponse {
            bytes: response_bytes.to_vec(),
            protocol_used: "HTTPS",
        })
    }
}

#[async_trait]
impl DnsTransport for HttpsTransport {
    async fn send(&self, message_bytes: &[u8]) -> Result<TransportResponse, DomainError> {
        self.send_with_client(message_bytes, None).await
    }

    fn protocol_name(&self) -> &'static str {
        "HTTPS"
    }
}
