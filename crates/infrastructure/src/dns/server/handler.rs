use super::request_id::RequestIdGenerator;
use dnsgate_application::dns_message::{formerr_from_raw, response_with_rcode, servfail};
use dnsgate_application::use_cases::HandleDnsQueryUseCase;
use dnsgate_domain::{canonical_name, ListenerConfig, RequestContext};
use hickory_proto::op::{Message, ResponseCode};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Classic DNS payload limit for clients that do not advertise EDNS0.
const MIN_UDP_PAYLOAD: u16 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("udp"),
            Self::Tcp => f.write_str("tcp"),
        }
    }
}

/// A configured listener as seen by the request path.
#[derive(Debug, Clone)]
pub struct ListenerBinding {
    pub id: String,
    pub config: ListenerConfig,
}

/// Turns raw query bytes into raw response bytes for one listener.
pub struct DnsServerHandler {
    use_case: Arc<HandleDnsQueryUseCase>,
    ids: Arc<RequestIdGenerator>,
}

impl DnsServerHandler {
    pub fn new(use_case: Arc<HandleDnsQueryUseCase>, ids: Arc<RequestIdGenerator>) -> Self {
        Self { use_case, ids }
    }

    /// `None` means nothing should be written back.
    pub async fn handle_raw(
        &self,
        listener: &ListenerBinding,
        raw: &[u8],
        remote: SocketAddr,
        local: SocketAddr,
        protocol: Protocol,
    ) -> Option<Vec<u8>> {
        let start = Instant::now();

        let query = match Message::from_vec(raw) {
            Ok(query) => query,
            Err(e) => {
                debug!(remote = %remote, error = %e, "Malformed DNS query");
                return formerr_from_raw(raw).and_then(|reply| encode(&reply));
            }
        };

        let Some(question) = query.queries().first() else {
            debug!(remote = %remote, "DNS query without question");
            return encode(&response_with_rcode(&query, ResponseCode::FormErr));
        };

        let ctx = RequestContext::new(self.ids.next_id());
        let domain = canonical_name(&question.name().to_ascii());
        debug!(
            request_id = %ctx.request_id,
            "{} -> listener.{}: {}: received query: {} {}",
            remote,
            listener.id,
            local,
            question.query_type(),
            domain
        );

        let answer = self
            .use_case
            .execute(&ctx, &listener.id, &listener.config, remote, &query)
            .await;

        let bytes = match protocol {
            Protocol::Udp => encode_for_udp(&query, answer),
            Protocol::Tcp => encode(&answer),
        };
        let bytes = bytes.or_else(|| {
            error!(request_id = %ctx.request_id, "Failed to encode DNS response");
            encode(&servfail(&query))
        })?;

        debug!(
            request_id = %ctx.request_id,
            protocol = %protocol,
            response_len = bytes.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "DNS response ready"
        );
        Some(bytes)
    }
}

fn encode(message: &Message) -> Option<Vec<u8>> {
    match message.to_vec() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(error = %e, "DNS message encoding failed");
            None
        }
    }
}

/// Encodes a UDP reply, dropping the record sections and setting TC when
/// it does not fit the client's advertised payload size.
fn encode_for_udp(query: &Message, mut answer: Message) -> Option<Vec<u8>> {
    let max_payload = query
        .extensions()
        .as_ref()
        .map_or(MIN_UDP_PAYLOAD, |edns| edns.max_payload())
        .max(MIN_UDP_PAYLOAD);

    let bytes = encode(&answer)?;
    if bytes.len() <= usize::from(max_payload) {
        return Some(bytes);
    }

    answer.take_answers();
    answer.take_name_servers();
    answer.take_additionals();
    answer.set_truncated(true);
    encode(&answer)
}
