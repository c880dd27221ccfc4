//! Helpers for the DNS messages flowing through the proxy.

use hickory_proto::op::{Header, Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::opt::{EdnsCode, EdnsOption};
use hickory_proto::rr::{Record, RecordType};
use hickory_proto::serialize::binary::BinDecodable;
use std::time::{Duration, Instant};

/// TTL handed out with stale cached answers.
pub const STALE_TTL: Duration = Duration::from_secs(60);

/// Private EDNS0 option carrying the client's hardware address.
pub const MAC_OPTION_CODE: u16 = 0xFDE9;

/// Sets every record TTL to the seconds left until `expires_at`.
///
/// OPT pseudo-records are left alone. If `expires_at` already passed the
/// message is not touched.
pub fn set_cached_answer_ttl(message: &mut Message, now: Instant, expires_at: Instant) {
    let Some(remaining) = expires_at.checked_duration_since(now) else {
        return;
    };
    let ttl = u32::try_from(remaining.as_secs()).unwrap_or(u32::MAX);

    for record in message.answers_mut() {
        record.set_ttl(ttl);
    }
    for record in message.name_servers_mut() {
        record.set_ttl(ttl);
    }
    for record in message
        .additionals_mut()
        .iter_mut()
        .filter(|r| r.record_type() != RecordType::OPT)
    {
        record.set_ttl(ttl);
    }
}

/// TTL of the first answer record, else the first authority record, else 0.
pub fn ttl_from_message(message: &Message) -> u32 {
    message
        .answers()
        .first()
        .or_else(|| message.name_servers().first())
        .map(Record::ttl)
        .unwrap_or(0)
}

/// Client MAC address from the private EDNS0 option, as lowercase
/// colon-separated hex.
pub fn mac_from_message(message: &Message) -> Option<String> {
    let edns = message.extensions().as_ref()?;
    match edns.option(EdnsCode::from(MAC_OPTION_CODE))? {
        EdnsOption::Unknown(_, data) if !data.is_empty() => Some(
            data.iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(":"),
        ),
        _ => None,
    }
}

/// Re-addresses a cached response to a live query: id, question, RD flag
/// and opcode come from the query, everything else from the cached copy.
pub fn reply_to(cached: &Message, query: &Message) -> Message {
    let mut reply = cached.clone();
    reply.take_queries();
    reply
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(query.op_code())
        .set_recursion_desired(query.recursion_desired());
    reply.add_queries(query.queries().first().cloned());
    reply
}

/// An empty response to `query` carrying only `rcode`.
pub fn response_with_rcode(query: &Message, rcode: ResponseCode) -> Message {
    let mut reply = Message::new();
    reply
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(query.op_code())
        .set_recursion_desired(query.recursion_desired())
        .set_response_code(rcode);
    reply.add_queries(query.queries().first().cloned());
    reply
}

pub fn servfail(query: &Message) -> Message {
    response_with_rcode(query, ResponseCode::ServFail)
}

pub fn refused(query: &Message) -> Message {
    response_with_rcode(query, ResponseCode::Refused)
}

/// FORMERR for a datagram that is not a usable query. Returns `None` when
/// not even the header can be read.
pub fn formerr_from_raw(raw: &[u8]) -> Option<Message> {
    let header = Header::from_bytes(raw).ok()?;
    let mut reply = Message::new();
    reply
        .set_id(header.id())
        .set_message_type(MessageType::Response)
        .set_op_code(header.op_code())
        .set_recursion_desired(header.recursion_desired())
        .set_response_code(ResponseCode::FormErr);
    Some(reply)
}
