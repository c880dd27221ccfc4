#![allow(dead_code)]

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::opt::EdnsOption;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;

pub const LAN_CLIENT: &str = "192.168.1.50:40000";
pub const WAN_CLIENT: &str = "203.0.113.9:40000";

pub fn source(addr: &str) -> SocketAddr {
    addr.parse().unwrap()
}

pub fn query(name: &str, record_type: RecordType) -> Message {
    let mut msg = Message::new();
    msg.set_id(stable_id(name))
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    msg.add_query(Query::query(Name::from_str(name).unwrap(), record_type));
    msg
}

pub fn query_with_mac(name: &str, mac: [u8; 6]) -> Message {
    let mut msg = query(name, RecordType::A);
    let mut edns = Edns::new();
    edns.options_mut()
        .insert(EdnsOption::Unknown(0xFDE9, mac.to_vec()));
    msg.set_edns(edns);
    msg
}

/// NOERROR answer to `query` with one A record.
pub fn a_answer(query: &Message, ip: Ipv4Addr, ttl: u32) -> Message {
    let mut msg = empty_reply(query);
    let name = query.queries()[0].name().clone();
    msg.add_answer(Record::from_rdata(name, ttl, RData::A(ip.into())));
    msg
}

pub fn empty_reply(query: &Message) -> Message {
    let mut msg = Message::new();
    msg.set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(query.op_code())
        .set_recursion_desired(query.recursion_desired())
        .set_recursion_available(true);
    msg.add_queries(query.queries().to_vec());
    msg
}

pub fn first_a(msg: &Message) -> Option<Ipv4Addr> {
    msg.answers().iter().find_map(|r| match r.data() {
        Some(RData::A(a)) => Some(a.0),
        _ => None,
    })
}

fn stable_id(name: &str) -> u16 {
    name.bytes().fold(0x1234u16, |acc, b| acc.rotate_left(3) ^ u16::from(b))
}
