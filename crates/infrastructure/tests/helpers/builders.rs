#![allow(dead_code)]
use dnsgate_domain::{ListenerConfig, PolicyConfig, Rcode, ResolverType, Rule, UpstreamConfig};
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use std::net::SocketAddr;
use std::str::FromStr;

pub fn legacy_upstream(name: &str, addr: SocketAddr, timeout_ms: i64) -> UpstreamConfig {
    UpstreamConfig {
        name: name.to_string(),
        resolver_type: ResolverType::Legacy,
        endpoint: addr.to_string(),
        timeout: timeout_ms,
        ..UpstreamConfig::default()
    }
}

pub fn local_listener() -> ListenerConfig {
    ListenerConfig {
        ip: "127.0.0.1".to_string(),
        port: 0,
        ..ListenerConfig::default()
    }
}

pub fn restricted_listener(domain_rules: &[(&str, &str)]) -> ListenerConfig {
    ListenerConfig {
        restricted: true,
        policy: Some(PolicyConfig {
            name: "restricted".to_string(),
            rules: domain_rules
                .iter()
                .map(|(pattern, upstream)| Rule::new(*pattern, vec![upstream.to_string()]))
                .collect(),
            failover_rcodes: vec![Rcode(2)],
            ..PolicyConfig::default()
        }),
        ..local_listener()
    }
}

pub fn query(id: u16, name: &str, record_type: RecordType) -> Message {
    let mut msg = Message::new();
    msg.set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    msg.add_query(Query::query(Name::from_str(name).unwrap(), record_type));
    msg
}
