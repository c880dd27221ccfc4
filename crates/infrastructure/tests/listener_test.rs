use dnsgate_application::services::PolicyMatcher;
use dnsgate_application::use_cases::{HandleDnsQueryUseCase, ProxyOptions, ProxyQueryUseCase};
use dnsgate_domain::{Config, DomainError, ListenerConfig};
use dnsgate_infrastructure::dns::transport::tcp::{read_with_length_prefix, send_with_length_prefix};
use dnsgate_infrastructure::dns::{
    DnsCache, DnsCacheConfig, DnsServerHandler, ListenerManager, RequestIdGenerator, UpstreamSet,
};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::{RData, RecordType};
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod helpers;
use helpers::{legacy_upstream, local_listener, query, restricted_listener, MockBehavior, MockDnsServer};

struct RunningProxy {
    addrs: Vec<SocketAddr>,
    shutdown: CancellationToken,
    task: JoinHandle<Result<(), DomainError>>,
}

fn config(upstream: SocketAddr, listeners: Vec<(&str, ListenerConfig)>) -> Config {
    let mut config = Config::default();
    config.upstream = BTreeMap::from([(
        "0".to_string(),
        legacy_upstream("mock", upstream, 2000),
    )]);
    config.listener = listeners
        .into_iter()
        .map(|(id, listener)| (id.to_string(), listener))
        .collect();
    config
}

fn manager(config: &Config) -> ListenerManager {
    let upstreams = Arc::new(UpstreamSet::from_config(&config.upstream));
    let cache = Arc::new(DnsCache::new(DnsCacheConfig::default()));
    let proxy = Arc::new(ProxyQueryUseCase::new(upstreams, ProxyOptions::default()).with_cache(cache));
    let matcher = Arc::new(PolicyMatcher::new(&config.network).unwrap());
    let use_case = Arc::new(HandleDnsQueryUseCase::new(matcher, proxy));
    let handler = Arc::new(DnsServerHandler::new(
        use_case,
        Arc::new(RequestIdGenerator::with_seed(42)),
    ));
    ListenerManager::new(config, handler)
}

async fn start(config: &Config) -> RunningProxy {
    let manager = Arc::new(manager(config));
    let bound = manager.bind().unwrap();
    let addrs = bound.local_addrs();
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let task = tokio::spawn(async move { manager.serve(bound, token).await });
    RunningProxy {
        addrs,
        shutdown,
        task,
    }
}

async fn udp_exchange(addr: SocketAddr, raw: &[u8]) -> Message {
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(raw, addr).await.unwrap();
    let mut buf = vec![0u8; 4096];
    let (len, _) = tokio::time::timeout(Duration::from_secs(3), client.recv_from(&mut buf))
        .await
        .expect("no reply from listener")
        .unwrap();
    Message::from_vec(&buf[..len]).unwrap()
}

fn first_a(message: &Message) -> Option<Ipv4Addr> {
    message.answers().iter().find_map(|r| match r.data() {
        Some(RData::A(a)) => Some(a.0),
        _ => None,
    })
}

#[tokio::test]
async fn test_udp_query_is_proxied_to_default_upstream() {
    let upstream = MockDnsServer::start(MockBehavior::Answer(Ipv4Addr::new(10, 9, 9, 9), 300))
        .await
        .unwrap();
    let proxy = start(&config(upstream.addr(), vec![("0", local_listener())])).await;

    let q = query(0x5151, "www.example.com.", RecordType::A);
    let answer = udp_exchange(proxy.addrs[0], &q.to_vec().unwrap()).await;

    assert_eq!(answer.id(), 0x5151);
    assert_eq!(answer.response_code(), ResponseCode::NoError);
    assert_eq!(first_a(&answer), Some(Ipv4Addr::new(10, 9, 9, 9)));
    assert_eq!(upstream.query_count(), 1);

    proxy.shutdown.cancel();
}

#[tokio::test]
async fn test_second_query_is_answered_from_cache() {
    let upstream = MockDnsServer::start(MockBehavior::Answer(Ipv4Addr::new(10, 9, 9, 9), 300))
        .await
        .unwrap();
    let proxy = start(&config(upstream.addr(), vec![("0", local_listener())])).await;

    let first = query(1, "cached.example.com.", RecordType::A);
    udp_exchange(proxy.addrs[0], &first.to_vec().unwrap()).await;
    let second = query(2, "CACHED.example.com.", RecordType::A);
    let answer = udp_exchange(proxy.addrs[0], &second.to_vec().unwrap()).await;

    assert_eq!(answer.id(), 2);
    assert_eq!(first_a(&answer), Some(Ipv4Addr::new(10, 9, 9, 9)));
    assert!(answer.answers()[0].ttl() <= 300);
    assert_eq!(upstream.query_count(), 1);

    proxy.shutdown.cancel();
}

#[tokio::test]
async fn test_tcp_query_uses_length_prefix_framing() {
    let upstream = MockDnsServer::start(MockBehavior::Answer(Ipv4Addr::new(10, 7, 7, 7), 60))
        .await
        .unwrap();
    let proxy = start(&config(upstream.addr(), vec![("0", local_listener())])).await;

    let mut stream = TcpStream::connect(proxy.addrs[0]).await.unwrap();
    for id in [11u16, 12] {
        let q = query(id, "tcp.example.com.", RecordType::A);
        send_with_length_prefix(&mut stream, &q.to_vec().unwrap())
            .await
            .unwrap();
        let raw = tokio::time::timeout(Duration::from_secs(3), read_with_length_prefix(&mut stream))
            .await
            .unwrap()
            .unwrap();
        let answer = Message::from_vec(&raw).unwrap();
        assert_eq!(answer.id(), id);
        assert_eq!(first_a(&answer), Some(Ipv4Addr::new(10, 7, 7, 7)));
    }

    proxy.shutdown.cancel();
}

#[tokio::test]
async fn test_restricted_listener_refuses_without_contacting_upstream() {
    let upstream = MockDnsServer::start(MockBehavior::Answer(Ipv4Addr::new(10, 9, 9, 9), 60))
        .await
        .unwrap();
    let proxy = start(&config(
        upstream.addr(),
        vec![
            ("0", local_listener()),
            ("1", restricted_listener(&[("*.corp.example", "upstream.0")])),
        ],
    ))
    .await;

    let q = query(77, "www.example.com.", RecordType::A);
    let answer = udp_exchange(proxy.addrs[1], &q.to_vec().unwrap()).await;

    assert_eq!(answer.id(), 77);
    assert_eq!(answer.response_code(), ResponseCode::Refused);
    assert_eq!(answer.queries().len(), 1);
    assert_eq!(upstream.query_count(), 0);

    let allowed = query(78, "git.corp.example.", RecordType::A);
    let answer = udp_exchange(proxy.addrs[1], &allowed.to_vec().unwrap()).await;
    assert_eq!(answer.response_code(), ResponseCode::NoError);
    assert_eq!(upstream.query_count(), 1);

    proxy.shutdown.cancel();
}

#[tokio::test]
async fn test_question_less_query_gets_formerr() {
    let upstream = MockDnsServer::start(MockBehavior::Answer(Ipv4Addr::new(10, 9, 9, 9), 60))
        .await
        .unwrap();
    let proxy = start(&config(upstream.addr(), vec![("0", local_listener())])).await;

    let header_only = [0x12, 0x34, 0x01, 0x00, 0, 0, 0, 0, 0, 0, 0, 0];
    let answer = udp_exchange(proxy.addrs[0], &header_only).await;

    assert_eq!(answer.id(), 0x1234);
    assert_eq!(answer.response_code(), ResponseCode::FormErr);
    assert_eq!(upstream.query_count(), 0);

    proxy.shutdown.cancel();
}

#[tokio::test]
async fn test_all_upstreams_failing_yields_servfail() {
    let upstream = MockDnsServer::start(MockBehavior::Silent).await.unwrap();
    let mut cfg = config(upstream.addr(), vec![("0", local_listener())]);
    if let Some(u) = cfg.upstream.get_mut("0") {
        u.timeout = 100;
    }
    let proxy = start(&cfg).await;

    let q = query(99, "down.example.com.", RecordType::A);
    let answer = udp_exchange(proxy.addrs[0], &q.to_vec().unwrap()).await;

    assert_eq!(answer.id(), 99);
    assert_eq!(answer.response_code(), ResponseCode::ServFail);
    assert_eq!(upstream.query_count(), 2);

    proxy.shutdown.cancel();
}

#[tokio::test]
async fn test_shutdown_stops_every_listener() {
    let upstream = MockDnsServer::start(MockBehavior::Answer(Ipv4Addr::new(10, 9, 9, 9), 60))
        .await
        .unwrap();
    let proxy = start(&config(
        upstream.addr(),
        vec![("0", local_listener()), ("1", local_listener())],
    ))
    .await;
    assert_eq!(proxy.addrs.len(), 2);

    proxy.shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(3), proxy.task)
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();
    let listener = ListenerConfig {
        port,
        ..local_listener()
    };
    let cfg = config("127.0.0.1:53".parse().unwrap(), vec![("0", listener)]);

    let err = manager(&cfg).run(CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, DomainError::ListenerBind { .. }));
}
