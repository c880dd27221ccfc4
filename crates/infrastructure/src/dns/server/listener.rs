use super::handler::{DnsServerHandler, ListenerBinding, Protocol};
use crate::dns::transport::tcp::{read_with_length_prefix, send_with_length_prefix};
use dnsgate_application::ports::ListenAddressProvider;
use dnsgate_domain::{Config, DomainError};
use socket2::{Domain, Protocol as SockProtocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const TCP_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
const UDP_RECV_BUFFER: usize = 4096;
const TCP_ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Runs the UDP and TCP servers of every configured listener.
pub struct ListenerManager {
    listeners: Vec<ListenerBinding>,
    handler: Arc<DnsServerHandler>,
    listen_address: Option<Arc<dyn ListenAddressProvider>>,
}

struct BoundListener {
    binding: Arc<ListenerBinding>,
    udp: UdpSocket,
    tcp: TcpListener,
}

impl ListenerManager {
    pub fn new(config: &Config, handler: Arc<DnsServerHandler>) -> Self {
        let listeners = config
            .listener_ids()
            .into_iter()
            .filter_map(|id| {
                config.listener.get(id).map(|cfg| ListenerBinding {
                    id: id.to_string(),
                    config: cfg.clone(),
                })
            })
            .collect();

        Self {
            listeners,
            handler,
            listen_address: None,
        }
    }

    pub fn with_listen_address(mut self, provider: Arc<dyn ListenAddressProvider>) -> Self {
        self.listen_address = Some(provider);
        self
    }

    /// Bind address for a listener: the platform override when it yields
    /// one, the configured `ip:port` otherwise.
    pub fn listen_address(&self, listener: &ListenerBinding) -> Result<SocketAddr, DomainError> {
        let preferred = self
            .listen_address
            .as_ref()
            .and_then(|p| p.preferred_listen_address())
            .filter(|addr| !addr.trim().is_empty());

        let raw = match preferred {
            Some(addr) => addr,
            None => format!("{}:{}", listener.config.ip, listener.config.port),
        };
        parse_listen_address(&raw, listener.config.port)
    }

    /// Binds every listener, then serves until `shutdown` fires or a
    /// server fails.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), DomainError> {
        let bound = self.bind()?;
        self.serve(bound, shutdown).await
    }

    /// Binds the UDP and TCP sockets of every listener. Any failure on a
    /// configured address is fatal; the extra `::1` pair only logs.
    pub fn bind(&self) -> Result<BoundListeners, DomainError> {
        let mut bound = Vec::with_capacity(self.listeners.len());
        for listener in &self.listeners {
            let addr = self.listen_address(listener)?;
            let binding = Arc::new(listener.clone());
            let (udp, tcp) = bind_pair(addr)?;
            info!(listener = %listener.id, address = %addr, "DNS listener bound");
            bound.push(BoundListener {
                binding: binding.clone(),
                udp,
                tcp,
            });

            if need_local_ipv6_listener() && addr.ip() != IpAddr::V6(Ipv6Addr::LOCALHOST) {
                let local = SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port());
                match bind_pair(local) {
                    Ok((udp, tcp)) => {
                        info!(listener = %listener.id, address = %local, "DNS loopback listener bound");
                        bound.push(BoundListener { binding, udp, tcp });
                    }
                    Err(e) => {
                        error!(listener = %listener.id, address = %local, error = %e, "could not serve on ::1");
                    }
                }
            }
        }
        Ok(BoundListeners(bound))
    }

    /// Serves already bound listeners. The first server failure cancels
    /// every other task of the group and is returned.
    pub async fn serve(
        &self,
        bound: BoundListeners,
        shutdown: CancellationToken,
    ) -> Result<(), DomainError> {
        let group = shutdown.child_token();
        let mut tasks: JoinSet<Result<(), DomainError>> = JoinSet::new();

        for BoundListener { binding, udp, tcp } in bound.0 {
            let token = group.child_token();
            tasks.spawn(serve_udp(
                Arc::new(udp),
                binding.clone(),
                self.handler.clone(),
                token.clone(),
            ));
            tasks.spawn(serve_tcp(tcp, binding, self.handler.clone(), token));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                Err(DomainError::IoError(format!("listener task failed: {}", e)))
            });
            if let Err(e) = result {
                if first_error.is_none() {
                    error!(error = %e, "DNS listener stopped, shutting down the others");
                    group.cancel();
                    first_error = Some(e);
                }
            }
        }

        info!("DNS listeners stopped");
        first_error.map_or(Ok(()), Err)
    }
}

/// Sockets bound by [`ListenerManager::bind`], not yet serving.
pub struct BoundListeners(Vec<BoundListener>);

impl BoundListeners {
    /// Local UDP addresses, in listener order.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.0
            .iter()
            .filter_map(|l| l.udp.local_addr().ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Windows keeps an IPv6 resolver on `::1` that cannot be disabled, so
/// queries sent there need their own listener.
pub fn need_local_ipv6_listener() -> bool {
    cfg!(windows) && std::net::UdpSocket::bind((Ipv6Addr::LOCALHOST, 0)).is_ok()
}

fn parse_listen_address(raw: &str, default_port: u16) -> Result<SocketAddr, DomainError> {
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let host = raw.trim_start_matches('[').trim_end_matches(']');
    host.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, default_port))
        .map_err(|_| DomainError::ListenerBind {
            addr: raw.to_string(),
            reason: "not an ip:port address".to_string(),
        })
}

fn bind_pair(addr: SocketAddr) -> Result<(UdpSocket, TcpListener), DomainError> {
    let bind_error = |e: io::Error| DomainError::ListenerBind {
        addr: addr.to_string(),
        reason: e.to_string(),
    };
    let udp = create_udp_socket(addr).map_err(bind_error)?;
    // Port 0 picks an ephemeral port; TCP follows whatever UDP got.
    let tcp_addr = udp.local_addr().map_err(bind_error)?;
    let tcp = create_tcp_listener(tcp_addr).map_err(bind_error)?;
    Ok((udp, tcp))
}

fn socket_domain(addr: SocketAddr) -> Domain {
    if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    }
}

fn create_udp_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(socket_domain(addr), Type::DGRAM, Some(SockProtocol::UDP))?;
    if addr.is_ipv6() && !addr.ip().is_loopback() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

fn create_tcp_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(socket_domain(addr), Type::STREAM, Some(SockProtocol::TCP))?;
    if addr.is_ipv6() && !addr.ip().is_loopback() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

async fn serve_udp(
    socket: Arc<UdpSocket>,
    listener: Arc<ListenerBinding>,
    handler: Arc<DnsServerHandler>,
    token: CancellationToken,
) -> Result<(), DomainError> {
    let local = socket.local_addr()?;
    let mut buf = vec![0u8; UDP_RECV_BUFFER];

    loop {
        let (len, remote) = tokio::select! {
            _ = token.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                // ICMP port unreachable from an earlier reply surfaces here on some platforms.
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(e) => {
                    return Err(DomainError::IoError(format!(
                        "udp listener {} failed: {}",
                        local, e
                    )))
                }
            },
        };

        let query = buf[..len].to_vec();
        let socket = socket.clone();
        let listener = listener.clone();
        let handler = handler.clone();
        tokio::spawn(async move {
            if let Some(response) = handler
                .handle_raw(&listener, &query, remote, local, Protocol::Udp)
                .await
            {
                if let Err(e) = socket.send_to(&response, remote).await {
                    warn!(remote = %remote, error = %e, "Failed to write UDP response");
                }
            }
        });
    }

    debug!(listener = %listener.id, address = %local, "UDP server stopped");
    Ok(())
}

async fn serve_tcp(
    tcp: TcpListener,
    listener: Arc<ListenerBinding>,
    handler: Arc<DnsServerHandler>,
    token: CancellationToken,
) -> Result<(), DomainError> {
    let local = tcp.local_addr()?;

    loop {
        let (stream, remote) = tokio::select! {
            _ = token.cancelled() => break,
            accepted = tcp.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(address = %local, error = %e, "TCP accept failed");
                    if accept_backoff(&token).await {
                        continue;
                    }
                    break;
                }
            },
        };

        let listener = listener.clone();
        let handler = handler.clone();
        let token = token.clone();
        tokio::spawn(async move {
            serve_tcp_connection(stream, remote, local, listener, handler, token).await;
        });
    }

    debug!(listener = %listener.id, address = %local, "TCP server stopped");
    Ok(())
}

/// Pauses after a failed accept so persistent errors (fd exhaustion) do not
/// spin. Returns `false` when the listener was cancelled meanwhile.
async fn accept_backoff(token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(TCP_ACCEPT_BACKOFF) => true,
    }
}

async fn serve_tcp_connection(
    mut stream: TcpStream,
    remote: SocketAddr,
    local: SocketAddr,
    listener: Arc<ListenerBinding>,
    handler: Arc<DnsServerHandler>,
    token: CancellationToken,
) {
    loop {
        let query = tokio::select! {
            _ = token.cancelled() => return,
            read = tokio::time::timeout(TCP_IDLE_TIMEOUT, read_with_length_prefix(&mut stream)) => match read {
                Ok(Ok(query)) => query,
                Ok(Err(e)) => {
                    if e.kind() != io::ErrorKind::UnexpectedEof {
                        debug!(remote = %remote, error = %e, "TCP read failed");
                    }
                    return;
                }
                Err(_) => return,
            },
        };

        let Some(response) = handler
            .handle_raw(&listener, &query, remote, local, Protocol::Tcp)
            .await
        else {
            return;
        };

        if let Err(e) = send_with_length_prefix(&mut stream, &response).await {
            warn!(remote = %remote, error = %e, "Failed to write TCP response");
            return;
        }
    }
}
