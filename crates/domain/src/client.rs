use std::net::IpAddr;
use std::sync::Arc;

/// A LAN client as known to the platform, looked up by hardware address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub mac: Arc<str>,
    pub ip: Option<IpAddr>,
    pub hostname: Option<Arc<str>>,
}

impl ClientInfo {
    pub fn new(mac: &str) -> Self {
        Self {
            mac: Arc::from(mac),
            ip: None,
            hostname: None,
        }
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = Some(Arc::from(hostname));
        self
    }
}
