use async_trait::async_trait;
use dnsgate_domain::DomainError;
use std::collections::HashMap;
use std::net::IpAddr;

/// Neighbour table snapshot: IP address to hardware address.
pub type ArpTable = HashMap<IpAddr, String>;

#[async_trait]
pub trait ArpReader: Send + Sync {
    async fn read_arp_table(&self) -> Result<ArpTable, DomainError>;
}
