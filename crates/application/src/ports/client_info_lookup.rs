use dnsgate_domain::ClientInfo;

/// Platform view of the LAN clients, keyed by hardware address.
pub trait ClientInfoLookup: Send + Sync {
    fn client_info_by_mac(&self, mac: &str) -> Option<ClientInfo>;
}
