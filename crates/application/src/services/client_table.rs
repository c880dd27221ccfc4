use crate::ports::{ArpTable, ClientInfoLookup};
use dnsgate_domain::ClientInfo;
use rustc_hash::FxHashMap;
use std::sync::RwLock;
use tracing::warn;

/// In-memory view of the LAN clients, keyed by lowercase MAC.
#[derive(Default)]
pub struct ClientTable {
    by_mac: RwLock<FxHashMap<String, ClientInfo>>,
}

impl ClientTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps in a fresh snapshot built from `arp`. Hostnames learned
    /// earlier survive for MACs that are still present.
    pub fn replace_from_arp(&self, arp: &ArpTable) -> usize {
        let Ok(mut by_mac) = self.by_mac.write() else {
            warn!("client table lock poisoned, skipping refresh");
            return 0;
        };

        let mut next = FxHashMap::with_capacity_and_hasher(arp.len(), Default::default());
        for (ip, mac) in arp {
            let mac = mac.to_ascii_lowercase();
            let mut info = ClientInfo::new(&mac).with_ip(*ip);
            if let Some(hostname) = by_mac.get(&mac).and_then(|c| c.hostname.clone()) {
                info.hostname = Some(hostname);
            }
            next.insert(mac, info);
        }

        *by_mac = next;
        by_mac.len()
    }

    pub fn set_hostname(&self, mac: &str, hostname: &str) {
        if let Ok(mut by_mac) = self.by_mac.write() {
            if let Some(info) = by_mac.get_mut(&mac.to_ascii_lowercase()) {
                info.hostname = Some(hostname.into());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_mac.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClientInfoLookup for ClientTable {
    fn client_info_by_mac(&self, mac: &str) -> Option<ClientInfo> {
        self.by_mac
            .read()
            .ok()?
            .get(&mac.to_ascii_lowercase())
            .cloned()
    }
}
