use async_trait::async_trait;
use dnsgate_application::ports::{ArpReader, ArpTable};
use dnsgate_domain::DomainError;
use std::net::IpAddr;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, warn};

const PROC_NET_ARP: &str = "/proc/net/arp";
/// ATF_COM: the neighbour entry is complete.
const ATF_COMPLETE: u32 = 0x2;

/// Reads the kernel neighbour table exposed at `/proc/net/arp`.
pub struct ProcArpReader {
    path: PathBuf,
}

impl ProcArpReader {
    pub fn new() -> Self {
        Self::with_path(PROC_NET_ARP)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcArpReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArpReader for ProcArpReader {
    async fn read_arp_table(&self) -> Result<ArpTable, DomainError> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            DomainError::IoError(format!("reading {}: {}", self.path.display(), e))
        })?;
        let table = parse_proc_net_arp(&content);
        debug!(entries = table.len(), "ARP table parsed");
        Ok(table)
    }
}

/// Parses `/proc/net/arp`:
///
/// ```text
/// IP address       HW type     Flags       HW address            Mask     Device
/// 192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0
/// ```
///
/// Incomplete entries and all-zero MACs are skipped.
pub fn parse_proc_net_arp(content: &str) -> ArpTable {
    let mut table = ArpTable::new();

    for line in content.lines().skip(1) {
        let mut fields = line.split_whitespace();
        let (Some(ip), Some(_hw_type), Some(flags), Some(mac)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        let flags = u32::from_str_radix(flags.trim_start_matches("0x"), 16).unwrap_or(0);
        if flags & ATF_COMPLETE == 0 || mac == "00:00:00:00:00:00" {
            continue;
        }

        match ip.parse::<IpAddr>() {
            Ok(ip) => {
                table.insert(ip, mac.to_ascii_lowercase());
            }
            Err(e) => warn!(error = %e, ip, "Invalid IP in ARP table"),
        }
    }

    table
}
