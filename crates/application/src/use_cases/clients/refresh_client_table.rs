use crate::ports::ArpReader;
use crate::services::ClientTable;
use dnsgate_domain::DomainError;
use std::sync::Arc;
use tracing::debug;

/// Rebuilds the client table from the platform's neighbour table.
pub struct RefreshClientTableUseCase {
    arp_reader: Arc<dyn ArpReader>,
    table: Arc<ClientTable>,
}

impl RefreshClientTableUseCase {
    pub fn new(arp_reader: Arc<dyn ArpReader>, table: Arc<ClientTable>) -> Self {
        Self { arp_reader, table }
    }

    /// Returns the number of clients known after the refresh. A failed
    /// read leaves the previous table in place.
    pub async fn execute(&self) -> Result<usize, DomainError> {
        let arp_table = self.arp_reader.read_arp_table().await?;
        let known = self.table.replace_from_arp(&arp_table);
        debug!(entries = arp_table.len(), known, "Client table refreshed");
        Ok(known)
    }
}
