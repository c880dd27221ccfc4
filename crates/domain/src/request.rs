use std::fmt;
use std::sync::Arc;

use crate::client::ClientInfo;

/// Short random identifier used to correlate the log lines of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId([u8; 3]);

impl RequestId {
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Per-request state passed explicitly down the resolution path.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub client_info: Option<Arc<ClientInfo>>,
}

impl RequestContext {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            client_info: None,
        }
    }

    pub fn with_client_info(mut self, client_info: Arc<ClientInfo>) -> Self {
        self.client_info = Some(client_info);
        self
    }
}
