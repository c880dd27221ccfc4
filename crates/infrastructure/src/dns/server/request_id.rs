use dnsgate_domain::RequestId;
use std::sync::Mutex;

/// Source of the short ids that tag each query's log lines.
pub struct RequestIdGenerator {
    rng: Mutex<fastrand::Rng>,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    pub fn next_id(&self) -> RequestId {
        let mut bytes = [0u8; 3];
        match self.rng.lock() {
            Ok(mut rng) => rng.fill(&mut bytes),
            // A poisoned lock still yields usable ids from the global generator.
            Err(_) => fastrand::fill(&mut bytes),
        }
        RequestId::from_bytes(bytes)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
