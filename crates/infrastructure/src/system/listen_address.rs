use dnsgate_application::ports::ListenAddressProvider;

pub const LISTEN_ADDRESS_ENV: &str = "DNSGATE_LISTEN_ADDRESS";

/// Fixed bind override, usually taken from the environment of the
/// service manager that launched the proxy.
#[derive(Debug, Clone, Default)]
pub struct StaticListenAddress {
    address: Option<String>,
}

impl StaticListenAddress {
    pub fn new(address: Option<String>) -> Self {
        Self {
            address: address.filter(|a| !a.trim().is_empty()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var(LISTEN_ADDRESS_ENV).ok())
    }
}

impl ListenAddressProvider for StaticListenAddress {
    fn preferred_listen_address(&self) -> Option<String> {
        self.address.clone()
    }
}
