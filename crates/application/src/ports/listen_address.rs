/// Platform override for the address listeners bind to.
pub trait ListenAddressProvider: Send + Sync {
    fn preferred_listen_address(&self) -> Option<String>;
}
