pub mod handler;
pub mod listener;
pub mod request_id;

pub use handler::{DnsServerHandler, ListenerBinding, Protocol};
pub use listener::{need_local_ipv6_listener, BoundListeners, ListenerManager};
pub use request_id::RequestIdGenerator;
