pub mod arp_reader;
pub mod listen_address;

pub use arp_reader::{parse_proc_net_arp, ProcArpReader};
pub use listen_address::{StaticListenAddress, LISTEN_ADDRESS_ENV};
