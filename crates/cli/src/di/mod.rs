mod dns;
mod jobs;

pub use dns::DnsServices;
pub use jobs::build_jobs;
