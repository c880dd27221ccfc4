pub mod cache_sweep;
pub mod client_table_refresh;
pub mod runner;

pub use cache_sweep::CacheSweepJob;
pub use client_table_refresh::ClientTableRefreshJob;
pub use runner::JobRunner;
