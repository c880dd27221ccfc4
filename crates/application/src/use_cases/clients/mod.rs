mod refresh_client_table;

pub use refresh_client_table::RefreshClientTableUseCase;
