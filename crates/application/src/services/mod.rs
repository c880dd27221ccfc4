pub mod client_table;
pub mod policy_matcher;

pub use client_table::ClientTable;
pub use policy_matcher::{wildcard_matches, MatchOutcome, PolicyAudit, PolicyMatch, PolicyMatcher};
