/// Canonical form of a query name used for policy matching and cache keys.
///
/// Leading whitespace is dropped, trailing dots and whitespace are stripped
/// and the result is lowercased (RFC 4343).
pub fn canonical_name(fqdn: &str) -> String {
    fqdn.trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_lowercase()
}
