use dnsgate_domain::{ConfigError, ListenerConfig, NetworkConfig, RequestContext, Rule};
use ipnetwork::IpNetwork;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use tracing::info;

const NO_POLICY: &str = "no policy";
const NO_NETWORK: &str = "no network";
const NO_RULE: &str = "no rule";

/// Which kind of rule decided the upstreams for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyMatch {
    None,
    Network(Vec<String>),
    Domain(Vec<String>),
}

/// What the audit line reports for one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyAudit {
    pub policy: String,
    pub network: String,
    pub rule: String,
}

impl Default for PolicyAudit {
    fn default() -> Self {
        Self {
            policy: NO_POLICY.to_string(),
            network: NO_NETWORK.to_string(),
            rule: NO_RULE.to_string(),
        }
    }
}

impl fmt::Display for PolicyAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.policy, self.network, self.rule)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub upstreams: Vec<String>,
    pub matched: bool,
    pub audit: PolicyAudit,
}

/// Maps a query's source address and name to an ordered list of upstream
/// ids according to the listener's policy.
pub struct PolicyMatcher {
    networks: FxHashMap<String, Vec<IpNetwork>>,
}

impl PolicyMatcher {
    pub fn new(networks: &BTreeMap<String, NetworkConfig>) -> Result<Self, ConfigError> {
        let networks = networks
            .iter()
            .map(|(id, network)| Ok((id.clone(), network.ip_nets()?)))
            .collect::<Result<_, ConfigError>>()?;
        Ok(Self { networks })
    }

    /// Chooses upstreams for `domain` (already canonical) and writes one
    /// audit line describing the decision.
    ///
    /// Network rules are always evaluated first, even though a matching
    /// domain rule overrides them; the audit line reports both.
    pub fn upstream_for(
        &self,
        ctx: &RequestContext,
        listener_id: &str,
        listener: &ListenerConfig,
        source: Option<SocketAddr>,
        domain: &str,
    ) -> MatchOutcome {
        let outcome = self.evaluate(listener_id, listener, source, domain);
        audit(ctx, listener, source, &outcome);
        outcome
    }

    fn evaluate(
        &self,
        listener_id: &str,
        listener: &ListenerConfig,
        source: Option<SocketAddr>,
        domain: &str,
    ) -> MatchOutcome {
        let mut audit = PolicyAudit::default();
        let default_outcome = |audit| MatchOutcome {
            upstreams: vec![format!("upstream.{}", listener_id)],
            matched: false,
            audit,
        };

        let Some(policy) = listener.policy.as_ref() else {
            return default_outcome(audit);
        };

        let mut decision = PolicyMatch::None;
        if let Some(ip) = source.map(|s| s.ip()) {
            if let Some(rule) = self.match_network(&policy.networks, ip) {
                audit.network = rule.source.clone();
                decision = PolicyMatch::Network(rule.targets.clone());
            }
        }

        if let Some(rule) = policy
            .rules
            .iter()
            .find(|rule| rule.pattern() == domain || wildcard_matches(rule.pattern(), domain))
        {
            if matches!(&decision, PolicyMatch::Network(targets) if !targets.is_empty()) {
                audit.network.push_str(" (unenforced)");
            }
            audit.rule = rule.source.clone();
            decision = PolicyMatch::Domain(rule.targets.clone());
        }

        match decision {
            PolicyMatch::None => default_outcome(audit),
            PolicyMatch::Network(upstreams) | PolicyMatch::Domain(upstreams) => {
                audit.policy = policy.name.clone();
                MatchOutcome {
                    upstreams,
                    matched: true,
                    audit,
                }
            }
        }
    }

    /// First network rule whose network contains `ip`, in rule order and
    /// then CIDR order. Rules naming unknown networks are skipped.
    fn match_network<'a>(&self, rules: &'a [Rule], ip: IpAddr) -> Option<&'a Rule> {
        rules.iter().find(|rule| {
            let network_id = rule.source.strip_prefix("network.").unwrap_or(&rule.source);
            self.networks
                .get(network_id)
                .is_some_and(|nets| nets.iter().any(|net| net.contains(ip)))
        })
    }
}

fn audit(
    ctx: &RequestContext,
    listener: &ListenerConfig,
    source: Option<SocketAddr>,
    outcome: &MatchOutcome,
) {
    if !outcome.matched && listener.restricted {
        let source = source.map_or_else(|| "unknown source".to_string(), |s| s.to_string());
        info!(
            request_id = %ctx.request_id,
            "query refused, {} does not match any network policy",
            source
        );
        return;
    }
    info!(
        request_id = %ctx.request_id,
        policy = %outcome.audit.policy,
        network = %outcome.audit.network,
        rule = %outcome.audit.rule,
        upstreams = ?outcome.upstreams,
        "{} -> {:?}",
        outcome.audit,
        outcome.upstreams
    );
}

/// Matches `domain` against a pattern containing exactly one `*`.
///
/// With both a prefix and a suffix around the star, both must match;
/// otherwise whichever side is present must match. A bare `*` or a
/// pattern with more than one star never matches.
pub fn wildcard_matches(pattern: &str, domain: &str) -> bool {
    let mut parts = pattern.split('*');
    let (Some(prefix), Some(suffix), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    match (prefix.is_empty(), suffix.is_empty()) {
        (false, false) => domain.starts_with(prefix) && domain.ends_with(suffix),
        (true, false) => domain.ends_with(suffix),
        (false, true) => domain.starts_with(prefix),
        (true, true) => false,
    }
}
