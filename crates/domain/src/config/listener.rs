use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    #[serde(default = "default_listen_ip")]
    pub ip: String,

    #[serde(default = "default_listen_port")]
    pub port: u16,

    /// Refuse queries that match no network or domain rule.
    #[serde(default)]
    pub restricted: bool,

    #[serde(default)]
    pub policy: Option<PolicyConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            ip: default_listen_ip(),
            port: default_listen_port(),
            restricted: false,
            policy: None,
        }
    }
}

fn default_listen_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    53
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub name: String,

    /// `network.<n>` -> upstream ids, evaluated in order.
    #[serde(default)]
    pub networks: Vec<Rule>,

    /// Domain pattern -> upstream ids, evaluated in order.
    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub failover_rcodes: Vec<Rcode>,
}

impl PolicyConfig {
    pub fn failover_codes(&self) -> Vec<u16> {
        self.failover_rcodes.iter().map(|r| r.0).collect()
    }
}

/// Single-key mapping from a source (network id or domain pattern) to an
/// ordered list of upstream ids.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct Rule {
    pub source: String,
    pub targets: Vec<String>,
    pattern: String,
}

impl Rule {
    pub fn new(source: impl Into<String>, targets: Vec<String>) -> Self {
        let source = source.into();
        Self {
            pattern: source.to_ascii_lowercase(),
            source,
            targets,
        }
    }

    /// Lowercased source, used when matching query names.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for Rule {
    type Error = String;

    fn try_from(map: BTreeMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "a rule must have exactly one key, found {}",
                map.len()
            ));
        }
        let (source, targets) = map
            .into_iter()
            .next()
            .ok_or_else(|| "empty rule".to_string())?;
        Ok(Self::new(source, targets))
    }
}

impl From<Rule> for BTreeMap<String, Vec<String>> {
    fn from(rule: Rule) -> Self {
        BTreeMap::from([(rule.source, rule.targets)])
    }
}

const RCODE_NAMES: &[(&str, u16)] = &[
    ("NOERROR", 0),
    ("FORMERR", 1),
    ("SERVFAIL", 2),
    ("NXDOMAIN", 3),
    ("NOTIMP", 4),
    ("REFUSED", 5),
    ("YXDOMAIN", 6),
    ("YXRRSET", 7),
    ("NXRRSET", 8),
    ("NOTAUTH", 9),
    ("NOTZONE", 10),
];

/// DNS response code, written in config either as a mnemonic or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "RcodeRepr", into = "RcodeRepr")]
pub struct Rcode(pub u16);

impl Rcode {
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        RCODE_NAMES
            .iter()
            .find(|(n, _)| *n == upper)
            .map(|(_, code)| Self(*code))
    }

    pub fn name(&self) -> Option<&'static str> {
        RCODE_NAMES
            .iter()
            .find(|(_, code)| *code == self.0)
            .map(|(n, _)| *n)
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum RcodeRepr {
    Code(u16),
    Name(String),
}

impl TryFrom<RcodeRepr> for Rcode {
    type Error = String;

    fn try_from(repr: RcodeRepr) -> Result<Self, Self::Error> {
        match repr {
            RcodeRepr::Code(code) => Ok(Self(code)),
            RcodeRepr::Name(name) => {
                if let Ok(code) = name.trim().parse::<u16>() {
                    return Ok(Self(code));
                }
                Self::from_name(&name).ok_or_else(|| format!("unknown rcode: {}", name))
            }
        }
    }
}

impl From<Rcode> for RcodeRepr {
    fn from(rcode: Rcode) -> Self {
        match rcode.name() {
            Some(name) => Self::Name(name.to_string()),
            None => Self::Code(rcode.0),
        }
    }
}
