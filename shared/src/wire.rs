use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::McmpError;

/// Fixed field widths (spec §3: "All sizes below are fixed-width text
/// fields; values longer than the field are a syntax error"). The
/// distilled spec does not name exact numbers, so these follow the scale
/// mod_cluster-style managers use in practice; an embedder that needs
/// different caps constructs these newtypes directly rather than going
/// through a config knob, since the caps are a wire-format property, not
/// a runtime tunable.
pub const FIELD_CAP_JVM_ROUTE: usize = 64;
pub const FIELD_CAP_BALANCER: usize = 64;
pub const FIELD_CAP_HOST: usize = 128;
pub const FIELD_CAP_ALIAS: usize = 256;
pub const FIELD_CAP_CONTEXT: usize = 256;

/// The MCMP verbs (spec §6). `AddId`/`RemoveId`/`Query` are recognised but
/// unimplemented, matching spec §6's own phrasing; dispatch returns a
/// `General` error for them rather than silently dropping the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Config,
    EnableApp,
    DisableApp,
    StopApp,
    RemoveApp,
    Status,
    Dump,
    Info,
    Ping,
    Version,
    Error,
    AddId,
    RemoveId,
    Query,
}

impl FromStr for Verb {
    type Err = McmpError;

    fn from_str(method: &str) -> Result<Self, Self::Err> {
        match method {
            "CONFIG" => Ok(Verb::Config),
            "ENABLE-APP" => Ok(Verb::EnableApp),
            "DISABLE-APP" => Ok(Verb::DisableApp),
            "STOP-APP" => Ok(Verb::StopApp),
            "REMOVE-APP" => Ok(Verb::RemoveApp),
            "STATUS" => Ok(Verb::Status),
            "DUMP" => Ok(Verb::Dump),
            "INFO" => Ok(Verb::Info),
            "PING" => Ok(Verb::Ping),
            "VERSION" => Ok(Verb::Version),
            "ERROR" => Ok(Verb::Error),
            "ADDID" => Ok(Verb::AddId),
            "REMOVEID" => Ok(Verb::RemoveId),
            "QUERY" => Ok(Verb::Query),
            other => Err(McmpError::syntax(format!(
                "unrecognised MCMP verb \"{other}\""
            ))),
        }
    }
}

/// `Accept` header selector for DUMP/INFO (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Text,
    Xml,
}

impl Accept {
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.contains("text/xml") => Accept::Xml,
            _ => Accept::Text,
        }
    }
}

/// A validated, unique routing token (spec §3). Empty is rejected at
/// construction so `CONFIG`'s "JVMRoute can't be empty" check (spec §4.3)
/// can never be bypassed by constructing one directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JvmRoute(String);

impl JvmRoute {
    pub fn parse(raw: &str) -> Result<Self, McmpError> {
        if raw.is_empty() {
            return Err(McmpError::syntax("JVMRoute can't be empty"));
        }
        if raw.len() > FIELD_CAP_JVM_ROUTE {
            return Err(McmpError::syntax("JVMRoute too big"));
        }
        Ok(Self(raw.to_string()))
    }

    /// The sentinel value a tombstoned node's route is overwritten with
    /// (spec §3, §4.9). Bypasses `parse`'s non-empty check deliberately —
    /// this is the one route value the registry itself produces.
    pub fn removed_sentinel() -> Self {
        Self("REMOVED".to_string())
    }

    pub fn is_removed_sentinel(&self) -> bool {
        self.0 == "REMOVED"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JvmRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single virtual-host alias. Lowercased on construction: aliases are
/// DNS names and DNS names are case-insensitive (RFC 1035 §2.3.3, spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alias(String);

impl Alias {
    pub fn parse(raw: &str) -> Result<Self, McmpError> {
        if raw.is_empty() {
            return Err(McmpError::syntax("Alias can't be empty"));
        }
        if raw.len() > FIELD_CAP_ALIAS {
            return Err(McmpError::syntax("Alias too big"));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A URI path prefix (spec §3, §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextPath(String);

impl ContextPath {
    pub fn parse(raw: &str) -> Result<Self, McmpError> {
        if raw.is_empty() {
            return Err(McmpError::syntax("Context can't be empty"));
        }
        if raw.len() > FIELD_CAP_CONTEXT {
            return Err(McmpError::syntax("Context too big"));
        }
        Ok(Self(raw.to_string()))
    }

    /// Node-scope is signalled by a trailing `/*` or bare `*` (spec §4.4).
    pub fn is_node_scope(raw: &str) -> bool {
        raw == "*" || raw.ends_with("/*")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context lifecycle state (spec §4.8). `Removed` is terminal; the row
/// is freed rather than transitioned into this state and left around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextStatus {
    Enabled,
    Disabled,
    Stopped,
}

impl fmt::Display for ContextStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContextStatus::Enabled => "ENABLED",
            ContextStatus::Disabled => "DISABLED",
            ContextStatus::Stopped => "STOPPED",
        };
        write!(f, "{s}")
    }
}

/// `flushpackets` node tuning (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushPolicy {
    Off,
    On,
    Auto,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        FlushPolicy::Off
    }
}

impl FromStr for FlushPolicy {
    type Err = McmpError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "Off" | "off" | "0" => Ok(FlushPolicy::Off),
            "On" | "on" | "1" => Ok(FlushPolicy::On),
            "Auto" | "auto" => Ok(FlushPolicy::Auto),
            other => Err(McmpError::syntax(format!(
                "invalid flushpackets value \"{other}\""
            ))),
        }
    }
}

/// Worker endpoint scheme (spec §3, §4.3). WebSocket tunnelling rewrites
/// `Http`/`Https` into `Ws`/`Wss` (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    Ajp,
    Http,
    Https,
    Ws,
    Wss,
}

impl Default for Scheme {
    fn default() -> Self {
        Scheme::Ajp
    }
}

impl FromStr for Scheme {
    type Err = McmpError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "ajp" => Ok(Scheme::Ajp),
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            "ws" => Ok(Scheme::Ws),
            "wss" => Ok(Scheme::Wss),
            other => Err(McmpError::syntax(format!("invalid Type value \"{other}\""))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scheme::Ajp => "ajp",
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jvm_route_rejects_empty() {
        assert!(JvmRoute::parse("").is_err());
    }

    #[test]
    fn jvm_route_rejects_oversize() {
        let too_long = "x".repeat(FIELD_CAP_JVM_ROUTE + 1);
        assert!(JvmRoute::parse(&too_long).is_err());
    }

    #[test]
    fn alias_is_lowercased() {
        let alias = Alias::parse("Example.COM").unwrap();
        assert_eq!(alias.as_str(), "example.com");
    }

    #[test]
    fn context_path_detects_node_scope() {
        assert!(ContextPath::is_node_scope("*"));
        assert!(ContextPath::is_node_scope("/foo/*"));
        assert!(!ContextPath::is_node_scope("/foo"));
    }

    #[test]
    fn scheme_round_trips_through_display() {
        for s in [Scheme::Ajp, Scheme::Http, Scheme::Https, Scheme::Ws, Scheme::Wss] {
            let parsed: Scheme = s.to_string().parse().unwrap();
            assert_eq!(parsed, s);
        }
    }

    #[test]
    fn verb_parses_hyphenated_methods() {
        assert_eq!("ENABLE-APP".parse::<Verb>().unwrap(), Verb::EnableApp);
        assert!("BOGUS".parse::<Verb>().is_err());
    }
}
