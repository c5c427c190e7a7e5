use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the registry (spec §6). Constructed programmatically by
/// the embedder — parsing a configuration-directive grammar is explicitly
/// out of scope (spec §1) — the way the teacher's `ServerConfig`
/// (`server/src/server/server_config.rs`) is a plain struct an embedder
/// builds, not something this crate parses from a file itself.
#[derive(Clone)]
pub struct ManagerConfig {
    /// Max rows in the node table (spec §5 default: 20).
    pub max_nodes: usize,
    /// Max rows in the host (alias) table (spec §5 default: 20).
    pub max_hosts: usize,
    /// Max rows in the context table (spec §5 default: 100).
    pub max_contexts: usize,
    pub max_balancers: usize,
    pub max_session_ids: usize,
    pub max_domains: usize,

    /// Default balancer name new nodes join absent an explicit `Balancer`
    /// (spec §4.3 default: `"mycluster"`).
    pub default_balancer: String,

    /// Base path persisted snapshots are written under; each table
    /// becomes `<base>.<table>` (spec §6).
    pub persist_base_path: PathBuf,
    pub persist_enabled: bool,

    /// Whether UI-initiated command links must carry a matching nonce
    /// (spec §6).
    pub nonce_checking: bool,
    /// Whether the status page emits action links at all (spec §6).
    pub command_links_enabled: bool,

    /// Largest MCMP request body this receiver will parse (spec §6).
    pub max_message_size: usize,

    /// WebSocket tunnelling: rewrites `http`/`https` worker types to
    /// `ws`/`wss` at CONFIG time (spec §4.3).
    pub websocket_tunnel_enabled: bool,
    pub websocket_upgrade_header: String,

    /// AJP secret copied into nodes whose `Type == "ajp"` (spec §4.3).
    pub ajp_secret: Option<String>,

    /// Cap on a node's response field size (spec §3).
    pub response_field_size: usize,

    /// How long a PING against an arbitrary endpoint waits before being
    /// treated as down (external probe timeout; not specified
    /// numerically by spec §4.5, kept here as the one config knob the
    /// probe collaborator is expected to honour).
    pub ping_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_nodes: 20,
            max_hosts: 20,
            max_contexts: 100,
            max_balancers: 20,
            max_session_ids: 512,
            max_domains: 20,
            default_balancer: "mycluster".to_string(),
            persist_base_path: PathBuf::from("logs/manager"),
            persist_enabled: false,
            nonce_checking: true,
            command_links_enabled: true,
            max_message_size: 1024 * 8,
            websocket_tunnel_enabled: false,
            websocket_upgrade_header: "websocket".to_string(),
            ajp_secret: None,
            response_field_size: 8192,
            ping_timeout: Duration::from_secs(10),
        }
    }
}
