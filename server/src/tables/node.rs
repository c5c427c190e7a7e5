use serde::{Deserialize, Serialize};

use mcmp_shared::{FlushPolicy, JvmRoute, Scheme};

/// Native proxy worker counters that must survive a CONFIG which re-binds
/// the same (balancer, scheme, host, port) tuple to a new JVMRoute (spec
/// §9, Open Question 1). Kept as an explicit field rather than a raw byte
/// splice — the safe-layout equivalent the spec's design note asks for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub elected: u64,
    pub read: u64,
    pub transferred: u64,
    pub connected: u32,
    pub errors: u32,
}

/// A registered back-end node (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub jvm_route: JvmRoute,
    pub balancer: String,
    pub domain: Option<String>,
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
    pub upgrade_header: Option<String>,
    pub ajp_secret: Option<String>,
    pub reversed: bool,
    pub removed: bool,
    pub flush_policy: FlushPolicy,
    pub flush_wait_micros: u32,
    pub ping: u32,
    pub smax: i32,
    pub ttl: u32,
    pub timeout: u32,
    pub response_field_size: usize,
    pub last_update: u64,
    pub remove_check: u32,
    pub worker_stats: Option<WorkerStats>,
}

impl Node {
    /// The tuple the spec's worker-identity-uniqueness invariant is
    /// defined over (spec §3).
    pub fn identity(&self) -> (&str, Scheme, &str, u16, bool, i32, u32) {
        (
            &self.balancer,
            self.scheme,
            &self.host,
            self.port,
            self.reversed,
            self.smax,
            self.ttl,
        )
    }

    pub fn is_live(&self) -> bool {
        !self.removed && !self.jvm_route.is_removed_sentinel()
    }

    /// Mark this node tombstoned in place (spec §4.9: LIVE -> TOMBSTONED).
    pub fn tombstone(&mut self) {
        self.removed = true;
        self.jvm_route = JvmRoute::removed_sentinel();
        self.remove_check = 0;
    }
}
