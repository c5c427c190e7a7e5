use serde::{Deserialize, Serialize};

use mcmp_shared::{ContextStatus, TableId};

/// A URI path prefix on a (node, vhost) with a lifecycle state (spec §3,
/// §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub node_id: TableId,
    pub vhost_id: u32,
    pub path: String,
    pub status: ContextStatus,
    pub nb_requests: u64,
}
