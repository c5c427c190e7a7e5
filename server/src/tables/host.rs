use serde::{Deserialize, Serialize};

use mcmp_shared::TableId;

/// A virtual-host alias (spec §3). `vhost_id` is dense per owning node
/// (spec §3 "Vhost-id density").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub node_id: TableId,
    pub vhost_id: u32,
    pub alias: String,
}
