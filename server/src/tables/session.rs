use serde::{Deserialize, Serialize};

/// An observed session-id -> JVMRoute mapping, kept only for display
/// (spec §1, §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionId {
    pub session_id: String,
    pub jvm_route: String,
}
