use serde::{Deserialize, Serialize};

/// An LB-group ("domain") membership row (spec §3): which JVMRoute, on
/// which balancer, belongs to which failover domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub domain: String,
    pub balancer: String,
    pub jvm_route: String,
}
