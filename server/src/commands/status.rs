use mcmp_shared::McmpError;

use crate::commands::field;
use crate::reconciler::{ProbeStatus, WorkerReconciler};
use crate::registry::Registry;

fn state_str(status: ProbeStatus) -> &'static str {
    match status {
        ProbeStatus::Ok => "OK",
        ProbeStatus::NotOk => "NOTOK",
    }
}

/// `Type=STATUS-RSP&JVMRoute=…&State={OK|NOTOK}&id=<boot-timestamp>`.
/// `Load == -1` means broken, `Load == 0` means standby; both are
/// handed straight to the reconciler's probe.
pub fn handle_status(
    registry: &Registry,
    reconciler: &dyn WorkerReconciler,
    tokens: &[(String, String)],
) -> Result<String, McmpError> {
    let jvm_route = field(tokens, "JVMRoute").ok_or_else(|| McmpError::syntax("JVMRoute is mandatory"))?;
    let load: i32 = match field(tokens, "Load") {
        Some(raw) => raw
            .parse()
            .map_err(|_| McmpError::syntax(format!("invalid Load value \"{raw}\"")))?,
        None => 0,
    };
    if !(-1..=100).contains(&load) {
        return Err(McmpError::syntax("Load out of range [-1, 100]"));
    }

    let guard = registry.lock_nodes();
    let node_id = guard
        .nodes()
        .find(|n| n.is_live() && n.jvm_route.as_str() == jvm_route)
        .ok_or_else(|| McmpError::mem(format!("unknown JVMRoute \"{jvm_route}\"")))?;
    drop(guard);

    let state = reconciler.proxy_node_isup(node_id, load);
    Ok(format!(
        "Type=STATUS-RSP&JVMRoute={jvm_route}&State={}&id={}",
        state_str(state),
        registry.boot_timestamp()
    ))
}

/// Three modes: `JVMRoute` alone pings a known node, `Scheme+Host+Port`
/// pings an arbitrary endpoint, no fields at all reports manager
/// liveness.
pub fn handle_ping(
    registry: &Registry,
    reconciler: &dyn WorkerReconciler,
    tokens: &[(String, String)],
) -> Result<String, McmpError> {
    let state = if let Some(jvm_route) = field(tokens, "JVMRoute") {
        let guard = registry.lock_nodes();
        match guard.nodes().find(|n| n.is_live() && n.jvm_route.as_str() == jvm_route) {
            Some(node_id) => {
                drop(guard);
                reconciler.proxy_node_isup(node_id, 0)
            }
            None => ProbeStatus::NotOk,
        }
    } else if let (Some(scheme), Some(host), Some(port)) =
        (field(tokens, "Scheme"), field(tokens, "Host"), field(tokens, "Port"))
    {
        let scheme = scheme.parse()?;
        let port: u16 = port
            .parse()
            .map_err(|_| McmpError::syntax(format!("invalid Port value \"{port}\"")))?;
        reconciler.proxy_host_isup(scheme, host, port)
    } else {
        ProbeStatus::Ok
    };

    Ok(format!("Type=PING-RSP&State={}&id={}", state_str(state), registry.boot_timestamp()))
}
