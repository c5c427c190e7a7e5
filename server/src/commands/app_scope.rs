use log::warn;
use mcmp_shared::{ContextPath, ContextStatus, McmpError, TableId};

use crate::commands::{comma_list, field, RequestScope};
use crate::registry::{NodeLockGuard, Registry};

fn mandatory<'a>(tokens: &'a [(String, String)], key: &str) -> Result<&'a str, McmpError> {
    field(tokens, key).ok_or_else(|| McmpError::syntax(format!("{key} is mandatory")))
}

fn find_live_node(guard: &NodeLockGuard<'_>, jvm_route: &str) -> Option<TableId> {
    guard.nodes().find(|n| n.is_live() && n.jvm_route.as_str() == jvm_route)
}

fn nodes_in_domain(guard: &NodeLockGuard<'_>, domain: &Option<String>) -> Vec<TableId> {
    match domain {
        None => vec![],
        Some(domain) => guard
            .nodes()
            .iter()
            .filter(|(_, n)| n.is_live() && n.domain.as_deref() == Some(domain.as_str()))
            .map(|(id, _)| id)
            .collect(),
    }
}

/// Resolve the (node-id, vhost-id) a context-scope request targets: a
/// node is identified by the first alias in its list.
fn resolve_vhost(guard: &NodeLockGuard<'_>, node_id: TableId, first_alias: &str) -> Option<u32> {
    guard
        .hosts()
        .iter()
        .find(|(_, h)| h.node_id == node_id && h.alias == first_alias.to_ascii_lowercase())
        .map(|(_, h)| h.vhost_id)
}

fn context_ids_for(guard: &NodeLockGuard<'_>, node_id: TableId, vhost_id: u32, paths: &[&str]) -> Vec<TableId> {
    guard
        .contexts()
        .iter()
        .filter(|(_, c)| c.node_id == node_id && c.vhost_id == vhost_id && paths.contains(&c.path.as_str()))
        .map(|(id, _)| id)
        .collect()
}

fn all_context_ids_for_node(guard: &NodeLockGuard<'_>, node_id: TableId) -> Vec<TableId> {
    guard
        .contexts()
        .iter()
        .filter(|(_, c)| c.node_id == node_id)
        .map(|(id, _)| id)
        .collect()
}

/// Warn (non-fatally) if any of `paths` is already live under a
/// different balancer — ENABLE-APP's misconfiguration check.
fn warn_on_cross_balancer_context(guard: &NodeLockGuard<'_>, this_balancer: &str, paths: &[&str]) {
    for &path in paths {
        let clash = guard.contexts().iter().any(|(_, c)| {
            c.path == path
                && c.status == ContextStatus::Enabled
                && guard
                    .nodes()
                    .read(c.node_id)
                    .map(|n| n.balancer != this_balancer)
                    .unwrap_or(false)
        });
        if clash {
            warn!("context \"{path}\" is already enabled on a different balancer");
        }
    }
}

enum ScopeTarget {
    /// Gone already (node-scope REMOVE-APP idempotency).
    AlreadyGone,
    Nodes(Vec<TableId>),
}

fn resolve_target_nodes(guard: &NodeLockGuard<'_>, jvm_route: &str, scope: RequestScope) -> Result<ScopeTarget, McmpError> {
    let Some(node_id) = find_live_node(guard, jvm_route) else {
        return Ok(ScopeTarget::AlreadyGone);
    };
    match scope {
        RequestScope::Domain => {
            let domain = guard.nodes().read(node_id).and_then(|n| n.domain.clone());
            Ok(ScopeTarget::Nodes(nodes_in_domain(guard, &domain)))
        }
        RequestScope::Node | RequestScope::Context => Ok(ScopeTarget::Nodes(vec![node_id])),
    }
}

fn set_context_status(guard: &mut NodeLockGuard<'_>, context_id: TableId, status: ContextStatus) {
    if let Some(context) = guard.contexts_mut().read_mut(context_id) {
        context.status = status;
    }
}

fn remove_context_and_maybe_host(guard: &mut NodeLockGuard<'_>, context_id: TableId) {
    let Some(context) = guard.contexts().read(context_id).cloned() else {
        return;
    };
    guard.contexts_mut().remove(context_id);
    let any_left = guard
        .contexts()
        .iter()
        .any(|(_, c)| c.node_id == context.node_id && c.vhost_id == context.vhost_id);
    if !any_left {
        if let Some(host_id) = guard
            .hosts()
            .find(|h| h.node_id == context.node_id && h.vhost_id == context.vhost_id)
        {
            guard.hosts_mut().remove(host_id);
        }
    }
}

fn context_ids_in_scope(guard: &NodeLockGuard<'_>, node_id: TableId, scope: RequestScope, first_alias: &str, paths: &[&str]) -> Vec<TableId> {
    match scope {
        RequestScope::Node | RequestScope::Domain => all_context_ids_for_node(guard, node_id),
        RequestScope::Context => match resolve_vhost(guard, node_id, first_alias) {
            Some(vhost_id) => context_ids_for(guard, node_id, vhost_id, paths),
            None => vec![],
        },
    }
}

pub fn handle_enable(registry: &Registry, tokens: &[(String, String)], scope: RequestScope) -> Result<(), McmpError> {
    let jvm_route = mandatory(tokens, "JVMRoute")?;
    let alias_list = comma_list(mandatory(tokens, "Alias")?);
    let context_list = comma_list(mandatory(tokens, "Context")?);
    let first_alias = alias_list.first().copied().unwrap_or("");

    let mut guard = registry.lock_nodes();
    let ScopeTarget::Nodes(node_ids) = resolve_target_nodes(&guard, jvm_route, scope)? else {
        return Ok(());
    };
    for node_id in node_ids {
        let this_balancer = guard.nodes().read(node_id).map(|n| n.balancer.clone()).unwrap_or_default();
        warn_on_cross_balancer_context(&guard, &this_balancer, &context_list);
        let ids = context_ids_in_scope(&guard, node_id, scope, first_alias, &context_list);
        for id in ids {
            set_context_status(&mut guard, id, ContextStatus::Enabled);
        }
    }
    guard.bump_version();
    Ok(())
}

pub fn handle_disable(registry: &Registry, tokens: &[(String, String)], scope: RequestScope) -> Result<(), McmpError> {
    let jvm_route = mandatory(tokens, "JVMRoute")?;
    let alias_list = comma_list(mandatory(tokens, "Alias")?);
    let context_list = comma_list(mandatory(tokens, "Context")?);
    let first_alias = alias_list.first().copied().unwrap_or("");

    let mut guard = registry.lock_nodes();
    let ScopeTarget::Nodes(node_ids) = resolve_target_nodes(&guard, jvm_route, scope)? else {
        return Ok(());
    };
    for node_id in node_ids {
        let ids = context_ids_in_scope(&guard, node_id, scope, first_alias, &context_list);
        for id in ids {
            set_context_status(&mut guard, id, ContextStatus::Disabled);
        }
    }
    guard.bump_version();
    Ok(())
}

/// Returns the response body: empty for node/domain scope, or
/// `Type=STOP-APP-RSP&...&Requests=<n>` for a context-scope request —
/// this verb alone emits `JvmRoute=` in mixed case.
pub fn handle_stop(registry: &Registry, tokens: &[(String, String)], scope: RequestScope) -> Result<String, McmpError> {
    let jvm_route = mandatory(tokens, "JVMRoute")?;
    let alias_list = comma_list(mandatory(tokens, "Alias")?);
    let context_list = comma_list(mandatory(tokens, "Context")?);
    let first_alias = alias_list.first().copied().unwrap_or("");

    let mut guard = registry.lock_nodes();
    let ScopeTarget::Nodes(node_ids) = resolve_target_nodes(&guard, jvm_route, scope)? else {
        return Ok(String::new());
    };

    let mut first_requests = None;
    for node_id in node_ids {
        let ids = context_ids_in_scope(&guard, node_id, scope, first_alias, &context_list);
        for id in ids {
            if first_requests.is_none() {
                first_requests = guard.contexts().read(id).map(|c| c.nb_requests);
            }
            set_context_status(&mut guard, id, ContextStatus::Stopped);
        }
    }
    guard.bump_version();

    match scope {
        RequestScope::Context => Ok(format!(
            "Type=STOP-APP-RSP&JvmRoute={}&Alias={}&Context={}&Requests={}",
            jvm_route,
            first_alias,
            context_list.first().copied().unwrap_or(""),
            first_requests.unwrap_or(0)
        )),
        RequestScope::Node | RequestScope::Domain => Ok(String::new()),
    }
}

pub fn handle_remove(registry: &Registry, tokens: &[(String, String)], scope: RequestScope) -> Result<(), McmpError> {
    let jvm_route = mandatory(tokens, "JVMRoute")?;
    let alias_list = comma_list(mandatory(tokens, "Alias")?);
    let context_list = comma_list(mandatory(tokens, "Context")?);
    let first_alias = alias_list.first().copied().unwrap_or("");
    for path in &context_list {
        ContextPath::parse(path)?;
    }

    let mut guard = registry.lock_nodes();
    let ScopeTarget::Nodes(node_ids) = resolve_target_nodes(&guard, jvm_route, scope)? else {
        // Already tombstoned or never existed: idempotent success.
        return Ok(());
    };

    for node_id in node_ids {
        match scope {
            RequestScope::Context => {
                let ids = context_ids_in_scope(&guard, node_id, scope, first_alias, &context_list);
                for id in ids {
                    remove_context_and_maybe_host(&mut guard, id);
                }
            }
            RequestScope::Node | RequestScope::Domain => {
                guard.cascade_remove_node_dependents(node_id);
                let route = if let Some(node) = guard.nodes_mut().read_mut(node_id) {
                    let route = node.jvm_route.as_str().to_string();
                    node.tombstone();
                    Some(route)
                } else {
                    None
                };
                if let Some(route) = route {
                    guard.remove_domain_for_route(&route);
                }
            }
        }
    }
    guard.bump_version();
    Ok(())
}
