use mcmp_shared::{
    Alias, ContextPath, ContextStatus, FlushPolicy, JvmRoute, McmpError, Scheme,
    FIELD_CAP_BALANCER, FIELD_CAP_HOST,
};

use crate::commands::{comma_list, field, field_all};
use crate::config::ManagerConfig;
use crate::reconciler::WorkerReconciler;
use crate::registry::Registry;
use crate::tables::{Context, Host, Node};

fn parse_bool(raw: &str, default: bool) -> Result<bool, McmpError> {
    if raw.eq_ignore_ascii_case("1") || raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("on") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("0") || raw.eq_ignore_ascii_case("false") || raw.eq_ignore_ascii_case("off") {
        Ok(false)
    } else {
        let _ = default;
        Err(McmpError::syntax(format!("invalid boolean value \"{raw}\"")))
    }
}

fn parse_u32(raw: &str, field_name: &str) -> Result<u32, McmpError> {
    raw.parse()
        .map_err(|_| McmpError::syntax(format!("invalid {field_name} value \"{raw}\"")))
}

fn parse_i32(raw: &str, field_name: &str) -> Result<i32, McmpError> {
    raw.parse()
        .map_err(|_| McmpError::syntax(format!("invalid {field_name} value \"{raw}\"")))
}

/// Strip an IPv6 zone suffix (`fe80::1%eth0` -> `fe80::1`).
fn strip_zone_suffix(host: &str) -> &str {
    match host.find('%') {
        Some(idx) => &host[..idx],
        None => host,
    }
}

struct ConfigFields {
    balancer: String,
    sticky_session: bool,
    sticky_session_cookie: String,
    sticky_session_path: String,
    sticky_session_remove: bool,
    sticky_session_force: bool,
    wait_worker: u32,
    max_attempts: u32,
    jvm_route: JvmRoute,
    domain: Option<String>,
    host: String,
    port: u16,
    scheme: Scheme,
    reversed: bool,
    flush_policy: FlushPolicy,
    flush_wait_micros: u32,
    ping: u32,
    smax: i32,
    ttl: u32,
    timeout: u32,
}

fn parse_fields(tokens: &[(String, String)], config: &ManagerConfig) -> Result<ConfigFields, McmpError> {
    let jvm_route = JvmRoute::parse(field(tokens, "JVMRoute").unwrap_or(""))?;

    let host_raw = field(tokens, "Host").unwrap_or("localhost");
    let host = strip_zone_suffix(host_raw).to_string();
    if host.len() > FIELD_CAP_HOST {
        return Err(McmpError::syntax("Host too big"));
    }

    let port = match field(tokens, "Port") {
        Some(raw) => raw
            .parse()
            .map_err(|_| McmpError::syntax(format!("invalid Port value \"{raw}\"")))?,
        None => 8009,
    };

    let scheme = match field(tokens, "Type") {
        Some(raw) => raw.parse()?,
        None => Scheme::Ajp,
    };

    let balancer_raw = field(tokens, "Balancer").unwrap_or(config.default_balancer.as_str());
    if balancer_raw.len() > FIELD_CAP_BALANCER {
        return Err(McmpError::syntax("Balancer too big"));
    }
    let balancer = balancer_raw.to_ascii_lowercase();
    if balancer != balancer_raw {
        log::warn!("Balancer name \"{balancer_raw}\" contains uppercase; using \"{balancer}\"");
    }

    Ok(ConfigFields {
        balancer,
        sticky_session: match field(tokens, "StickySession") {
            Some(raw) => parse_bool(raw, true)?,
            None => true,
        },
        sticky_session_cookie: field(tokens, "StickySessionCookie")
            .unwrap_or("JSESSIONID")
            .to_string(),
        sticky_session_path: field(tokens, "StickySessionPath")
            .unwrap_or("jsessionid")
            .to_string(),
        sticky_session_remove: match field(tokens, "StickySessionRemove") {
            Some(raw) => parse_bool(raw, false)?,
            None => false,
        },
        sticky_session_force: match field(tokens, "StickySessionForce") {
            Some(raw) => parse_bool(raw, true)?,
            None => true,
        },
        wait_worker: match field(tokens, "WaitWorker") {
            Some(raw) => parse_u32(raw, "WaitWorker")?,
            None => 0,
        },
        max_attempts: match field(tokens, "Maxattempts") {
            Some(raw) => parse_u32(raw, "Maxattempts")?,
            None => 1,
        },
        jvm_route,
        domain: field(tokens, "Domain").map(str::to_string),
        host,
        port,
        scheme,
        reversed: match field(tokens, "Reversed") {
            Some(raw) => parse_bool(raw, false)?,
            None => false,
        },
        flush_policy: match field(tokens, "flushpackets") {
            Some(raw) => raw.parse()?,
            None => FlushPolicy::Off,
        },
        flush_wait_micros: match field(tokens, "flushwait") {
            Some(raw) => parse_u32(raw, "flushwait")?,
            None => 0,
        },
        ping: match field(tokens, "ping") {
            Some(raw) => parse_u32(raw, "ping")?,
            None => 10,
        },
        smax: match field(tokens, "smax") {
            Some(raw) => parse_i32(raw, "smax")?,
            None => -1,
        },
        ttl: match field(tokens, "ttl") {
            Some(raw) => parse_u32(raw, "ttl")?,
            None => 60,
        },
        timeout: match field(tokens, "Timeout") {
            Some(raw) => parse_u32(raw, "Timeout")?,
            None => 0,
        },
    })
}

/// Run one CONFIG transaction end to end. All ten steps run under one
/// node-lock acquisition; whatever this function mutates before
/// returning an error is kept — failure partway through must still
/// leave the registry consistent (most directly, step 2's own
/// tombstone-then-error path).
pub fn handle(
    registry: &Registry,
    reconciler: &dyn WorkerReconciler,
    tokens: &[(String, String)],
) -> Result<(), McmpError> {
    let fields = parse_fields(tokens, registry.config())?;

    let alias_groups: Vec<&str> = field_all(tokens, "Alias").collect();
    let context_groups: Vec<&str> = field_all(tokens, "Context").collect();
    if alias_groups.len() != context_groups.len() {
        return Err(McmpError::syntax(
            "Alias without following Context, or Context without preceding Alias",
        ));
    }

    let mut guard = registry.lock_nodes();
    let config = guard.config().clone();

    // Step 1: upsert the balancer and apply any policy fields this
    // request carries.
    let balancer_id = guard.upsert_balancer(&fields.balancer)?;
    if let Some(balancer) = guard.balancers_mut().read_mut(balancer_id) {
        balancer.sticky_session = fields.sticky_session;
        balancer.sticky_session_cookie = fields.sticky_session_cookie.clone();
        balancer.sticky_session_path = fields.sticky_session_path.clone();
        balancer.sticky_session_remove = fields.sticky_session_remove;
        balancer.sticky_session_force = fields.sticky_session_force;
        balancer.timeout = fields.wait_worker;
        balancer.max_attempts = fields.max_attempts;
    }

    // Configuration-driven rewrites.
    let mut scheme = fields.scheme;
    let mut upgrade_header = None;
    if config.websocket_tunnel_enabled {
        scheme = match scheme {
            Scheme::Http => {
                upgrade_header = Some(config.websocket_upgrade_header.clone());
                Scheme::Ws
            }
            Scheme::Https => {
                upgrade_header = Some(config.websocket_upgrade_header.clone());
                Scheme::Wss
            }
            other => other,
        };
    }
    let ajp_secret = if scheme == Scheme::Ajp {
        config.ajp_secret.clone()
    } else {
        None
    };

    let mut candidate = Node {
        jvm_route: fields.jvm_route.clone(),
        balancer: fields.balancer.clone(),
        domain: fields.domain.clone(),
        host: fields.host.clone(),
        port: fields.port,
        scheme,
        upgrade_header,
        ajp_secret,
        reversed: fields.reversed,
        removed: false,
        flush_policy: fields.flush_policy,
        flush_wait_micros: fields.flush_wait_micros,
        ping: fields.ping,
        smax: fields.smax,
        ttl: fields.ttl,
        timeout: fields.timeout,
        response_field_size: config.response_field_size,
        last_update: guard.version(),
        remove_check: 0,
        worker_stats: None,
    };

    // Step 2: an existing node with this JVMRoute.
    let mut id = None;
    if let Some(existing_id) = guard.nodes().find(|n| n.is_live() && n.jvm_route == candidate.jvm_route) {
        let existing = guard.nodes().read(existing_id).expect("just found").clone();
        if existing.identity() == candidate.identity() {
            id = Some(existing_id);
            candidate.worker_stats = existing.worker_stats.clone();
        } else {
            guard.nodes_mut().read_mut(existing_id).expect("just found").tombstone();
            guard.cascade_remove_node_dependents(existing_id);
            guard.remove_domain_for_route(candidate.jvm_route.as_str());
            guard.bump_version();
            return Err(McmpError::mem(format!(
                "Can't update or insert node with \"{}\" JVMRoute",
                candidate.jvm_route
            )));
        }
    }

    // Step 3: a different live node sharing the worker-identity tuple.
    let conflict = guard.nodes().iter().find(|(other_id, other)| {
        other.is_live() && Some(*other_id) != id && other.identity() == candidate.identity()
    });
    if conflict.is_some() {
        return Err(McmpError::mem(format!(
            "Can't update or insert node with \"{}\" JVMRoute",
            candidate.jvm_route
        )));
    }

    // Step 4: ask the reconciler whether a proxy worker already exists.
    let mut clean = true;
    let mut worker_handle = None;
    let mut reused_slot = None;
    if let Some((handle, worker_node_id)) =
        reconciler.proxy_node_getid(&candidate.balancer, candidate.scheme, &candidate.host, candidate.port)
    {
        match (id, worker_node_id) {
            (Some(existing), Some(worker_id)) if existing == worker_id => {
                // same node id on both sides, proceed clean
            }
            _ => {
                clean = false;
                worker_handle = Some(handle);
                // Only trust a reconciler-supplied node id that actually
                // resolves to a real slot in our own table — an id the
                // embedding proxy invents or has gone stale on must never
                // be allowed to grow a table past its fixed capacity.
                if let Some(worker_id) = worker_node_id {
                    if let Some(previous) = guard.nodes().read(worker_id) {
                        candidate.worker_stats = previous.worker_stats.clone();
                        reused_slot = Some(worker_id);
                        id = Some(worker_id);
                    }
                }
            }
        }
    } else if id.is_none() {
        // find_node_byhostport: a tombstoned node at this address is
        // rehydrated in place rather than allocating a new slot.
        if let Some(tombstoned_id) = guard.nodes().find(|n| {
            !n.is_live() && n.host == candidate.host && n.port == candidate.port
        }) {
            clean = false;
            if let Some(previous) = guard.nodes().read(tombstoned_id) {
                candidate.worker_stats = previous.worker_stats.clone();
            }
            id = Some(tombstoned_id);
        }
    }

    // Step 5: still no id — ask for a free one, bounded by the worker
    // table's configured maximum, then allocate our own slot.
    if id.is_none() && reconciler.proxy_node_get_free_id(config.max_nodes).is_none() {
        return Err(McmpError::mem("no free node id available"));
    }

    // Step 6: upsert.
    let final_id = match id {
        Some(existing_id) => {
            guard.nodes_mut().put(existing_id, candidate.clone());
            existing_id
        }
        None => match guard.nodes_mut().allocate(candidate.clone()) {
            Ok(new_id) => new_id,
            Err(err) => {
                if let Some(slot) = reused_slot {
                    if let Some(node) = guard.nodes_mut().read_mut(slot) {
                        node.tombstone();
                    }
                }
                return Err(err);
            }
        },
    };

    // Step 7: re-enable the worker in place when we spliced its stats.
    if !clean {
        if let Some(handle) = worker_handle {
            reconciler.reenable_proxy_worker(handle, &candidate);
        }
    }

    // Step 8.
    guard.bump_version();

    // Maintain the LB-group ("domain") table alongside the node's own
    // `Domain` field: a node that names a failover scope gets one row
    // there, keyed by its JVMRoute.
    if let Some(domain) = &fields.domain {
        guard.upsert_domain(domain, &fields.balancer, fields.jvm_route.as_str())?;
    } else {
        guard.remove_domain_for_route(fields.jvm_route.as_str());
    }

    // Step 9: install aliases/contexts, one dense vhost-id per group.
    let mut next_vhost = guard
        .hosts()
        .iter()
        .filter(|(_, h)| h.node_id == final_id)
        .map(|(_, h)| h.vhost_id)
        .max()
        .unwrap_or(0)
        + 1;
    for (alias_raw, context_raw) in alias_groups.iter().zip(context_groups.iter()) {
        let vhost_id = next_vhost;
        next_vhost += 1;
        for alias_str in comma_list(alias_raw) {
            let alias = Alias::parse(alias_str)?;
            guard.hosts_mut().allocate(Host {
                node_id: final_id,
                vhost_id,
                alias: alias.as_str().to_string(),
            })?;
        }
        for path_str in comma_list(context_raw) {
            let path = ContextPath::parse(path_str)?;
            guard.contexts_mut().allocate(Context {
                node_id: final_id,
                vhost_id,
                path: path.as_str().to_string(),
                status: ContextStatus::Stopped,
                nb_requests: 0,
            })?;
        }
    }

    // Step 10 (lock release, optional balancer-manager push) happens
    // implicitly when `guard` drops; pushing worker parameters to a
    // co-resident balancer manager is part of the embedding proxy, out
    // of scope here.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManagerConfig;
    use crate::reconciler::{NullReconciler, ProbeStatus, WorkerHandle, WorkerReconciler};
    use mcmp_shared::TableId;

    /// A reconciler double that hands back a fixed, caller-supplied node
    /// id on every lookup — used to simulate a worker table reporting a
    /// stale id (e.g. one whose slot has since been freed and reused,
    /// bumping its generation). The registry must never trust such an id
    /// blindly — fixed table capacity must hold even against a
    /// misbehaving or stale external worker table.
    struct FixedIdReconciler(TableId);

    impl WorkerReconciler for FixedIdReconciler {
        fn proxy_node_getid(
            &self,
            _balancer: &str,
            _scheme: mcmp_shared::Scheme,
            _host: &str,
            _port: u16,
        ) -> Option<(WorkerHandle, Option<TableId>)> {
            Some((1, Some(self.0)))
        }

        fn proxy_node_get_free_id(&self, table_size: usize) -> Option<u32> {
            if table_size == 0 {
                None
            } else {
                Some(0)
            }
        }

        fn reenable_proxy_worker(&self, _worker: WorkerHandle, _node: &Node) {}

        fn proxy_node_isup(&self, _id: TableId, _load: i32) -> ProbeStatus {
            ProbeStatus::Ok
        }

        fn proxy_host_isup(&self, _scheme: mcmp_shared::Scheme, _host: &str, _port: u16) -> ProbeStatus {
            ProbeStatus::Ok
        }
    }

    fn tokens(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn fresh_config_creates_node_host_and_context() {
        let registry = Registry::new(ManagerConfig::default());
        let reconciler = NullReconciler;
        let body = tokens(&[
            ("JVMRoute", "node1"),
            ("Host", "10.0.0.1"),
            ("Port", "8009"),
            ("Type", "ajp"),
            ("Alias", "example.com"),
            ("Context", "/app"),
        ]);

        handle(&registry, &reconciler, &body).unwrap();

        let guard = registry.lock_nodes();
        assert_eq!(guard.nodes().len(), 1);
        assert_eq!(guard.hosts().len(), 1);
        assert_eq!(guard.contexts().len(), 1);
        assert_eq!(registry.version(), 1);
    }

    #[test]
    fn duplicate_jvm_route_different_endpoint_tombstones_and_errors() {
        let registry = Registry::new(ManagerConfig::default());
        let reconciler = NullReconciler;
        handle(
            &registry,
            &reconciler,
            &tokens(&[
                ("JVMRoute", "node1"),
                ("Host", "10.0.0.1"),
                ("Port", "8009"),
                ("Type", "ajp"),
            ]),
        )
        .unwrap();

        let result = handle(
            &registry,
            &reconciler,
            &tokens(&[
                ("JVMRoute", "node1"),
                ("Host", "10.0.0.2"),
                ("Port", "8009"),
                ("Type", "ajp"),
            ]),
        );

        assert!(result.is_err());
        let guard = registry.lock_nodes();
        assert!(guard.nodes().iter().all(|(_, n)| !n.is_live()));
    }

    #[test]
    fn slot_is_reused_after_tombstoning() {
        let registry = Registry::new(ManagerConfig::default());
        let reconciler = NullReconciler;
        handle(
            &registry,
            &reconciler,
            &tokens(&[("JVMRoute", "node1"), ("Host", "10.0.0.1"), ("Port", "8009"), ("Type", "ajp")]),
        )
        .unwrap();
        let _ = handle(
            &registry,
            &reconciler,
            &tokens(&[("JVMRoute", "node1"), ("Host", "10.0.0.2"), ("Port", "8009"), ("Type", "ajp")]),
        );

        handle(
            &registry,
            &reconciler,
            &tokens(&[("JVMRoute", "node2"), ("Host", "10.0.0.1"), ("Port", "8009"), ("Type", "ajp")]),
        )
        .unwrap();

        let guard = registry.lock_nodes();
        let live: Vec<_> = guard.nodes().iter().filter(|(_, n)| n.is_live()).collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].1.jvm_route.as_str(), "node2");
    }

    #[test]
    fn missing_jvm_route_is_syntax_error() {
        let registry = Registry::new(ManagerConfig::default());
        let reconciler = NullReconciler;
        let result = handle(&registry, &reconciler, &tokens(&[("Host", "10.0.0.1")]));
        assert!(result.is_err());
        assert_eq!(registry.version(), 0);
    }

    #[test]
    fn capacity_exhaustion_leaves_existing_node_untouched() {
        let mut config = ManagerConfig::default();
        config.max_nodes = 1;
        let registry = Registry::new(config);
        let reconciler = NullReconciler;
        handle(
            &registry,
            &reconciler,
            &tokens(&[("JVMRoute", "nodeA"), ("Host", "10.0.0.1"), ("Port", "8009")]),
        )
        .unwrap();

        let result = handle(
            &registry,
            &reconciler,
            &tokens(&[("JVMRoute", "nodeB"), ("Host", "10.0.0.2"), ("Port", "9009")]),
        );

        assert!(result.is_err());
        let guard = registry.lock_nodes();
        assert_eq!(guard.nodes().len(), 1);
        assert_eq!(guard.nodes().find(|n| n.jvm_route.as_str() == "nodeA"), guard.nodes().find(|n| n.is_live()));
    }

    #[test]
    fn oversize_host_field_is_a_syntax_error() {
        let registry = Registry::new(ManagerConfig::default());
        let reconciler = NullReconciler;
        let too_long_host = "h".repeat(mcmp_shared::FIELD_CAP_HOST + 1);
        let result = handle(
            &registry,
            &reconciler,
            &tokens(&[("JVMRoute", "node1"), ("Host", &too_long_host)]),
        );
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind, mcmp_shared::McmpErrorKind::Syntax);
    }

    #[test]
    fn oversize_balancer_field_is_a_syntax_error() {
        let registry = Registry::new(ManagerConfig::default());
        let reconciler = NullReconciler;
        let too_long_balancer = "b".repeat(mcmp_shared::FIELD_CAP_BALANCER + 1);
        let result = handle(
            &registry,
            &reconciler,
            &tokens(&[("JVMRoute", "node1"), ("Host", "10.0.0.1"), ("Balancer", &too_long_balancer)]),
        );
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind, mcmp_shared::McmpErrorKind::Syntax);
    }

    #[test]
    fn a_custom_default_balancer_is_used_absent_an_explicit_one() {
        let mut config = ManagerConfig::default();
        config.default_balancer = "customcluster".to_string();
        let registry = Registry::new(config);
        let reconciler = NullReconciler;
        handle(
            &registry,
            &reconciler,
            &tokens(&[("JVMRoute", "node1"), ("Host", "10.0.0.1")]),
        )
        .unwrap();

        let guard = registry.lock_nodes();
        let (_, node) = guard.nodes().iter().next().unwrap();
        assert_eq!(node.balancer, "customcluster");
    }

    #[test]
    fn uppercase_balancer_names_are_lowercased() {
        let registry = Registry::new(ManagerConfig::default());
        let reconciler = NullReconciler;
        handle(
            &registry,
            &reconciler,
            &tokens(&[
                ("JVMRoute", "node1"),
                ("Host", "10.0.0.1"),
                ("Port", "8009"),
                ("Balancer", "MyCluster"),
            ]),
        )
        .unwrap();

        let guard = registry.lock_nodes();
        let (_, node) = guard.nodes().iter().next().unwrap();
        assert_eq!(node.balancer, "mycluster");
        assert_eq!(guard.balancers().iter().next().unwrap().1.name, "mycluster");
    }

    #[test]
    fn a_stale_reconciler_supplied_node_id_is_never_trusted_blindly() {
        let registry = Registry::new(ManagerConfig::default());

        let stale_id = {
            handle(
                &registry,
                &NullReconciler,
                &tokens(&[("JVMRoute", "throwaway"), ("Host", "1.2.3.4"), ("Port", "1")]),
            )
            .unwrap();
            let mut guard = registry.lock_nodes();
            let id = guard.nodes().find(|n| n.jvm_route.as_str() == "throwaway").unwrap();
            // Freeing this slot bumps its generation; `id` now refers to
            // nothing live in the table.
            guard.nodes_mut().remove(id);
            id
        };

        let reconciler = FixedIdReconciler(stale_id);
        handle(
            &registry,
            &reconciler,
            &tokens(&[("JVMRoute", "node1"), ("Host", "10.0.0.1"), ("Port", "8009")]),
        )
        .unwrap();

        let guard = registry.lock_nodes();
        // The stale id must not have been reused to overwrite anything,
        // and the new node must have been allocated a fresh, valid slot.
        assert!(guard.nodes().read(stale_id).is_none());
        assert!(guard.nodes().find(|n| n.jvm_route.as_str() == "node1").is_some());
    }

    #[test]
    fn a_domain_field_creates_an_lb_group_row_keyed_by_jvm_route() {
        let registry = Registry::new(ManagerConfig::default());
        let reconciler = NullReconciler;
        handle(
            &registry,
            &reconciler,
            &tokens(&[
                ("JVMRoute", "node1"),
                ("Host", "10.0.0.1"),
                ("Port", "8009"),
                ("Domain", "domainA"),
            ]),
        )
        .unwrap();

        let guard = registry.lock_nodes();
        assert_eq!(guard.domains().len(), 1);
        let (_, row) = guard.domains().iter().next().unwrap();
        assert_eq!(row.domain, "domainA");
        assert_eq!(row.jvm_route, "node1");
        assert_eq!(row.balancer, "mycluster");
    }

    #[test]
    fn tombstoning_a_node_drops_its_lb_group_row() {
        let registry = Registry::new(ManagerConfig::default());
        let reconciler = NullReconciler;
        handle(
            &registry,
            &reconciler,
            &tokens(&[
                ("JVMRoute", "node1"),
                ("Host", "10.0.0.1"),
                ("Port", "8009"),
                ("Domain", "domainA"),
            ]),
        )
        .unwrap();

        // Same JVMRoute, different endpoint: tombstones the old row.
        let _ = handle(
            &registry,
            &reconciler,
            &tokens(&[("JVMRoute", "node1"), ("Host", "10.0.0.2"), ("Port", "8009")]),
        );

        let guard = registry.lock_nodes();
        assert_eq!(guard.domains().len(), 0);
    }
}
