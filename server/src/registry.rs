use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, MutexGuard};

use mcmp_shared::{McmpError, TableId};

use crate::config::ManagerConfig;
use crate::persist::{self, PersistError};
use crate::tables::{Balancer, Context, Domain, Host, Node, SessionId, Table, VersionCounter};

/// Number of node-lock acquisitions a tombstoned node survives, with no
/// dependents left, before its slot is freed for reuse
/// (TOMBSTONED -> FREED).
pub const REMOVE_CHECK_THRESHOLD: u32 = 10;

/// Every table the node lock covers: node, host, context, balancer, and
/// domain. Session-ids are grouped in here too — there is no separate
/// lock for that table and it is display-only, so there is nothing to
/// gain from a seventh mutex.
struct NodeGraph {
    nodes: Table<Node>,
    hosts: Table<Host>,
    balancers: Table<Balancer>,
    domains: Table<Domain>,
    session_ids: Table<SessionId>,
}

/// Thin facade over the six fixed-capacity tables plus the version
/// slot. Locking discipline: `node-shm` (here, `node_graph`) must be
/// taken before `context-shm` (here, `contexts`), and a
/// [`NodeLockGuard`] always takes both together in that order, so the
/// two mutexes can never be acquired in reverse.
pub struct Registry {
    config: ManagerConfig,
    node_graph: Mutex<NodeGraph>,
    contexts: Mutex<Table<Context>>,
    version: VersionCounter,
    /// Unix timestamp this registry was created, reported as the `id`
    /// field of STATUS-RSP/PING-RSP.
    boot_timestamp: u64,
}

impl Registry {
    pub fn new(config: ManagerConfig) -> Self {
        let node_graph = NodeGraph {
            nodes: Table::new(config.max_nodes),
            hosts: Table::new(config.max_hosts),
            balancers: Table::new(config.max_balancers),
            domains: Table::new(config.max_domains),
            session_ids: Table::new(config.max_session_ids),
        };
        let boot_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            node_graph: Mutex::new(node_graph),
            contexts: Mutex::new(Table::new(config.max_contexts)),
            version: VersionCounter::new(),
            boot_timestamp,
            config,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn boot_timestamp(&self) -> u64 {
        self.boot_timestamp
    }

    /// Current version, readable without acquiring any lock — this is
    /// the cheap check a reader makes before deciding whether to rebuild
    /// derived state.
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Acquire the node lock (and, as its protocol requires, the context
    /// lock right after it) for a full CONFIG / *-APP transaction.
    pub fn lock_nodes(&self) -> NodeLockGuard<'_> {
        let graph = self.node_graph.lock();
        let contexts = self.contexts.lock();
        NodeLockGuard {
            registry: self,
            graph,
            contexts,
        }
    }

    /// Acquire only the context lock, for the watchdog-style lone
    /// context read/update (acquired by the reconciler's watchdog when
    /// only context state changes). Never call this while already
    /// holding a [`NodeLockGuard`] on the same
    /// thread — the lock order is node-then-context, not the reverse,
    /// and `parking_lot::Mutex` is not reentrant.
    pub fn lock_contexts(&self) -> ContextLockGuard<'_> {
        ContextLockGuard {
            registry: self,
            contexts: self.contexts.lock(),
        }
    }

    /// Write every table to `<persist_base_path>.<table>`. A no-op call
    /// site is expected to check `config.persist_enabled` first.
    pub fn save_snapshot(&self) -> Result<(), PersistError> {
        let base = &self.config.persist_base_path;
        let graph = self.node_graph.lock();
        persist::save_table(base, "nodes", &graph.nodes)?;
        persist::save_table(base, "hosts", &graph.hosts)?;
        persist::save_table(base, "balancers", &graph.balancers)?;
        persist::save_table(base, "domains", &graph.domains)?;
        persist::save_table(base, "session_ids", &graph.session_ids)?;
        drop(graph);
        persist::save_table(base, "contexts", &*self.contexts.lock())?;
        Ok(())
    }

    /// Construct a registry from whatever snapshot files exist at
    /// `config.persist_base_path`, falling back to empty tables for any
    /// table with no snapshot yet.
    pub fn load(config: ManagerConfig) -> Result<Self, PersistError> {
        let base = config.persist_base_path.clone();
        let node_graph = NodeGraph {
            nodes: persist::load_table(&base, "nodes", config.max_nodes)?,
            hosts: persist::load_table(&base, "hosts", config.max_hosts)?,
            balancers: persist::load_table(&base, "balancers", config.max_balancers)?,
            domains: persist::load_table(&base, "domains", config.max_domains)?,
            session_ids: persist::load_table(&base, "session_ids", config.max_session_ids)?,
        };
        let contexts = persist::load_table(&base, "contexts", config.max_contexts)?;
        let boot_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(Self {
            node_graph: Mutex::new(node_graph),
            contexts: Mutex::new(contexts),
            version: VersionCounter::new(),
            boot_timestamp,
            config,
        })
    }
}

/// Held across a node-scope transaction. Gives mutable access to every
/// table the node lock covers, plus the context table (taken in the
/// mandated order), plus the ability to bump the version counter before
/// releasing.
pub struct NodeLockGuard<'a> {
    registry: &'a Registry,
    graph: MutexGuard<'a, NodeGraph>,
    contexts: MutexGuard<'a, Table<Context>>,
}

impl<'a> NodeLockGuard<'a> {
    pub fn config(&self) -> &ManagerConfig {
        self.registry.config()
    }

    pub fn nodes(&self) -> &Table<Node> {
        &self.graph.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut Table<Node> {
        &mut self.graph.nodes
    }

    pub fn hosts(&self) -> &Table<Host> {
        &self.graph.hosts
    }

    pub fn hosts_mut(&mut self) -> &mut Table<Host> {
        &mut self.graph.hosts
    }

    pub fn contexts(&self) -> &Table<Context> {
        &self.contexts
    }

    pub fn contexts_mut(&mut self) -> &mut Table<Context> {
        &mut self.contexts
    }

    pub fn balancers(&self) -> &Table<Balancer> {
        &self.graph.balancers
    }

    pub fn balancers_mut(&mut self) -> &mut Table<Balancer> {
        &mut self.graph.balancers
    }

    pub fn domains(&self) -> &Table<Domain> {
        &self.graph.domains
    }

    pub fn domains_mut(&mut self) -> &mut Table<Domain> {
        &mut self.graph.domains
    }

    pub fn session_ids(&self) -> &Table<SessionId> {
        &self.graph.session_ids
    }

    pub fn session_ids_mut(&mut self) -> &mut Table<SessionId> {
        &mut self.graph.session_ids
    }

    /// Upsert a balancer by name, creating it with defaults if absent.
    pub fn upsert_balancer(&mut self, name: &str) -> Result<TableId, McmpError> {
        if let Some(id) = self.graph.balancers.find(|b| b.name == name) {
            return Ok(id);
        }
        self.graph
            .balancers
            .allocate(Balancer::new_default(name.to_string()))
    }

    /// Upsert the LB-group ("domain") row for `jvm_route`. A node with
    /// no `Domain` field carries no row here at all — only nodes that
    /// opted into a failover scope get one.
    pub fn upsert_domain(&mut self, domain: &str, balancer: &str, jvm_route: &str) -> Result<TableId, McmpError> {
        if let Some(id) = self
            .graph
            .domains
            .find(|d| d.jvm_route == jvm_route)
        {
            if let Some(row) = self.graph.domains.read_mut(id) {
                row.domain = domain.to_string();
                row.balancer = balancer.to_string();
            }
            return Ok(id);
        }
        self.graph.domains.allocate(Domain {
            domain: domain.to_string(),
            balancer: balancer.to_string(),
            jvm_route: jvm_route.to_string(),
        })
    }

    /// Drop the LB-group row for `jvm_route`, if any — a tombstoned
    /// node no longer belongs to any failover domain.
    pub fn remove_domain_for_route(&mut self, jvm_route: &str) {
        if let Some(id) = self.graph.domains.find(|d| d.jvm_route == jvm_route) {
            self.graph.domains.remove(id);
        }
    }

    /// Cascade-delete every host and context owned by `node_id` (used by
    /// node-scope REMOVE and duplicate-JVMRoute replacement). Must run
    /// under this same lock acquisition as whatever triggered it.
    pub fn cascade_remove_node_dependents(&mut self, node_id: TableId) {
        let host_ids: Vec<TableId> = self
            .graph
            .hosts
            .iter()
            .filter(|(_, h)| h.node_id == node_id)
            .map(|(id, _)| id)
            .collect();
        for id in host_ids {
            self.graph.hosts.remove(id);
        }

        let context_ids: Vec<TableId> = self
            .contexts
            .iter()
            .filter(|(_, c)| c.node_id == node_id)
            .map(|(id, _)| id)
            .collect();
        for id in context_ids {
            self.contexts.remove(id);
        }
    }

    /// Bump the version counter. Must be called before this guard is
    /// dropped for every mutation to the node/host/context graph.
    pub fn bump_version(&self) -> u64 {
        self.registry.version.bump()
    }

    pub fn version(&self) -> u64 {
        self.registry.version()
    }

    /// Advance every tombstoned node's `remove_check` counter and free
    /// the slot of any that has no remaining hosts/contexts and has
    /// crossed [`REMOVE_CHECK_THRESHOLD`]. Called once per node-lock
    /// acquisition by whatever drives the watchdog loop; a command
    /// processor does not need to call this itself.
    pub fn reap_tombstones(&mut self) {
        let candidates: Vec<TableId> = self
            .graph
            .nodes
            .iter()
            .filter(|(_, n)| !n.is_live())
            .map(|(id, _)| id)
            .collect();
        for id in candidates {
            let has_dependents = self.graph.hosts.iter().any(|(_, h)| h.node_id == id)
                || self.contexts.iter().any(|(_, c)| c.node_id == id);
            if has_dependents {
                continue;
            }
            let Some(node) = self.graph.nodes.read_mut(id) else {
                continue;
            };
            node.remove_check += 1;
            if node.remove_check > REMOVE_CHECK_THRESHOLD {
                self.graph.nodes.remove(id);
            }
        }
    }
}

/// Held for a lone context-table operation outside a node-scope
/// transaction.
pub struct ContextLockGuard<'a> {
    registry: &'a Registry,
    contexts: MutexGuard<'a, Table<Context>>,
}

impl<'a> ContextLockGuard<'a> {
    pub fn contexts(&self) -> &Table<Context> {
        &self.contexts
    }

    pub fn contexts_mut(&mut self) -> &mut Table<Context> {
        &mut self.contexts
    }

    pub fn bump_version(&self) -> u64 {
        self.registry.version.bump()
    }
}
