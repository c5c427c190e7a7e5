//! # mcmp-server
//!
//! The stateful half of the cluster manager: fixed-capacity shared
//! tables, the registry facade enforcing cross-table invariants, MCMP
//! command processors, the worker-reconciler interface, and the
//! UI/report surface. `mcmp-shared` carries everything stateless
//! (wire types, the parser, error kinds); this crate is where a request
//! actually changes something.

pub mod commands;
pub mod config;
pub mod persist;
pub mod reconciler;
pub mod registry;
mod tables;
pub mod ui;

pub use config::ManagerConfig;
pub use reconciler::{NullReconciler, ProbeStatus, WorkerHandle, WorkerReconciler};
pub use registry::{ContextLockGuard, NodeLockGuard, Registry, REMOVE_CHECK_THRESHOLD};
pub use tables::{Balancer, Context, Domain, Host, Node, SessionId, Table, WorkerStats};

pub use mcmp_shared::{
    parse_body, Accept, Alias, ContextPath, ContextStatus, FlushPolicy, JvmRoute, McmpError,
    McmpErrorKind, Scheme, TableId, Verb,
};
