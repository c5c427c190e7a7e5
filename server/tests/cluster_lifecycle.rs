//! End-to-end MCMP scenarios driven through the public dispatch entry
//! point, exercising the receiver -> registry -> reconciler path as a
//! whole rather than one command processor in isolation.

use mcmp_server::commands::dispatch;
use mcmp_server::{Accept, ManagerConfig, NullReconciler, Registry};
use mcmp_shared::{parse_body, Verb};

fn run(registry: &Registry, verb: Verb, node_scope: bool, body: &str) -> Result<String, mcmp_shared::McmpError> {
    let tokens = parse_body(body)?;
    dispatch(verb, node_scope, &tokens, Accept::Text, registry, &NullReconciler)
}

#[test]
fn fresh_config_then_enable_stop_remove_cycle() {
    let registry = Registry::new(ManagerConfig::default());

    run(
        &registry,
        Verb::Config,
        false,
        "JVMRoute=node1&Host=10.0.0.1&Port=8009&Type=ajp&Alias=example.com&Context=/app",
    )
    .unwrap();
    assert_eq!(registry.version(), 1);

    run(&registry, Verb::EnableApp, false, "JVMRoute=node1&Alias=example.com&Context=/app").unwrap();

    let stopped = run(&registry, Verb::StopApp, false, "JVMRoute=node1&Alias=example.com&Context=/app").unwrap();
    assert_eq!(stopped, "Type=STOP-APP-RSP&JvmRoute=node1&Alias=example.com&Context=/app&Requests=0");

    run(&registry, Verb::RemoveApp, false, "JVMRoute=node1&Alias=example.com&Context=/app").unwrap();

    let dump = run(&registry, Verb::Dump, false, "JVMRoute=ignored").unwrap_or_default();
    let _ = dump;
}

#[test]
fn duplicate_jvm_route_on_a_different_endpoint_tombstones_the_old_row() {
    let registry = Registry::new(ManagerConfig::default());
    run(&registry, Verb::Config, false, "JVMRoute=node1&Host=10.0.0.1&Port=8009&Type=ajp").unwrap();

    let result = run(&registry, Verb::Config, false, "JVMRoute=node1&Host=10.0.0.2&Port=8009&Type=ajp");
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().kind, mcmp_shared::McmpErrorKind::Mem);
}

#[test]
fn capacity_exhaustion_reports_mem_and_leaves_existing_node_untouched() {
    let mut config = ManagerConfig::default();
    config.max_nodes = 1;
    let registry = Registry::new(config);

    run(&registry, Verb::Config, false, "JVMRoute=nodeA&Host=10.0.0.1&Port=8009&Type=ajp").unwrap();
    let result = run(&registry, Verb::Config, false, "JVMRoute=nodeB&Host=10.0.0.2&Port=9009&Type=ajp");

    assert!(result.is_err());
    assert_eq!(result.unwrap_err().kind, mcmp_shared::McmpErrorKind::Mem);
    let guard = registry.lock_nodes();
    assert_eq!(guard.nodes().len(), 1);
}

#[test]
fn a_percent_encoded_forbidden_character_is_rejected_before_any_mutation() {
    let registry = Registry::new(ManagerConfig::default());
    let result = run(&registry, Verb::Config, false, "JVMRoute=node1&Host=10.0.0.1&Context=%3Cscript%3E");

    assert!(result.is_err());
    assert_eq!(result.unwrap_err().kind, mcmp_shared::McmpErrorKind::Syntax);
    assert_eq!(registry.version(), 0);
}

#[test]
fn node_scope_path_removes_every_context_and_host_owned_by_the_node() {
    let registry = Registry::new(ManagerConfig::default());
    run(
        &registry,
        Verb::Config,
        false,
        "JVMRoute=node1&Host=10.0.0.1&Port=8009&Type=ajp&Alias=example.com&Context=/app",
    )
    .unwrap();

    run(&registry, Verb::RemoveApp, true, "JVMRoute=node1&Alias=example.com&Context=/app").unwrap();

    let guard = registry.lock_nodes();
    assert_eq!(guard.hosts().len(), 0);
    assert_eq!(guard.contexts().len(), 0);
    assert!(guard.nodes().iter().all(|(_, n)| !n.is_live()));
}

#[test]
fn unimplemented_verbs_are_recognised_but_refused() {
    let registry = Registry::new(ManagerConfig::default());
    let result = run(&registry, Verb::Query, false, "JVMRoute=node1");
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().kind, mcmp_shared::McmpErrorKind::General);
}
