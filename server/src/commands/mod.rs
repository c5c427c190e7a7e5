mod app_scope;
mod config;
mod report;
mod status;

use mcmp_shared::{parse_body, Accept, McmpError, Verb};

use crate::reconciler::WorkerReconciler;
use crate::registry::Registry;

/// Where a *-APP verb applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestScope {
    /// Default: the contexts named by one `Alias`+`Context` pair.
    Context,
    /// Path ends `/*` or is bare `*`: every host+context owned by the node.
    Node,
    /// UI-only `Range=DOMAIN`: every node whose LB group matches.
    Domain,
}

impl RequestScope {
    /// Resolve scope from the path-derived node-scope flag and the
    /// token-derived `Range=DOMAIN` override (UI only). Domain scope
    /// wins if present; otherwise the path decides.
    pub fn resolve(path_is_node_scope: bool, tokens: &[(String, String)]) -> Self {
        if field(tokens, "Range").map(|v| v.eq_ignore_ascii_case("DOMAIN")) == Some(true) {
            RequestScope::Domain
        } else if path_is_node_scope {
            RequestScope::Node
        } else {
            RequestScope::Context
        }
    }
}

/// Case-insensitive lookup of the first occurrence of `key`. Tokens may
/// repeat (`Alias`, `Context`); use [`field_all`] when every occurrence
/// matters.
pub(crate) fn field<'a>(tokens: &'a [(String, String)], key: &str) -> Option<&'a str> {
    tokens
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

/// Every value paired with `key`, in order, case-insensitive.
pub(crate) fn field_all<'a>(
    tokens: &'a [(String, String)],
    key: &str,
) -> impl Iterator<Item = &'a str> {
    tokens
        .iter()
        .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

/// Split a comma list, dropping empty segments produced by stray commas.
pub(crate) fn comma_list(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Entry point: parses nothing itself (the caller already ran
/// [`mcmp_shared::parse_body`]) and dispatches by verb. Returns the
/// response body on success; an [`McmpError`] is the sender-visible
/// SYNTAX/MEM/GENERAL failure.
pub fn dispatch(
    verb: Verb,
    path_is_node_scope: bool,
    tokens: &[(String, String)],
    accept: Accept,
    registry: &Registry,
    reconciler: &dyn WorkerReconciler,
) -> Result<String, McmpError> {
    match verb {
        Verb::Config => config::handle(registry, reconciler, tokens).map(|_| String::new()),
        Verb::EnableApp => {
            let scope = RequestScope::resolve(path_is_node_scope, tokens);
            app_scope::handle_enable(registry, tokens, scope).map(|_| String::new())
        }
        Verb::DisableApp => {
            let scope = RequestScope::resolve(path_is_node_scope, tokens);
            app_scope::handle_disable(registry, tokens, scope).map(|_| String::new())
        }
        Verb::StopApp => {
            let scope = RequestScope::resolve(path_is_node_scope, tokens);
            app_scope::handle_stop(registry, tokens, scope)
        }
        Verb::RemoveApp => {
            let scope = RequestScope::resolve(path_is_node_scope, tokens);
            app_scope::handle_remove(registry, tokens, scope).map(|_| String::new())
        }
        Verb::Status => status::handle_status(registry, reconciler, tokens),
        Verb::Ping => status::handle_ping(registry, reconciler, tokens),
        Verb::Dump => report::handle_dump(registry, accept),
        Verb::Info => report::handle_info(registry, accept),
        Verb::Version => Ok(report::handle_version()),
        Verb::Error | Verb::AddId | Verb::RemoveId | Verb::Query => Err(McmpError::general(
            format!("{verb:?} is recognised but not implemented"),
        )),
    }
}

/// Full receiver entry point: enforces the configured max message size
/// (spec §6), tokenizes the raw body, then dispatches. `dispatch` itself
/// stays usable on its own for callers that already have tokens (e.g. a
/// UI-initiated command built from query parameters rather than a body).
pub fn receive(
    verb: Verb,
    path_is_node_scope: bool,
    body: &str,
    accept: Accept,
    registry: &Registry,
    reconciler: &dyn WorkerReconciler,
) -> Result<String, McmpError> {
    if body.len() > registry.config().max_message_size {
        return Err(McmpError::syntax("MCMP message exceeds the configured maximum size"));
    }
    let tokens = parse_body(body)?;
    dispatch(verb, path_is_node_scope, &tokens, accept, registry, reconciler)
}
