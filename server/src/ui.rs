use uuid::Uuid;

use crate::registry::Registry;

/// Generated once at startup; every action link on the status page
/// must carry a matching `nonce=<uuid>` query parameter or its other
/// parameters are silently dropped.
#[derive(Debug, Clone)]
pub struct Nonce(String);

impl Nonce {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate a nonce carried on an incoming UI request. A mismatch is
    /// never an error the sender sees — the caller drops the other
    /// query parameters and re-renders the page.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Plain-text table dump consumed by DUMP/INFO when `Accept` doesn't ask
/// for XML. Visual fidelity of the HTML page is explicitly out of
/// scope; this is the data surface that matters.
pub fn render_dump_text(registry: &Registry) -> String {
    let guard = registry.lock_nodes();
    let mut out = String::new();
    out.push_str(&format!("version: {}\n", registry.version()));

    for (id, node) in guard.nodes().iter() {
        out.push_str(&format!(
            "node: [{}] JVMRoute: {} Balancer: {} Host: {} Port: {} Type: {}{}\n",
            id,
            node.jvm_route,
            node.balancer,
            node.host,
            node.port,
            node.scheme,
            if node.removed { " (removed)" } else { "" }
        ));
    }
    for (id, balancer) in guard.balancers().iter() {
        out.push_str(&format!(
            "balancer: [{}] Name: {} StickySession: {}\n",
            id, balancer.name, balancer.sticky_session
        ));
    }
    for (id, host) in guard.hosts().iter() {
        out.push_str(&format!(
            "host: [{}] node: {} vhost: {} alias: {}\n",
            id, host.node_id, host.vhost_id, host.alias
        ));
    }
    for (id, context) in guard.contexts().iter() {
        out.push_str(&format!(
            "context: [{}] node: {} vhost: {} path: {} status: {} requests: {}\n",
            id, context.node_id, context.vhost_id, context.path, context.status, context.nb_requests
        ));
    }
    for (id, domain) in guard.domains().iter() {
        out.push_str(&format!(
            "domain: [{}] domain: {} balancer: {} JVMRoute: {}\n",
            id, domain.domain, domain.balancer, domain.jvm_route
        ));
    }
    for (id, session) in guard.session_ids().iter() {
        out.push_str(&format!(
            "sessionid: [{}] id: {} JVMRoute: {}\n",
            id, session.session_id, session.jvm_route
        ));
    }
    out
}

/// XML rendering of the same tables, selected by an `Accept: text/xml`
/// request header (spec §4.6).
pub fn render_dump_xml(registry: &Registry) -> String {
    let guard = registry.lock_nodes();
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\"?>\n");
    out.push_str(&format!("<mcmp version=\"{}\">\n", registry.version()));

    for (id, node) in guard.nodes().iter() {
        out.push_str(&format!(
            "  <node id=\"{}\" jvmRoute=\"{}\" balancer=\"{}\" host=\"{}\" port=\"{}\" type=\"{}\" removed=\"{}\"/>\n",
            id,
            escape_xml(node.jvm_route.as_str()),
            escape_xml(&node.balancer),
            escape_xml(&node.host),
            node.port,
            node.scheme,
            node.removed
        ));
    }
    for (id, host) in guard.hosts().iter() {
        out.push_str(&format!(
            "  <host id=\"{}\" node=\"{}\" vhost=\"{}\" alias=\"{}\"/>\n",
            id,
            host.node_id,
            host.vhost_id,
            escape_xml(&host.alias)
        ));
    }
    for (id, context) in guard.contexts().iter() {
        out.push_str(&format!(
            "  <context id=\"{}\" node=\"{}\" vhost=\"{}\" path=\"{}\" status=\"{}\" requests=\"{}\"/>\n",
            id,
            context.node_id,
            context.vhost_id,
            escape_xml(&context.path),
            context.status,
            context.nb_requests
        ));
    }
    for (id, session) in guard.session_ids().iter() {
        out.push_str(&format!(
            "  <sessionid id=\"{}\" sessionid=\"{}\" jvmRoute=\"{}\"/>\n",
            id,
            escape_xml(&session.session_id),
            escape_xml(&session.jvm_route)
        ));
    }
    out.push_str("</mcmp>\n");
    out
}

/// Minimal HTML status page: one row per node/alias/context plus an
/// action link carrying the required nonce (spec §6). Layout/styling is
/// out of scope (spec §1) — this renders the data, nothing more.
pub fn render_status_html(registry: &Registry, nonce: &Nonce, command_links_enabled: bool) -> String {
    let guard = registry.lock_nodes();
    let mut out = String::from("<html><body><table>\n");
    for (_, node) in guard.nodes().iter().filter(|(_, n)| n.is_live()) {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}:{}</td>",
            node.jvm_route, node.balancer, node.host, node.port
        ));
        if command_links_enabled {
            out.push_str(&format!(
                "<td><a href=\"?cmd=STOP-APP&JVMRoute={}&nonce={}\">stop</a></td>",
                node.jvm_route,
                nonce.as_str()
            ));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table></body></html>\n");
    out
}
