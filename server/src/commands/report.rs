use mcmp_shared::{Accept, McmpError};

use crate::registry::Registry;
use crate::ui;

/// Hard-coded release string emitted by VERSION.
pub const RELEASE: &str = "mcmp-server/0.1.0";
/// Protocol version reported by VERSION and carried in every error
/// response's `Version:` header.
pub const PROTOCOL_VERSION: &str = "0.2.1";

pub fn handle_dump(registry: &Registry, accept: Accept) -> Result<String, McmpError> {
    Ok(match accept {
        Accept::Xml => ui::render_dump_xml(registry),
        Accept::Text => ui::render_dump_text(registry),
    })
}

pub fn handle_info(registry: &Registry, accept: Accept) -> Result<String, McmpError> {
    // INFO enumerates the same tables as DUMP; the two verbs differ in
    // the embedding proxy's own request routing, not in the data this
    // crate produces.
    handle_dump(registry, accept)
}

pub fn handle_version() -> String {
    format!("Type=VERSION-RSP&Release={RELEASE}&Protocol={PROTOCOL_VERSION}")
}
