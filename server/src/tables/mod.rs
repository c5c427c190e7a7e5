mod balancer;
mod context;
mod domain;
mod host;
mod node;
mod session;
mod slab;
mod version;

pub use balancer::Balancer;
pub use context::Context;
pub use domain::Domain;
pub use host::Host;
pub use node::{Node, WorkerStats};
pub use session::SessionId;
pub use slab::Table;
pub use version::VersionCounter;
