//! # MCMP shared
//! Wire types, percent-decoding and the id primitive shared between the
//! MCMP receiver and everything that consumes its registry. Holds no
//! notion of "a running server" — this crate is the codec/protocol layer
//! shared by the receiver and any future consumer (a status-page
//! renderer, a CLI inspector, ...).

mod error;
mod ids;
mod parser;
mod wire;

pub use error::{McmpError, McmpErrorKind};
pub use ids::TableId;
pub use parser::parse_body;
pub use wire::{
    Accept, Alias, ContextPath, ContextStatus, FlushPolicy, JvmRoute, Scheme, Verb,
    FIELD_CAP_ALIAS, FIELD_CAP_BALANCER, FIELD_CAP_CONTEXT, FIELD_CAP_HOST, FIELD_CAP_JVM_ROUTE,
};
