use std::borrow::Cow;

use thiserror::Error;

/// The three wire-visible error kinds an MCMP response can carry.
///
/// Mirrors the catalogued `Type:` header the sender sees — deliberately
/// flat rather than nested, one variant per concern rather than a
/// wrapped hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McmpErrorKind {
    /// Malformed body, unknown field, oversize field, missing mandatory
    /// field, Alias/Context pairing violated, forbidden decoded character.
    Syntax,
    /// Table full, conflicting worker identity, node still tombstoned,
    /// upsert race.
    Mem,
    /// Anything else the sender needs reported but that doesn't fit the
    /// two catalogued kinds above (e.g. an unimplemented verb).
    General,
}

impl McmpErrorKind {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            McmpErrorKind::Syntax => "SYNTAX",
            McmpErrorKind::Mem => "MEM",
            McmpErrorKind::General => "GENERAL",
        }
    }
}

/// An error reported verbatim to an MCMP sender. No partial mutation ever
/// survives an `Err` of this type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct McmpError {
    pub kind: McmpErrorKind,
    pub message: Cow<'static, str>,
}

impl McmpError {
    pub fn syntax(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: McmpErrorKind::Syntax,
            message: message.into(),
        }
    }

    pub fn mem(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: McmpErrorKind::Mem,
            message: message.into(),
        }
    }

    pub fn general(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: McmpErrorKind::General,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_str_matches_catalogued_header() {
        assert_eq!(McmpErrorKind::Syntax.as_wire_str(), "SYNTAX");
        assert_eq!(McmpErrorKind::Mem.as_wire_str(), "MEM");
        assert_eq!(McmpErrorKind::General.as_wire_str(), "GENERAL");
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = McmpError::syntax("JVMRoute can't be empty");
        assert_eq!(format!("{err}"), "Syntax: JVMRoute can't be empty");
    }
}
