use std::fmt;

use serde::{Deserialize, Serialize};

/// A generational index into one of the registry's fixed-capacity tables.
///
/// All cross-entity references in the registry are `TableId`s, never
/// pointers — the tables live behind an arena so a reference must be
/// able to outlive any particular backing allocation. The generation
/// catches stale ids held across a slot's removal-then-reuse; the
/// registry's tables never hand a caller a bare `usize`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId {
    index: u32,
    generation: u32,
}

impl TableId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({}#{})", self.index, self.generation)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)
    }
}
