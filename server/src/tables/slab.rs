use mcmp_shared::{McmpError, TableId};

enum Slot<T> {
    Free { next_free: Option<u32>, generation: u32 },
    Used { value: T, generation: u32 },
}

/// A fixed-capacity arena: the concrete shape behind all six of the
/// spec's "shared tables" (§3). No allocation occurs on the data path
/// (spec §5) — `Table::new` reserves its full capacity up front and
/// every later operation reuses existing storage.
///
/// Grounded on the teacher's arena-of-ids idiom
/// (`server/src/server/main_server.rs`'s `BigMap<UserKey, MainUser>`,
/// `shared/src/world/entity/global_entity_map.rs`'s
/// `BigMap<GlobalEntity, Option<E>>`) with the free-list threaded through
/// unused slots so a freed id is the next one reused, matching spec §3's
/// "a freed slot... may be reused" requirement exactly.
pub struct Table<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
    capacity: usize,
}

impl<T> Table<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            len: 0,
            capacity,
        }
    }

    pub fn max_size(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocate a free slot and store `value` in it, returning its id.
    /// Returns a `Mem` error without mutating anything if the table is
    /// at capacity (spec §3 "Fixed capacity").
    pub fn allocate(&mut self, value: T) -> Result<TableId, McmpError> {
        if let Some(index) = self.free_head {
            let (next_free, generation) = match &self.slots[index as usize] {
                Slot::Free { next_free, generation } => (*next_free, *generation),
                Slot::Used { .. } => unreachable!("free_head must point at a free slot"),
            };
            self.free_head = next_free;
            self.slots[index as usize] = Slot::Used { value, generation };
            self.len += 1;
            return Ok(TableId::new(index, generation));
        }

        if self.slots.len() >= self.capacity {
            return Err(McmpError::mem("table is full"));
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot::Used {
            value,
            generation: 0,
        });
        self.len += 1;
        Ok(TableId::new(index, 0))
    }

    /// Write `value` into a specific slot `id`. Used when the registry
    /// already knows the slot to reuse (spec §4.2's `insert_update`
    /// semantics with `id != -1`).
    pub fn put(&mut self, id: TableId, value: T) {
        let index = id.index();
        while self.slots.len() <= index {
            self.slots.push(Slot::Free {
                next_free: None,
                generation: 0,
            });
        }
        match &self.slots[index] {
            Slot::Free { .. } => self.len += 1,
            Slot::Used { .. } => {}
        }
        self.slots[index] = Slot::Used {
            value,
            generation: id.generation(),
        };
    }

    pub fn read(&self, id: TableId) -> Option<&T> {
        match self.slots.get(id.index())? {
            Slot::Used { value, generation } if *generation == id.generation() => Some(value),
            _ => None,
        }
    }

    pub fn read_mut(&mut self, id: TableId) -> Option<&mut T> {
        match self.slots.get_mut(id.index())? {
            Slot::Used { value, generation } if *generation == id.generation() => Some(value),
            _ => None,
        }
    }

    pub fn remove(&mut self, id: TableId) -> Option<T> {
        match self.slots.get(id.index()) {
            Some(Slot::Used { generation, .. }) if *generation == id.generation() => {
                let index = id.index();
                // Bump the generation of the slot we're freeing so a
                // stale `TableId` pointing at it never resolves again,
                // even once the slot is reused (spec §3 slot reuse).
                let next_generation = id.generation().wrapping_add(1);
                let old = std::mem::replace(
                    &mut self.slots[index],
                    Slot::Free {
                        next_free: self.free_head,
                        generation: next_generation,
                    },
                );
                self.free_head = Some(index as u32);
                self.len -= 1;
                let Slot::Used { value, .. } = old else {
                    unreachable!();
                };
                Some(value)
            }
            _ => None,
        }
    }

    pub fn find<F: Fn(&T) -> bool>(&self, predicate: F) -> Option<TableId> {
        self.iter().find(|(_, v)| predicate(v)).map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TableId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| match slot {
            Slot::Used { value, generation } => {
                Some((TableId::new(index as u32, *generation), value))
            }
            Slot::Free { .. } => None,
        })
    }

    pub fn ids_used(&self) -> Vec<TableId> {
        self.iter().map(|(id, _)| id).collect()
    }
}
