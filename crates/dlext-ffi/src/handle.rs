//! Typed handle tables for objects owned across the C boundary.
//!
//! A handle is laid out as `kind:8 | slot:24 | generation:32`. The kind tag
//! stops a view handle from addressing a sampler or pool slot, and the
//! generation makes a destroyed handle miss once its slot is reused. Zero
//! is never a valid handle.

/// Object family a table hands out handles for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum HandleKind {
    View = 1,
    Sampler = 2,
    Pool = 3,
}

const KIND_SHIFT: u32 = 56;
const SLOT_SHIFT: u32 = 32;
const SLOT_LIMIT: u32 = 1 << 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Parts {
    kind: u8,
    slot: u32,
    generation: u32,
}

impl Parts {
    fn split(handle: u64) -> Self {
        Self {
            kind: (handle >> KIND_SHIFT) as u8,
            slot: ((handle >> SLOT_SHIFT) as u32) & (SLOT_LIMIT - 1),
            generation: handle as u32,
        }
    }

    fn join(self) -> u64 {
        (u64::from(self.kind) << KIND_SHIFT)
            | (u64::from(self.slot) << SLOT_SHIFT)
            | u64::from(self.generation)
    }
}

struct Live<T> {
    generation: u32,
    value: T,
}

/// Slot storage addressed by handles of a single [`HandleKind`].
pub(crate) struct HandleTable<T> {
    kind: HandleKind,
    slots: Vec<Option<Live<T>>>,
    /// Vacant slots with the generation their next occupant gets.
    free: Vec<(u32, u32)>,
}

impl<T> HandleTable<T> {
    pub const fn new(kind: HandleKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Store `value` and mint its handle. `None` once every slot index is
    /// in use.
    pub fn insert(&mut self, value: T) -> Option<u64> {
        let (slot, generation) = match self.free.pop() {
            Some(vacant) => vacant,
            None => {
                let slot = u32::try_from(self.slots.len())
                    .ok()
                    .filter(|&slot| slot < SLOT_LIMIT)?;
                self.slots.push(None);
                (slot, 0)
            }
        };
        self.slots[slot as usize] = Some(Live { generation, value });
        Some(
            Parts {
                kind: self.kind as u8,
                slot,
                generation,
            }
            .join(),
        )
    }

    /// Slot index for `handle` if its kind tag matches this table.
    fn resolve(&self, handle: u64) -> Option<(usize, u32)> {
        let parts = Parts::split(handle);
        (parts.kind == self.kind as u8).then_some((parts.slot as usize, parts.generation))
    }

    pub fn get(&self, handle: u64) -> Option<&T> {
        let (slot, generation) = self.resolve(handle)?;
        match self.slots.get(slot)? {
            Some(live) if live.generation == generation => Some(&live.value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: u64) -> Option<&mut T> {
        let (slot, generation) = self.resolve(handle)?;
        match self.slots.get_mut(slot)? {
            Some(live) if live.generation == generation => Some(&mut live.value),
            _ => None,
        }
    }

    /// Take the value out and invalidate `handle`.
    ///
    /// A slot whose generation is exhausted is never handed out again.
    pub fn remove(&mut self, handle: u64) -> Option<T> {
        let (slot, generation) = self.resolve(handle)?;
        let entry = self.slots.get_mut(slot)?;
        if entry.as_ref()?.generation != generation {
            return None;
        }
        let live = entry.take()?;
        if let Some(next) = generation.checked_add(1) {
            self.free.push((slot as u32, next));
        }
        Some(live.value)
    }
}
