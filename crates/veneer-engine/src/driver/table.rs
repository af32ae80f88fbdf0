use slotmap::{Key, SlotMap};

/// Result of looking an id up in a [`ResourceTable`].
#[derive(Debug)]
pub enum Lookup<'a, T> {
    Live(&'a T),
    /// Destroyed but still held until the next flush completes.
    Retired(&'a T),
    Missing,
}

struct Slot<T> {
    value: T,
    retired: bool,
}

/// Id-keyed storage for one resource kind.
///
/// Destroying a resource only retires its slot: retired entries still
/// resolve for commands queued before the destroy, but new calls must
/// reject them. `sweep` removes them once nothing can reference them.
pub struct ResourceTable<K: Key, T> {
    slots: SlotMap<K, Slot<T>>,
    retired: usize,
}

impl<K: Key, T> Default for ResourceTable<K, T> {
    fn default() -> Self {
        Self {
            slots: SlotMap::with_key(),
            retired: 0,
        }
    }
}

impl<K: Key, T> ResourceTable<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> K {
        self.slots.insert(Slot { value, retired: false })
    }

    pub fn lookup(&self, id: K) -> Lookup<'_, T> {
        match self.slots.get(id) {
            Some(slot) if slot.retired => Lookup::Retired(&slot.value),
            Some(slot) => Lookup::Live(&slot.value),
            None => Lookup::Missing,
        }
    }

    /// Live or retired entry; used when executing already-queued commands.
    #[inline]
    pub fn get(&self, id: K) -> Option<&T> {
        self.slots.get(id).map(|slot| &slot.value)
    }

    /// Live entry only.
    #[inline]
    pub fn get_live(&self, id: K) -> Option<&T> {
        self.slots.get(id).filter(|slot| !slot.retired).map(|slot| &slot.value)
    }

    #[inline]
    pub fn get_live_mut(&mut self, id: K) -> Option<&mut T> {
        self.slots
            .get_mut(id)
            .filter(|slot| !slot.retired)
            .map(|slot| &mut slot.value)
    }

    #[inline]
    pub fn is_live(&self, id: K) -> bool {
        self.get_live(id).is_some()
    }

    /// Marks a live entry retired. Returns `false` if it was not live.
    pub fn retire(&mut self, id: K) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) if !slot.retired => {
                slot.retired = true;
                self.retired += 1;
                true
            }
            _ => false,
        }
    }

    /// Removes every retired entry and returns the values.
    pub fn sweep(&mut self) -> Vec<T> {
        if self.retired == 0 {
            return Vec::new();
        }
        let ids: Vec<K> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.retired)
            .map(|(id, _)| id)
            .collect();
        self.retired = 0;
        ids.into_iter()
            .filter_map(|id| self.slots.remove(id))
            .map(|slot| slot.value)
            .collect()
    }

    /// Removes every entry, live or retired.
    pub fn drain(&mut self) -> Vec<T> {
        self.retired = 0;
        self.slots.drain().map(|(_, slot)| slot.value).collect()
    }

    #[inline]
    pub fn retired_len(&self) -> usize {
        self.retired
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len() - self.retired
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (K, &T)> {
        self.slots
            .iter()
            .filter(|(_, slot)| !slot.retired)
            .map(|(id, slot)| (id, &slot.value))
    }
}
