//! Generation checked storage for handles.
//!
//! A [`HandleTable`] hands out [`Key`]s instead of references. Removing an entry bumps the
//! generation of its slot, so a key which outlived its entry is rejected rather than resolving to
//! whatever occupies the slot next.

use std::fmt;

/// Identifies an entry within a [`HandleTable`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    index: u32,
    generation: u32,
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}v{})", self.index, self.generation)
    }
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

impl<T> Slot<T> {
    fn generation(&self) -> u32 {
        match self {
            Slot::Occupied { generation, .. } | Slot::Vacant { generation, .. } => *generation,
        }
    }
}

/// Arena of values addressed by generation checked [`Key`]s.
pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    /// Head of the list of vacant slots.
    free_head: Option<u32>,
    len: usize,
    /// Maximum number of occupied entries.
    limit: usize,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self::with_limit(u32::MAX as usize)
    }

    /// Table holding at most `limit` entries at a time. Keys index slots with a `u32`, so larger
    /// limits are capped.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
            limit: limit.min(u32::MAX as usize),
        }
    }

    /// Number of occupied entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `value` and returns the key to retrieve it again. Hands `value` back if the table
    /// is full.
    pub fn insert(&mut self, value: T) -> Result<Key, T> {
        if self.len >= self.limit {
            return Err(value);
        }
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let (generation, next_free) = match slot {
                Slot::Vacant {
                    generation,
                    next_free,
                } => (*generation, *next_free),
                Slot::Occupied { .. } => unreachable!("free list points to an occupied slot"),
            };
            *slot = Slot::Occupied { generation, value };
            self.free_head = next_free;
            self.len += 1;
            Ok(Key { index, generation })
        } else {
            // Without vacant slots every slot is occupied, so there are fewer than `limit`.
            let Ok(index) = u32::try_from(self.slots.len()) else {
                return Err(value);
            };
            self.slots.push(Slot::Occupied {
                generation: 0,
                value,
            });
            self.len += 1;
            Ok(Key {
                index,
                generation: 0,
            })
        }
    }

    pub fn contains(&self, key: Key) -> bool {
        self.get(key).is_some()
    }

    /// `None` if the entry has been removed.
    pub fn get(&self, key: Key) -> Option<&T> {
        match self.slots.get(key.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == key.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// `None` if the entry has been removed.
    pub fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        match self.slots.get_mut(key.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == key.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Removes the entry and returns its value. Returns `None` for stale keys, so removing twice
    /// is harmless.
    pub fn remove(&mut self, key: Key) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if !matches!(slot, Slot::Occupied { generation, .. } if *generation == key.generation) {
            return None;
        }
        let vacant = Slot::Vacant {
            generation: slot.generation().wrapping_add(1),
            next_free: self.free_head,
        };
        match std::mem::replace(slot, vacant) {
            Slot::Occupied { value, .. } => {
                self.free_head = Some(key.index);
                self.len -= 1;
                Some(value)
            }
            Slot::Vacant { .. } => unreachable!(),
        }
    }

    /// Removes every entry, invalidating all keys handed out so far.
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);
        for index in 0..self.slots.len() {
            let generation = self.slots[index].generation();
            if let Slot::Occupied { .. } = self.slots[index] {
                let key = Key {
                    index: index as u32,
                    generation,
                };
                if let Some(value) = self.remove(key) {
                    values.push(value);
                }
            }
        }
        values
    }
}
