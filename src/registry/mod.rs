//! Identity-keyed storage for intercepted Vulkan handles.
//!
//! Dispatchable handles carry no user-data field, so the layer keys records
//! by the handle's dispatch-table pointer (the first machine word behind the
//! opaque handle). Each object kind gets its own `Registry`, so unrelated
//! kinds never contend on one lock.
//!
//! Records are kept in a slab; cross-record references hold a `RecordId`
//! (slot + generation) instead of an address. Destroying a record bumps the
//! slot generation, so a stale back-reference resolves to `None` rather than
//! to whatever record later reuses the slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::OverlayError;

/// Stable, liveness-checked reference to a registry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    slot: u32,
    generation: u32,
}

struct Slot<T> {
    generation: u32,
    value: Option<Arc<T>>,
}

struct Inner<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    by_key: HashMap<usize, u32>,
}

pub struct Registry<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                slots: Vec::new(),
                free: Vec::new(),
                by_key: HashMap::new(),
            }),
        }
    }

    /// Register a record under `key`. Fails if the key is already live;
    /// querying before creation is a caller bug, not an implicit insert.
    pub fn create(&self, key: usize, value: T) -> Result<RecordId, OverlayError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.by_key.contains_key(&key) {
            return Err(OverlayError::AlreadyRegistered(key));
        }
        let value = Arc::new(value);
        let slot = match inner.free.pop() {
            Some(slot) => {
                inner.slots[slot as usize].value = Some(value);
                slot
            }
            None => {
                inner.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                (inner.slots.len() - 1) as u32
            }
        };
        inner.by_key.insert(key, slot);
        Ok(RecordId {
            slot,
            generation: inner.slots[slot as usize].generation,
        })
    }

    /// Resolve a live record by handle key.
    pub fn lookup(&self, key: usize) -> Option<Arc<T>> {
        let inner = self.inner.lock().unwrap();
        let slot = *inner.by_key.get(&key)?;
        inner.slots[slot as usize].value.clone()
    }

    /// Resolve a back-reference, checking the liveness generation.
    pub fn get(&self, id: RecordId) -> Option<Arc<T>> {
        let inner = self.inner.lock().unwrap();
        let slot = inner.slots.get(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.clone()
    }

    pub fn id_of(&self, key: usize) -> Option<RecordId> {
        let inner = self.inner.lock().unwrap();
        let slot = *inner.by_key.get(&key)?;
        Some(RecordId {
            slot,
            generation: inner.slots[slot as usize].generation,
        })
    }

    /// Remove the record for `key`, invalidating every `RecordId` that
    /// pointed at it. Returns the record so the caller can finish tearing
    /// it down outside the registry lock.
    pub fn remove(&self, key: usize) -> Option<Arc<T>> {
        let mut inner = self.inner.lock().unwrap();
        let slot = inner.by_key.remove(&key)?;
        let entry = &mut inner.slots[slot as usize];
        entry.generation = entry.generation.wrapping_add(1);
        let value = entry.value.take();
        inner.free.push(slot);
        value
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all live records, for cascading teardown.
    pub fn values(&self) -> Vec<Arc<T>> {
        let inner = self.inner.lock().unwrap();
        inner
            .by_key
            .values()
            .filter_map(|&slot| inner.slots[slot as usize].value.clone())
            .collect()
    }

    /// Keys of records matching a predicate; used to find the queues a
    /// device owns when the device goes away.
    pub fn keys_where(&self, mut pred: impl FnMut(&T) -> bool) -> Vec<usize> {
        let inner = self.inner.lock().unwrap();
        inner
            .by_key
            .iter()
            .filter(|(_, &slot)| {
                inner.slots[slot as usize]
                    .value
                    .as_deref()
                    .is_some_and(&mut pred)
            })
            .map(|(&key, _)| key)
            .collect()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_lookup() {
        let reg = Registry::new();
        reg.create(0x10, "a").unwrap();
        assert_eq!(*reg.lookup(0x10).unwrap(), "a");
        assert!(reg.lookup(0x20).is_none());
    }

    #[test]
    fn double_create_fails() {
        let reg = Registry::new();
        reg.create(1, 1u32).unwrap();
        assert!(matches!(
            reg.create(1, 2u32),
            Err(OverlayError::AlreadyRegistered(1))
        ));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn count_tracks_create_minus_remove() {
        let reg = Registry::new();
        for k in 0..8usize {
            reg.create(k, k).unwrap();
        }
        for k in 0..5usize {
            assert!(reg.remove(k).is_some());
        }
        assert_eq!(reg.len(), 3);
        assert!(reg.remove(0).is_none());
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn stale_id_does_not_resolve_after_slot_reuse() {
        let reg = Registry::new();
        let id = reg.create(1, "old").unwrap();
        reg.remove(1);
        assert!(reg.get(id).is_none());

        // New record reuses the freed slot; the stale id must still miss.
        let id2 = reg.create(2, "new").unwrap();
        assert!(reg.get(id).is_none());
        assert_eq!(*reg.get(id2).unwrap(), "new");
    }

    #[test]
    fn keys_where_filters() {
        let reg = Registry::new();
        reg.create(1, 10u32).unwrap();
        reg.create(2, 20u32).unwrap();
        reg.create(3, 10u32).unwrap();
        let mut keys = reg.keys_where(|v| *v == 10);
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 3]);
    }

    #[test]
    fn remove_returns_record_for_out_of_lock_teardown() {
        let reg = Registry::new();
        reg.create(7, String::from("payload")).unwrap();
        let rec = reg.remove(7).unwrap();
        assert_eq!(*rec, "payload");
        assert!(reg.is_empty());
    }
}
