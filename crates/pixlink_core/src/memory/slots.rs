//! # Slot Tables
//!
//! Fixed-capacity tables of pool-backed records addressed by
//! generation-tagged handles.
//!
//! Freeing a slot bumps its generation, so a handle kept across a free and a
//! reuse of the same index is rejected instead of silently reading the new
//! occupant's bytes.

use crate::error::{ResourceError, ResourceResult};
use crate::memory::PoolRegion;

/// Handle to an allocated slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    /// Index into the table.
    index: u16,
    /// Generation of the slot when the handle was issued.
    generation: u32,
}

impl SlotHandle {
    /// Slot index.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// Generation the handle was issued for.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    const fn stale(self) -> ResourceError {
        ResourceError::StaleHandle { index: self.index, generation: self.generation }
    }
}

/// A live slot: where its bytes are, when it was last used, and what it holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotEntry<M> {
    /// Bytes owned by this slot.
    pub region: PoolRegion,
    /// Timestamp (ms) of the last use, for age-based sweeps.
    pub last_used: u32,
    /// Table-specific metadata.
    pub meta: M,
}

struct Slot<M> {
    generation: u32,
    entry: Option<SlotEntry<M>>,
}

/// A fixed-size table of slots.
///
/// # Example
///
/// ```rust,ignore
/// let mut table: SlotTable<u8> = SlotTable::new(4);
/// let handle = table.insert(region, 7, now)?;
/// table.remove(handle)?;
/// assert!(table.get(handle).is_err()); // generation moved on
/// ```
pub struct SlotTable<M> {
    /// The slots.
    slots: Box<[Slot<M>]>,
    /// Free list - indices of available slots.
    free_list: Vec<u16>,
}

impl<M> SlotTable<M> {
    /// Creates a table with `capacity` empty slots.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u16::MAX`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(capacity <= usize::from(u16::MAX), "Capacity must fit in u16");
        let capacity = capacity as u16;

        let slots: Vec<Slot<M>> = (0..capacity).map(|_| Slot { generation: 0, entry: None }).collect();

        // Lowest index is handed out first
        let free_list: Vec<u16> = (0..capacity).rev().collect();

        Self { slots: slots.into_boxed_slice(), free_list }
    }

    /// Total number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of allocated slots.
    #[inline]
    #[must_use]
    pub fn allocated_count(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Claims a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::SlotTableFull`] when every slot is taken.
    pub fn insert(&mut self, region: PoolRegion, meta: M, now: u32) -> ResourceResult<SlotHandle> {
        let index = self.free_list.pop().ok_or(ResourceError::SlotTableFull(self.capacity()))?;
        let slot = &mut self.slots[usize::from(index)];
        slot.entry = Some(SlotEntry { region, last_used: now, meta });
        Ok(SlotHandle { index, generation: slot.generation })
    }

    /// Frees a slot and returns what it held.
    ///
    /// The pool bytes are not touched; only the handle is invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::StaleHandle`] if the handle is not live.
    pub fn remove(&mut self, handle: SlotHandle) -> ResourceResult<SlotEntry<M>> {
        let slot = self
            .slots
            .get_mut(usize::from(handle.index))
            .filter(|slot| slot.generation == handle.generation)
            .ok_or(handle.stale())?;
        let entry = slot.entry.take().ok_or(handle.stale())?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        Ok(entry)
    }

    /// Looks up a live slot.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::StaleHandle`] if the handle is not live.
    #[inline]
    pub fn get(&self, handle: SlotHandle) -> ResourceResult<&SlotEntry<M>> {
        self.slots
            .get(usize::from(handle.index))
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(handle.stale())
    }

    /// Looks up a live slot mutably.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::StaleHandle`] if the handle is not live.
    #[inline]
    pub fn get_mut(&mut self, handle: SlotHandle) -> ResourceResult<&mut SlotEntry<M>> {
        self.slots
            .get_mut(usize::from(handle.index))
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_mut())
            .ok_or(handle.stale())
    }

    /// Handle of the live occupant of slot `index`, if any.
    #[must_use]
    pub fn handle_at(&self, index: u16) -> Option<SlotHandle> {
        let slot = self.slots.get(usize::from(index))?;
        slot.entry.as_ref().map(|_| SlotHandle { index, generation: slot.generation })
    }

    /// True if the handle refers to the slot's current occupant.
    #[inline]
    #[must_use]
    pub fn is_live(&self, handle: SlotHandle) -> bool {
        self.get(handle).is_ok()
    }

    /// Frees every slot for which `keep` returns false. Returns the count freed.
    pub fn retain(&mut self, mut keep: impl FnMut(&SlotEntry<M>) -> bool) -> usize {
        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let drop_it = slot.entry.as_ref().is_some_and(|entry| !keep(entry));
            if drop_it {
                slot.entry = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(index as u16);
                freed += 1;
            }
        }
        freed
    }

    /// Iterates over live slots.
    pub fn iter(&self) -> impl Iterator<Item = (SlotHandle, &SlotEntry<M>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|entry| {
                (SlotHandle { index: index as u16, generation: slot.generation }, entry)
            })
        })
    }

    /// Iterates mutably over live slots.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotHandle, &mut SlotEntry<M>)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.entry
                .as_mut()
                .map(|entry| (SlotHandle { index: index as u16, generation }, entry))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(offset: usize) -> PoolRegion {
        PoolRegion { offset, len: 4 }
    }

    #[test]
    fn test_insert_remove() {
        let mut table: SlotTable<u32> = SlotTable::new(4);

        let h1 = table.insert(region(0), 42, 10).unwrap();
        assert_eq!(h1.index(), 0);
        assert_eq!(table.get(h1).unwrap().meta, 42);
        assert_eq!(table.get(h1).unwrap().last_used, 10);
        assert_eq!(table.allocated_count(), 1);

        let freed = table.remove(h1).unwrap();
        assert_eq!(freed.meta, 42);
        assert_eq!(table.allocated_count(), 0);
    }

    #[test]
    fn test_table_full() {
        let mut table: SlotTable<u8> = SlotTable::new(2);

        let _ = table.insert(region(0), 1, 0).unwrap();
        let _ = table.insert(region(4), 2, 0).unwrap();
        assert_eq!(table.insert(region(8), 3, 0), Err(ResourceError::SlotTableFull(2)));
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut table: SlotTable<u32> = SlotTable::new(1);

        let h1 = table.insert(region(0), 1, 0).unwrap();
        table.remove(h1).unwrap();

        let h2 = table.insert(region(4), 2, 0).unwrap();
        assert_eq!(h1.index(), h2.index()); // Same slot reused
        assert_ne!(h1.generation(), h2.generation());

        assert!(!table.is_live(h1));
        assert!(matches!(table.get(h1), Err(ResourceError::StaleHandle { .. })));
        assert!(table.remove(h1).is_err());
        assert_eq!(table.get(h2).unwrap().meta, 2);
    }

    #[test]
    fn test_double_remove_rejected() {
        let mut table: SlotTable<u8> = SlotTable::new(2);
        let h = table.insert(region(0), 0, 0).unwrap();
        assert!(table.remove(h).is_ok());
        assert!(table.remove(h).is_err());
        assert_eq!(table.allocated_count(), 0);
    }

    #[test]
    fn test_retain_counts_and_invalidates() {
        let mut table: SlotTable<u32> = SlotTable::new(4);
        let old = table.insert(region(0), 0, 0).unwrap();
        let fresh = table.insert(region(4), 1, 100).unwrap();

        let freed = table.retain(|entry| entry.last_used >= 50);
        assert_eq!(freed, 1);
        assert!(!table.is_live(old));
        assert!(table.is_live(fresh));
        assert_eq!(table.iter().count(), 1);
    }

    #[test]
    fn test_handle_at_tracks_generation() {
        let mut table: SlotTable<u8> = SlotTable::new(2);
        assert_eq!(table.handle_at(0), None);

        let h = table.insert(region(0), 0, 0).unwrap();
        assert_eq!(table.handle_at(0), Some(h));
        table.remove(h).unwrap();
        let again = table.insert(region(4), 1, 0).unwrap();
        assert_eq!(table.handle_at(0), Some(again));
        assert_eq!(table.handle_at(9), None);
    }
}
