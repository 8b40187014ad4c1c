//! Fixed-capacity slot table.

use serde::Serialize;

use crate::error::{ProvisionError, Result};

/// Number of interface slots a domain can carry (indices 0..=8).
pub const MAX_SLOTS: usize = 9;

/// Highest valid slot index.
pub const MAX_SLOT_INDEX: u8 = (MAX_SLOTS - 1) as u8;

/// Slot carrying the provisioning path; excluded from guest reconfiguration.
pub const MANAGEMENT_SLOT: u8 = 0;

/// Sparse mapping from slot index to an entry, bounded to [`MAX_SLOTS`].
///
/// An occupied index is never released or reused during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotTable<T> {
    slots: [Option<T>; MAX_SLOTS],
}

impl<T> SlotTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    fn index(slot: u32) -> Result<usize> {
        if slot > MAX_SLOT_INDEX as u32 {
            return Err(ProvisionError::SlotOutOfRange {
                slot,
                max: MAX_SLOT_INDEX,
            });
        }
        Ok(slot as usize)
    }

    /// Place `entry` at `slot`.
    pub fn occupy(&mut self, slot: u8, entry: T) -> Result<()> {
        let idx = Self::index(slot as u32)?;
        if self.slots[idx].is_some() {
            return Err(ProvisionError::InterfaceSlotConflict { slot });
        }
        self.slots[idx] = Some(entry);
        Ok(())
    }

    /// Whether `slot` already holds an entry. Out-of-range slots are never occupied.
    pub fn is_occupied(&self, slot: u8) -> bool {
        self.get(slot).is_some()
    }

    /// Entry at `slot`, if any.
    pub fn get(&self, slot: u8) -> Option<&T> {
        self.slots.get(slot as usize).and_then(Option::as_ref)
    }

    /// Lowest unoccupied slot index.
    pub fn first_free(&self) -> Option<u8> {
        self.slots
            .iter()
            .position(Option::is_none)
            .map(|idx| idx as u8)
    }

    /// Occupied entries in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| entry.as_ref().map(|e| (idx as u8, e)))
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transform every occupied entry in ascending slot order, stopping at
    /// the first error.
    pub fn try_map<U, F>(&self, mut f: F) -> Result<SlotTable<U>>
    where
        F: FnMut(u8, &T) -> Result<U>,
    {
        let mut mapped = SlotTable::new();
        for (slot, entry) in self.iter() {
            mapped.slots[slot as usize] = Some(f(slot, entry)?);
        }
        Ok(mapped)
    }
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupy_and_conflict() {
        let mut table = SlotTable::new();
        table.occupy(3, "a").unwrap();
        assert!(table.is_occupied(3));

        let err = table.occupy(3, "b").unwrap_err();
        assert!(matches!(err, ProvisionError::InterfaceSlotConflict { slot: 3 }));
        assert_eq!(table.get(3), Some(&"a"));
    }

    #[test]
    fn test_out_of_range() {
        let mut table = SlotTable::new();
        let err = table.occupy(9, ()).unwrap_err();
        assert!(matches!(err, ProvisionError::SlotOutOfRange { slot: 9, max: 8 }));
        assert!(!table.is_occupied(200));
    }

    #[test]
    fn test_first_free_and_iteration_order() {
        let mut table = SlotTable::new();
        table.occupy(0, 'x').unwrap();
        table.occupy(2, 'z').unwrap();
        assert_eq!(table.first_free(), Some(1));

        table.occupy(1, 'y').unwrap();
        let order: Vec<_> = table.iter().collect();
        assert_eq!(order, vec![(0, &'x'), (1, &'y'), (2, &'z')]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_full_table_has_no_free_slot() {
        let mut table = SlotTable::new();
        for slot in 0..=MAX_SLOT_INDEX {
            table.occupy(slot, slot).unwrap();
        }
        assert_eq!(table.first_free(), None);
    }

    #[test]
    fn test_try_map_keeps_positions() {
        let mut table = SlotTable::new();
        table.occupy(4, 2u32).unwrap();
        table.occupy(7, 3u32).unwrap();

        let doubled = table.try_map(|_, v| Ok(v * 2)).unwrap();
        assert_eq!(doubled.get(4), Some(&4));
        assert_eq!(doubled.get(7), Some(&6));
        assert!(!doubled.is_occupied(0));
    }
}
