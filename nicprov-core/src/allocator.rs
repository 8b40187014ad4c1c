//! Interface slot allocation.

use tracing::debug;

use crate::error::{ProvisionError, Result};
use crate::slots::{SlotTable, MANAGEMENT_SLOT, MAX_SLOTS};
use crate::types::InterfaceIntent;

/// Assigns each declared interface to a slot.
///
/// Intents are processed in declaration order. An explicit slot is taken as
/// given; otherwise the lowest free slot is used. The same input always
/// yields the same table. The management slot must end up occupied.
#[derive(Debug, Default, Clone, Copy)]
pub struct SlotAllocator;

impl SlotAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Build the slot table for `intents`.
    pub fn allocate(&self, intents: &[InterfaceIntent]) -> Result<SlotTable<InterfaceIntent>> {
        let mut table = SlotTable::new();

        for intent in intents {
            let slot = match intent.slot {
                Some(slot) => slot,
                None => table.first_free().ok_or(ProvisionError::InterfaceSlotExhausted {
                    max: MAX_SLOTS,
                })?,
            };

            table.occupy(slot, intent.clone())?;
            debug!(
                slot,
                explicit = intent.slot.is_some(),
                connection = intent.connection.as_str(),
                "Allocated interface slot"
            );
        }

        if !table.is_occupied(MANAGEMENT_SLOT) {
            return Err(ProvisionError::MissingManagementSlot {
                slot: MANAGEMENT_SLOT,
            });
        }

        Ok(table)
    }
}
