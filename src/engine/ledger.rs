use tokio::sync::OwnedRwLockWriteGuard;

use crate::model::{Consumable, Deduction, InventoryItem};

use super::BookingError;

/// Collapse a service's consumable list into one deduction per distinct item,
/// sorted by item id. Sorting fixes the lock acquisition order; summing means
/// a service listing the same item twice is checked against the combined
/// requirement, not each entry against the same untouched stock.
pub(super) fn aggregate_requirements(consumables: &[Consumable]) -> Vec<Deduction> {
    let mut needs: Vec<Deduction> = Vec::with_capacity(consumables.len());
    for c in consumables {
        match needs.iter_mut().find(|d| d.item_id == c.item_id) {
            Some(d) => d.quantity += c.quantity,
            None => needs.push(Deduction {
                item_id: c.item_id,
                quantity: c.quantity,
            }),
        }
    }
    needs.sort_by_key(|d| d.item_id);
    needs
}

/// Check phase: every requirement is verified against the locked items before
/// any deduction happens. `guards[i]` is the locked item for `needs[i]`.
pub(super) fn check_stock(
    guards: &[OwnedRwLockWriteGuard<InventoryItem>],
    needs: &[Deduction],
) -> Result<(), BookingError> {
    debug_assert_eq!(guards.len(), needs.len());
    for (guard, need) in guards.iter().zip(needs) {
        if guard.stock_level < need.quantity {
            return Err(BookingError::InsufficientStock {
                item: guard.name.clone(),
                required: need.quantity,
                available: guard.stock_level,
                unit: guard.unit.clone(),
            });
        }
    }
    Ok(())
}

/// Deduct phase: only reached when `check_stock` passed for the whole list.
/// The caller still holds every lock, so no other booking can have moved the
/// levels since the check.
pub(super) fn apply_deductions(
    guards: &mut [OwnedRwLockWriteGuard<InventoryItem>],
    needs: &[Deduction],
) {
    for (guard, need) in guards.iter_mut().zip(needs) {
        guard.stock_level -= need.quantity;
    }
}
