//! First-fit warehouse allocation.

use tracing::debug;

use orderflow_core::{
    ConstraintViolation, FulfillmentError, FulfillmentResult, ProductId, Record, RecordStore,
    StoreError, Violations,
};

use crate::record::{InventoryRecord, StockKey};

/// Picks a warehouse for an order line and decrements its stock.
///
/// ## Algorithm
///
/// 1. Load every record for the product, ordered by warehouse id ascending.
/// 2. Take the **first** record holding at least the requested quantity
///    (first-fit, not best-fit: deterministic for a given snapshot).
/// 3. Decrement it and persist the updated record before returning.
///
/// Ties are broken by warehouse id, never by geography.
///
/// ## Concurrency
///
/// `allocate` is a read-then-write on a shared row. It is only correct when no
/// other allocation pass runs concurrently against the same records; the
/// allocator itself takes no locks.
#[derive(Debug, Clone)]
pub struct WarehouseAllocator<S> {
    store: S,
}

impl<S> WarehouseAllocator<S>
where
    S: RecordStore<InventoryRecord>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Allocate `quantity` units of `product_id` from a single warehouse.
    ///
    /// Returns the record as persisted after the decrement. Exactly one
    /// record is written on success and none on failure.
    pub fn allocate(&self, product_id: ProductId, quantity: u32) -> FulfillmentResult<InventoryRecord> {
        if quantity == 0 {
            let mut violations = Violations::new();
            violations.push(ConstraintViolation {
                entity: "Allocation".to_string(),
                path: "quantity".to_string(),
                message: "must be positive".to_string(),
            });
            return Err(FulfillmentError::ValidationFailed(violations));
        }

        let candidates = self.records_for(product_id)?;
        if candidates.is_empty() {
            return Err(FulfillmentError::ProductNotFound(product_id));
        }

        let Some(chosen) = candidates.into_iter().find(|r| r.can_fulfil(quantity)) else {
            return Err(FulfillmentError::out_of_stock(product_id, quantity));
        };

        let mut updated = chosen;
        updated.quantity -= quantity;
        self.store.update(&updated.stock_key(), updated.clone())?;

        debug!(
            product_id = %product_id,
            warehouse_id = %updated.warehouse_id,
            allocated = quantity,
            remaining = updated.quantity,
            "allocated stock"
        );

        Ok(updated)
    }

    /// Return `quantity` units to the record at `key`.
    ///
    /// Used only to compensate an allocation whose order was rolled back.
    pub fn release(&self, key: &StockKey, quantity: u32) -> FulfillmentResult<InventoryRecord> {
        let mut record = self
            .store
            .find(key)?
            .ok_or_else(|| StoreError::not_found::<InventoryRecord>(key))?;

        record.quantity = record.quantity.checked_add(quantity).ok_or_else(|| {
            FulfillmentError::store(format!(
                "releasing {quantity} units would overflow {key:?}"
            ))
        })?;
        self.store.update(key, record.clone())?;

        debug!(
            product_id = %key.product_id,
            warehouse_id = %key.warehouse_id,
            released = quantity,
            "released stock"
        );

        Ok(record)
    }

    /// Every record for `product_id`, warehouse ascending.
    pub fn records_for(&self, product_id: ProductId) -> FulfillmentResult<Vec<InventoryRecord>> {
        let (low, high) = StockKey::product_bounds(product_id);
        let mut records = self.store.find_range(&low, &high)?;
        // The store contract promises key order; keep the scan deterministic
        // even if a backend ignores it.
        records.sort_by_key(|r| r.key());
        Ok(records)
    }

    /// Total units of `product_id` across all warehouses.
    pub fn stock_on_hand(&self, product_id: ProductId) -> FulfillmentResult<u64> {
        Ok(self
            .records_for(product_id)?
            .iter()
            .map(|r| u64::from(r.quantity))
            .sum())
    }
}
