use serde::{Deserialize, Serialize};

use orderflow_core::{ProductId, Record, WarehouseId};

/// Key of an inventory row.
///
/// Field order matters: ordering by `(product_id, warehouse_id)` makes a key
/// range over one product come back in ascending warehouse order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
}

impl StockKey {
    pub fn new(product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            product_id,
            warehouse_id,
        }
    }

    /// Inclusive key bounds covering every warehouse for `product_id`.
    pub fn product_bounds(product_id: ProductId) -> (Self, Self) {
        (
            Self::new(product_id, WarehouseId::MIN),
            Self::new(product_id, WarehouseId::MAX),
        )
    }
}

/// Stock of one product held in one warehouse.
///
/// `quantity` is unsigned, so a negative level cannot be represented; the
/// allocator rejects any decrement that would underflow before writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: u32,
}

impl InventoryRecord {
    pub fn new(product_id: ProductId, warehouse_id: WarehouseId, quantity: u32) -> Self {
        Self {
            product_id,
            warehouse_id,
            quantity,
        }
    }

    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.product_id, self.warehouse_id)
    }

    pub fn can_fulfil(&self, quantity: u32) -> bool {
        self.quantity >= quantity
    }
}

impl Record for InventoryRecord {
    type Key = StockKey;

    const ENTITY: &'static str = "InventoryRecord";

    fn key(&self) -> Option<Self::Key> {
        Some(self.stock_key())
    }

    fn assign_key(&mut self, _generated: u64) -> Self::Key {
        self.stock_key()
    }
}
