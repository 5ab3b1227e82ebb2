//! Warehouse inventory module.
//!
//! Holds the stock records and the first-fit allocator that mutates them.
//! The allocator assumes it is the only writer: callers must serialize
//! allocation passes (the intake queue does this structurally).

pub mod allocator;
pub mod record;

pub use allocator::WarehouseAllocator;
pub use record::{InventoryRecord, StockKey};
