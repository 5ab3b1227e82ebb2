//! In-memory wiring of every record store the pipeline touches.

use std::sync::Arc;

use orderflow_core::{InMemoryRecordStore, RecordStore, StoreError};
use orderflow_inventory::InventoryRecord;
use orderflow_products::Product;
use orderflow_sales::{OrderHeader, OrderItem, OrderStores};

use crate::documents::ShipmentDocument;

/// Typed handles to the in-memory stores, kept so callers can read back state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStores {
    pub headers: Arc<InMemoryRecordStore<OrderHeader>>,
    pub items: Arc<InMemoryRecordStore<OrderItem>>,
    pub inventory: Arc<InMemoryRecordStore<InventoryRecord>>,
    pub products: Arc<InMemoryRecordStore<Product>>,
    pub documents: Arc<InMemoryRecordStore<ShipmentDocument>>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores pre-loaded with a catalog and stock levels.
    pub fn seeded(
        products: impl IntoIterator<Item = Product>,
        inventory: impl IntoIterator<Item = InventoryRecord>,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            products: Arc::new(InMemoryRecordStore::seeded(products)?),
            inventory: Arc::new(InMemoryRecordStore::seeded(inventory)?),
            ..Self::default()
        })
    }

    /// The builder's view of these stores.
    pub fn order_stores(&self) -> OrderStores {
        OrderStores {
            headers: self.headers.clone(),
            items: self.items.clone(),
            inventory: self.inventory.clone(),
            products: self.products.clone(),
        }
    }

    pub fn documents(&self) -> Arc<dyn RecordStore<ShipmentDocument>> {
        self.documents.clone()
    }
}
