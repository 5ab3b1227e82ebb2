//! Fan-out task: render and store a shipment manifest for each committed order.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use orderflow_core::{RecordStore, StoreError};
use orderflow_products::Product;
use orderflow_sales::{ItemKey, OrderHeader, OrderItem};

use crate::documents::{DocumentRenderer, ShipmentDocument, ShipmentManifest};

use super::pool::{FanoutError, FanoutTask};

/// Reads the committed lines back through the record store, renders a
/// [`ShipmentManifest`], and saves it as a [`ShipmentDocument`].
pub struct ShipmentManifestTask {
    items: Arc<dyn RecordStore<OrderItem>>,
    products: Arc<dyn RecordStore<Product>>,
    documents: Arc<dyn RecordStore<ShipmentDocument>>,
    renderer: Arc<dyn DocumentRenderer>,
}

impl ShipmentManifestTask {
    pub fn new(
        items: Arc<dyn RecordStore<OrderItem>>,
        products: Arc<dyn RecordStore<Product>>,
        documents: Arc<dyn RecordStore<ShipmentDocument>>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            items,
            products,
            documents,
            renderer,
        }
    }

    fn manifest_for(&self, header: &OrderHeader) -> Result<ShipmentManifest, FanoutError> {
        let order_id = header
            .order_id
            .ok_or_else(|| FanoutError::task("committed header has no order id"))?;

        let (low, high) = ItemKey::order_bounds(order_id);
        let items = self.items.find_range(&low, &high).map_err(store_failure)?;
        if items.is_empty() {
            return Err(FanoutError::task(format!("order {order_id} has no lines")));
        }

        // A missing catalog row only leaves the name blank; an unreachable
        // catalog fails the task.
        let mut catalog = BTreeMap::new();
        for item in &items {
            if let Some(product) = self.products.find(&item.product_id).map_err(store_failure)? {
                catalog.insert(item.product_id, product);
            }
        }

        Ok(ShipmentManifest::assemble(order_id, header, &items, |pid| {
            catalog.get(&pid).cloned()
        }))
    }
}

impl FanoutTask<OrderHeader> for ShipmentManifestTask {
    fn name(&self) -> &str {
        "shipment_manifest"
    }

    fn run(&self, header: &OrderHeader) -> Result<(), FanoutError> {
        let manifest = self.manifest_for(header)?;
        let bytes = self
            .renderer
            .render(&manifest)
            .map_err(|e| FanoutError::task(e.to_string()))?;

        let document = ShipmentDocument {
            order_id: manifest.order_id,
            manifest_id: manifest.manifest_id,
            content_type: self.renderer.content_type().to_string(),
            bytes,
        };
        let size = document.bytes.len();
        self.documents.save(document).map_err(store_failure)?;

        debug!(
            order_id = %manifest.order_id,
            manifest_id = %manifest.manifest_id,
            lines = manifest.lines.len(),
            size,
            "shipment manifest stored"
        );
        Ok(())
    }
}

impl core::fmt::Debug for ShipmentManifestTask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ShipmentManifestTask")
            .field("content_type", &self.renderer.content_type())
            .finish_non_exhaustive()
    }
}

fn store_failure(err: StoreError) -> FanoutError {
    FanoutError::task(err.to_string())
}
