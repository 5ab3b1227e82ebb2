//! Shipment documents produced after an order commits.

pub mod manifest;
pub mod render;

use serde::{Deserialize, Serialize};

use orderflow_core::{OrderId, Record};

pub use manifest::{ManifestId, ManifestLine, ShipmentManifest};
pub use render::{DocumentRenderer, JsonRenderer, PlainTextRenderer, RenderError};

/// A rendered manifest as stored, one per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentDocument {
    pub order_id: OrderId,
    pub manifest_id: ManifestId,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Record for ShipmentDocument {
    type Key = OrderId;

    const ENTITY: &'static str = "ShipmentDocument";

    fn key(&self) -> Option<Self::Key> {
        Some(self.order_id)
    }

    fn assign_key(&mut self, _generated: u64) -> Self::Key {
        self.order_id
    }
}
