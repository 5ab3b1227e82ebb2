use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use orderflow_core::{CustomerId, OrderId, ProductId, SalesmanId};
use orderflow_products::Product;
use orderflow_sales::{OrderHeader, OrderItem, OrderStatus};

/// Unique manifest identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

impl ManifestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ManifestId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ManifestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One shipped line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestLine {
    pub item_id: u32,
    pub product_id: ProductId,
    /// Catalog name, or `None` if the product row disappeared since commit.
    pub product_name: Option<String>,
    pub quantity: u32,
    pub unit_price: u64,
    pub line_total: u64,
}

/// Shipment manifest for one committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentManifest {
    pub manifest_id: ManifestId,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub salesman_id: SalesmanId,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub lines: Vec<ManifestLine>,
    pub total_units: u64,
    pub total_value: u64,
}

impl ShipmentManifest {
    /// Assemble a manifest from a committed header and its lines.
    ///
    /// `catalog` resolves product names; lines whose product is unknown keep
    /// `product_name: None`.
    pub fn assemble(
        order_id: OrderId,
        header: &OrderHeader,
        items: &[OrderItem],
        catalog: impl Fn(ProductId) -> Option<Product>,
    ) -> Self {
        let lines: Vec<ManifestLine> = items
            .iter()
            .map(|item| ManifestLine {
                item_id: item.item_id,
                product_id: item.product_id,
                product_name: catalog(item.product_id).map(|p| p.name),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total(),
            })
            .collect();

        Self {
            manifest_id: ManifestId::new(),
            order_id,
            customer_id: header.customer_id,
            salesman_id: header.salesman_id,
            status: header.status,
            order_date: header.order_date,
            generated_at: Utc::now(),
            total_units: lines.iter().map(|l| u64::from(l.quantity)).sum(),
            total_value: lines.iter().map(|l| l.line_total).sum(),
            lines,
        }
    }
}
