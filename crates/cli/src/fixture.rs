//! Harness input: catalog, stock levels and the orders to submit.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use orderflow_core::{CustomerId, ProductId, SalesmanId, WarehouseId};
use orderflow_inventory::InventoryRecord;
use orderflow_products::Product;
use orderflow_sales::OrderRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub products: Vec<Product>,
    pub inventory: Vec<InventoryRecord>,
    pub orders: Vec<OrderRequest>,
}

impl Fixture {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing fixture {}", path.display()))
    }

    /// A small catalog with one order of every outcome: committed, out of
    /// stock, unknown product, invalid, and one that fails on its second line.
    pub fn demo() -> Self {
        let products = vec![
            Product::new(ProductId::new(1), "Bolt M8", 10, 25),
            Product::new(ProductId::new(2), "Hex nut M8", 5, 12),
            Product::new(ProductId::new(3), "Widget", 120, 200),
            Product::new(ProductId::new(4), "Gadget", 275, 400),
            Product::new(ProductId::new(5), "Shipping crate", 900, 1500),
        ];

        let inventory = [
            (1, 1, 500),
            (1, 2, 500),
            (2, 1, 300),
            (3, 1, 5),
            (3, 2, 10),
            (4, 2, 3),
            (4, 3, 8),
            (5, 1, 10),
            (5, 2, 999),
            (5, 3, 0),
        ]
        .into_iter()
        .map(|(p, w, q)| InventoryRecord::new(ProductId::new(p), WarehouseId::new(w), q))
        .collect();

        let order = |customer: u64| OrderRequest::new(CustomerId::new(customer), SalesmanId::new(1));
        let pid = ProductId::new;

        let orders = vec![
            order(10).with_item(pid(3), 1).with_item(pid(4), 1),
            order(11).with_item(pid(1), 40).with_item(pid(2), 40),
            order(12).with_item(pid(5), 1000),
            order(13).with_item(pid(9), 1),
            order(14).with_item(pid(1), 0),
            order(15).with_item(pid(1), 5).with_item(pid(4), 50),
            order(16).with_item(pid(3), 6),
            order(17).with_item(pid(5), 10).with_item(pid(2), 3),
        ];

        Self {
            products,
            inventory,
            orders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_survives_a_json_round_trip() {
        let demo = Fixture::demo();
        let json = serde_json::to_string(&demo).unwrap();
        assert_eq!(serde_json::from_str::<Fixture>(&json).unwrap(), demo);
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = Fixture::load(Path::new("/nonexistent/orders.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/orders.json"));
    }
}
