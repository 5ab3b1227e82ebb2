use serde::{Deserialize, Serialize};

use orderflow_core::{ProductId, Record};

/// Catalog row: a sellable product and its prices.
///
/// Prices are in the smallest currency unit (e.g., cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    /// What the product costs us; order items are priced at this value.
    pub standard_cost: u64,
    pub list_price: u64,
}

impl Product {
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        standard_cost: u64,
        list_price: u64,
    ) -> Self {
        Self {
            product_id,
            name: name.into(),
            standard_cost,
            list_price,
        }
    }
}

impl Record for Product {
    type Key = ProductId;

    const ENTITY: &'static str = "Product";

    fn key(&self) -> Option<Self::Key> {
        Some(self.product_id)
    }

    fn assign_key(&mut self, _generated: u64) -> Self::Key {
        self.product_id
    }
}
