use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::{CustomerId, OrderId, ProductId, Record, SalesmanId};

/// Order status lifecycle.
///
/// This crate only ever creates `New` orders; later transitions belong to a
/// separate status-update path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Statuses an order may carry at the moment it is committed.
    pub fn is_initial(self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::Pending)
    }
}

/// One requested line: what and how many. The price is never caller-supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderItemRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A customer's request to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer_id: CustomerId,
    pub salesman_id: SalesmanId,
    pub items: Vec<OrderItemRequest>,
}

impl OrderRequest {
    pub fn new(customer_id: CustomerId, salesman_id: SalesmanId) -> Self {
        Self {
            customer_id,
            salesman_id,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, product_id: ProductId, quantity: u32) -> Self {
        self.items.push(OrderItemRequest::new(product_id, quantity));
        self
    }

    /// Sum of requested units across all lines.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

/// Order header. `order_id` stays `None` until the store generates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHeader {
    pub order_id: Option<OrderId>,
    pub customer_id: CustomerId,
    pub salesman_id: SalesmanId,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
}

impl OrderHeader {
    /// A fresh, not-yet-persisted header with status `New`.
    pub fn new(customer_id: CustomerId, salesman_id: SalesmanId, order_date: DateTime<Utc>) -> Self {
        Self {
            order_id: None,
            customer_id,
            salesman_id,
            order_date,
            status: OrderStatus::New,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.order_id.is_some_and(OrderId::is_assigned)
    }
}

impl Record for OrderHeader {
    type Key = OrderId;

    const ENTITY: &'static str = "OrderHeader";

    fn key(&self) -> Option<Self::Key> {
        self.order_id
    }

    fn assign_key(&mut self, generated: u64) -> Self::Key {
        let id = OrderId::new(generated);
        self.order_id = Some(id);
        id
    }
}

/// Key of an order line: the owning order plus the 1-based line number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub order_id: OrderId,
    pub item_id: u32,
}

impl ItemKey {
    pub fn new(order_id: OrderId, item_id: u32) -> Self {
        Self { order_id, item_id }
    }

    /// Inclusive key bounds covering every line of `order_id`.
    pub fn order_bounds(order_id: OrderId) -> (Self, Self) {
        (Self::new(order_id, 1), Self::new(order_id, u32::MAX))
    }
}

/// A priced, allocated order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Back-filled from the header once its key is known (`0` until then).
    pub order_id: OrderId,
    pub item_id: u32,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Standard cost of the product at allocation time, smallest currency unit.
    pub unit_price: u64,
}

impl OrderItem {
    /// A line that has not been attached to an order yet.
    pub fn unassigned(item_id: u32, request: &OrderItemRequest) -> Self {
        Self {
            order_id: OrderId::new(0),
            item_id,
            product_id: request.product_id,
            quantity: request.quantity,
            unit_price: 0,
        }
    }

    pub fn item_key(&self) -> ItemKey {
        ItemKey::new(self.order_id, self.item_id)
    }

    pub fn line_total(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }
}

impl Record for OrderItem {
    type Key = ItemKey;

    const ENTITY: &'static str = "OrderItem";

    fn key(&self) -> Option<Self::Key> {
        Some(self.item_key())
    }

    fn assign_key(&mut self, _generated: u64) -> Self::Key {
        self.item_key()
    }
}
