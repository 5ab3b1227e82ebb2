//! Order aggregate construction (header + allocated, priced items).
//!
//! ## Build Steps
//!
//! ```text
//! OrderRequest
//!   ↓
//! 0. Validate request shape (nothing touched yet)
//!   ↓
//! 1. Persist header (status New) → generated OrderId
//!   ↓
//! 2. Per item: back-fill OrderId → allocate → price → validate → persist
//!   ↓
//! 3. Validate header
//!   ↓
//! Committed OrderHeader
//! ```
//!
//! Any failure, including a panic in a validator or store, aborts the
//! remaining items. The record store offers no
//! transactions, so everything written after step 1 is tracked and undone
//! according to the configured [`CompensationPolicy`] before the original
//! failure is returned.
//!
//! The builder must never run twice at the same time against the same
//! inventory: allocation is a read-then-write without locks.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use orderflow_core::fault::panic_message;
use orderflow_core::{FulfillmentError, FulfillmentResult, OrderId, ProductId, RecordStore};
use orderflow_inventory::{InventoryRecord, StockKey, WarehouseAllocator};
use orderflow_products::Product;

use crate::order::{ItemKey, OrderHeader, OrderItem, OrderRequest};
use crate::rules::OrderRules;

/// What happens to partial work when a build fails after the header exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompensationPolicy {
    /// Re-credit allocations, delete written items and the header.
    #[default]
    Rollback,
    /// Leave partial work in place: earlier allocations stay decremented and
    /// the header/items stay persisted.
    None,
}

/// The record-store collaborators a builder reads and writes.
#[derive(Clone)]
pub struct OrderStores {
    pub headers: Arc<dyn RecordStore<OrderHeader>>,
    pub items: Arc<dyn RecordStore<OrderItem>>,
    pub inventory: Arc<dyn RecordStore<InventoryRecord>>,
    pub products: Arc<dyn RecordStore<Product>>,
}

impl core::fmt::Debug for OrderStores {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OrderStores").finish_non_exhaustive()
    }
}

/// Writes performed by one build, in order, for compensation.
#[derive(Debug, Default)]
struct WorkLog {
    allocations: Vec<(StockKey, u32)>,
    items: Vec<ItemKey>,
}

/// Turns an [`OrderRequest`] into a committed order.
pub struct OrderAggregateBuilder {
    headers: Arc<dyn RecordStore<OrderHeader>>,
    items: Arc<dyn RecordStore<OrderItem>>,
    products: Arc<dyn RecordStore<Product>>,
    allocator: WarehouseAllocator<Arc<dyn RecordStore<InventoryRecord>>>,
    rules: OrderRules,
    compensation: CompensationPolicy,
}

impl OrderAggregateBuilder {
    pub fn new(stores: OrderStores) -> Self {
        Self {
            headers: stores.headers,
            items: stores.items,
            products: stores.products,
            allocator: WarehouseAllocator::new(stores.inventory),
            rules: OrderRules::standard(),
            compensation: CompensationPolicy::default(),
        }
    }

    pub fn with_rules(mut self, rules: OrderRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_compensation(mut self, policy: CompensationPolicy) -> Self {
        self.compensation = policy;
        self
    }

    pub fn compensation(&self) -> CompensationPolicy {
        self.compensation
    }

    pub fn allocator(&self) -> &WarehouseAllocator<Arc<dyn RecordStore<InventoryRecord>>> {
        &self.allocator
    }

    /// Build and commit one order.
    pub fn build(&self, request: &OrderRequest) -> FulfillmentResult<OrderHeader> {
        self.rules.check_request(request)?;

        let mut header = OrderHeader::new(request.customer_id, request.salesman_id, Utc::now());
        let order_id = self.headers.save(header.clone())?;
        header.order_id = Some(order_id);
        debug!(order_id = %order_id, lines = request.items.len(), "order header persisted");

        // The log lives outside the unwind boundary so a panicking validator
        // or store still leaves a complete record of what to undo.
        let mut log = WorkLog::default();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.build_items(order_id, request, &mut log)
                .and_then(|()| self.rules.check_header(&header))
        }))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!(order_id = %order_id, panic = %message, "order build panicked");
            Err(FulfillmentError::WorkerPanicked(message))
        });

        match outcome {
            Ok(()) => {
                info!(
                    order_id = %order_id,
                    lines = log.items.len(),
                    units = request.total_quantity(),
                    "order committed"
                );
                Ok(header)
            }
            Err(err) => {
                self.compensate(order_id, log, &err);
                Err(err)
            }
        }
    }

    /// All persisted lines of `order_id`, in line order.
    pub fn items_of(&self, order_id: OrderId) -> FulfillmentResult<Vec<OrderItem>> {
        let (low, high) = ItemKey::order_bounds(order_id);
        Ok(self.items.find_range(&low, &high)?)
    }

    fn build_items(
        &self,
        order_id: OrderId,
        request: &OrderRequest,
        log: &mut WorkLog,
    ) -> FulfillmentResult<()> {
        for (idx, line) in request.items.iter().enumerate() {
            let item_id = (idx as u32) + 1;
            let mut item = OrderItem::unassigned(item_id, line);
            item.order_id = order_id;

            let allocated = self.allocator.allocate(line.product_id, line.quantity)?;
            log.allocations.push((allocated.stock_key(), line.quantity));

            item.unit_price = self.standard_cost(line.product_id)?;
            self.rules.check_item(&item, idx)?;

            let key = self.items.save(item)?;
            log.items.push(key);
        }
        Ok(())
    }

    fn standard_cost(&self, product_id: ProductId) -> FulfillmentResult<u64> {
        self.products
            .find(&product_id)?
            .map(|p| p.standard_cost)
            .ok_or(FulfillmentError::ProductNotFound(product_id))
    }

    fn compensate(&self, order_id: OrderId, log: WorkLog, cause: &FulfillmentError) {
        match self.compensation {
            CompensationPolicy::None => {
                warn!(
                    order_id = %order_id,
                    error = %cause,
                    allocations_kept = log.allocations.len(),
                    items_kept = log.items.len(),
                    "order failed; compensation disabled, partial work left in place"
                );
            }
            CompensationPolicy::Rollback => {
                for (key, quantity) in log.allocations.iter().rev() {
                    if let Err(e) = self.allocator.release(key, *quantity) {
                        error!(order_id = %order_id, stock = ?key, error = %e, "failed to release allocation");
                    }
                }
                for key in log.items.iter().rev() {
                    if let Err(e) = self.items.delete(key) {
                        error!(order_id = %order_id, item = ?key, error = %e, "failed to delete order item");
                    }
                }
                if let Err(e) = self.headers.delete(&order_id) {
                    error!(order_id = %order_id, error = %e, "failed to delete order header");
                }
                debug!(order_id = %order_id, error = %cause, "order rolled back");
            }
        }
    }
}

impl core::fmt::Debug for OrderAggregateBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OrderAggregateBuilder")
            .field("rules", &self.rules)
            .field("compensation", &self.compensation)
            .finish_non_exhaustive()
    }
}
