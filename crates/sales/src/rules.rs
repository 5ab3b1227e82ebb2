//! Structural and business constraints on orders.

use orderflow_core::{FulfillmentError, ValidationGate, Validator, Violation};

use crate::order::{OrderHeader, OrderItem, OrderRequest};

/// Validation gates for every order-related entity.
///
/// `standard()` installs the built-in constraints; callers can append their
/// own validators per entity (e.g. a per-line quantity cap).
#[derive(Debug)]
pub struct OrderRules {
    request: ValidationGate<OrderRequest>,
    header: ValidationGate<OrderHeader>,
    item: ValidationGate<OrderItem>,
}

impl OrderRules {
    pub fn standard() -> Self {
        Self {
            request: ValidationGate::new("OrderRequest").with_validator(request_constraints),
            header: ValidationGate::new("OrderHeader").with_validator(header_constraints),
            item: ValidationGate::new("OrderItem").with_validator(item_constraints),
        }
    }

    pub fn with_request_validator(mut self, v: impl Validator<OrderRequest> + 'static) -> Self {
        self.request = self.request.with_validator(v);
        self
    }

    pub fn with_header_validator(mut self, v: impl Validator<OrderHeader> + 'static) -> Self {
        self.header = self.header.with_validator(v);
        self
    }

    pub fn with_item_validator(mut self, v: impl Validator<OrderItem> + 'static) -> Self {
        self.item = self.item.with_validator(v);
        self
    }

    /// Checked before anything is persisted or allocated.
    pub fn check_request(&self, request: &OrderRequest) -> Result<(), FulfillmentError> {
        self.request.validate(request)
    }

    /// Checked after the header has its generated key.
    pub fn check_header(&self, header: &OrderHeader) -> Result<(), FulfillmentError> {
        self.header.validate(header)
    }

    /// Checked after the item is back-filled, allocated and priced.
    /// `index` is the item's zero-based position in the request.
    pub fn check_item(&self, item: &OrderItem, index: usize) -> Result<(), FulfillmentError> {
        self.item.check(item, &format!("items[{index}]"))
    }
}

impl Default for OrderRules {
    fn default() -> Self {
        Self::standard()
    }
}

fn request_constraints(request: &OrderRequest) -> Vec<Violation> {
    let mut out = Vec::new();

    if !request.customer_id.is_assigned() {
        out.push(Violation::new("customer_id", "must be set"));
    }
    if !request.salesman_id.is_assigned() {
        out.push(Violation::new("salesman_id", "must be set"));
    }
    if request.items.is_empty() {
        out.push(Violation::new("items", "order must contain at least one item"));
    }
    for (idx, item) in request.items.iter().enumerate() {
        if !item.product_id.is_assigned() {
            out.push(Violation::new(format!("items[{idx}].product_id"), "must be set"));
        }
        if item.quantity == 0 {
            out.push(Violation::new(format!("items[{idx}].quantity"), "must be positive"));
        }
    }

    out
}

fn header_constraints(header: &OrderHeader) -> Vec<Violation> {
    let mut out = Vec::new();

    if !header.is_persisted() {
        out.push(Violation::new("order_id", "must be assigned before validation"));
    }
    if !header.customer_id.is_assigned() {
        out.push(Violation::new("customer_id", "must be set"));
    }
    if !header.salesman_id.is_assigned() {
        out.push(Violation::new("salesman_id", "must be set"));
    }
    if !header.status.is_initial() {
        out.push(Violation::new(
            "status",
            format!("new orders must be new or pending, found {:?}", header.status),
        ));
    }

    out
}

fn item_constraints(item: &OrderItem) -> Vec<Violation> {
    let mut out = Vec::new();

    if !item.order_id.is_assigned() {
        out.push(Violation::new("order_id", "must be back-filled from the header"));
    }
    if item.item_id == 0 {
        out.push(Violation::new("item_id", "line numbers start at 1"));
    }
    if !item.product_id.is_assigned() {
        out.push(Violation::new("product_id", "must be set"));
    }
    if item.quantity == 0 {
        out.push(Violation::new("quantity", "must be positive"));
    }

    out
}
