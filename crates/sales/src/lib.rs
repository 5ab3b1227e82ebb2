//! Sales orders module.
//!
//! Order model, the order validation rules, and the builder that turns an
//! order request into a committed header with priced, allocated items.

pub mod builder;
pub mod order;
pub mod rules;

pub use builder::{CompensationPolicy, OrderAggregateBuilder, OrderStores};
pub use order::{ItemKey, OrderHeader, OrderItem, OrderItemRequest, OrderRequest, OrderStatus};
pub use rules::OrderRules;
