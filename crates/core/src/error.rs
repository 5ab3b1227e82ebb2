//! Fulfillment error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::ProductId;
use crate::store::StoreError;
use crate::validation::Violations;

/// Result type used across the fulfillment pipeline.
pub type FulfillmentResult<T> = Result<T, FulfillmentError>;

/// Why a single order was rejected.
///
/// Every variant is scoped to one order: the intake worker surfaces it to the
/// submitting caller and keeps draining the queue.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FulfillmentError {
    /// The request, header or an item broke one or more constraints.
    #[error("validation failed: {0}")]
    ValidationFailed(Violations),

    /// Inventory exists for the product, but no single warehouse holds enough.
    #[error("out of stock: no warehouse holds {requested} units of product {product_id}")]
    OutOfStock { product_id: ProductId, requested: u32 },

    /// No inventory (or no catalog row) exists for the product at all.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// A record-store collaborator failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The build panicked; the worker caught it and moved on.
    #[error("worker panicked while building order: {0}")]
    WorkerPanicked(String),
}

impl FulfillmentError {
    pub fn out_of_stock(product_id: ProductId, requested: u32) -> Self {
        Self::OutOfStock {
            product_id,
            requested,
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Stable snake_case tag, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            FulfillmentError::ValidationFailed(_) => "validation_failed",
            FulfillmentError::OutOfStock { .. } => "out_of_stock",
            FulfillmentError::ProductNotFound(_) => "product_not_found",
            FulfillmentError::StoreUnavailable(_) => "store_unavailable",
            FulfillmentError::WorkerPanicked(_) => "worker_panicked",
        }
    }

    pub fn violations(&self) -> Option<&Violations> {
        match self {
            FulfillmentError::ValidationFailed(v) => Some(v),
            _ => None,
        }
    }
}

impl From<StoreError> for FulfillmentError {
    fn from(value: StoreError) -> Self {
        FulfillmentError::StoreUnavailable(value.to_string())
    }
}

impl From<Violations> for FulfillmentError {
    fn from(value: Violations) -> Self {
        FulfillmentError::ValidationFailed(value)
    }
}
