//! `orderflow-core`: fulfillment building blocks shared by every crate.
//!
//! This crate contains **pure** primitives: identifiers, the failure taxonomy,
//! the record-store and validator collaborator interfaces, and the validation
//! gate, plus an in-memory record store for tests/dev. Nothing here performs IO.

pub mod error;
pub mod fault;
pub mod id;
pub mod memory;
pub mod record;
pub mod store;
pub mod validation;

pub use error::{FulfillmentError, FulfillmentResult};
pub use id::{CustomerId, IdParseError, OrderId, ProductId, SalesmanId, WarehouseId};
pub use memory::InMemoryRecordStore;
pub use record::Record;
pub use store::{RecordStore, StoreError};
pub use validation::{ConstraintViolation, ValidationGate, Validator, Violation, Violations};
