//! Product catalog module.
//!
//! Catalog rows are read-only from the pipeline's point of view: the order
//! builder looks them up to price items.

pub mod product;

pub use product::Product;
