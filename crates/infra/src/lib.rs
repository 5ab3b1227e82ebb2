//! Fulfillment runtime: intake executors, fan-out workers, documents, and the
//! pipeline that wires them to the order builder.

pub mod config;
pub mod documents;
pub mod fanout;
pub mod intake;
pub mod pipeline;
pub mod stores;

mod integration_tests;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{FulfillmentPipeline, PipelineError};
pub use stores::InMemoryStores;
