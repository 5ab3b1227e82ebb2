//! Post-commit fan-out: a bounded worker pool and the tasks it runs.

pub mod manifest;
pub mod pool;

pub use manifest::ShipmentManifestTask;
pub use pool::{FanoutConfig, FanoutError, FanoutStats, FanoutTask, NotificationFanout};
