//! Ordered, single-worker order intake and its two executor shapes.

pub mod channel;
pub mod executor;
pub mod lifecycle;
pub mod queue;
pub mod ring;

pub use channel::ChannelExecutor;
pub use executor::{IntakeError, IntakeShape, IntakeTask, OrderedExecutor};
pub use lifecycle::{DEFAULT_LIFECYCLE_RETENTION, LifecycleRegistry, OrderLifecycle};
pub use queue::{IntakeQueue, IntakeStats, PendingOrder};
pub use ring::RingBufferExecutor;
