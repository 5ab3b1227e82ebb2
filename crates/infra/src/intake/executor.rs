//! The "ordered single-consumer executor" contract shared by both intake shapes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A unit of work handed to the intake worker.
pub type IntakeTask = Box<dyn FnOnce() + Send + 'static>;

/// Which executor backs the intake queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntakeShape {
    /// Bounded blocking channel feeding one worker thread.
    #[default]
    Channel,
    /// Single-producer ring buffer drained by one consumer thread.
    ///
    /// The consumer busy-spins while waiting for work, so it occupies a full
    /// core for the life of the pipeline even when no orders arrive.
    Ring,
}

impl IntakeShape {
    pub fn as_str(self) -> &'static str {
        match self {
            IntakeShape::Channel => "channel",
            IntakeShape::Ring => "ring",
        }
    }
}

impl core::fmt::Display for IntakeShape {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for IntakeShape {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "channel" => Ok(IntakeShape::Channel),
            "ring" | "ringbuffer" | "ring_buffer" => Ok(IntakeShape::Ring),
            other => Err(IntakeError::UnknownShape(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("intake is closed")]
    Closed,

    #[error("intake worker is gone")]
    WorkerGone,

    #[error("invalid intake capacity {capacity}: {reason}")]
    InvalidCapacity {
        capacity: usize,
        reason: &'static str,
    },

    #[error("unknown intake shape: {0}")]
    UnknownShape(String),
}

/// Runs tasks one at a time, in the order they were accepted, on a single
/// dedicated consumer.
///
/// - `execute` blocks only while the executor is at capacity.
/// - After `shutdown` returns, every accepted task has run and the consumer
///   thread has been joined; later `execute` calls fail with `Closed`.
/// - A panicking task is logged and does not stop the consumer.
pub trait OrderedExecutor: Send + Sync {
    fn shape(&self) -> IntakeShape;

    fn execute(&self, task: IntakeTask) -> Result<(), IntakeError>;

    fn shutdown(&self);

    fn is_closed(&self) -> bool;
}
