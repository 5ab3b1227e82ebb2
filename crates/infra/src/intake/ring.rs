//! Ring-buffer intake executor backed by the `disruptor` crate.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use disruptor::{BusySpinWithSpinLoopHint, Producer, build_single_producer};
use tracing::{debug, error, info};

use orderflow_core::fault::panic_message;

use super::executor::{IntakeError, IntakeShape, IntakeTask, OrderedExecutor};

/// Pre-allocated ring slot. The task is taken out by the consumer.
#[derive(Default)]
struct IntakeSlot {
    task: Mutex<Option<IntakeTask>>,
}

type Publish = Box<dyn FnMut(IntakeTask) + Send>;

/// Single producer, single consumer ring of `size` slots.
///
/// The consumer drains published slots in sequence order and in batches.
/// `execute` spins while the ring is full. Dropping the producer on shutdown
/// lets the consumer finish every published slot before it is joined.
pub struct RingBufferExecutor {
    name: String,
    size: usize,
    publish: Mutex<Option<Publish>>,
    closed: AtomicBool,
}

impl RingBufferExecutor {
    pub fn spawn(name: impl Into<String>, size: usize) -> Result<Self, IntakeError> {
        if !size.is_power_of_two() {
            return Err(IntakeError::InvalidCapacity {
                capacity: size,
                reason: "ring size must be a power of two",
            });
        }

        let name = name.into();
        let consumer_name = name.clone();
        let mut batch = 0usize;

        let mut producer = build_single_producer(size, IntakeSlot::default, BusySpinWithSpinLoopHint)
            .handle_events_with(move |slot: &IntakeSlot, sequence, end_of_batch: bool| {
                let task = slot
                    .task
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();

                if let Some(task) = task {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
                        error!(
                            worker = %consumer_name,
                            sequence,
                            panic = %panic_message(payload.as_ref()),
                            "intake task panicked"
                        );
                    }
                }

                batch += 1;
                if end_of_batch {
                    debug!(worker = %consumer_name, sequence, batch, "intake batch drained");
                    batch = 0;
                }
            })
            .build();

        let publish: Publish = Box::new(move |task: IntakeTask| {
            producer.publish(|slot| {
                *slot.task.get_mut().unwrap_or_else(PoisonError::into_inner) = Some(task);
            });
        });

        info!(executor = %name, size, "ring intake started");

        Ok(Self {
            name,
            size,
            publish: Mutex::new(Some(publish)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl OrderedExecutor for RingBufferExecutor {
    fn shape(&self) -> IntakeShape {
        IntakeShape::Ring
    }

    fn execute(&self, task: IntakeTask) -> Result<(), IntakeError> {
        let mut publish = self.publish.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(publish) = publish.as_mut() else {
            return Err(IntakeError::Closed);
        };
        publish(task);
        Ok(())
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);

        // Dropping the producer drains the ring and joins the consumer. The
        // lock stays held meanwhile so a concurrent caller waits too.
        let mut publish = self.publish.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(producer) = publish.take() {
            drop(producer);
            info!(executor = %self.name, "ring intake stopped");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for RingBufferExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl core::fmt::Debug for RingBufferExecutor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingBufferExecutor")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("closed", &self.is_closed())
            .finish()
    }
}
