//! Single-worker order intake.
//!
//! ## Flow
//!
//! ```text
//! caller ── submit(request) ──▶ [OrderedExecutor] ──▶ worker:
//!                                                      Building
//!                                                      builder.build()
//!                                                      ├─ Ok  → Committed → observers → Notified
//!                                                      └─ Err → Rejected
//!                                                      reply → PendingOrder
//! ```
//!
//! Sequence numbers are assigned under the same lock that enqueues the task,
//! so a lower sequence always starts building before a higher one.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use orderflow_core::fault::panic_message;
use orderflow_core::{FulfillmentError, FulfillmentResult, OrderId};
use orderflow_events::CommitObservable;
use orderflow_sales::{OrderAggregateBuilder, OrderHeader, OrderRequest};

use super::channel::ChannelExecutor;
use super::executor::{IntakeError, IntakeShape, OrderedExecutor};
use super::lifecycle::{LifecycleRegistry, OrderLifecycle};
use super::ring::RingBufferExecutor;

/// Intake runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntakeStats {
    pub submitted: u64,
    pub committed: u64,
    pub rejected: u64,
    pub panicked: u64,
}

#[derive(Debug, Default)]
struct IntakeCounters {
    submitted: AtomicU64,
    committed: AtomicU64,
    rejected: AtomicU64,
    panicked: AtomicU64,
}

impl IntakeCounters {
    fn snapshot(&self) -> IntakeStats {
        IntakeStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct SubmitGate {
    next_sequence: u64,
    closed: bool,
}

/// Result handle for one submitted order.
#[derive(Debug)]
pub struct PendingOrder {
    sequence: u64,
    receiver: mpsc::Receiver<FulfillmentResult<OrderHeader>>,
    outcome: Option<FulfillmentResult<OrderHeader>>,
}

impl PendingOrder {
    /// FIFO position assigned at submission (starts at 1).
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Block until the order is committed or rejected.
    pub fn wait(mut self) -> FulfillmentResult<OrderHeader> {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        self.receiver.recv().unwrap_or_else(|_| Err(dropped_reply()))
    }

    /// Non-blocking poll. Returns `None` while the order is still queued or building.
    pub fn try_result(&mut self) -> Option<&FulfillmentResult<OrderHeader>> {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(mpsc::TryRecvError::Empty) => return None,
                Err(mpsc::TryRecvError::Disconnected) => self.outcome = Some(Err(dropped_reply())),
            }
        }
        self.outcome.as_ref()
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`, keeping the handle usable.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<&FulfillmentResult<OrderHeader>> {
        if self.outcome.is_none() {
            match self.receiver.recv_timeout(timeout) {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(mpsc::RecvTimeoutError::Timeout) => return None,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    self.outcome = Some(Err(dropped_reply()))
                }
            }
        }
        self.outcome.as_ref()
    }
}

fn dropped_reply() -> FulfillmentError {
    FulfillmentError::WorkerPanicked("intake worker dropped the order without a result".to_string())
}

/// FIFO order intake with exactly one building worker.
pub struct IntakeQueue {
    executor: Box<dyn OrderedExecutor>,
    builder: Arc<OrderAggregateBuilder>,
    observable: Arc<CommitObservable<OrderHeader>>,
    lifecycle: Arc<LifecycleRegistry>,
    counters: Arc<IntakeCounters>,
    gate: Mutex<SubmitGate>,
}

impl IntakeQueue {
    /// Start a queue on a freshly spawned executor of the given shape.
    ///
    /// `capacity` bounds the channel, or sizes the ring (power of two).
    pub fn spawn(
        name: &str,
        shape: IntakeShape,
        capacity: usize,
        builder: Arc<OrderAggregateBuilder>,
        observable: Arc<CommitObservable<OrderHeader>>,
    ) -> Result<Self, IntakeError> {
        let executor: Box<dyn OrderedExecutor> = match shape {
            IntakeShape::Channel => Box::new(ChannelExecutor::spawn(name, capacity)?),
            IntakeShape::Ring => Box::new(RingBufferExecutor::spawn(name, capacity)?),
        };
        Ok(Self::with_executor(executor, builder, observable))
    }

    pub fn with_executor(
        executor: Box<dyn OrderedExecutor>,
        builder: Arc<OrderAggregateBuilder>,
        observable: Arc<CommitObservable<OrderHeader>>,
    ) -> Self {
        Self {
            executor,
            builder,
            observable,
            lifecycle: Arc::new(LifecycleRegistry::new()),
            counters: Arc::new(IntakeCounters::default()),
            gate: Mutex::new(SubmitGate {
                next_sequence: 1,
                closed: false,
            }),
        }
    }

    /// Keep at most `retention` terminal lifecycle states for lookup.
    pub fn with_lifecycle_retention(mut self, retention: usize) -> Self {
        self.lifecycle = Arc::new(LifecycleRegistry::with_retention(retention));
        self
    }

    pub fn shape(&self) -> IntakeShape {
        self.executor.shape()
    }

    /// Hand `request` to the worker.
    ///
    /// Blocks only while the executor is at capacity; the build itself runs
    /// later on the worker and resolves the returned handle.
    pub fn submit(&self, request: OrderRequest) -> Result<PendingOrder, IntakeError> {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if gate.closed {
            return Err(IntakeError::Closed);
        }

        let sequence = gate.next_sequence;
        let (reply_tx, reply_rx) = mpsc::channel();

        self.lifecycle.set(sequence, OrderLifecycle::Intake);
        let job = IntakeJob {
            sequence,
            request,
            reply: reply_tx,
            builder: self.builder.clone(),
            observable: self.observable.clone(),
            lifecycle: self.lifecycle.clone(),
            counters: self.counters.clone(),
        };

        if let Err(err) = self.executor.execute(Box::new(move || job.run())) {
            self.lifecycle.remove(sequence);
            return Err(err);
        }

        gate.next_sequence += 1;
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(order_seq = sequence, shape = %self.shape(), "order accepted");

        Ok(PendingOrder {
            sequence,
            receiver: reply_rx,
            outcome: None,
        })
    }

    /// Stop accepting, run every accepted order to a terminal state, join the worker.
    ///
    /// A concurrent or repeated call also blocks until the drain has finished.
    pub fn shutdown(&self) {
        let already_closed = {
            let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut gate.closed, true)
        };

        self.executor.shutdown();
        if already_closed {
            return;
        }

        let stats = self.stats();
        info!(
            shape = %self.shape(),
            submitted = stats.submitted,
            committed = stats.committed,
            rejected = stats.rejected,
            "intake drained"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner).closed
    }

    pub fn stats(&self) -> IntakeStats {
        self.counters.snapshot()
    }

    pub fn lifecycle(&self, sequence: u64) -> Option<OrderLifecycle> {
        self.lifecycle.get(sequence)
    }

    /// Accepted sequences that are not yet terminal.
    pub fn outstanding(&self) -> Vec<u64> {
        self.lifecycle.outstanding()
    }
}

impl core::fmt::Debug for IntakeQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IntakeQueue")
            .field("shape", &self.shape())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Everything the worker needs to process one submission.
struct IntakeJob {
    sequence: u64,
    request: OrderRequest,
    reply: mpsc::Sender<FulfillmentResult<OrderHeader>>,
    builder: Arc<OrderAggregateBuilder>,
    observable: Arc<CommitObservable<OrderHeader>>,
    lifecycle: Arc<LifecycleRegistry>,
    counters: Arc<IntakeCounters>,
}

impl IntakeJob {
    fn run(self) {
        let seq = self.sequence;
        self.lifecycle.set(seq, OrderLifecycle::Building);

        // The builder converts panics inside its rollback scope itself; this
        // catches anything that escapes before the header is persisted.
        let outcome = catch_unwind(AssertUnwindSafe(|| self.builder.build(&self.request)))
            .unwrap_or_else(|payload| {
                Err(FulfillmentError::WorkerPanicked(panic_message(payload.as_ref())))
            });
        if matches!(outcome, Err(FulfillmentError::WorkerPanicked(_))) {
            self.counters.panicked.fetch_add(1, Ordering::Relaxed);
        }

        match &outcome {
            Ok(header) => {
                // A committed header always carries its generated key.
                let order_id = header.order_id.unwrap_or(OrderId::new(0));
                self.counters.committed.fetch_add(1, Ordering::Relaxed);
                self.lifecycle.set(seq, OrderLifecycle::Committed { order_id });

                let report = self.observable.notify(header);
                self.lifecycle.set(seq, OrderLifecycle::Notified { order_id });
                debug!(
                    order_seq = seq,
                    order_id = %order_id,
                    delivered = report.delivered,
                    failed = report.failed,
                    "commit observers notified"
                );
            }
            Err(err) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                self.lifecycle.set(seq, OrderLifecycle::Rejected { reason: err.clone() });
                warn!(order_seq = seq, kind = err.kind(), error = %err, "order rejected");
            }
        }

        // The caller may have dropped its handle; the outcome is still recorded above.
        let _ = self.reply.send(outcome);
    }
}
