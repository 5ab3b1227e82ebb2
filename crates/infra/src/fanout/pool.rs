//! Fixed-size worker pool for post-commit side work.
//!
//! - `dispatch` never blocks: the queue in front of the workers is unbounded.
//! - Each message is handled by exactly one worker; there is no ordering
//!   across messages.
//! - A failing or panicking task is logged and counted, and the worker moves on.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use orderflow_core::fault::panic_message;
use orderflow_events::{CommitObserver, ObserverError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FanoutError {
    #[error("fanout is shut down")]
    Closed,

    #[error("fanout task failed: {0}")]
    Task(String),
}

impl FanoutError {
    pub fn task(msg: impl Into<String>) -> Self {
        Self::Task(msg.into())
    }
}

/// Side work run once per dispatched message.
pub trait FanoutTask<M>: Send + Sync {
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    fn run(&self, message: &M) -> Result<(), FanoutError>;
}

impl<M, F> FanoutTask<M> for F
where
    F: Fn(&M) -> Result<(), FanoutError> + Send + Sync,
{
    fn run(&self, message: &M) -> Result<(), FanoutError> {
        self(message)
    }
}

/// Fanout pool configuration.
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    /// Fixed number of worker threads (at least 1).
    pub workers: usize,
    /// Thread name prefix.
    pub name: String,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            name: "fanout".to_string(),
        }
    }
}

impl FanoutConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Fanout runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanoutStats {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct FanoutCounters {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Runs one [`FanoutTask`] per message on a fixed pool of threads.
pub struct NotificationFanout<M> {
    name: String,
    task_name: String,
    sender: Mutex<Option<mpsc::Sender<M>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    counters: Arc<FanoutCounters>,
}

impl<M: Send + 'static> NotificationFanout<M> {
    pub fn spawn(config: FanoutConfig, task: Arc<dyn FanoutTask<M>>) -> Self {
        let workers = config.workers.max(1);
        let (tx, rx) = mpsc::channel::<M>();
        let rx = Arc::new(Mutex::new(rx));
        let counters = Arc::new(FanoutCounters::default());

        let handles = (0..workers)
            .map(|idx| {
                let worker_name = format!("{}-{idx}", config.name);
                let rx = rx.clone();
                let task = task.clone();
                let counters = counters.clone();
                thread::Builder::new()
                    .name(worker_name.clone())
                    .spawn(move || worker_loop(&worker_name, &rx, task.as_ref(), &counters))
                    .expect("failed to spawn fanout worker thread")
            })
            .collect();

        info!(fanout = %config.name, workers, task = task.name(), "fanout started");

        Self {
            name: config.name,
            task_name: task.name().to_string(),
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
            counters,
        }
    }

    /// Queue `message` for one worker. Never blocks.
    pub fn dispatch(&self, message: M) -> Result<(), FanoutError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = sender.as_ref().ok_or(FanoutError::Closed)?;
        tx.send(message).map_err(|_| FanoutError::Closed)?;
        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Stop accepting, let workers finish queued and in-flight tasks, join them.
    pub fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(PoisonError::into_inner).take());

        // Held across the joins: a concurrent caller waits here until the drain is done.
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if workers.is_empty() {
            return;
        }

        for handle in workers.drain(..) {
            if handle.join().is_err() {
                error!(fanout = %self.name, "fanout worker thread terminated abnormally");
            }
        }
        drop(workers);

        let stats = self.stats();
        info!(
            fanout = %self.name,
            dispatched = stats.dispatched,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "fanout drained"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    pub fn stats(&self) -> FanoutStats {
        FanoutStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl<M> Drop for NotificationFanout<M> {
    fn drop(&mut self) {
        drop(self.sender.get_mut().unwrap_or_else(PoisonError::into_inner).take());
        for handle in self
            .workers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            let _ = handle.join();
        }
    }
}

impl<M> core::fmt::Debug for NotificationFanout<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationFanout")
            .field("name", &self.name)
            .field("task", &self.task_name)
            .finish_non_exhaustive()
    }
}

/// Registering the pool as a commit observer hands every committed message
/// to the workers without running the task on the committing thread.
impl<M: Clone + Send + 'static> CommitObserver<M> for NotificationFanout<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_commit(&self, committed: &M) -> Result<(), ObserverError> {
        self.dispatch(committed.clone())
            .map_err(|e| ObserverError::new(e.to_string()))
    }
}

fn worker_loop<M>(
    name: &str,
    rx: &Mutex<mpsc::Receiver<M>>,
    task: &dyn FanoutTask<M>,
    counters: &FanoutCounters,
) {
    loop {
        // Only one idle worker waits on the channel at a time.
        let next = rx.lock().unwrap_or_else(PoisonError::into_inner).recv();
        let Ok(message) = next else {
            break;
        };

        match catch_unwind(AssertUnwindSafe(|| task.run(&message))) {
            Ok(Ok(())) => {
                counters.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(err)) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(worker = name, task = task.name(), error = %err, "fanout task failed");
            }
            Err(payload) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    worker = name,
                    task = task.name(),
                    panic = %panic_message(payload.as_ref()),
                    "fanout task panicked"
                );
            }
        }
    }

    debug!(worker = name, "fanout worker stopped");
}
