//! Registration-ordered, identity-deduplicated observer list.
//!
//! ## Delivery
//!
//! - `notify()` runs on the caller's thread (the intake worker) and calls
//!   observers one after another, in registration order.
//! - A failing or panicking observer is logged and skipped; later observers
//!   still run and the commit itself is never undone.
//! - Registration is keyed by `Arc` identity: registering the same observer
//!   twice is a no-op. There is no unregistration.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use orderflow_core::fault::panic_message;

use crate::observer::CommitObserver;

/// Outcome of a single `notify()` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Publishes committed messages to registered observers.
pub struct CommitObservable<M> {
    observers: RwLock<Vec<Arc<dyn CommitObserver<M>>>>,
}

impl<M> CommitObservable<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Returns `false` if this exact observer was
    /// already registered.
    pub fn register(&self, observer: Arc<dyn CommitObserver<M>>) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if observers.iter().any(|o| same_observer(o, &observer)) {
            debug!(observer = observer.name(), "observer already registered");
            return false;
        }

        observers.push(observer);
        true
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `committed` to every observer in registration order.
    pub fn notify(&self, committed: &M) -> NotifyReport {
        // Snapshot so observers may register others without deadlocking.
        let observers: Vec<_> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut report = NotifyReport::default();
        for observer in &observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_commit(committed))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    warn!(observer = observer.name(), error = %err, "commit observer failed");
                }
                Err(payload) => {
                    report.failed += 1;
                    warn!(
                        observer = observer.name(),
                        panic = %panic_message(payload.as_ref()),
                        "commit observer panicked"
                    );
                }
            }
        }
        report
    }
}

impl<M> Default for CommitObservable<M> {
    fn default() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }
}

impl<M> core::fmt::Debug for CommitObservable<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommitObservable")
            .field("observers", &self.len())
            .finish()
    }
}

// Compare data pointers only; vtable pointers for one type may differ across
// codegen units.
fn same_observer<M>(a: &Arc<dyn CommitObserver<M>>, b: &Arc<dyn CommitObserver<M>>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
